//! Batch pipeline tests against a scripted in-process extractor.
//!
//! No network: every test injects a [`ScriptedExtractor`] through
//! `ExtractionConfig::extractor`, so the full order → decode → encode →
//! invoke → assemble path runs exactly as in production.

use async_trait::async_trait;
use edgequake_img2text::pipeline::encode::EncodedImage;
use edgequake_img2text::{
    assemble, extract_batch, extract_stream, extract_to_file, run_batch, Block,
    ExtractionConfig, ExtractionProgressCallback, Img2TextError, ItemError, ServiceReply,
    TextExtractor, UploadedItem,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays canned replies in call order and counts calls.
struct ScriptedExtractor {
    replies: Mutex<VecDeque<Result<ServiceReply, ItemError>>>,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    fn new(replies: Vec<Result<ServiceReply, ItemError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        })
    }

    fn echoing(n: usize) -> Arc<Self> {
        Self::new(
            (1..=n)
                .map(|i| Ok(ServiceReply::text(format!("text {i}"))))
                .collect(),
        )
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(
        &self,
        instruction: &str,
        image: &EncodedImage,
    ) -> Result<ServiceReply, ItemError> {
        assert_eq!(image.mime_type, "image/png");
        assert!(!image.data.is_empty());
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.lock().unwrap().push(instruction.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ServiceReply::default()))
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn upload(name: &str) -> UploadedItem {
    UploadedItem::new(name, png_bytes(), "image/png")
}

fn config_with(extractor: Arc<ScriptedExtractor>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .extractor(extractor)
        .build()
        .unwrap()
}

fn filenames(output: &edgequake_img2text::BatchOutput) -> Vec<&str> {
    output.results.iter().map(|r| r.filename.as_str()).collect()
}

// ── Ordering and result accounting ───────────────────────────────────────────

#[tokio::test]
async fn results_follow_numeric_filename_order() {
    let extractor = ScriptedExtractor::echoing(4);
    let config = config_with(extractor.clone());
    let items = vec![upload("10.jpg"), upload("cover.png"), upload("2.jpg"), upload("1.png")];

    let output = extract_batch(items, &config).await.unwrap();

    assert_eq!(filenames(&output), ["1.png", "2.jpg", "10.jpg", "cover.png"]);
    let labels: Vec<&str> = output.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["Q1", "Q2", "Q10", "Unknown"]);
    // Replies are consumed in processing order.
    assert_eq!(output.results[0].text, "text 1");
    assert_eq!(output.results[3].text, "text 4");
    assert_eq!(extractor.calls(), 4);
}

#[tokio::test]
async fn every_call_carries_the_configured_instruction() {
    let extractor = ScriptedExtractor::echoing(2);
    let config = ExtractionConfig::builder()
        .extractor(extractor.clone())
        .instruction_text("Read the page.")
        .build()
        .unwrap();

    extract_batch(vec![upload("1.png"), upload("2.png")], &config)
        .await
        .unwrap();

    let seen = extractor.instructions.lock().unwrap().clone();
    assert_eq!(seen, ["Read the page.", "Read the page."]);
}

#[tokio::test]
async fn one_result_per_input_even_when_all_fail() {
    let fail = || {
        Err(ItemError::Service {
            message: "quota exceeded".into(),
        })
    };
    let extractor = ScriptedExtractor::new(vec![fail(), fail(), fail()]);
    let config = config_with(extractor.clone());

    let output = extract_batch(vec![upload("3.png"), upload("1.png"), upload("2.png")], &config)
        .await
        .unwrap();

    assert_eq!(output.results.len(), 3);
    assert!(output.results.iter().all(|r| r.failed));
    assert_eq!(output.results[0].text, "[Error: quota exceeded]");
    assert_eq!(output.stats.failed, 3);
    assert_eq!(output.stats.succeeded, 0);
}

#[tokio::test]
async fn failure_does_not_stop_later_items() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(ServiceReply::text("first")),
        Err(ItemError::Service {
            message: "boom".into(),
        }),
        Ok(ServiceReply::text("third")),
    ]);
    let config = config_with(extractor.clone());

    let output = extract_batch(vec![upload("1.png"), upload("2.png"), upload("3.png")], &config)
        .await
        .unwrap();

    assert_eq!(extractor.calls(), 3);
    assert!(!output.results[0].failed);
    assert!(output.results[1].failed);
    assert_eq!(output.results[1].text, "[Error: boom]");
    assert_eq!(output.results[2].text, "third");
}

// ── Reply normalisation ──────────────────────────────────────────────────────

#[tokio::test]
async fn empty_reply_becomes_placeholder() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(ServiceReply::default()),
        Ok(ServiceReply::text("")),
        Ok(ServiceReply::text("  Q1. नेपाल \n")),
    ]);
    let config = config_with(extractor);

    let output = extract_batch(vec![upload("1.png"), upload("2.png"), upload("3.png")], &config)
        .await
        .unwrap();

    assert_eq!(output.results[0].text, "[No text found]");
    assert_eq!(output.results[1].text, "[No text found]");
    assert!(!output.results[0].failed);
    assert_eq!(output.results[2].text, "Q1. नेपाल");
}

#[tokio::test]
async fn undecodable_bytes_fail_without_a_service_call() {
    let extractor = ScriptedExtractor::echoing(1);
    let config = config_with(extractor.clone());
    let items = vec![
        UploadedItem::new("1.png", b"definitely not an image".to_vec(), "image/png"),
        upload("2.png"),
    ];

    let output = extract_batch(items, &config).await.unwrap();

    assert_eq!(extractor.calls(), 1);
    assert!(output.results[0].failed);
    assert!(
        output.results[0].text.starts_with("[Error: "),
        "got: {}",
        output.results[0].text
    );
    assert_eq!(output.results[1].text, "text 1");
}

#[tokio::test]
async fn token_usage_is_totalled() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(ServiceReply {
            text: Some("a".into()),
            input_tokens: 100,
            output_tokens: 7,
        }),
        Ok(ServiceReply {
            text: Some("b".into()),
            input_tokens: 50,
            output_tokens: 3,
        }),
    ]);
    let config = config_with(extractor);

    let output = run_batch(
        config.extractor.as_deref().unwrap(),
        vec![upload("1.png"), upload("2.png")],
        &config,
    )
    .await;

    assert_eq!(output.stats.total_input_tokens, 150);
    assert_eq!(output.stats.total_output_tokens, 10);
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_batch_is_rejected_before_any_call() {
    let extractor = ScriptedExtractor::echoing(1);
    let config = config_with(extractor.clone());

    let err = extract_batch(Vec::new(), &config).await.unwrap_err();

    assert!(matches!(err, Img2TextError::EmptyBatch));
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn missing_credential_is_fatal() {
    if ["GOOGLE_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .any(|v| std::env::var(v).is_ok())
    {
        eprintln!("SKIP: a Gemini API key is set in the environment");
        return;
    }
    let config = ExtractionConfig::default();

    let err = extract_batch(vec![upload("1.png")], &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Img2TextError::MissingCredential { .. }), "got: {err}");
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_results_in_batch_order() {
    let extractor = ScriptedExtractor::echoing(3);
    let config = config_with(extractor);

    let stream = extract_stream(vec![upload("q3.png"), upload("q1.png"), upload("q2.png")], &config)
        .unwrap();
    let results: Vec<_> = stream.collect().await;

    let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["q1.png", "q2.png", "q3.png"]);
    assert_eq!(results[2].text, "text 3");
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for RecordingCallback {
    fn on_batch_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start {total}"));
    }
    fn on_item_start(&self, position: usize, _total: usize, filename: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("item {position} {filename}"));
    }
    fn on_item_complete(&self, position: usize, _total: usize, _filename: &str, len: usize) {
        self.events.lock().unwrap().push(format!("ok {position} {len}"));
    }
    fn on_item_error(&self, position: usize, _total: usize, _filename: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("err {position}"));
    }
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total}"));
    }
}

#[tokio::test]
async fn progress_events_fire_in_order() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(ServiceReply::text("abc")),
        Err(ItemError::Service {
            message: "x".into(),
        }),
    ]);
    let recorder = Arc::new(RecordingCallback::default());
    let config = ExtractionConfig::builder()
        .extractor(extractor)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    extract_batch(vec![upload("2.png"), upload("1.png")], &config)
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "start 2",
            "item 1 1.png",
            "ok 1 3",
            "item 2 2.png",
            "err 2",
            "done 1/2",
        ]
    );
}

// ── Document output ──────────────────────────────────────────────────────────

#[tokio::test]
async fn document_sections_follow_results() {
    let extractor = ScriptedExtractor::new(vec![
        Ok(ServiceReply::text("Hello\nWorld")),
        Ok(ServiceReply::text("Hi")),
    ]);
    let config = config_with(extractor);

    let output = extract_batch(vec![upload("2.png"), upload("1.png")], &config)
        .await
        .unwrap();
    let doc = assemble(&output.results);

    assert_eq!(doc.blocks[1], Block::Source("1.png".into()));
    assert_eq!(
        doc.paragraph_texts()[1..],
        [
            "From: 1.png".to_string(),
            "Hello".to_string(),
            "World".to_string(),
            "_".repeat(50),
            "From: 2.png".to_string(),
            "Hi".to_string(),
            "_".repeat(50),
        ]
    );
}

#[tokio::test]
async fn extract_to_file_writes_docx() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exam.docx");
    let config = config_with(ScriptedExtractor::echoing(1));

    let output = extract_to_file(vec![upload("1.png")], &path, &config)
        .await
        .unwrap();

    assert_eq!(output.results.len(), 1);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn stream_reports_batch_completion() {
    let extractor = ScriptedExtractor::new(vec![
        Err(ItemError::Service {
            message: "x".into(),
        }),
        Ok(ServiceReply::text("ok")),
    ]);
    let recorder = Arc::new(RecordingCallback::default());
    let config = ExtractionConfig::builder()
        .extractor(extractor)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let results: Vec<_> = extract_stream(vec![upload("2.png"), upload("1.png")], &config)
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "start 2",
            "item 1 1.png",
            "err 1",
            "item 2 2.png",
            "ok 2 2",
            "done 1/2",
        ]
    );
}
