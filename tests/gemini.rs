//! Gemini REST client tests against a local mock server.

use edgequake_img2text::pipeline::encode::encode_image;
use edgequake_img2text::{
    extract_batch, ExtractionConfig, GeminiExtractor, ItemError, TextExtractor, UploadedItem,
};
use mockito::Matcher;
use serde_json::json;
use std::io::Cursor;
use tokio_test::{assert_err, assert_ok};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn png_image() -> image::DynamicImage {
    image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    png_image().write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn success_body(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }],
        "usageMetadata": { "promptTokenCount": 258, "candidatesTokenCount": 12 }
    })
    .to_string()
}

#[tokio::test]
async fn sends_key_header_and_inline_image() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""inline_data""#.into()),
            Matcher::Regex(r#""mime_type":"image/png""#.into()),
            Matcher::Regex(r#""maxOutputTokens":2048"#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(success_body("Q1. नमस्ते\nHello"))
        .create_async()
        .await;

    let gemini = GeminiExtractor::new("test-key", "gemini-2.5-flash", server.url())
        .with_generation(0.1, 2048);
    let image = encode_image(&png_image()).unwrap();

    let reply = assert_ok!(gemini.extract("Extract the text.", &image).await);

    assert_eq!(reply.text.as_deref(), Some("Q1. नमस्ते\nHello"));
    assert_eq!(reply.input_tokens, 258);
    assert_eq!(reply.output_tokens, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn api_error_body_becomes_service_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let gemini = GeminiExtractor::new("bad-key", "gemini-2.5-flash", server.url());
    let image = encode_image(&png_image()).unwrap();

    let err = assert_err!(gemini.extract("Extract the text.", &image).await);

    match err {
        ItemError::Service { message } => {
            assert!(message.contains("API key not valid"), "got: {message}");
            assert!(!message.contains("bad-key"), "key leaked: {message}");
        }
        other => panic!("expected a service error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn non_json_error_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", GENERATE_PATH)
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let gemini = GeminiExtractor::new("k", "gemini-2.5-flash", server.url());
    let image = encode_image(&png_image()).unwrap();

    let err = assert_err!(gemini.extract("x", &image).await);
    let text = err.to_string();
    assert!(text.contains("503"), "got: {text}");
    assert!(text.contains("upstream unavailable"), "got: {text}");
}

#[tokio::test]
async fn batch_through_configured_gemini_client() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "cfg-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(success_body("  Hello  "))
        .expect(2)
        .create_async()
        .await;

    let config = ExtractionConfig::builder()
        .api_key("cfg-key")
        .gemini_base_url(server.url())
        .build()
        .unwrap();
    let items = vec![
        UploadedItem::new("2.png", png_bytes(), "image/png"),
        UploadedItem::new("1.png", png_bytes(), "image/png"),
    ];

    let output = extract_batch(items, &config).await.unwrap();

    assert_eq!(output.results[0].filename, "1.png");
    assert_eq!(output.results[0].text, "Hello");
    assert_eq!(output.stats.total_input_tokens, 516);
    mock.assert_async().await;
}

#[tokio::test]
async fn blocked_prompt_fails_the_item_only() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string())
        .create_async()
        .await;

    let config = ExtractionConfig::builder()
        .api_key("k")
        .gemini_base_url(server.url())
        .build()
        .unwrap();

    let output = extract_batch(
        vec![UploadedItem::new("q1.png", png_bytes(), "image/png")],
        &config,
    )
    .await
    .unwrap();

    assert!(output.results[0].failed);
    assert!(output.results[0].text.contains("SAFETY"));
}
