//! Eager (whole-batch) extraction entry points.
//!
//! [`extract_batch`] orders the uploads, runs every image through the
//! extraction service one at a time, and returns all results at once. Use
//! [`crate::stream::extract_stream`] to receive results as they are ready.

use crate::config::{ExtractionConfig, DEFAULT_GEMINI_MODEL};
use crate::document::{self, DOCX_FILENAME};
use crate::error::Img2TextError;
use crate::order;
use crate::output::{BatchOutput, BatchStats, ExtractionResult};
use crate::pipeline::input::UploadedItem;
use crate::pipeline::invoke::invoke;
use crate::pipeline::service::{GeminiExtractor, LlmProviderExtractor, TextExtractor};
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used for non-Gemini providers when none is named.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1-nano";

/// Environment variables checked, in order, for the Gemini credential.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Extract text from every upload, in filename order.
///
/// # Errors
/// Returns `Err` only for fatal problems: an empty batch or an extractor
/// that cannot be configured. Per-image failures are recorded in the
/// corresponding [`ExtractionResult`] and never abort the batch.
pub async fn extract_batch(
    items: Vec<UploadedItem>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Img2TextError> {
    if items.is_empty() {
        return Err(Img2TextError::EmptyBatch);
    }
    let extractor = resolve_extractor(config)?;
    Ok(run_batch(extractor.as_ref(), items, config).await)
}

/// Run a batch against an already resolved extractor.
///
/// The result sequence has exactly one entry per input item, in the order
/// given by [`order::order_batch`].
pub async fn run_batch(
    extractor: &dyn TextExtractor,
    items: Vec<UploadedItem>,
    config: &ExtractionConfig,
) -> BatchOutput {
    let start = Instant::now();
    let ordered = order::order_batch(items);
    let total = ordered.len();
    info!("Extracting text from {} image(s) via {}", total, extractor.name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for (i, item) in ordered.iter().enumerate() {
        results.push(extract_item(extractor, item, i + 1, total, config).await);
    }

    let stats = BatchStats::from_results(&results, start.elapsed().as_millis() as u64);
    info!(
        "Extraction complete: {}/{} images, {}ms total",
        stats.succeeded, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.succeeded);
    }

    BatchOutput { results, stats }
}

/// Extract one item of an ordered batch and fire its progress events.
pub(crate) async fn extract_item(
    extractor: &dyn TextExtractor,
    item: &UploadedItem,
    position: usize,
    total: usize,
    config: &ExtractionConfig,
) -> ExtractionResult {
    if let Some(ref cb) = config.progress_callback {
        cb.on_item_start(position, total, &item.filename);
    }

    let start = Instant::now();
    let outcome = invoke(extractor, &item.bytes, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match &outcome {
        Ok(extraction) => {
            debug!(
                "{} [{}/{}]: {} chars in {}ms",
                item.filename,
                position,
                total,
                extraction.text.len(),
                duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_item_complete(position, total, &item.filename, extraction.text.len());
            }
        }
        Err(e) => {
            warn!("Error processing {}: {}", item.filename, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_item_error(position, total, &item.filename, &e.to_string());
            }
        }
    }

    ExtractionResult::from_outcome(item.filename.clone(), outcome, duration_ms)
}

/// Run a batch and write the assembled Word document to `output_path`.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// half-written document behind.
pub async fn extract_to_file(
    items: Vec<UploadedItem>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Img2TextError> {
    let output = extract_batch(items, config).await?;
    let doc = document::assemble(&output.results);
    document::write_document(&doc, output_path.as_ref()).await?;
    Ok(output)
}

/// Default output path for the batch document in `dir`.
pub fn default_output_path(dir: impl AsRef<Path>) -> std::path::PathBuf {
    dir.as_ref().join(DOCX_FILENAME)
}

// ── Extractor resolution ─────────────────────────────────────────────────

/// Resolve the extraction client, from most-specific to least-specific.
///
/// 1. **Pre-built extractor** (`config.extractor`): used as-is.
/// 2. **Gemini** (default provider): credential from `config.api_key`, else
///    `GOOGLE_API_KEY`, else `GEMINI_API_KEY`. A missing credential is fatal.
/// 3. **Any other name**: handed to edgequake-llm's
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    own API key variable.
pub fn resolve_extractor(
    config: &ExtractionConfig,
) -> Result<Arc<dyn TextExtractor>, Img2TextError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }

    let provider = config.provider();
    if provider.eq_ignore_ascii_case("gemini") {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(api_key_from_env)
            .ok_or_else(|| Img2TextError::MissingCredential {
                provider: provider.to_string(),
            })?;
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        debug!("Using Gemini REST extractor with model {}", model);
        let extractor = GeminiExtractor::new(api_key, model, config.gemini_base_url.as_str())
            .with_generation(config.temperature, config.max_tokens);
        return Ok(Arc::new(extractor));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);
    let llm = ProviderFactory::create_llm_provider(provider, model).map_err(|e| {
        Img2TextError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: format!("{e}"),
        }
    })?;
    debug!("Using edgequake-llm provider {} with model {}", provider, model);
    Ok(Arc::new(LlmProviderExtractor::new(
        llm,
        provider,
        config.temperature,
        config.max_tokens,
    )))
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}
