//! Single-image extraction: decode, encode, one service call, normalise.
//!
//! [`invoke`] is shared by both front-ends. It returns an explicit `Result`;
//! the batch pipeline folds failures into an
//! [`crate::output::ExtractionResult`] while the HTTP responder turns them
//! into a 500.

use crate::config::ExtractionConfig;
use crate::error::ItemError;
use crate::pipeline::service::{ServiceReply, TextExtractor};
use crate::pipeline::{decode, encode};
use crate::prompts::NO_TEXT_PLACEHOLDER;
use std::time::Duration;
use tracing::debug;

/// Normalised text from one successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Trim the model text, or substitute [`NO_TEXT_PLACEHOLDER`] when the reply
/// had no text at all.
///
/// Whitespace-only text is not "absent": it trims to an empty string.
pub fn normalize_text(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => t.trim().to_string(),
        _ => NO_TEXT_PLACEHOLDER.to_string(),
    }
}

/// Extract the text of one image.
///
/// Exactly one call reaches `extractor`, and only if the bytes decode.
pub async fn invoke(
    extractor: &dyn TextExtractor,
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<Extraction, ItemError> {
    let owned = bytes.to_vec();
    let image = tokio::task::spawn_blocking(move || {
        let img = decode::decode_image(&owned)?;
        encode::encode_image(&img).map_err(|e| ItemError::Decode {
            detail: format!("re-encoding failed: {e}"),
        })
    })
    .await
    .map_err(|e| ItemError::Decode {
        detail: format!("image task failed: {e}"),
    })??;

    let call = extractor.extract(&config.instruction_text, &image);
    let reply: ServiceReply = match config.api_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| ItemError::Timeout { secs })??,
        None => call.await?,
    };

    debug!(
        "{}: {} input tokens, {} output tokens",
        extractor.name(),
        reply.input_tokens,
        reply.output_tokens
    );

    Ok(Extraction {
        text: normalize_text(reply.text.as_deref()),
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
    })
}
