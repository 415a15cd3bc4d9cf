//! Result types produced by the extraction pipeline.

use crate::error::ItemError;
use crate::order;
use crate::pipeline::invoke::Extraction;
use crate::prompts::error_text;
use serde::{Deserialize, Serialize};

/// Outcome of one uploaded image, in batch order.
///
/// A failed item is still a result: its `text` carries `[Error: …]` and it
/// is rendered into the document like any other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub filename: String,
    /// Presentation label (`Q3`, `Unknown`).
    pub label: String,
    pub text: String,
    pub failed: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

impl ExtractionResult {
    /// Fold the invoker's outcome into a result record.
    pub fn from_outcome(
        filename: impl Into<String>,
        outcome: Result<Extraction, ItemError>,
        duration_ms: u64,
    ) -> Self {
        let filename = filename.into();
        let label = order::label(&filename);
        match outcome {
            Ok(extraction) => Self {
                filename,
                label,
                text: extraction.text,
                failed: false,
                input_tokens: extraction.input_tokens,
                output_tokens: extraction.output_tokens,
                duration_ms,
            },
            Err(e) => Self {
                filename,
                label,
                text: error_text(&e),
                failed: true,
                input_tokens: 0,
                output_tokens: 0,
                duration_ms,
            },
        }
    }
}

/// Aggregate figures for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

impl BatchStats {
    pub fn from_results(results: &[ExtractionResult], total_duration_ms: u64) -> Self {
        let failed = results.iter().filter(|r| r.failed).count();
        Self {
            total_items: results.len(),
            succeeded: results.len() - failed,
            failed,
            total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
            total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
            total_duration_ms,
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<ExtractionResult>,
    pub stats: BatchStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_not_failed() {
        let r = ExtractionResult::from_outcome(
            "q4.png",
            Ok(Extraction {
                text: "Hi".into(),
                input_tokens: 10,
                output_tokens: 2,
            }),
            5,
        );
        assert!(!r.failed);
        assert_eq!(r.text, "Hi");
        assert_eq!(r.label, "Q4");
    }

    #[test]
    fn failure_embeds_message() {
        let r = ExtractionResult::from_outcome(
            "cover.png",
            Err(ItemError::Service {
                message: "quota exceeded".into(),
            }),
            0,
        );
        assert!(r.failed);
        assert_eq!(r.text, "[Error: quota exceeded]");
        assert_eq!(r.label, "Unknown");
    }

    #[test]
    fn stats_count_failures_and_tokens() {
        let ok = ExtractionResult::from_outcome(
            "1.png",
            Ok(Extraction {
                text: "a".into(),
                input_tokens: 7,
                output_tokens: 3,
            }),
            1,
        );
        let bad = ExtractionResult::from_outcome(
            "2.png",
            Err(ItemError::Decode {
                detail: "x".into(),
            }),
            1,
        );
        let stats = BatchStats::from_results(&[ok, bad], 42);
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_input_tokens, 7);
        assert_eq!(stats.total_output_tokens, 3);
        assert_eq!(stats.total_duration_ms, 42);
    }
}
