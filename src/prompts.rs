//! Instruction text sent to the vision model alongside each image.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! unit tests can inspect it without a live model. Callers override the
//! default through [`crate::config::ExtractionConfig::instruction_text`].

/// Default extraction instruction.
///
/// Asks for a verbatim transcription: line breaks kept (each line becomes one
/// document paragraph downstream) and mixed-script content left untouched.
pub const DEFAULT_INSTRUCTION: &str = "Extract all visible text from this image exactly as it appears. \
Preserve line breaks, bilingual content (Nepali + English), and formatting.";

/// Placeholder stored when the model answers with no text at all.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text found]";

/// Render the body text recorded for a failed item.
pub fn error_text(err: &impl std::fmt::Display) -> String {
    format!("[Error: {err}]")
}
