//! Error types for the edgequake-img2text library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2TextError`]: **Fatal**: the run cannot proceed at all (missing
//!   credential, unreadable input file, document could not be written).
//!   Returned as `Err(Img2TextError)` from the top-level entry points.
//!
//! * [`ItemError`]: **Non-fatal**: a single image failed (not a decodable
//!   image, extraction service error) but the rest of the batch is fine. The
//!   batch pipeline folds it into [`crate::output::ExtractionResult`] so the
//!   failed item keeps its place in the document.
//!
//! The HTTP front-end maps both onto status codes in `crate::server`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-img2text library.
#[derive(Debug, Error)]
pub enum Img2TextError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// No API credential was configured for the default Gemini extractor.
    #[error(
        "No API key configured for provider '{provider}'.\n\
Set GOOGLE_API_KEY (or GEMINI_API_KEY), or pass --api-key."
    )]
    MissingCredential { provider: String },

    /// A named edgequake-llm provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one of the accepted image types.
    #[error("Unsupported file '{path}': expected a .jpg, .jpeg or .png image")]
    UnsupportedFile { path: PathBuf },

    /// Nothing to process.
    #[error("No images to process")]
    EmptyBatch,

    // ── Output errors ─────────────────────────────────────────────────────
    /// The Word document could not be serialised.
    #[error("Failed to build document: {0}")]
    DocumentBuild(String),

    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The `Display` output is what ends up embedded in the document body as
/// `[Error: …]`, so messages stay short and human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The bytes are not an image the decoder understands.
    #[error("cannot identify image file: {detail}")]
    Decode { detail: String },

    /// The extraction service call failed.
    #[error("{message}")]
    Service { message: String },

    /// The extraction service did not answer in time.
    #[error("extraction timed out after {secs}s")]
    Timeout { secs: u64 },
}
