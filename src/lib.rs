//! # edgequake-img2text
//!
//! Extract text from images with Vision Language Models (VLMs) and assemble
//! the result into a Word document or a JSON response.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads
//!  │
//!  ├─ 1. Order     natural sort on the first number in each filename
//!  ├─ 2. Decode    sniff + decode each image (JPEG / PNG)
//!  ├─ 3. Encode    PNG → base64
//!  ├─ 4. VLM       one call per image, strictly in order (Gemini by default)
//!  ├─ 5. Record    trimmed text, "[No text found]", or "[Error: …]"
//!  └─ 6. Output    .docx (batch) or {"extracted_text": …} (HTTP)
//! ```
//!
//! A failed image never aborts a batch: it keeps its place in the document
//! with the error as its body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2text::{extract_to_file, load_uploads, ExtractionConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GOOGLE_API_KEY unless set with `.api_key(…)`
//!     let config = ExtractionConfig::default();
//!     let items = load_uploads(&[PathBuf::from("scans/")]).await?;
//!     let output = extract_to_file(items, "extracted_exam_paper.docx", &config).await?;
//!     eprintln!("{}/{} images ok", output.stats.succeeded, output.stats.total_items);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `img2text` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables the axum HTTP API in [`server`] |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{assemble, write_document, AssembledDocument, Block};
pub use error::{Img2TextError, ItemError};
pub use extract::{extract_batch, extract_to_file, resolve_extractor, run_batch};
pub use order::{label, order_batch, plan, sort_key, PlanEntry, SortKey};
pub use output::{BatchOutput, BatchStats, ExtractionResult};
pub use pipeline::input::{load_uploads, UploadedItem};
pub use pipeline::invoke::{invoke, Extraction};
pub use pipeline::service::{
    GeminiExtractor, LlmProviderExtractor, ServiceReply, TextExtractor,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::extract_stream;
