//! Progress-callback trait for per-image extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to hear about
//! each image as the batch runs. The CLI uses it to drive its progress bar;
//! a library caller can forward events to a channel or a log instead.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2text::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, position: usize, total: usize, filename: &str, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{position}/{total} {filename}: {text_len} chars");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch pipeline as it processes each image.
///
/// Items run one after another, so calls never overlap within a batch, but
/// the trait is `Send + Sync` so one callback can be shared by concurrent
/// HTTP requests. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once, after ordering and before the first image.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an image is sent to the service.
    ///
    /// `position` is 1-based, in processing order.
    fn on_item_start(&self, position: usize, total: usize, filename: &str) {
        let _ = (position, total, filename);
    }

    /// Called when an image produced text.
    fn on_item_complete(&self, position: usize, total: usize, filename: &str, text_len: usize) {
        let _ = (position, total, filename, text_len);
    }

    /// Called when an image failed; the batch continues.
    fn on_item_error(&self, position: usize, total: usize, filename: &str, error: &str) {
        let _ = (position, total, filename, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
