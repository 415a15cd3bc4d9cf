//! Streaming extraction API: emit each result as soon as it is ready.
//!
//! [`crate::extract::extract_batch`] returns only after the last image. For a
//! long batch a caller usually wants to show each transcription as it lands;
//! [`extract_stream`] yields the same results, one by one, in batch order.
//! Images are still processed strictly one after another.

use crate::config::ExtractionConfig;
use crate::error::Img2TextError;
use crate::extract::{extract_item, resolve_extractor};
use crate::order;
use crate::output::ExtractionResult;
use crate::pipeline::input::UploadedItem;
use futures::future;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-image results.
pub type ResultStream = Pin<Box<dyn Stream<Item = ExtractionResult> + Send>>;

/// Order the batch and stream its results.
///
/// # Returns
/// - `Ok(ResultStream)`: one item per upload, in filename order
/// - `Err(Img2TextError)`: empty batch or unconfigured extractor
pub fn extract_stream(
    items: Vec<UploadedItem>,
    config: &ExtractionConfig,
) -> Result<ResultStream, Img2TextError> {
    if items.is_empty() {
        return Err(Img2TextError::EmptyBatch);
    }
    let extractor = resolve_extractor(config)?;
    let ordered = order::order_batch(items);
    let total = ordered.len();
    info!("Streaming extraction of {} image(s) via {}", total, extractor.name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let succeeded = Arc::new(AtomicUsize::new(0));
    let config = config.clone();
    let callback = config.progress_callback.clone();

    let results = {
        let succeeded = Arc::clone(&succeeded);
        stream::iter(ordered.into_iter().enumerate()).then(move |(i, item)| {
            let extractor = Arc::clone(&extractor);
            let succeeded = Arc::clone(&succeeded);
            let config = config.clone();
            async move {
                let result = extract_item(extractor.as_ref(), &item, i + 1, total, &config).await;
                if !result.failed {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                }
                result
            }
        })
    };

    // Runs once the last item has been yielded; emits nothing.
    let finish = stream::once(async move {
        if let Some(cb) = callback {
            cb.on_batch_complete(total, succeeded.load(Ordering::SeqCst));
        }
        None
    });

    let stream = results.map(Some).chain(finish).filter_map(future::ready);

    Ok(Box::pin(stream))
}
