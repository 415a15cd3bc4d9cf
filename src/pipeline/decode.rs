//! Image decoding: raw upload bytes → `DynamicImage`.
//!
//! The declared content type is only a hint from the client; the format is
//! sniffed from the bytes themselves. Anything the decoder rejects becomes an
//! [`ItemError::Decode`] so the batch can carry on.

use crate::error::ItemError;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Sniff the image format from the leading bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Decode an uploaded image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ItemError> {
    let format = sniff_format(bytes).ok_or_else(|| ItemError::Decode {
        detail: "unrecognised image format".to_string(),
    })?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| ItemError::Decode {
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded {:?} image {}x{}",
        format,
        img.width(),
        img.height()
    );
    Ok(img)
}
