//! Image encoding: `DynamicImage` → base64 PNG ready for a VLM request body.
//!
//! Uploads arrive as JPEG or PNG. Re-encoding to PNG gives every provider the
//! same lossless payload; JPEG artefacts around glyphs hurt transcription
//! accuracy more than the extra bytes cost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A base64-encoded image plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// Convert into the edgequake-llm attachment type.
    ///
    /// `detail: "high"` keeps fine print legible for OpenAI-style tiling.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.mime_type).with_detail("high")
    }
}

/// Encode a decoded image as a base64 PNG.
pub fn encode_image(img: &DynamicImage) -> Result<EncodedImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(EncodedImage {
        data: b64,
        mime_type: "image/png",
    })
}
