//! Ingestion: turn user-supplied paths into [`UploadedItem`]s.
//!
//! The HTTP front-end builds items straight from multipart fields; the CLI
//! goes through [`load_uploads`], which accepts image files and directories
//! (expanded to the images they contain). Only `.jpg`, `.jpeg` and `.png`
//! are accepted, the same set the upload form offers.

use crate::error::Img2TextError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by the batch front-end.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One uploaded image: name, raw bytes and declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedItem {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl UploadedItem {
    pub fn new(
        filename: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Whether the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Media type implied by a file extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Load every path (files or directories) into upload items, in argument
/// order. Directory entries are taken in file-name order.
pub async fn load_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedItem>, Img2TextError> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_dir() {
            for file in list_images(path).await? {
                items.push(load_file(&file).await?);
            }
        } else {
            items.push(load_file(path).await?);
        }
    }
    if items.is_empty() {
        return Err(Img2TextError::EmptyBatch);
    }
    Ok(items)
}

async fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Img2TextError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| io_error(dir, e))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        if path.is_file() && content_type_for(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    debug!("{}: {} image(s)", dir.display(), files.len());
    Ok(files)
}

async fn load_file(path: &Path) -> Result<UploadedItem, Img2TextError> {
    if !path.exists() {
        return Err(Img2TextError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content_type = content_type_for(path).ok_or_else(|| Img2TextError::UnsupportedFile {
        path: path.to_path_buf(),
    })?;
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded {} ({} bytes)", filename, bytes.len());
    Ok(UploadedItem::new(filename, bytes, content_type))
}

fn io_error(path: &Path, e: std::io::Error) -> Img2TextError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => Img2TextError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Img2TextError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Img2TextError::Internal(format!("reading '{}': {e}", path.display())),
    }
}
