//! HTTP API front-end.
//!
//! | Method | Path            | Body                      | Response |
//! |--------|-----------------|---------------------------|----------|
//! | GET    | `/`             | (none)                    | `{"message": …}` |
//! | POST   | `/extract-text` | multipart, one `file`     | `{"extracted_text": …}` |
//! | POST   | `/extract-docx` | multipart, 1..n `file`    | `.docx` attachment |
//!
//! The extraction client is built once at startup and shared read-only by
//! every request. A single-image request fails as a whole (500 with a generic
//! message, cause logged), while the batch endpoint isolates per-image
//! failures inside the document.

use crate::config::ExtractionConfig;
use crate::document::{self, DOCX_FILENAME, DOCX_MEDIA_TYPE};
use crate::extract::run_batch;
use crate::pipeline::input::UploadedItem;
use crate::pipeline::invoke::invoke;
use crate::pipeline::service::TextExtractor;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Multipart field carrying an uploaded image.
pub const FILE_FIELD: &str = "file";

/// Default maximum request body size: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const WELCOME_MESSAGE: &str = "Welcome to the Gemini Image Text Extractor API!";
const INVALID_TYPE_MESSAGE: &str = "Invalid file type. Only images are supported.";
const PROCESSING_FAILED_MESSAGE: &str =
    "Failed to process the image and extract text. Please try again.";

/// Listener settings for [`serve`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Arc<ExtractionConfig>,
}

impl AppState {
    pub fn new(extractor: Arc<dyn TextExtractor>, config: ExtractionConfig) -> Self {
        Self {
            extractor,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextResponse {
    pub extracted_text: String,
}

/// Error body: `{"detail": …}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Handler failure mapped onto an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    /// Client error; the message is shown to the caller.
    Rejected { status: StatusCode, detail: String },
    /// Server-side failure; the caller only sees a generic message.
    Processing,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Rejected {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Rejected { status, detail } => (status, detail),
            ApiError::Processing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROCESSING_FAILED_MESSAGE.to_string(),
            ),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Build the API router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/extract-text", post(extract_text))
        .route("/extract-docx", post(extract_docx))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(server: &ServerConfig, state: AppState) -> Result<(), std::io::Error> {
    let app = build_router(state, server.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&server.addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    let mut files = read_files(multipart).await?;
    if files.len() != 1 {
        return Err(ApiError::bad_request(format!(
            "Expected exactly one '{FILE_FIELD}' field, got {}",
            files.len()
        )));
    }
    let item = files.remove(0);
    if !item.is_image() {
        return Err(ApiError::bad_request(INVALID_TYPE_MESSAGE));
    }

    match invoke(state.extractor.as_ref(), &item.bytes, &state.config).await {
        Ok(extraction) => Ok(Json(TextResponse {
            extracted_text: extraction.text,
        })),
        Err(e) => {
            error!("An error occurred processing {}: {}", item.filename, e);
            Err(ApiError::Processing)
        }
    }
}

async fn extract_docx(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Expected at least one '{FILE_FIELD}' field"
        )));
    }
    if let Some(bad) = files.iter().find(|f| !f.is_image()) {
        return Err(ApiError::bad_request(format!(
            "{INVALID_TYPE_MESSAGE} Rejected: {}",
            bad.filename
        )));
    }

    let output = run_batch(state.extractor.as_ref(), files, &state.config).await;
    let bytes = document::assemble(&output.results)
        .to_docx()
        .map_err(|e| {
            error!("Document assembly failed: {}", e);
            ApiError::Processing
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MEDIA_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOCX_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}

/// Collect every `file` field; other fields are ignored.
async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadedItem>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        files.push(UploadedItem::new(filename, bytes.to_vec(), content_type));
    }
    Ok(files)
}
