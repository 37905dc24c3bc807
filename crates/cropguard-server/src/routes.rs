//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, DefaultBodyLimit, Multipart,
        State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use std::fmt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::service::AppState;

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// Accepted upload content types; an absent content type is also accepted
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/bmp"];

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Room for multipart boundaries and part headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Crop Disease Detection API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let classifier = state.service.classifier();
    Json(json!({
        "status": "healthy",
        "model_loaded": true,
        "model": classifier.name(),
        "num_classes": classifier.num_classes(),
        "device": classifier.device_name(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics exporter not installed",
        )
            .into_response(),
    }
}

/// Classify an uploaded leaf image
async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    metrics::counter!("cropguard_requests_total").increment(1);

    let result = match multipart {
        Ok(multipart) => run_prediction(&state, multipart, &request_id).await,
        Err(rejection) => Err(AppError::from(rejection)),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(err) => {
            let kind = err.kind();
            metrics::counter!("cropguard_errors_total", "kind" => kind).increment(1);

            let message = err.to_string();
            let response = err.into_response();
            if response.status().is_server_error() {
                error!("[{}] Prediction failed ({}): {}", request_id, kind, message);
            } else {
                warn!(
                    "[{}] Rejected request ({}): {}",
                    request_id,
                    response.status(),
                    message
                );
            }
            response
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn run_prediction(
    state: &AppState,
    multipart: Multipart,
    request_id: &str,
) -> Result<Response, AppError> {
    let image = read_upload(multipart, state.config.max_upload_bytes).await?;
    debug!("[{}] Received {} byte upload", request_id, image.len());

    let service = state.service.clone();
    let prediction = tokio::task::spawn_blocking(move || service.diagnose(&image))
        .await
        .map_err(|e| AppError::Internal(format!("Inference task failed: {}", e)))??;

    info!(
        "[{}] Predicted {} ({:.4}), advice from {} match",
        request_id,
        prediction.predicted_class,
        prediction.confidence,
        prediction.advisory_source.as_str()
    );
    Ok(Json(prediction).into_response())
}

/// Pull the image bytes out of the `file` field
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            if !content_type.is_empty() && !ALLOWED_CONTENT_TYPES.contains(&content_type) {
                return Err(AppError::InvalidRequest(format!(
                    "Invalid file type: {}. Please upload an image (JPEG, PNG, or BMP).",
                    content_type
                )));
            }
        }

        let data = field.bytes().await?;
        if data.len() > max_bytes {
            return Err(AppError::TooLarge {
                size: data.len(),
                limit: max_bytes,
            });
        }
        if data.is_empty() {
            return Err(AppError::InvalidRequest(
                "Uploaded file is empty".to_string(),
            ));
        }
        return Ok(data);
    }

    Err(AppError::InvalidRequest(format!(
        "No file uploaded (expected multipart field '{}')",
        UPLOAD_FIELD
    )))
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    TooLarge { size: usize, limit: usize },
    NotMultipart(MultipartRejection),
    Multipart(MultipartError),
    Diagnosis(cropguard_core::Error),
    Internal(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::TooLarge { .. } => "payload_too_large",
            AppError::NotMultipart(_) | AppError::Multipart(_) => "multipart",
            AppError::Diagnosis(e) => e.kind(),
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotMultipart(rejection) => rejection.status(),
            AppError::Multipart(err) => err.status(),
            AppError::Diagnosis(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Diagnosis(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) | AppError::Internal(msg) => f.write_str(msg),
            AppError::TooLarge { size, limit } => write!(
                f,
                "Uploaded file is {} bytes, above the {} byte limit",
                size, limit
            ),
            AppError::NotMultipart(rejection) => f.write_str(&rejection.body_text()),
            AppError::Multipart(err) => f.write_str(&err.body_text()),
            AppError::Diagnosis(err) => write!(f, "{}", err),
        }
    }
}

impl From<cropguard_core::Error> for AppError {
    fn from(err: cropguard_core::Error) -> Self {
        AppError::Diagnosis(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::NotMultipart(rejection)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        });

        (self.status(), Json(body)).into_response()
    }
}
