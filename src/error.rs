use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to initialize recognition engine: {0}")]
    EngineInit(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ScanError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
            ScanError::EngineInit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_INIT"),
            ScanError::Recognition(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_FAILED"),
            ScanError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            ScanError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ScanError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ScanError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
