//! Error types for revpred-api
//!
//! [`PredictError`] is the request-scoped taxonomy produced by the prediction
//! pipeline. [`ApiError`] wraps it for HTTP handlers and renders the JSON error
//! body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::ModelError;

/// Failures of a single prediction request
///
/// Every variant is scoped to one request; none leaves state behind.
#[derive(Debug, Error)]
pub enum PredictError {
    /// Caller input is malformed or out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded bytes could not be read as a spreadsheet
    #[error("Error processing file: {0}")]
    MalformedInput(String),

    /// Spreadsheet parsed but holds no data rows
    #[error("Excel file is empty: {0}")]
    EmptyTable(String),

    /// Upload exceeds the configured ceiling; checked before parsing
    #[error("File size exceeds maximum allowed size of {}", format_limit(.limit))]
    PayloadTooLarge { limit: usize },

    /// Normalization or model invocation failed after validation passed
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// No model is loaded
    #[error("Model not loaded")]
    ModelUnavailable,
}

impl From<ModelError> for PredictError {
    fn from(err: ModelError) -> Self {
        PredictError::Prediction(err.to_string())
    }
}

impl PredictError {
    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "VALIDATION_ERROR",
            PredictError::MalformedInput(_) => "MALFORMED_INPUT",
            PredictError::EmptyTable(_) => "EMPTY_FILE",
            PredictError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            PredictError::Prediction(_) => "PREDICTION_ERROR",
            PredictError::ModelUnavailable => "MODEL_UNAVAILABLE",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::ModelUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Render a byte ceiling the way users configure it
fn format_limit(limit: &usize) -> String {
    const MIB: usize = 1024 * 1024;
    if *limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format!("{} bytes", limit)
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pipeline failure (status decided by the variant)
    #[error(transparent)]
    Predict(#[from] PredictError),

    /// Internal server error (500), e.g. a panicked worker task
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Predict(ref err) => (err.status(), err.code(), err.to_string()),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
