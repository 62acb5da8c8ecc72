//! Prediction endpoints
//!
//! Single prediction runs inline; bulk prediction parses and scores the
//! spreadsheet on the blocking pool.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, PredictError};
use crate::predict::{BulkPredictionResponse, PredictionRequest, PredictionResponse};
use crate::table::is_spreadsheet_filename;
use crate::AppState;

/// Multipart field carrying the spreadsheet
const UPLOAD_FIELD: &str = "file";

/// POST /api/predict
pub async fn predict_single(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let service = state.service()?;
    let Json(request) =
        payload.map_err(|rejection| PredictError::Validation(rejection.body_text()))?;

    match service.predict_single(request) {
        Ok(response) => {
            info!("Single prediction: {:.2}", response.predicted_revenue);
            Ok(Json(response))
        }
        Err(e) => {
            warn!("Single prediction failed: {}", e);
            Err(e.into())
        }
    }
}

/// POST /api/predict/bulk
pub async fn predict_bulk(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<BulkPredictionResponse>> {
    let service = state.service()?;
    let mut multipart =
        multipart.map_err(|rejection| PredictError::Validation(rejection.body_text()))?;

    let upload = read_upload(&mut multipart, service.max_upload_bytes()).await?;
    if !is_spreadsheet_filename(&upload.filename) {
        warn!("Rejected upload with unsupported name: {:?}", upload.filename);
        return Err(PredictError::Validation(
            "File must be Excel format (.xlsx or .xls)".to_string(),
        )
        .into());
    }

    info!(
        "Bulk prediction request: {} ({} bytes)",
        upload.filename,
        upload.data.len()
    );

    let result = tokio::task::spawn_blocking(move || service.predict_bulk(&upload.data))
        .await
        .map_err(|e| ApiError::Internal(format!("Bulk prediction task failed: {}", e)))?;

    match result {
        Ok(prediction) => Ok(Json(prediction.into_response())),
        Err(e) => {
            warn!("Bulk prediction failed: {}", e);
            Err(e.into())
        }
    }
}

struct Upload {
    filename: String,
    data: Bytes,
}

/// Pull the `file` field out of the form, skipping anything else
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, PredictError> {
    let to_error = |err: MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            PredictError::PayloadTooLarge { limit }
        } else {
            PredictError::Validation(format!("Invalid multipart upload: {}", err.body_text()))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(to_error)?;
        return Ok(Upload { filename, data });
    }

    Err(PredictError::Validation(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/api/predict", post(predict_single))
        .route("/api/predict/bulk", post(predict_bulk))
}
