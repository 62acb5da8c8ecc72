//! revpred-api library - revenue prediction service
//!
//! Exposes the prediction pipeline and the HTTP router for the service
//! binary, the batch tool and integration tests.

pub mod api;
pub mod error;
pub mod features;
pub mod model;
pub mod predict;
pub mod table;

pub use crate::error::{ApiError, ApiResult, PredictError};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::model::ModelInfo;
use crate::predict::PredictionService;

/// Allowance for multipart framing on top of the upload ceiling, so that
/// oversize files reach the pipeline's own size check
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
///
/// Built once in `main`; never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the service started without a model (degraded mode)
    pub service: Option<Arc<PredictionService>>,
    /// Identification of the loaded artifact, if any
    pub model_info: Option<ModelInfo>,
    /// Bulk upload ceiling in bytes
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with a loaded model
    pub fn new(service: PredictionService, model_info: Option<ModelInfo>) -> Self {
        Self {
            max_upload_bytes: service.max_upload_bytes(),
            service: Some(Arc::new(service)),
            model_info,
            startup_time: Utc::now(),
        }
    }

    /// State without a model: health reports it, predictions are refused
    pub fn degraded(max_upload_bytes: usize) -> Self {
        Self {
            service: None,
            model_info: None,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.service.is_some()
    }

    /// The prediction service, or `ModelUnavailable`
    pub fn service(&self) -> Result<Arc<PredictionService>, PredictError> {
        self.service.clone().ok_or(PredictError::ModelUnavailable)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(api::root_routes())
        .merge(api::health_routes())
        .merge(api::predict_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
