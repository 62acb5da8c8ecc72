//! Prediction orchestration
//!
//! normalize -> [`Predictor::predict`] (log1p scale) -> `expm1` -> response.
//! [`PredictionService`] bundles the loaded model with the per-request limits
//! and is shared read-only by all handlers.

pub mod bulk;
pub mod single;
pub mod stats;

use std::sync::Arc;

use tracing::debug;

use crate::error::PredictError;
use crate::features::FeatureRow;
use crate::model::Predictor;

pub use bulk::{BulkPrediction, BulkPredictionResponse, PREDICTION_COLUMN};
pub use single::{PredictionRequest, PredictionResponse};
pub use stats::BulkStatistics;

/// Invert the model's `log1p` target: `exp(y) - 1`
pub fn inverse_transform(log_value: f64) -> f64 {
    log_value.exp_m1()
}

/// Call the model once over all rows and return revenues in row order
///
/// A log value that overflows `expm1` fails the whole call.
pub(crate) fn run_model(
    predictor: &dyn Predictor,
    rows: &[FeatureRow],
) -> Result<Vec<f64>, PredictError> {
    let log_values = predictor.predict(rows)?;
    if log_values.len() != rows.len() {
        return Err(PredictError::Prediction(format!(
            "model returned {} predictions for {} rows",
            log_values.len(),
            rows.len()
        )));
    }
    debug!("Model produced {} predictions", log_values.len());

    log_values
        .into_iter()
        .enumerate()
        .map(|(row, log_value)| {
            let revenue = inverse_transform(log_value);
            if revenue.is_finite() {
                Ok(revenue)
            } else {
                Err(PredictError::Prediction(format!(
                    "non-finite prediction for row {} (log value {})",
                    row, log_value
                )))
            }
        })
        .collect()
}

/// Immutable prediction service built once at startup
pub struct PredictionService {
    predictor: Arc<dyn Predictor>,
    max_upload_bytes: usize,
}

impl PredictionService {
    pub fn new(predictor: Arc<dyn Predictor>, max_upload_bytes: usize) -> Self {
        Self {
            predictor,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Predict revenue for one company
    pub fn predict_single(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionResponse, PredictError> {
        single::predict_single(self.predictor.as_ref(), request)
    }

    /// Predict revenue for every row of an uploaded spreadsheet
    pub fn predict_bulk(&self, payload: &[u8]) -> Result<BulkPrediction, PredictError> {
        bulk::predict_bulk(self.predictor.as_ref(), payload, self.max_upload_bytes)
    }
}
