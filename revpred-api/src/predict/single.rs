//! Single-record prediction

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::run_model;
use crate::error::PredictError;
use crate::features::{normalize, RawRecord};
use crate::model::Predictor;

/// Body of `POST /api/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// Number of employees (> 0)
    pub employee_count: f64,
    /// Company age in years (>= 0)
    pub company_age: f64,
    /// e.g. "Private Company", "Public Company"
    pub company_type: String,
    /// Industry category
    #[serde(default)]
    pub category: Option<String>,
    /// Headquarters city
    #[serde(default)]
    pub city: Option<String>,
    pub state: String,
    /// Current revenue (>= 0); only feeds revenue_per_employee
    #[serde(default)]
    pub revenue: Option<f64>,
}

impl From<&PredictionRequest> for RawRecord {
    fn from(request: &PredictionRequest) -> Self {
        RawRecord {
            employee_count: Some(request.employee_count),
            company_age: Some(request.company_age),
            company_type: Some(request.company_type.clone()),
            category: request.category.clone(),
            city: request.city.clone(),
            state: Some(request.state.clone()),
            revenue: request.revenue,
        }
    }
}

/// Response of `POST /api/predict`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub predicted_revenue: f64,
    /// Echo of the validated request
    pub input_data: PredictionRequest,
}

/// Validate, normalize, run the model on a one-row table, invert the log scale
pub fn predict_single(
    predictor: &dyn Predictor,
    request: PredictionRequest,
) -> Result<PredictionResponse, PredictError> {
    let record = RawRecord::from(&request);
    record.check_ranges().map_err(PredictError::Validation)?;

    let row = normalize(&record);
    debug!("Normalized single request: {:?}", row);

    let revenues = run_model(predictor, std::slice::from_ref(&row))?;

    Ok(PredictionResponse {
        predicted_revenue: revenues[0],
        input_data: request,
    })
}
