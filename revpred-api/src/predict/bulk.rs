//! Bulk (spreadsheet) prediction
//!
//! The whole table is normalized first and the model is called exactly once.
//! Any failure fails the batch; no partial result list is produced.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{run_model, BulkStatistics};
use crate::error::PredictError;
use crate::features::normalize_table;
use crate::model::Predictor;
use crate::table::{read_spreadsheet, CellValue, Table};

/// Name of the column appended to the caller's table
pub const PREDICTION_COLUMN: &str = "predicted_revenue";

/// Result of a bulk run
#[derive(Debug, Clone)]
pub struct BulkPrediction {
    /// Copy of the original table with [`PREDICTION_COLUMN`] appended
    pub table: Table,
    pub statistics: BulkStatistics,
}

impl BulkPrediction {
    pub fn into_response(self) -> BulkPredictionResponse {
        BulkPredictionResponse {
            predictions: self.table.to_records(),
            statistics: self.statistics,
        }
    }
}

/// Response of `POST /api/predict/bulk`
#[derive(Debug, Clone, Serialize)]
pub struct BulkPredictionResponse {
    pub predictions: Vec<Map<String, Value>>,
    pub statistics: BulkStatistics,
}

/// Size-check, parse and predict an uploaded spreadsheet
///
/// The size ceiling is enforced before any parsing work.
pub fn predict_bulk(
    predictor: &dyn Predictor,
    payload: &[u8],
    max_bytes: usize,
) -> Result<BulkPrediction, PredictError> {
    if payload.len() > max_bytes {
        warn!(
            "Rejecting bulk upload of {} bytes (limit {} bytes)",
            payload.len(),
            max_bytes
        );
        return Err(PredictError::PayloadTooLarge { limit: max_bytes });
    }

    let table = read_spreadsheet(payload)?;
    predict_table(predictor, &table)
}

/// Predict every row of an already-parsed table
pub fn predict_table(predictor: &dyn Predictor, table: &Table) -> Result<BulkPrediction, PredictError> {
    if table.is_empty() {
        return Err(PredictError::EmptyTable("table has no rows".to_string()));
    }

    let rows = normalize_table(table)?;
    let predictions = run_model(predictor, &rows)?;
    let statistics = BulkStatistics::from_values(&predictions)
        .ok_or_else(|| PredictError::Prediction("model returned no predictions".to_string()))?;

    let values = predictions.iter().map(|v| CellValue::Float(*v)).collect();
    let table = table.with_column(PREDICTION_COLUMN, values);

    info!(
        "Bulk prediction complete: {} rows, mean {:.2}, median {:.2}",
        statistics.count, statistics.mean, statistics.median
    );

    Ok(BulkPrediction { table, statistics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;
    use crate::model::ModelError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Predicts log1p(1000 * employees) and counts invocations
    #[derive(Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    impl Predictor for CountingModel {
        fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(rows.iter().map(|r| (r.employee_count * 1000.0).ln_1p()).collect())
        }
    }

    fn sample_table() -> Table {
        let mut table = Table::new(vec![
            "Company".into(),
            "Employee Count".into(),
            "Company Age".into(),
        ]);
        for (name, staff) in [("A", 10), ("B", 20), ("C", 30)] {
            table.push_row(vec![
                CellValue::Text(name.into()),
                CellValue::Int(staff),
                CellValue::Int(2),
            ]);
        }
        table
    }

    #[test]
    fn test_single_model_call_and_statistics() {
        let model = CountingModel::default();
        let result = predict_table(&model, &sample_table()).unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.statistics.count, 3);
        assert!((result.statistics.mean - 20_000.0).abs() < 1e-6);
        assert!((result.statistics.median - 20_000.0).abs() < 1e-6);
        assert!((result.statistics.std - 8_164.965809277264).abs() < 1e-6);
    }

    #[test]
    fn test_original_columns_preserved_with_prediction_appended() {
        let result = predict_table(&CountingModel::default(), &sample_table()).unwrap();
        let response = result.into_response();

        let keys: Vec<&String> = response.predictions[0].keys().collect();
        assert_eq!(keys, ["Company", "Employee Count", "Company Age", "predicted_revenue"]);
        assert_eq!(response.predictions[2]["Company"], "C");
        let predicted = response.predictions[2]["predicted_revenue"].as_f64().unwrap();
        assert!((predicted - 30_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_oversize_rejected_before_parsing() {
        let model = CountingModel::default();
        // Not a spreadsheet: would be MalformedInput if it were parsed
        let payload = vec![0u8; 2048];
        match predict_bulk(&model, &payload, 1024) {
            Err(PredictError::PayloadTooLarge { limit }) => assert_eq!(limit, 1024),
            other => panic!("expected PayloadTooLarge, got {:?}", other.map(|_| ())),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_row_fails_whole_batch() {
        let mut table = sample_table();
        table.push_row(vec![
            CellValue::Text("D".into()),
            CellValue::Int(-4),
            CellValue::Int(1),
        ]);
        let model = CountingModel::default();
        assert!(matches!(
            predict_table(&model, &table),
            Err(PredictError::Validation(_))
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec!["employeeCount".into(), "companyAge".into()]);
        assert!(matches!(
            predict_table(&CountingModel::default(), &table),
            Err(PredictError::EmptyTable(_))
        ));
    }
}
