//! Summary statistics over a batch of predictions

use serde::Serialize;

/// Descriptive statistics; `std` is the population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

impl BulkStatistics {
    /// `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let n = count as f64;

        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            count,
            mean,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            std: variance.sqrt(),
        })
    }
}
