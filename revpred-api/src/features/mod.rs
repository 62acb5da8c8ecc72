//! Feature normalization
//!
//! Maps raw company records (a typed single request or one spreadsheet row)
//! onto the fixed eight-column schema the model was trained on. Both the
//! single and bulk paths funnel through [`RawRecord`] and [`normalize`], so a
//! record produces the same [`FeatureRow`] whichever way it arrives.

pub mod columns;

use serde::Serialize;

use crate::error::PredictError;
use crate::table::Table;
pub use columns::{canonical_key, ColumnMap, InputField};

/// Model input columns, in the order the model expects them
pub const FEATURE_COLUMNS: [&str; 8] = [
    "employeeCount",
    "companyAge",
    "revenue_per_employee",
    "tenure_index",
    "companyType",
    "category",
    "city_tier",
    "state",
];

/// Cities classified as Tier 1 (case-sensitive exact match)
pub const TIER_1_CITIES: [&str; 10] = [
    "Bengaluru",
    "Bangalore",
    "Mumbai",
    "Delhi",
    "New Delhi",
    "Hyderabad",
    "Chennai",
    "Pune",
    "Gurgaon",
    "Noida",
];

pub const DEFAULT_EMPLOYEE_COUNT: f64 = 1.0;
pub const DEFAULT_COMPANY_AGE: f64 = 0.0;
pub const DEFAULT_REVENUE_PER_EMPLOYEE: f64 = 1.0;
pub const DEFAULT_TENURE_INDEX: f64 = 0.0;
pub const DEFAULT_COMPANY_TYPE: &str = "Private Company";

/// Coarse location class derived from the headquarters city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CityTier {
    #[serde(rename = "Tier_1")]
    Tier1,
    /// Everything else, including a missing or empty city
    #[serde(rename = "Tier_2_3")]
    Tier2Or3,
}

impl CityTier {
    pub fn from_city(city: Option<&str>) -> Self {
        match city {
            Some(name) if TIER_1_CITIES.contains(&name) => CityTier::Tier1,
            _ => CityTier::Tier2Or3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CityTier::Tier1 => "Tier_1",
            CityTier::Tier2Or3 => "Tier_2_3",
        }
    }
}

impl std::fmt::Display for CityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model input row; field order matches [`FEATURE_COLUMNS`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(rename = "employeeCount")]
    pub employee_count: f64,
    #[serde(rename = "companyAge")]
    pub company_age: f64,
    pub revenue_per_employee: f64,
    pub tenure_index: f64,
    #[serde(rename = "companyType")]
    pub company_type: String,
    pub category: String,
    pub city_tier: CityTier,
    pub state: String,
}

impl FeatureRow {
    /// Numeric features in schema order
    pub fn numeric(&self) -> [f64; 4] {
        [
            self.employee_count,
            self.company_age,
            self.revenue_per_employee,
            self.tenure_index,
        ]
    }

    /// Categorical features in schema order: companyType, category, city_tier, state
    pub fn categorical(&self) -> [&str; 4] {
        [
            self.company_type.as_str(),
            self.category.as_str(),
            self.city_tier.as_str(),
            self.state.as_str(),
        ]
    }
}

/// Company record before normalization; `None` means the value was absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub employee_count: Option<f64>,
    pub company_age: Option<f64>,
    pub company_type: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub revenue: Option<f64>,
}

impl RawRecord {
    /// Range checks shared by the single and bulk paths
    ///
    /// Values that are present must satisfy employeeCount > 0,
    /// companyAge >= 0 and revenue >= 0. Absent values are left to the
    /// normalization defaults.
    pub fn check_ranges(&self) -> Result<(), String> {
        if let Some(v) = self.employee_count {
            if !(v.is_finite() && v > 0.0) {
                return Err(format!("employeeCount must be greater than 0 (got {})", v));
            }
        }
        if let Some(v) = self.company_age {
            if !(v.is_finite() && v >= 0.0) {
                return Err(format!("companyAge must be 0 or greater (got {})", v));
            }
        }
        if let Some(v) = self.revenue {
            if !(v.is_finite() && v >= 0.0) {
                return Err(format!("revenue must be 0 or greater (got {})", v));
            }
        }
        Ok(())
    }
}

/// `(revenue_per_employee, tenure_index)` for one record
///
/// Division only happens when employee_count > 0; otherwise the defaults
/// (1.0 and 0.0) apply. revenue_per_employee is also 1.0 without revenue.
pub fn derived_ratios(employee_count: f64, company_age: f64, revenue: Option<f64>) -> (f64, f64) {
    let revenue_per_employee = match revenue {
        Some(revenue) if employee_count > 0.0 => revenue / employee_count,
        _ => DEFAULT_REVENUE_PER_EMPLOYEE,
    };
    let tenure_index = if employee_count > 0.0 {
        company_age / employee_count
    } else {
        DEFAULT_TENURE_INDEX
    };
    (revenue_per_employee, tenure_index)
}

/// Normalize one record into the model schema, filling defaults for absent values
pub fn normalize(record: &RawRecord) -> FeatureRow {
    let employee_count = record.employee_count.unwrap_or(DEFAULT_EMPLOYEE_COUNT);
    let company_age = record.company_age.unwrap_or(DEFAULT_COMPANY_AGE);
    let (revenue_per_employee, tenure_index) =
        derived_ratios(employee_count, company_age, record.revenue);

    FeatureRow {
        employee_count,
        company_age,
        revenue_per_employee,
        tenure_index,
        company_type: record
            .company_type
            .clone()
            .unwrap_or_else(|| DEFAULT_COMPANY_TYPE.to_string()),
        category: record.category.clone().unwrap_or_default(),
        city_tier: CityTier::from_city(record.city.as_deref()),
        state: record.state.clone().unwrap_or_default(),
    }
}

/// Structural columns; a bulk table must carry at least one of them
const STRUCTURAL_FIELDS: [InputField; 2] = [InputField::EmployeeCount, InputField::CompanyAge];

/// Extract raw records from an uploaded table
///
/// Headers are resolved once through [`ColumnMap`]. The table must contain an
/// employeeCount or a companyAge column, and every row must pass
/// [`RawRecord::check_ranges`]; row numbers in errors are the spreadsheet
/// rows the data came from.
pub fn records_from_table(table: &Table) -> Result<Vec<RawRecord>, PredictError> {
    let map = ColumnMap::resolve(table.columns());

    let missing = map.missing(&STRUCTURAL_FIELDS);
    if missing.len() == STRUCTURAL_FIELDS.len() {
        let names: Vec<&str> = missing.iter().map(|f| f.schema_name()).collect();
        return Err(PredictError::Validation(format!(
            "Missing required column: need at least one of {} (column names are matched ignoring case and spaces)",
            names.join(", ")
        )));
    }

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let sheet_row = table.source_row(index);
            let number = |field: InputField| -> Result<Option<f64>, PredictError> {
                match map.get(field) {
                    Some(col) => row[col].as_number().map_err(|e| {
                        PredictError::Validation(format!(
                            "Row {}: {} {}",
                            sheet_row,
                            field.schema_name(),
                            e
                        ))
                    }),
                    None => Ok(None),
                }
            };
            let text = |field: InputField| map.get(field).and_then(|col| row[col].as_text());

            let record = RawRecord {
                employee_count: number(InputField::EmployeeCount)?,
                company_age: number(InputField::CompanyAge)?,
                company_type: text(InputField::CompanyType),
                category: text(InputField::Category),
                city: text(InputField::City),
                state: text(InputField::State),
                revenue: number(InputField::Revenue)?,
            };
            record
                .check_ranges()
                .map_err(|e| PredictError::Validation(format!("Row {}: {}", sheet_row, e)))?;
            Ok(record)
        })
        .collect()
}

/// Normalize every row of an uploaded table, preserving row order
pub fn normalize_table(table: &Table) -> Result<Vec<FeatureRow>, PredictError> {
    Ok(records_from_table(table)?.iter().map(normalize).collect())
}
