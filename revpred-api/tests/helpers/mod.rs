//! Shared fixtures for revpred-api integration tests
//!
//! - [`LinearModel`]: deterministic stand-in predictor
//! - Router builders with and without a model
//! - In-memory xlsx and multipart body builders

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use revpred_api::features::FeatureRow;
use revpred_api::model::{ModelError, Predictor};
use revpred_api::predict::PredictionService;
use revpred_api::{build_router, AppState};
use rust_xlsxwriter::Workbook;
use serde_json::Value;

pub const DEFAULT_LIMIT: usize = 50 * 1024 * 1024;
pub const BOUNDARY: &str = "revpred-test-boundary";

/// Predicts `log1p(1000 * employeeCount)`, so revenue comes back as
/// exactly 1000 per employee
pub struct LinearModel;

impl Predictor for LinearModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        Ok(rows
            .iter()
            .map(|r| (r.employee_count * 1000.0).ln_1p())
            .collect())
    }
}

/// Two-tree ensemble over the full feature layout
///
/// Mumbai + Private Company + 50 employees scores 10.75 (log scale).
pub const GBDT_ARTIFACT: &str = r#"{
    "format": "revpred-gbdt",
    "version": 1,
    "base_score": 10.0,
    "categories": {
        "companyType": ["Private Company", "Public Company"],
        "category": ["Tech", "Retail"],
        "city_tier": ["Tier_1", "Tier_2_3"],
        "state": ["Maharashtra", "Karnataka"]
    },
    "trees": [
        { "nodes": [
            { "feature": 0, "threshold": 100.0, "left": 1, "right": 2 },
            { "leaf": 0.5 },
            { "leaf": 1.5 }
        ] },
        { "nodes": [
            { "feature": 8, "threshold": 0.5, "left": 1, "right": 2 },
            { "leaf": -0.25 },
            { "feature": 5, "threshold": 0.5, "left": 3, "right": 4 },
            { "leaf": 0.25 },
            { "leaf": 0.75 }
        ] }
    ]
}"#;

pub fn app_with_limit(max_upload_bytes: usize) -> Router {
    let service = PredictionService::new(Arc::new(LinearModel), max_upload_bytes);
    build_router(AppState::new(service, None))
}

pub fn test_app() -> Router {
    app_with_limit(DEFAULT_LIMIT)
}

/// Router started without a model
pub fn degraded_app() -> Router {
    build_router(AppState::degraded(DEFAULT_LIMIT))
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// `multipart/form-data` request with one file field
pub fn upload_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/predict/bulk")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Cell content for [`xlsx_bytes`]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

/// Build an xlsx workbook in memory: first row is the header
pub fn xlsx_bytes(header: &[&str], rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, name) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = ((r + 1) as u32, c as u16);
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r, c, *s).unwrap();
                }
                Cell::Number(v) => {
                    sheet.write_number(r, c, *v).unwrap();
                }
                Cell::Blank => {}
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `error.code` of an error body
pub async fn error_code(response: Response<Body>) -> String {
    let body = body_json(response).await;
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}
