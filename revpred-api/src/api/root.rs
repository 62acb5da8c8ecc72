//! Service metadata and endpoint directory

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Map, Value};

use crate::AppState;

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Revenue Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/api/predict": "POST - Single prediction",
            "/api/predict/bulk": "POST - Bulk prediction from Excel file",
            "/health": "GET - Health check",
        },
        "model": model_block(&state),
    }))
}

/// `{loaded, path, sha256, trees}`; only `loaded` without a model
fn model_block(state: &AppState) -> Value {
    let mut block = Map::new();
    block.insert("loaded".to_string(), Value::Bool(state.model_loaded()));
    if let Some(info) = &state.model_info {
        block.insert("path".to_string(), json!(info.path));
        block.insert("sha256".to_string(), json!(info.sha256));
        block.insert("trees".to_string(), json!(info.trees));
    }
    Value::Object(block)
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(service_info))
}
