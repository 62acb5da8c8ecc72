//! Bulk spreadsheet prediction through the HTTP router

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use tower::ServiceExt;

const HEADER: [&str; 6] = [
    "Company",
    "Employee Count",
    "Company Age",
    "City",
    "STATE",
    "companyType",
];

fn company(name: &'static str, employees: f64, city: &'static str) -> Vec<Cell<'static>> {
    vec![
        Cell::Text(name),
        Cell::Number(employees),
        Cell::Number(4.0),
        Cell::Text(city),
        Cell::Text("Karnataka"),
        Cell::Text("Private Company"),
    ]
}

fn sample_workbook() -> Vec<u8> {
    xlsx_bytes(
        &HEADER,
        &[
            company("Acme", 10.0, "Bengaluru"),
            company("Globex", 20.0, "Indore"),
            company("Initech", 30.0, "Pune"),
        ],
    )
}

#[tokio::test]
async fn test_bulk_prediction_preserves_rows_and_reports_statistics() {
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &sample_workbook()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);

    let keys: Vec<&String> = predictions[0].as_object().unwrap().keys().collect();
    let mut expected: Vec<&str> = HEADER.to_vec();
    expected.push("predicted_revenue");
    assert_eq!(keys, expected);

    for (record, (name, revenue)) in predictions
        .iter()
        .zip([("Acme", 10_000.0), ("Globex", 20_000.0), ("Initech", 30_000.0)])
    {
        assert_eq!(record["Company"], name);
        let predicted = record["predicted_revenue"].as_f64().unwrap();
        assert!((predicted - revenue).abs() < 1e-6);
    }

    let stats = &body["statistics"];
    assert_eq!(stats["count"], 3);
    assert!((stats["mean"].as_f64().unwrap() - 20_000.0).abs() < 1e-6);
    assert!((stats["median"].as_f64().unwrap() - 20_000.0).abs() < 1e-6);
    assert!((stats["min"].as_f64().unwrap() - 10_000.0).abs() < 1e-6);
    assert!((stats["max"].as_f64().unwrap() - 30_000.0).abs() < 1e-6);
    assert!((stats["std"].as_f64().unwrap() - 8_164.965809277261).abs() < 1e-6);
}

#[tokio::test]
async fn test_bulk_extension_is_case_insensitive() {
    let response = test_app()
        .oneshot(upload_request("file", "COMPANIES.XLSX", &sample_workbook()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bulk_rejects_non_excel_filename() {
    let response = test_app()
        .oneshot(upload_request("file", "companies.csv", b"a,b\n1,2\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Excel format"));
}

#[tokio::test]
async fn test_bulk_missing_file_field() {
    let response = test_app()
        .oneshot(upload_request("attachment", "companies.xlsx", &sample_workbook()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bulk_oversize_upload() {
    let workbook = sample_workbook();
    let response = app_with_limit(workbook.len() - 1)
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("File size exceeds maximum allowed size"));
}

#[tokio::test]
async fn test_bulk_body_over_transport_limit() {
    // Ceiling plus the 1 MiB multipart allowance is far below the body size
    let payload = vec![0u8; 2 * 1024 * 1024];
    let response = app_with_limit(16)
        .oneshot(upload_request("file", "companies.xlsx", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(
        body["error"]["message"],
        "File size exceeds maximum allowed size of 16 bytes"
    );
}

#[tokio::test]
async fn test_bulk_header_only_is_empty() {
    let workbook = xlsx_bytes(&HEADER, &[]);
    let response = test_app()
        .oneshot(upload_request("file", "empty.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "EMPTY_FILE");
}

#[tokio::test]
async fn test_bulk_unreadable_bytes() {
    let response = test_app()
        .oneshot(upload_request("file", "broken.xlsx", b"definitely not a workbook"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "MALFORMED_INPUT");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Error processing file"));
}

#[tokio::test]
async fn test_bulk_without_structural_columns() {
    let workbook = xlsx_bytes(
        &["Company", "City"],
        &[vec![Cell::Text("Acme"), Cell::Text("Pune")]],
    );
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("employeeCount"));
    assert!(message.contains("companyAge"));
}

#[tokio::test]
async fn test_bulk_single_structural_column_uses_defaults() {
    let workbook = xlsx_bytes(
        &["Company", "Employee Count"],
        &[vec![Cell::Text("Acme"), Cell::Number(12.0)]],
    );
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predicted = body["predictions"][0]["predicted_revenue"].as_f64().unwrap();
    assert!((predicted - 12_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_bulk_invalid_row_fails_whole_batch() {
    let workbook = xlsx_bytes(
        &HEADER,
        &[
            company("Acme", 10.0, "Bengaluru"),
            company("Hooli", 0.0, "Mumbai"),
        ],
    );
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("Row 3"));
}

#[tokio::test]
async fn test_bulk_row_error_names_sheet_row_after_blank_row() {
    let workbook = xlsx_bytes(
        &HEADER,
        &[
            company("Acme", 10.0, "Bengaluru"),
            vec![],
            company("Hooli", -3.0, "Mumbai"),
        ],
    );
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("Row 4:"), "{}", message);
}

#[tokio::test]
async fn test_bulk_blank_optional_cells_use_defaults() {
    let workbook = xlsx_bytes(
        &HEADER,
        &[vec![
            Cell::Text("Acme"),
            Cell::Number(7.0),
            Cell::Number(1.0),
            Cell::Blank,
            Cell::Blank,
            Cell::Blank,
        ]],
    );
    let response = test_app()
        .oneshot(upload_request("file", "companies.xlsx", &workbook))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let record = &body["predictions"][0];
    assert!(record["City"].is_null());
    assert!((record["predicted_revenue"].as_f64().unwrap() - 7_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_bulk_without_model() {
    let response = degraded_app()
        .oneshot(upload_request("file", "companies.xlsx", &sample_workbook()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "MODEL_UNAVAILABLE");
}
