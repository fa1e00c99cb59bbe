mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use chemdocs_document_processing::create_app;

use common::*;

const BODY_LIMIT: usize = 64 * 1024 * 1024;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/document-sets")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn full_upload<'a>(coa: &'a [u8], msds: &'a [u8], tds: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("company_product_name", PRODUCT),
        Part::File("supplier_coa", "coa.pdf", coa),
        Part::File("supplier_msds", "msds.pdf", msds),
        Part::File("supplier_tds", "tds.pdf", tds),
    ]
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app().await;
    let router = create_app(app.state.clone());

    let (status, body) = send_json(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send_json(&router, get("/health/detailed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["storage"]["status"], "healthy");

    let (status, headers, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upload_validation_messages() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    let (coa, msds, tds) = (coa_pdf(), msds_pdf(), tds_pdf());

    let (status, body) = send_json(
        &router,
        upload_request(&[
            Part::Text("company_product_name", PRODUCT),
            Part::File("supplier_coa", "coa.pdf", &coa),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please upload all three required documents (COA, MSDS, TDS)");

    let mut parts = full_upload(&coa, &msds, &tds);
    parts[1] = Part::File("supplier_coa", "coa.docx", &coa);
    let (status, body) = send_json(&router, upload_request(&parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "COA file must be a PDF");
    assert_eq!(body["details"]["field"], "supplier_coa");

    let mut parts = full_upload(&coa, &msds, &tds);
    parts[2] = Part::File("supplier_msds", "", &msds);
    let (status, body) = send_json(&router, upload_request(&parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please select a MSDS file");

    let mut parts = full_upload(&coa, &msds, &tds);
    parts[0] = Part::Text("company_product_name", "   ");
    let (status, body) = send_json(&router, upload_request(&parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a company product name");

    let (status, body) = send_json(&router, get("/api/v1/document-sets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.storage.max_file_size = 1024 * 1024;
    let app = test_app_with(dir, config, None).await;
    let router = create_app(app.state.clone());

    let mut large = b"%PDF-1.4\n".to_vec();
    large.resize(2 * 1024 * 1024, b' ');
    let (msds, tds) = (msds_pdf(), tds_pdf());

    let (status, body) = send_json(&router, upload_request(&full_upload(&large, &msds, &tds))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["message"], "File is too large. Maximum size is 1MB.");
}

#[tokio::test]
async fn test_upload_download_and_bundle() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    let (coa, msds, tds) = (coa_pdf(), msds_pdf(), tds_pdf());

    let (status, body) = send_json(&router, upload_request(&full_upload(&coa, &msds, &tds))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["status"], "generated");
    assert_eq!(body["reused"], false);
    assert_eq!(body["test_results"].as_array().unwrap().len(), 3);
    assert_eq!(body["downloads"].as_array().unwrap().len(), 3);
    assert_eq!(body["extracted"]["cas_number"], "98-92-0");
    let id = body["id"].as_i64().unwrap();

    let (status, headers, pdf) = send(&router, get(&format!("/api/v1/document-sets/{}/documents/msds", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"NTCB_MSDS_Coscare_Niacinamide.pdf\""
    );
    assert!(text_of(&pdf).contains("98-92-0"));

    let (status, headers, zip) = send(&router, get(&format!("/api/v1/document-sets/{}/bundle", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(zip)).unwrap();
    assert_eq!(archive.len(), 3);
    let mut coa_pdf = Vec::new();
    archive
        .by_name("NTCB_COA_Coscare_Niacinamide.pdf")
        .unwrap()
        .read_to_end(&mut coa_pdf)
        .unwrap();
    assert!(text_of(&coa_pdf).contains("CERTIFICATE OF ANALYSIS"));

    let (status, _) = send_json(&router, get(&format!("/api/v1/document-sets/{}/documents/invoice", id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&router, get("/api/v1/document-sets/999/bundle")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reupload_returns_existing_set() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    let (coa, msds, tds) = (coa_pdf(), msds_pdf(), tds_pdf());

    let (status, first) = send_json(&router, upload_request(&full_upload(&coa, &msds, &tds))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send_json(&router, upload_request(&full_upload(&coa, &msds, &tds))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reused"], true);
    assert_eq!(second["id"], first["id"]);

    let (_, list) = send_json(&router, get("/api/v1/document-sets?limit=10")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_set_has_no_downloads() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    let (coa, blank, tds) = (coa_pdf(), blank_pdf(), tds_pdf());

    let (status, body) = send_json(&router, upload_request(&full_upload(&coa, &blank, &tds))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "failed");
    assert!(body["error_message"].as_str().unwrap().contains("MSDS"));
    assert_eq!(body["downloads"].as_array().unwrap().len(), 0);

    let id = body["id"].as_i64().unwrap();
    let (status, _) = send_json(&router, get(&format!("/api/v1/document-sets/{}/documents/coa", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&router, get(&format!("/api/v1/document-sets/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_list_is_newest_first_with_default_limit() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    let (coa, msds, tds) = (coa_pdf(), msds_pdf(), tds_pdf());

    for index in 0..6 {
        let name = format!("Product {}", index);
        let mut parts = full_upload(&coa, &msds, &tds);
        parts[0] = Part::Text("company_product_name", &name);
        let (status, _, _) = send(&router, upload_request(&parts)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, list) = send_json(&router, get("/api/v1/document-sets")).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 5);
    assert_eq!(list[0]["company_product_name"], "Product 5");
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = test_app().await;
    let router = create_app(app.state.clone());

    let (status, body) = send_json(&router, get("/api/v1/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_api_key"], false);

    let update = Request::builder()
        .method("PUT")
        .uri("/api/v1/settings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"mistral_api_key":"test-key-123456","enable_ai_ocr":true}"#))
        .unwrap();
    let (status, body) = send_json(&router, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_api_key"], true);
    assert_eq!(body["enable_ai_ocr"], true);
    assert!(body.get("mistral_api_key").is_none());

    let short_key = Request::builder()
        .method("PUT")
        .uri("/api/v1/settings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"mistral_api_key":"abc"}"#))
        .unwrap();
    let (status, _) = send_json(&router, short_key).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let saved = std::fs::read_to_string(app.dir.path().join("app_settings.json")).unwrap();
    assert!(saved.contains("test-key-123456"));

    let test_connection = Request::builder()
        .method("POST")
        .uri("/api/v1/settings/test-connection")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, test_connection).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

/// Log sink shared with the test body
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_settings_update_is_logged_once() {
    let app = test_app().await;
    let router = create_app(app.state.clone());

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let update = Request::builder()
        .method("PUT")
        .uri("/api/v1/settings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"enable_field_validation":true}"#))
        .unwrap();
    let (status, _) = send_json(&router, update).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(logs.contents().matches("AI settings updated").count(), 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app().await;
    let router = create_app(app.state.clone());
    app.state.metrics.record_upload("processed");

    let (status, _, body) = send(&router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("chemdocs_uploads_total"));
}
