use axum::{extract::State, response::Json};
use chemdocs_database::health_check as database_health_check;
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "chemdocs",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "service": "chemdocs",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    let database_status = match database_health_check(&state.pool).await {
        Ok(_) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    health_status["checks"]["database"] = database_status;

    let storage = &state.config.storage;
    let storage_status = match (
        tokio::fs::try_exists(&storage.upload_dir).await,
        tokio::fs::try_exists(&storage.generated_dir).await,
    ) {
        (Ok(true), Ok(true)) => json!({"status": "healthy", "message": "Directories present"}),
        _ => json!({"status": "unhealthy", "message": "Storage directory missing"}),
    };
    health_status["checks"]["storage"] = storage_status;

    // OCR is optional; a missing backend degrades scanned documents only
    health_status["ocr_available"] = json!(state.ocr_available);

    let all_healthy = health_status["checks"]
        .as_object()
        .map(|checks| checks.values().all(|check| check["status"] == "healthy"))
        .unwrap_or(false);

    if !all_healthy {
        health_status["status"] = json!("degraded");
    }

    Json(health_status)
}

pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .encode()
        .unwrap_or_else(|_| "Error encoding metrics".to_string())
}
