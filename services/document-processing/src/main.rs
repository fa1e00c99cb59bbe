use anyhow::Result;
use axum::serve;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chemdocs_database::{initialize_database, DatabaseConfig};
use chemdocs_document_processing::ocr::{OcrBackend, TesseractBackend};
use chemdocs_document_processing::{create_app, AppState};
use chemdocs_utils::{init_logging, AppConfig, ChemdocsError};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Chemdocs document service");

    let db_config = DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: Duration::from_secs(config.database.connection_timeout_seconds),
    };
    let pool = initialize_database(&db_config).await?;
    info!(url = %db_config.url, "Database ready");

    let ocr = ocr_backend(&config);
    let state = AppState::new(config.clone(), pool, ocr).await?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ChemdocsError::configuration(format!("Invalid server address: {}", e)))?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

fn ocr_backend(config: &AppConfig) -> Option<Arc<dyn OcrBackend>> {
    if !config.ocr.enabled {
        info!("OCR disabled; scanned pages will yield no text");
        return None;
    }

    let backend = TesseractBackend::new(&config.ocr);
    if backend.is_available() {
        info!(backend = backend.name(), language = %config.ocr.language, "OCR backend available");
        Some(Arc::new(backend))
    } else {
        warn!("tesseract or pdftoppm not found; OCR fallback disabled");
        None
    }
}
