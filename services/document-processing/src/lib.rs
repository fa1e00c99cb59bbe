//! Chemdocs Document Processing Service
//!
//! Takes a supplier's COA, MSDS and TDS for one product, extracts their
//! fields (with OCR for scanned pages and optional AI assistance) and
//! produces the same three documents under the company's own branding.

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use chemdocs_database::SqlitePool;
use chemdocs_utils::AppConfig;

pub mod bundle;
pub mod error;
pub mod extraction;
pub mod generator;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod ocr;
pub mod pdf_processor;
pub mod pipeline;
pub mod routes;
pub mod settings_store;
pub mod storage;
pub mod upload;
pub mod vlm_client;

use generator::DocumentGenerator;
use metrics::PipelineMetrics;
use middleware::request_id_middleware;
use ocr::OcrBackend;
use pdf_processor::PdfProcessor;
use pipeline::DocumentPipeline;
use settings_store::SettingsStore;
use storage::FileStorage;
use vlm_client::VlmClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<DocumentPipeline>,
    pub storage: FileStorage,
    pub settings: Arc<SettingsStore>,
    pub vlm: VlmClient,
    pub metrics: PipelineMetrics,
    pub ocr_available: bool,
}

impl AppState {
    /// Wire up storage, settings and the pipeline. `ocr` is the backend for
    /// pages without a text layer, if one is installed.
    pub async fn new(config: AppConfig, pool: SqlitePool, ocr: Option<Arc<dyn OcrBackend>>) -> Result<Self> {
        let storage = FileStorage::new(&config.storage).await?;
        let settings = Arc::new(SettingsStore::load(&config.settings.path).await);
        let vlm = VlmClient::new(&config.ai)?;
        let metrics = PipelineMetrics::new(&config.monitoring.prometheus_namespace)
            .context("Failed to register metrics")?;
        let generator = DocumentGenerator::new(config.branding.clone())?;

        let ocr_available = ocr.is_some();
        let processor = PdfProcessor::new(ocr, config.ocr.min_page_chars);

        let pipeline = DocumentPipeline::new(
            pool.clone(),
            storage.clone(),
            processor,
            generator,
            vlm.clone(),
            Arc::clone(&settings),
            metrics.clone(),
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            storage,
            settings,
            vlm,
            metrics,
            ocr_available,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/detailed", get(handlers::detailed_health_check));

    if config.monitoring.metrics_enabled {
        app = app.route("/metrics", get(handlers::metrics_handler));
    }

    app.nest("/api/v1", routes::create_api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
                )
                .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout_seconds)))
                .layer(DefaultBodyLimit::max(config.server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}
