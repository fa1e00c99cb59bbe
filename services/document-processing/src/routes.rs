use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .nest("/document-sets", document_set_routes())
        .nest("/settings", settings_routes())
}

fn document_set_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_document_set).get(list_document_sets))
        .route("/:id", get(get_document_set))
        .route("/:id/reprocess", post(reprocess_document_set))
        .route("/:id/documents/:doc_type", get(download_document))
        .route("/:id/bundle", get(download_bundle))
}

fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .route("/test-connection", post(test_connection))
}
