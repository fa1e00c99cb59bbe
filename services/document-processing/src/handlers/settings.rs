//! AI settings endpoints. The API key is write-only.

use axum::{extract::State, response::Json};
use serde::Deserialize;

use chemdocs_models::{AiSettingsView, SettingsUpdate};
use chemdocs_utils::validate_model;

use crate::error::ApiResult;
use crate::vlm_client::ConnectionStatus;
use crate::AppState;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<AiSettingsView> {
    Json(state.settings.get().await.view())
}

/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<Json<AiSettingsView>> {
    let update = update.normalized();
    validate_model(&update)?;

    let settings = state.settings.update(update).await?;
    Ok(Json(settings.view()))
}

#[derive(Debug, Default, Deserialize)]
pub struct TestConnectionRequest {
    /// Key to try instead of the stored one
    #[serde(default)]
    pub api_key: Option<String>,
}

/// POST /api/v1/settings/test-connection
pub async fn test_connection(
    State(state): State<AppState>,
    request: Option<Json<TestConnectionRequest>>,
) -> Json<ConnectionStatus> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let stored = state.settings.get().await;

    let key = request
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .or(stored.api_key());

    Json(state.vlm.test_connection(key).await)
}
