use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::app_setting::{AppSetting, UpsertAppSetting};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub async fn get_settings(
    State(state): State<AppState>,
) -> ResponseJson<ApiResponse<Vec<AppSetting>>> {
    let settings = AppSetting::find_all(&state.db.conn)
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Failed to list settings: {err}");
            Vec::new()
        });
    ResponseJson(ApiResponse::success(settings))
}

/// Upserts a batch of settings by key and returns the full settings list,
/// which is what the settings page renders after saving.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<Vec<UpsertAppSetting>>,
) -> Result<ResponseJson<ApiResponse<Vec<AppSetting>>>, ApiError> {
    if payload.iter().any(|setting| setting.key.trim().is_empty()) {
        return Err(ApiError::BadRequest("Setting key must not be empty".to_string()));
    }

    for setting in &payload {
        AppSetting::upsert(&state.db.conn, setting).await?;
    }
    let settings = AppSetting::find_all(&state.db.conn).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}
