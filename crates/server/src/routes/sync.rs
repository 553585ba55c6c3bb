use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::User;
use ghl::{GhlClient, GhlContact};
use serde::Deserialize;
use sync::SyncSummary;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct SyncTasksRequest {
    pub user_id: Option<Uuid>,
}

/// Pulls all tasks from the CRM. Tasks that are new locally need a creator;
/// the caller can name one, otherwise the earliest-registered user is used.
pub async fn sync_tasks(
    State(state): State<AppState>,
    payload: Option<Json<SyncTasksRequest>>,
) -> Result<ResponseJson<ApiResponse<SyncSummary>>, ApiError> {
    let client = GhlClient::from_settings(&state.db.conn).await?;
    let requested = payload.and_then(|Json(request)| request.user_id);
    let created_by = resolve_created_by(&state, requested).await?;

    let summary = sync::pull_tasks(&state.db.conn, &client, created_by).await?;
    Ok(ResponseJson(match summary.message.clone() {
        Some(message) => ApiResponse::success_with_message(summary, &message),
        None => ApiResponse::success(summary),
    }))
}

pub async fn sync_users(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<SyncSummary>>, ApiError> {
    let client = GhlClient::from_settings(&state.db.conn).await?;
    let summary = sync::pull_users(&state.db.conn, &client).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// Live listing straight from the CRM; contacts are never stored locally.
pub async fn get_ghl_contacts(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<GhlContact>>>, ApiError> {
    let client = GhlClient::from_settings(&state.db.conn).await?;
    let contacts = client.list_contacts().await?;
    Ok(ResponseJson(ApiResponse::success(contacts)))
}

async fn resolve_created_by(
    state: &AppState,
    requested: Option<Uuid>,
) -> Result<Uuid, ApiError> {
    if let Some(user_id) = requested {
        return match User::find_by_id(&state.db.conn, user_id).await? {
            Some(user) => Ok(user.id),
            None => Err(ApiError::BadRequest("Unknown user".to_string())),
        };
    }

    User::find_all(&state.db.conn)
        .await?
        .into_iter()
        .next()
        .map(|user| user.id)
        .ok_or_else(|| {
            ApiError::BadRequest("No local user to attribute synced tasks to".to_string())
        })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/tasks", post(sync_tasks))
        .route("/sync/users", post(sync_users))
        .route("/ghl-contacts", get(get_ghl_contacts))
}
