use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    ghl_user::GhlUser,
    user::{UpsertUser, User},
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub async fn get_users(State(state): State<AppState>) -> ResponseJson<ApiResponse<Vec<User>>> {
    let users = User::find_all(&state.db.conn).await.unwrap_or_else(|err| {
        tracing::error!("Failed to list users: {err}");
        Vec::new()
    });
    ResponseJson(ApiResponse::success(users))
}

/// Sign-in upsert. The identity provider sits in front of this API; the
/// open id it hands over is trusted as-is.
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<UpsertUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.open_id.trim().is_empty() {
        return Err(ApiError::BadRequest("open_id must not be empty".to_string()));
    }

    let user =
        User::upsert_signin(&state.db.conn, &payload, state.owner_open_id.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_ghl_users(
    State(state): State<AppState>,
) -> ResponseJson<ApiResponse<Vec<GhlUser>>> {
    let users = GhlUser::find_all(&state.db.conn).await.unwrap_or_else(|err| {
        tracing::error!("Failed to list GHL users: {err}");
        Vec::new()
    });
    ResponseJson(ApiResponse::success(users))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users))
        .route("/users/signin", post(signin))
        .route("/ghl-users", get(get_ghl_users))
}
