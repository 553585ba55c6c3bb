use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::delete,
};
use db::models::{
    task::Task,
    task_file::{CreateTaskFile, TaskFile},
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::load_task_file_middleware};

pub async fn list_task_files(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskFile>>>, ApiError> {
    let files = TaskFile::find_by_task_id(&state.db.conn, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(files)))
}

pub async fn attach_task_file(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskFile>,
) -> Result<ResponseJson<ApiResponse<TaskFile>>, ApiError> {
    if payload.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("Filename must not be empty".to_string()));
    }
    let file = TaskFile::create(&state.db.conn, task.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(file)))
}

pub async fn delete_file(
    Extension(file): Extension<TaskFile>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TaskFile::delete(&state.db.conn, file.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let file_id_router = Router::new()
        .route("/", delete(delete_file))
        .layer(from_fn_with_state(state.clone(), load_task_file_middleware));

    Router::new().nest("/files/{id}", file_id_router)
}
