use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::DbErr;
use ghl::GhlError;
use sync::SyncError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Ghl(#[from] GhlError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Ghl(ghl_err) => match ghl_err {
                GhlError::NotConfigured | GhlError::ContactRequired => {
                    (StatusCode::BAD_REQUEST, "GhlError")
                }
                GhlError::Api { .. } | GhlError::Http(_) | GhlError::MissingTaskId => {
                    (StatusCode::BAD_GATEWAY, "GhlError")
                }
                GhlError::Database(db_err) => match db_err {
                    DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
                },
            },
            ApiError::Sync(sync_err) => match sync_err {
                SyncError::NoRemoteUsers => (StatusCode::NOT_FOUND, "SyncError"),
                SyncError::Ghl(GhlError::NotConfigured) => (StatusCode::BAD_REQUEST, "SyncError"),
                SyncError::Ghl(_) => (StatusCode::BAD_GATEWAY, "SyncError"),
                SyncError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SyncError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::Ghl(err) => err.to_string(),
            ApiError::Sync(err) => err.to_string(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
