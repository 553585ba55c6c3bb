use db::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhlError {
    #[error("GoHighLevel API credentials not configured")]
    NotConfigured,
    #[error("A contact id is required to create a GoHighLevel task")]
    ContactRequired,
    #[error("GHL API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("GoHighLevel accepted the task but returned no id")]
    MissingTaskId,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}
