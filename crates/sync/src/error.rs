use db::DbErr;
use ghl::GhlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No users found in GoHighLevel location")]
    NoRemoteUsers,
    #[error(transparent)]
    Ghl(#[from] GhlError),
    #[error(transparent)]
    Database(#[from] DbErr),
}
