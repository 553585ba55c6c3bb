//! GoHighLevel REST client.
//!
//! Tasks in GoHighLevel always hang off a contact; every task operation is
//! addressed as `/contacts/{contactId}/tasks[/{taskId}]`. Users and contacts
//! are read through the location the credentials are scoped to.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GhlClient, GhlCredentials, DEFAULT_BASE_URL};
pub use error::GhlError;
pub use types::{CreateTaskRequest, GhlContact, GhlRemoteUser, GhlTask, UpdateTaskRequest};
