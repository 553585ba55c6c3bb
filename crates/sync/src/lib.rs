//! Synchronization against GoHighLevel.
//!
//! Two directions, two mechanisms: pull fetches the remote collection and
//! upserts it into the local store on request; push drains the sync outbox in
//! a background worker, so local mutations never wait on the CRM.

pub mod dispatch;
pub mod error;
pub mod pull;
pub mod worker;

pub use dispatch::{GhlDispatch, GhlFetch};
pub use error::SyncError;
pub use pull::{SyncSummary, pull_tasks, pull_users};
pub use worker::{OutboxWorker, drain_once};
