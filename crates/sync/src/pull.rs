use db::{
    ConnectionTrait,
    models::{
        ghl_user::{GhlUser, UpsertGhlUser},
        task::{RemoteTaskFields, Task},
    },
};
use ghl::{GhlRemoteUser, GhlTask};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{dispatch::GhlFetch, error::SyncError};

/// Outcome of one pull run. `errors` counts records that failed to upsert;
/// the run itself still succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub synced: usize,
    pub total: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncSummary {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            synced: 0,
            total: 0,
            errors: 0,
            message: Some(message.into()),
        }
    }
}

/// Pulls the location's users into the local cache.
pub async fn pull_users<C: ConnectionTrait>(
    db: &C,
    fetch: &dyn GhlFetch,
) -> Result<SyncSummary, SyncError> {
    let users = fetch.list_users().await?;
    if users.is_empty() {
        return Err(SyncError::NoRemoteUsers);
    }
    Ok(apply_remote_users(db, users).await?)
}

/// Pulls all tasks in the location into the local store. Users are pulled
/// first so assignee references resolve; a failure there is logged and the
/// task pull proceeds anyway.
pub async fn pull_tasks<C: ConnectionTrait>(
    db: &C,
    fetch: &dyn GhlFetch,
    created_by: Uuid,
) -> Result<SyncSummary, SyncError> {
    if let Err(err) = pull_users(db, fetch).await {
        warn!("User pull failed, continuing with task pull: {err}");
    }

    let tasks = fetch.search_tasks().await?;
    if tasks.is_empty() {
        return Ok(SyncSummary::empty("No tasks found in GoHighLevel"));
    }

    Ok(apply_remote_tasks(db, tasks, created_by).await?)
}

/// Upserts a batch of remote users, counting per-record failures instead of
/// aborting on them.
pub async fn apply_remote_users<C: ConnectionTrait>(
    db: &C,
    users: Vec<GhlRemoteUser>,
) -> Result<SyncSummary, db::DbErr> {
    let total = users.len();
    let mut synced = 0;
    let mut errors = 0;

    for user in users {
        let upsert = UpsertGhlUser {
            ghl_user_id: user.id.clone(),
            name: user.display_name(),
            email: user.email.clone(),
        };
        match GhlUser::upsert(db, &upsert).await {
            Ok(_) => synced += 1,
            Err(err) => {
                error!("Failed to upsert GHL user {}: {err}", user.id);
                errors += 1;
            }
        }
    }

    Ok(SyncSummary {
        synced,
        total,
        errors,
        message: None,
    })
}

/// Upserts a batch of remote tasks keyed by their external id. Remote state
/// wins; local priority is preserved because the CRM does not carry one.
pub async fn apply_remote_tasks<C: ConnectionTrait>(
    db: &C,
    tasks: Vec<GhlTask>,
    created_by: Uuid,
) -> Result<SyncSummary, db::DbErr> {
    let total = tasks.len();
    let mut synced = 0;
    let mut errors = 0;

    for task in tasks {
        let fields = RemoteTaskFields {
            ghl_task_id: task.id.clone(),
            title: task
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| "Unbenannte Aufgabe".to_string()),
            description: task.body.clone(),
            status: task.board_status(),
            due_date: task.due_date,
            assigned_to_ghl_user_id: task.assigned_to.clone(),
            ghl_contact_id: task.contact_id.clone(),
        };
        match Task::upsert_remote(db, &fields, created_by).await {
            Ok(_) => synced += 1,
            Err(err) => {
                error!("Failed to upsert GHL task {}: {err}", task.id);
                errors += 1;
            }
        }
    }

    Ok(SyncSummary {
        synced,
        total,
        errors,
        message: None,
    })
}
