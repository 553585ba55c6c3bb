use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbox payload for mutations on a task that still exists locally. The
/// sync worker re-reads the task when it processes the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSyncPayload {
    pub task_id: Uuid,
}

/// Outbox payload for deletions. The local row is gone by the time the
/// worker runs, so the remote identifiers are captured at delete time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTaskSyncPayload {
    pub task_id: Uuid,
    pub ghl_task_id: Option<String>,
    pub ghl_contact_id: Option<String>,
}
