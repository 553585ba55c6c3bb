use chrono::{DateTime, Utc};
use db::types::TaskStatus;
use serde::{Deserialize, Serialize};

/// Task record as returned by the GoHighLevel API. Search results carry the
/// id under `_id`, single-task responses sometimes under `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlTask {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl GhlTask {
    /// Maps the remote task state onto a board column. GoHighLevel only
    /// distinguishes completed and in-progress; everything else lands in the
    /// inbox.
    pub fn board_status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Done
        } else if self.status.as_deref() == Some("in_progress") {
            TaskStatus::InProgress
        } else {
            TaskStatus::Inbox
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// User record from the location endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlRemoteUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GhlRemoteUser {
    /// Prefers the explicit name, falls back to "first last".
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|name| !name.trim().is_empty()) {
            return Some(name.to_string());
        }
        let combined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let combined = combined.trim();
        (!combined.is_empty()).then(|| combined.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhlContact {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskSearchResponse {
    #[serde(default)]
    pub tasks: Vec<GhlTask>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationResponse {
    #[serde(default)]
    pub users: Vec<GhlRemoteUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactListResponse {
    #[serde(default)]
    pub contacts: Vec<GhlContact>,
}

/// Create responses put the new id in `_id`; fall back to `id` for the few
/// endpoints that use the plain field.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedTaskResponse {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl CreatedTaskResponse {
    pub fn into_id(self) -> Option<String> {
        self.mongo_id.or(self.id)
    }
}
