pub mod app_setting;
pub mod ghl_user;
pub mod ids;
pub mod sync_outbox;
pub mod task;
pub mod task_file;
pub mod task_status_history;
pub mod user;

pub use app_setting::{AppSetting, UpsertAppSetting};
pub use ghl_user::{GhlUser, UpsertGhlUser};
pub use sync_outbox::SyncOutbox;
pub use task::{CreateTask, RemoteTaskFields, Task, UpdateTask};
pub use task_file::{CreateTaskFile, TaskFile};
pub use task_status_history::{TaskStatusHistory, TaskStatusHistoryEntry};
pub use user::{UpsertUser, User};
