pub mod app_setting;
pub mod ghl_user;
pub mod sync_outbox;
pub mod task;
pub mod task_file;
pub mod task_status_history;
pub mod user;
