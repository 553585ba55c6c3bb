pub mod files;
pub mod health;
pub mod settings;
pub mod sync;
pub mod tasks;
pub mod users;
