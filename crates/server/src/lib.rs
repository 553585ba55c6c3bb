use db::DBService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

pub const OWNER_OPEN_ID_ENV: &str = "TASKBOARD_OWNER_OPEN_ID";

/// Shared state behind every route: the database handle plus the open id
/// that is promoted to admin on sign-in.
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub owner_open_id: Option<String>,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        let owner_open_id = std::env::var(OWNER_OPEN_ID_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { db, owner_open_id }
    }
}
