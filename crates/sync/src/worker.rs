use std::time::Duration;

use db::{
    DatabaseConnection,
    entities::sync_outbox,
    events::{DeletedTaskSyncPayload, TaskSyncPayload},
    models::{sync_outbox::SyncOutbox, task::Task},
    types::{SyncOp, TaskStatus},
};
use ghl::{CreateTaskRequest, GhlClient, GhlError, UpdateTaskRequest};
use tracing::{debug, error, warn};

use crate::dispatch::GhlDispatch;

/// A row that keeps failing is parked after this many attempts.
pub const MAX_ATTEMPTS: i32 = 5;
pub const BATCH_SIZE: u64 = 20;
const DEFAULT_TICK: Duration = Duration::from_secs(15);

/// Drains one batch of unpublished outbox rows, oldest first. Rows whose
/// remote call succeeds (or turns out to be a no-op) are marked published;
/// failures record the error and stay queued for the next tick.
pub async fn drain_once(
    db: &DatabaseConnection,
    dispatch: &dyn GhlDispatch,
) -> Result<usize, db::DbErr> {
    let entries = SyncOutbox::fetch_unpublished(db, BATCH_SIZE, MAX_ATTEMPTS).await?;
    let mut published = 0;

    for entry in entries {
        match deliver(db, dispatch, &entry).await {
            Ok(()) => {
                SyncOutbox::mark_published(db, entry.id).await?;
                published += 1;
            }
            Err(message) => {
                warn!("Outbox delivery failed for {} ({}): {message}", entry.uuid, entry.op);
                SyncOutbox::mark_failed(db, entry.id, &message).await?;
            }
        }
    }

    Ok(published)
}

async fn deliver(
    db: &DatabaseConnection,
    dispatch: &dyn GhlDispatch,
    entry: &sync_outbox::Model,
) -> Result<(), String> {
    match entry.op {
        SyncOp::TaskCreated => {
            let Some(task) = load_task(db, entry).await? else {
                return Ok(());
            };
            // Already linked: an earlier attempt got through.
            if task.ghl_task_id.is_some() {
                return Ok(());
            }
            // Tasks without a contact stay local; the CRM cannot hold them.
            let Some(contact_id) = task.ghl_contact_id.clone() else {
                return Ok(());
            };

            let request = CreateTaskRequest::new(
                task.title.clone(),
                task.description.clone(),
                task.due_date,
                task.assigned_to_ghl_user_id.clone(),
            );
            let remote_id = dispatch
                .create_task(&contact_id, request)
                .await
                .map_err(|err| err.to_string())?;
            Task::set_ghl_task_id(db, task.id, &remote_id)
                .await
                .map_err(|err| err.to_string())?;
            Ok(())
        }
        SyncOp::TaskUpdated | SyncOp::TaskStatusChanged => {
            let Some(task) = load_task(db, entry).await? else {
                return Ok(());
            };
            let (Some(ghl_task_id), Some(contact_id)) =
                (task.ghl_task_id.clone(), task.ghl_contact_id.clone())
            else {
                return Ok(());
            };

            let request = UpdateTaskRequest {
                title: Some(task.title.clone()),
                body: task.description.clone(),
                due_date: task.due_date,
                completed: Some(task.status == TaskStatus::Done),
                assigned_to: task.assigned_to_ghl_user_id.clone(),
            };
            dispatch
                .update_task(&contact_id, &ghl_task_id, &request)
                .await
                .map_err(|err| err.to_string())
        }
        SyncOp::TaskDeleted => {
            let payload: DeletedTaskSyncPayload =
                serde_json::from_value(entry.payload.clone()).map_err(|err| err.to_string())?;
            let (Some(ghl_task_id), Some(contact_id)) =
                (payload.ghl_task_id, payload.ghl_contact_id)
            else {
                return Ok(());
            };
            dispatch
                .delete_task(&contact_id, &ghl_task_id)
                .await
                .map_err(|err| err.to_string())
        }
    }
}

async fn load_task(
    db: &DatabaseConnection,
    entry: &sync_outbox::Model,
) -> Result<Option<Task>, String> {
    let payload: TaskSyncPayload =
        serde_json::from_value(entry.payload.clone()).map_err(|err| err.to_string())?;
    Task::find_by_id(db, payload.task_id)
        .await
        .map_err(|err| err.to_string())
}

/// Background loop pushing local task mutations to the CRM. Credentials are
/// re-read from settings on every tick so a token rotation takes effect
/// without a restart; while they are missing the outbox is left untouched.
pub struct OutboxWorker {
    db: DatabaseConnection,
    interval: Duration,
}

impl OutboxWorker {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            interval: DEFAULT_TICK,
        }
    }

    pub fn with_interval(db: DatabaseConnection, interval: Duration) -> Self {
        Self { db, interval }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match GhlClient::from_settings(&self.db).await {
                Ok(client) => {
                    if let Err(err) = drain_once(&self.db, &client).await {
                        error!("Outbox drain failed: {err}");
                    }
                }
                Err(GhlError::NotConfigured) => {
                    debug!("CRM credentials not configured, leaving outbox untouched");
                }
                Err(err) => warn!("Could not build CRM client: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db::models::{
        task::CreateTask,
        user::{UpsertUser, User},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Create { contact_id: String, title: String },
        Update { contact_id: String, task_id: String, completed: Option<bool> },
        Delete { contact_id: String, task_id: String },
    }

    #[derive(Default)]
    struct FakeDispatch {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl FakeDispatch {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<Call> {
            std::mem::take(&mut self.calls.lock().unwrap())
        }
    }

    #[async_trait]
    impl GhlDispatch for FakeDispatch {
        async fn create_task(
            &self,
            contact_id: &str,
            request: CreateTaskRequest,
        ) -> Result<String, GhlError> {
            if self.fail {
                return Err(GhlError::Api {
                    status: 502,
                    message: "upstream down".to_string(),
                });
            }
            self.calls.lock().unwrap().push(Call::Create {
                contact_id: contact_id.to_string(),
                title: request.title,
            });
            Ok("remote-1".to_string())
        }

        async fn update_task(
            &self,
            contact_id: &str,
            task_id: &str,
            request: &UpdateTaskRequest,
        ) -> Result<(), GhlError> {
            if self.fail {
                return Err(GhlError::Api {
                    status: 502,
                    message: "upstream down".to_string(),
                });
            }
            self.calls.lock().unwrap().push(Call::Update {
                contact_id: contact_id.to_string(),
                task_id: task_id.to_string(),
                completed: request.completed,
            });
            Ok(())
        }

        async fn delete_task(&self, contact_id: &str, task_id: &str) -> Result<(), GhlError> {
            if self.fail {
                return Err(GhlError::Api {
                    status: 502,
                    message: "upstream down".to_string(),
                });
            }
            self.calls.lock().unwrap().push(Call::Delete {
                contact_id: contact_id.to_string(),
                task_id: task_id.to_string(),
            });
            Ok(())
        }
    }

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_user(db: &DatabaseConnection) -> Uuid {
        User::upsert_signin(db, &UpsertUser::from_open_id("open-1".to_string()), None)
            .await
            .unwrap()
            .id
    }

    async fn create_task_with_contact(
        db: &DatabaseConnection,
        user_id: Uuid,
        contact: Option<&str>,
    ) -> Uuid {
        let task_id = Uuid::new_v4();
        let mut data = CreateTask::from_title("Angebot erstellen".to_string(), user_id);
        data.ghl_contact_id = contact.map(str::to_string);
        Task::create(db, &data, task_id).await.unwrap();
        task_id
    }

    #[tokio::test]
    async fn created_task_with_contact_is_pushed_and_linked() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        let task_id = create_task_with_contact(&db, user_id, Some("C1")).await;

        let dispatch = FakeDispatch::default();
        let published = drain_once(&db, &dispatch).await.unwrap();
        assert_eq!(published, 1);
        assert_eq!(
            dispatch.calls(),
            vec![Call::Create {
                contact_id: "C1".to_string(),
                title: "Angebot erstellen".to_string()
            }]
        );

        let task = Task::find_by_id(&db, task_id).await.unwrap().unwrap();
        assert_eq!(task.ghl_task_id.as_deref(), Some("remote-1"));
        assert!(SyncOutbox::fetch_unpublished(&db, 10, MAX_ATTEMPTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_task_without_contact_is_published_as_noop() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        let task_id = create_task_with_contact(&db, user_id, None).await;

        let dispatch = FakeDispatch::default();
        drain_once(&db, &dispatch).await.unwrap();
        assert!(dispatch.calls().is_empty());

        let task = Task::find_by_id(&db, task_id).await.unwrap().unwrap();
        assert!(task.ghl_task_id.is_none());
        assert!(SyncOutbox::fetch_unpublished(&db, 10, MAX_ATTEMPTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_without_remote_link_is_a_noop() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        let task_id = create_task_with_contact(&db, user_id, None).await;

        // Flush the create entry first.
        let dispatch = FakeDispatch::default();
        drain_once(&db, &dispatch).await.unwrap();
        dispatch.calls();

        Task::update(
            &db,
            task_id,
            "Neuer Titel".to_string(),
            None,
            db::types::TaskPriority::High,
            None,
            None,
            None,
        )
        .await
        .unwrap();

        drain_once(&db, &dispatch).await.unwrap();
        assert!(dispatch.calls().is_empty());
        assert!(SyncOutbox::fetch_unpublished(&db, 10, MAX_ATTEMPTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn done_transition_pushes_completion_flag() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        let task_id = create_task_with_contact(&db, user_id, Some("C1")).await;

        let dispatch = FakeDispatch::default();
        drain_once(&db, &dispatch).await.unwrap();
        dispatch.calls();

        Task::update_status(&db, task_id, TaskStatus::Done, Some(user_id))
            .await
            .unwrap();
        drain_once(&db, &dispatch).await.unwrap();

        assert_eq!(
            dispatch.calls(),
            vec![Call::Update {
                contact_id: "C1".to_string(),
                task_id: "remote-1".to_string(),
                completed: Some(true)
            }]
        );
    }

    #[tokio::test]
    async fn delete_uses_ids_captured_in_payload() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        let task_id = create_task_with_contact(&db, user_id, Some("C1")).await;

        let dispatch = FakeDispatch::default();
        drain_once(&db, &dispatch).await.unwrap();
        dispatch.calls();

        Task::delete(&db, task_id).await.unwrap();
        drain_once(&db, &dispatch).await.unwrap();

        assert_eq!(
            dispatch.calls(),
            vec![Call::Delete {
                contact_id: "C1".to_string(),
                task_id: "remote-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_then_parked() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;
        create_task_with_contact(&db, user_id, Some("C1")).await;

        let failing = FakeDispatch::failing();
        for _ in 0..MAX_ATTEMPTS {
            let published = drain_once(&db, &failing).await.unwrap();
            assert_eq!(published, 0);
        }

        // Attempts exhausted: the row is parked, not deleted.
        assert!(SyncOutbox::fetch_unpublished(&db, 10, MAX_ATTEMPTS).await.unwrap().is_empty());
        let parked = SyncOutbox::fetch_unpublished(&db, 10, MAX_ATTEMPTS + 1)
            .await
            .unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].attempts, MAX_ATTEMPTS);
        assert_eq!(parked[0].last_error.as_deref(), Some("GHL API error (502): upstream down"));

        // Once the remote recovers, the entry can be released by a higher
        // ceiling; normal ticks leave it alone.
        let dispatch = FakeDispatch::default();
        assert_eq!(drain_once(&db, &dispatch).await.unwrap(), 0);
        assert!(dispatch.calls().is_empty());
    }
}
