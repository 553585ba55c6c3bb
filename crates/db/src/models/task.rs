use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::types::{TaskPriority, TaskStatus};

use crate::{
    entities::task,
    events::{DeletedTaskSyncPayload, TaskSyncPayload},
    models::{ids, sync_outbox::SyncOutbox, task_status_history::TaskStatusHistory},
    types::SyncOp,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub ghl_task_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_ghl_user_id: Option<String>,
    pub ghl_contact_id: Option<String>,
    pub created_by: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_ghl_user_id: Option<String>,
    pub ghl_contact_id: Option<String>,
    pub created_by: Uuid,
}

impl CreateTask {
    pub fn from_title(title: String, created_by: Uuid) -> Self {
        Self {
            title,
            description: None,
            status: None,
            priority: None,
            due_date: None,
            assigned_to_ghl_user_id: None,
            ghl_contact_id: None,
            created_by,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_ghl_user_id: Option<String>,
    pub ghl_contact_id: Option<String>,
}

/// Field set pulled from the CRM during inbound sync. Upserting these never
/// touches the outbox; remote state is not echoed back.
#[derive(Debug, Clone)]
pub struct RemoteTaskFields {
    pub ghl_task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to_ghl_user_id: Option<String>,
    pub ghl_contact_id: Option<String>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let created_by = ids::user_uuid_by_id(db, model.created_by_user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            ghl_task_id: model.ghl_task_id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date.map(Into::into),
            assigned_to_ghl_user_id: model.assigned_to_ghl_user_id,
            ghl_contact_id: model.ghl_contact_id,
            created_by,
            completed_at: model.completed_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_status<C: ConnectionTrait>(
        db: &C,
        status: TaskStatus,
    ) -> Result<Vec<Self>, DbErr> {
        let models = task::Entity::find()
            .filter(task::Column::Status.eq(status))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_ghl_task_id<C: ConnectionTrait>(
        db: &C,
        ghl_task_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::GhlTaskId.eq(ghl_task_id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Inserts the task and its outbox entry in one transaction, so a
    /// committed task is always visible to the sync worker.
    pub async fn create<C>(db: &C, data: &CreateTask, task_id: Uuid) -> Result<Self, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let data = data.clone();
        let model = db
            .transaction::<_, task::Model, DbErr>(move |txn| {
                Box::pin(async move {
                    let created_by_user_id = ids::user_id_by_uuid(txn, data.created_by)
                        .await?
                        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

                    let now = Utc::now();
                    let active = task::ActiveModel {
                        uuid: Set(task_id),
                        ghl_task_id: Set(None),
                        title: Set(data.title.clone()),
                        description: Set(data.description.clone()),
                        status: Set(data.status.clone().unwrap_or_default()),
                        priority: Set(data.priority.clone().unwrap_or_default()),
                        due_date: Set(data.due_date.map(Into::into)),
                        assigned_to_ghl_user_id: Set(data.assigned_to_ghl_user_id.clone()),
                        ghl_contact_id: Set(data.ghl_contact_id.clone()),
                        created_by_user_id: Set(created_by_user_id),
                        completed_at: Set(None),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                        ..Default::default()
                    };

                    let model = active.insert(txn).await?;
                    let payload = serde_json::to_value(TaskSyncPayload { task_id })
                        .map_err(|err| DbErr::Custom(err.to_string()))?;
                    SyncOutbox::enqueue(txn, SyncOp::TaskCreated, task_id, payload).await?;
                    Ok(model)
                })
            })
            .await
            .map_err(flatten_txn_err)?;
        Self::from_model(db, model).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update<C>(
        db: &C,
        id: Uuid,
        title: String,
        description: Option<String>,
        priority: TaskPriority,
        due_date: Option<DateTime<Utc>>,
        assigned_to_ghl_user_id: Option<String>,
        ghl_contact_id: Option<String>,
    ) -> Result<Self, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let model = db
            .transaction::<_, task::Model, DbErr>(move |txn| {
                Box::pin(async move {
                    let record = task::Entity::find()
                        .filter(task::Column::Uuid.eq(id))
                        .one(txn)
                        .await?
                        .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

                    let mut active: task::ActiveModel = record.into();
                    active.title = Set(title);
                    active.description = Set(description);
                    active.priority = Set(priority);
                    active.due_date = Set(due_date.map(Into::into));
                    active.assigned_to_ghl_user_id = Set(assigned_to_ghl_user_id);
                    active.ghl_contact_id = Set(ghl_contact_id);
                    active.updated_at = Set(Utc::now().into());

                    let updated = active.update(txn).await?;
                    let payload = serde_json::to_value(TaskSyncPayload { task_id: id })
                        .map_err(|err| DbErr::Custom(err.to_string()))?;
                    SyncOutbox::enqueue(txn, SyncOp::TaskUpdated, id, payload).await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(flatten_txn_err)?;
        Self::from_model(db, model).await
    }

    /// Moves a task to a new status. Appends one status-history row per
    /// actual transition; a no-op move is not recorded. Status, history, and
    /// outbox entry commit together.
    pub async fn update_status<C>(
        db: &C,
        id: Uuid,
        status: TaskStatus,
        changed_by: Option<Uuid>,
    ) -> Result<Self, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let model = db
            .transaction::<_, task::Model, DbErr>(move |txn| {
                Box::pin(async move {
                    let record = task::Entity::find()
                        .filter(task::Column::Uuid.eq(id))
                        .one(txn)
                        .await?
                        .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

                    if record.status == status {
                        return Ok(record);
                    }

                    let old_status = record.status.clone();
                    let changed_by_user_id = match changed_by {
                        Some(user_id) => ids::user_id_by_uuid(txn, user_id)
                            .await?
                            .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                            .map(Some)?,
                        None => None,
                    };

                    let now = Utc::now();
                    let mut active: task::ActiveModel = record.into();
                    active.status = Set(status.clone());
                    active.completed_at = Set(if status == TaskStatus::Done {
                        Some(now.into())
                    } else {
                        None
                    });
                    active.updated_at = Set(now.into());
                    let updated = active.update(txn).await?;

                    TaskStatusHistory::append(txn, id, Some(old_status), status, changed_by_user_id)
                        .await?;

                    let payload = serde_json::to_value(TaskSyncPayload { task_id: id })
                        .map_err(|err| DbErr::Custom(err.to_string()))?;
                    SyncOutbox::enqueue(txn, SyncOp::TaskStatusChanged, id, payload).await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(flatten_txn_err)?;
        Self::from_model(db, model).await
    }

    /// Records the remote id after a successful outbound create. Does not
    /// touch the outbox.
    pub async fn set_ghl_task_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        ghl_task_id: &str,
    ) -> Result<(), DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        active.ghl_task_id = Set(Some(ghl_task_id.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    /// Deletes the task locally and enqueues the outbound delete with the
    /// remote identifiers captured before the row disappears, both in one
    /// transaction. Status history rows are intentionally left behind.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<u64, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        db.transaction::<_, u64, DbErr>(move |txn| {
            Box::pin(async move {
                let record = task::Entity::find()
                    .filter(task::Column::Uuid.eq(id))
                    .one(txn)
                    .await?;

                let Some(record) = record else {
                    return Ok(0);
                };

                let ghl_task_id = record.ghl_task_id.clone();
                let ghl_contact_id = record.ghl_contact_id.clone();

                let result = task::Entity::delete_many()
                    .filter(task::Column::Uuid.eq(id))
                    .exec(txn)
                    .await?;

                if result.rows_affected > 0 {
                    let payload = serde_json::to_value(DeletedTaskSyncPayload {
                        task_id: id,
                        ghl_task_id,
                        ghl_contact_id,
                    })
                    .map_err(|err| DbErr::Custom(err.to_string()))?;
                    SyncOutbox::enqueue(txn, SyncOp::TaskDeleted, id, payload).await?;
                }

                Ok(result.rows_affected)
            })
        })
        .await
        .map_err(flatten_txn_err)
    }

    /// Inbound upsert keyed by the remote task id. Last write wins: remote
    /// fields overwrite local ones, except priority, which the CRM does not
    /// carry and which keeps its local value on update.
    pub async fn upsert_remote<C: ConnectionTrait>(
        db: &C,
        fields: &RemoteTaskFields,
        created_by: Uuid,
    ) -> Result<Self, DbErr> {
        let existing = task::Entity::find()
            .filter(task::Column::GhlTaskId.eq(fields.ghl_task_id.as_str()))
            .one(db)
            .await?;

        let now = Utc::now();
        let model = match existing {
            Some(record) => {
                let mut active: task::ActiveModel = record.into();
                active.title = Set(fields.title.clone());
                active.description = Set(fields.description.clone());
                active.status = Set(fields.status.clone());
                active.due_date = Set(fields.due_date.map(Into::into));
                active.assigned_to_ghl_user_id = Set(fields.assigned_to_ghl_user_id.clone());
                active.ghl_contact_id = Set(fields.ghl_contact_id.clone());
                active.updated_at = Set(now.into());
                active.update(db).await?
            }
            None => {
                let created_by_user_id = ids::user_id_by_uuid(db, created_by)
                    .await?
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
                let active = task::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    ghl_task_id: Set(Some(fields.ghl_task_id.clone())),
                    title: Set(fields.title.clone()),
                    description: Set(fields.description.clone()),
                    status: Set(fields.status.clone()),
                    priority: Set(TaskPriority::Medium),
                    due_date: Set(fields.due_date.map(Into::into)),
                    assigned_to_ghl_user_id: Set(fields.assigned_to_ghl_user_id.clone()),
                    ghl_contact_id: Set(fields.ghl_contact_id.clone()),
                    created_by_user_id: Set(created_by_user_id),
                    completed_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(db).await?
            }
        };

        Self::from_model(db, model).await
    }
}

fn flatten_txn_err(err: TransactionError<DbErr>) -> DbErr {
    match err {
        TransactionError::Connection(err) | TransactionError::Transaction(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        sync_outbox::SyncOutbox,
        task_status_history::TaskStatusHistory,
        user::{UpsertUser, User},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_user(db: &sea_orm::DatabaseConnection) -> Uuid {
        User::upsert_signin(db, &UpsertUser::from_open_id("open-1".to_string()), None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_defaults_to_inbox_and_medium() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let task_id = Uuid::new_v4();
        let task = Task::create(
            &db,
            &CreateTask::from_title("Angebot erstellen".to_string(), user_id),
            task_id,
        )
        .await
        .unwrap();

        assert_eq!(task.id, task_id);
        assert_eq!(task.status, TaskStatus::Inbox);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_by, user_id);
        assert!(task.ghl_task_id.is_none());

        let entries = SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, crate::types::SyncOp::TaskCreated);
        assert_eq!(entries[0].task_uuid, task_id);
    }

    #[tokio::test]
    async fn status_change_appends_exactly_one_history_row() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let task_id = Uuid::new_v4();
        Task::create(
            &db,
            &CreateTask::from_title("Rechnung prüfen".to_string(), user_id),
            task_id,
        )
        .await
        .unwrap();

        let task = Task::update_status(&db, task_id, TaskStatus::InProgress, Some(user_id))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());

        let task = Task::update_status(&db, task_id, TaskStatus::Done, Some(user_id))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());

        let history = TaskStatusHistory::find_by_task_id(&db, task_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].old_status, Some(TaskStatus::Inbox));
        assert_eq!(history[0].new_status, TaskStatus::InProgress);
        assert_eq!(history[1].old_status, Some(TaskStatus::InProgress));
        assert_eq!(history[1].new_status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn noop_status_change_records_nothing() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let task_id = Uuid::new_v4();
        Task::create(
            &db,
            &CreateTask::from_title("Noop".to_string(), user_id),
            task_id,
        )
        .await
        .unwrap();

        Task::update_status(&db, task_id, TaskStatus::Inbox, Some(user_id))
            .await
            .unwrap();

        let history = TaskStatusHistory::find_by_task_id(&db, task_id).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_task_but_keeps_history() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let task_id = Uuid::new_v4();
        Task::create(
            &db,
            &CreateTask::from_title("Löschen".to_string(), user_id),
            task_id,
        )
        .await
        .unwrap();
        Task::update_status(&db, task_id, TaskStatus::Done, Some(user_id))
            .await
            .unwrap();

        let rows = Task::delete(&db, task_id).await.unwrap();
        assert_eq!(rows, 1);
        assert!(Task::find_by_id(&db, task_id).await.unwrap().is_none());
        assert!(Task::find_all(&db).await.unwrap().is_empty());

        let history = TaskStatusHistory::find_by_task_id(&db, task_id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn upsert_remote_is_idempotent_per_external_id() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let fields = RemoteTaskFields {
            ghl_task_id: "ghl-1".to_string(),
            title: "Remote Aufgabe".to_string(),
            description: Some("aus GHL".to_string()),
            status: TaskStatus::InProgress,
            due_date: None,
            assigned_to_ghl_user_id: Some("ghl-user-1".to_string()),
            ghl_contact_id: Some("C1".to_string()),
        };

        let first = Task::upsert_remote(&db, &fields, user_id).await.unwrap();
        let second = Task::upsert_remote(&db, &fields, user_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, TaskStatus::InProgress);
        assert_eq!(second.priority, TaskPriority::Medium);
        assert_eq!(Task::find_all(&db).await.unwrap().len(), 1);

        // Inbound upserts never feed the outbox.
        assert!(SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_outbox_enqueue_rolls_back_the_create() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        // Break the enqueue statement mid-transaction.
        db.execute_unprepared("DROP TABLE sync_outbox").await.unwrap();

        let result = Task::create(
            &db,
            &CreateTask::from_title("Angebot erstellen".to_string(), user_id),
            Uuid::new_v4(),
        )
        .await;

        assert!(result.is_err());
        assert!(Task::find_all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_outbox_enqueue_rolls_back_the_status_change() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let task_id = Uuid::new_v4();
        Task::create(
            &db,
            &CreateTask::from_title("Statuswechsel".to_string(), user_id),
            task_id,
        )
        .await
        .unwrap();

        db.execute_unprepared("DROP TABLE sync_outbox").await.unwrap();

        let result = Task::update_status(&db, task_id, TaskStatus::Done, Some(user_id)).await;
        assert!(result.is_err());

        let task = Task::find_by_id(&db, task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Inbox);
        assert!(task.completed_at.is_none());
        assert!(TaskStatusHistory::find_by_task_id(&db, task_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_enqueues_remote_ids_in_payload() {
        let db = setup_db().await;
        let user_id = seed_user(&db).await;

        let fields = RemoteTaskFields {
            ghl_task_id: "ghl-9".to_string(),
            title: "Verknüpft".to_string(),
            description: None,
            status: TaskStatus::Inbox,
            due_date: None,
            assigned_to_ghl_user_id: None,
            ghl_contact_id: Some("C9".to_string()),
        };
        let task = Task::upsert_remote(&db, &fields, user_id).await.unwrap();

        Task::delete(&db, task.id).await.unwrap();

        let entries = SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, crate::types::SyncOp::TaskDeleted);
        let payload: crate::events::DeletedTaskSyncPayload =
            serde_json::from_value(entries[0].payload.clone()).unwrap();
        assert_eq!(payload.ghl_task_id.as_deref(), Some("ghl-9"));
        assert_eq!(payload.ghl_contact_id.as_deref(), Some("C9"));
    }
}
