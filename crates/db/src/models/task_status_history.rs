use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::task_status_history,
    models::ids,
    types::TaskStatus,
};

/// One append-only row per status transition. Rows are never updated or
/// deleted, and they survive deletion of the task they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusHistoryEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub old_status: Option<TaskStatus>,
    pub new_status: TaskStatus,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

pub struct TaskStatusHistory;

impl TaskStatusHistory {
    pub(crate) async fn append<C: ConnectionTrait>(
        db: &C,
        task_uuid: Uuid,
        old_status: Option<TaskStatus>,
        new_status: TaskStatus,
        changed_by_user_id: Option<i64>,
    ) -> Result<(), DbErr> {
        let active = task_status_history::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_uuid: Set(task_uuid),
            old_status: Set(old_status),
            new_status: Set(new_status),
            changed_by_user_id: Set(changed_by_user_id),
            changed_at: Set(Utc::now().into()),
            ..Default::default()
        };

        active.insert(db).await?;
        Ok(())
    }

    /// Chronological history for a task, oldest first.
    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_uuid: Uuid,
    ) -> Result<Vec<TaskStatusHistoryEntry>, DbErr> {
        let models = task_status_history::Entity::find()
            .filter(task_status_history::Column::TaskUuid.eq(task_uuid))
            .order_by_asc(task_status_history::Column::ChangedAt)
            .order_by_asc(task_status_history::Column::Id)
            .all(db)
            .await?;

        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            let changed_by = match model.changed_by_user_id {
                Some(user_row_id) => ids::user_uuid_by_id(db, user_row_id).await?,
                None => None,
            };
            entries.push(TaskStatusHistoryEntry {
                id: model.uuid,
                task_id: model.task_uuid,
                old_status: model.old_status,
                new_status: model.new_status,
                changed_by,
                changed_at: model.changed_at.into(),
            });
        }
        Ok(entries)
    }
}
