use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::task_file, models::ids};

/// File attachment metadata. The bytes themselves live in external object
/// storage; this table only records where they went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFile {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_url: String,
    pub file_key: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskFile {
    pub file_url: String,
    pub file_key: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub uploaded_by: Option<Uuid>,
}

impl TaskFile {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task_file::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let uploaded_by = match model.uploaded_by_user_id {
            Some(user_row_id) => ids::user_uuid_by_id(db, user_row_id).await?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            task_id,
            file_url: model.file_url,
            file_key: model.file_key,
            filename: model.filename,
            mime_type: model.mime_type,
            size_bytes: model.size_bytes,
            uploaded_by,
            uploaded_at: model.uploaded_at.into(),
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        data: &CreateTaskFile,
    ) -> Result<Self, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let uploaded_by_user_id = match data.uploaded_by {
            Some(user_id) => ids::user_id_by_uuid(db, user_id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let active = task_file::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            file_url: Set(data.file_url.clone()),
            file_key: Set(data.file_key.clone()),
            filename: Set(data.filename.clone()),
            mime_type: Set(data.mime_type.clone()),
            size_bytes: Set(data.size_bytes),
            uploaded_by_user_id: Set(uploaded_by_user_id),
            uploaded_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(task_row_id) = ids::task_id_by_uuid(db, task_id).await? else {
            return Ok(Vec::new());
        };

        let models = task_file::Entity::find()
            .filter(task_file::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_file::Column::UploadedAt)
            .order_by_asc(task_file::Column::Id)
            .all(db)
            .await?;

        let mut files = Vec::with_capacity(models.len());
        for model in models {
            files.push(Self::from_model(db, model).await?);
        }
        Ok(files)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task_file::Entity::find()
            .filter(task_file::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task_file::Entity::delete_many()
            .filter(task_file::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
