use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{entities::sync_outbox, types::SyncOp};

pub struct SyncOutbox;

impl SyncOutbox {
    pub async fn enqueue<C: ConnectionTrait>(
        db: &C,
        op: SyncOp,
        task_uuid: Uuid,
        payload: Value,
    ) -> Result<(), DbErr> {
        let active = sync_outbox::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            op: Set(op),
            task_uuid: Set(task_uuid),
            payload: Set(payload),
            created_at: Set(Utc::now().into()),
            published_at: Set(None),
            attempts: Set(0),
            last_error: Set(None),
            ..Default::default()
        };

        active.insert(db).await?;
        Ok(())
    }

    /// Unpublished entries, oldest first. Entries that already burned
    /// `max_attempts` attempts stay parked until someone looks at them.
    pub async fn fetch_unpublished<C: ConnectionTrait>(
        db: &C,
        limit: u64,
        max_attempts: i32,
    ) -> Result<Vec<sync_outbox::Model>, DbErr> {
        sync_outbox::Entity::find()
            .filter(sync_outbox::Column::PublishedAt.is_null())
            .filter(sync_outbox::Column::Attempts.lt(max_attempts))
            .order_by_asc(sync_outbox::Column::CreatedAt)
            .order_by_asc(sync_outbox::Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn mark_published<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        let record = sync_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Sync outbox record not found".to_string(),
            ))?;

        let mut active: sync_outbox::ActiveModel = record.into();
        active.published_at = Set(Some(Utc::now().into()));
        active.update(db).await?;
        Ok(())
    }

    pub async fn mark_failed<C: ConnectionTrait>(
        db: &C,
        id: i64,
        error: &str,
    ) -> Result<(), DbErr> {
        let record = sync_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Sync outbox record not found".to_string(),
            ))?;

        let attempts = record.attempts + 1;
        let mut active: sync_outbox::ActiveModel = record.into();
        active.attempts = Set(attempts);
        active.last_error = Set(Some(error.to_string()));
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn outbox_enqueue_fetch_and_marking() {
        let db = setup_db().await;

        let task_one = Uuid::new_v4();
        SyncOutbox::enqueue(
            &db,
            SyncOp::TaskCreated,
            task_one,
            serde_json::json!({ "task_id": task_one }),
        )
        .await
        .unwrap();

        let task_two = Uuid::new_v4();
        SyncOutbox::enqueue(
            &db,
            SyncOp::TaskUpdated,
            task_two,
            serde_json::json!({ "task_id": task_two }),
        )
        .await
        .unwrap();

        let entries = SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].task_uuid, task_one);

        SyncOutbox::mark_published(&db, entries[0].id).await.unwrap();
        let remaining = SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task_uuid, task_two);

        SyncOutbox::mark_failed(&db, remaining[0].id, "GHL API Error: 502")
            .await
            .unwrap();
        let failed = SyncOutbox::fetch_unpublished(&db, 10, 5).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("GHL API Error: 502"));
    }

    #[tokio::test]
    async fn exhausted_entries_are_parked() {
        let db = setup_db().await;

        let task_id = Uuid::new_v4();
        SyncOutbox::enqueue(
            &db,
            SyncOp::TaskDeleted,
            task_id,
            serde_json::json!({ "task_id": task_id }),
        )
        .await
        .unwrap();

        let entry_id = SyncOutbox::fetch_unpublished(&db, 1, 2).await.unwrap()[0].id;
        SyncOutbox::mark_failed(&db, entry_id, "boom").await.unwrap();
        SyncOutbox::mark_failed(&db, entry_id, "boom").await.unwrap();

        assert!(SyncOutbox::fetch_unpublished(&db, 10, 2).await.unwrap().is_empty());
        // Still visible with a higher ceiling; nothing was deleted.
        assert_eq!(SyncOutbox::fetch_unpublished(&db, 10, 3).await.unwrap().len(), 1);
    }
}
