use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::OpenId).string_len(64).not_null())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Email).string_len(320))
                    .col(ColumnDef::new(Users::LoginMethod).string_len(64))
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("user")),
                    )
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .col(timestamp_col(Users::LastSignedIn))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_open_id")
                    .table(Users::Table)
                    .col(Users::OpenId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(ColumnDef::new(Tasks::GhlTaskId).string_len(64))
                    .col(ColumnDef::new(Tasks::Title).string_len(500).not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("inbox")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(ColumnDef::new(Tasks::AssignedToGhlUserId).string_len(64))
                    .col(ColumnDef::new(Tasks::GhlContactId).string_len(64))
                    .col(fk_id_col(manager, Tasks::CreatedByUserId))
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_ghl_task_id")
                    .table(Tasks::Table)
                    .col(Tasks::GhlTaskId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_status")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskStatusHistory::Table)
                    .col(pk_id_col(manager, TaskStatusHistory::Id))
                    .col(uuid_col(TaskStatusHistory::Uuid))
                    .col(uuid_col(TaskStatusHistory::TaskUuid))
                    .col(ColumnDef::new(TaskStatusHistory::OldStatus).string_len(32))
                    .col(
                        ColumnDef::new(TaskStatusHistory::NewStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(fk_id_nullable_col(manager, TaskStatusHistory::ChangedByUserId))
                    .col(timestamp_col(TaskStatusHistory::ChangedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_status_history_uuid")
                    .table(TaskStatusHistory::Table)
                    .col(TaskStatusHistory::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_status_history_task_uuid")
                    .table(TaskStatusHistory::Table)
                    .col(TaskStatusHistory::TaskUuid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskFiles::Table)
                    .col(pk_id_col(manager, TaskFiles::Id))
                    .col(uuid_col(TaskFiles::Uuid))
                    .col(fk_id_col(manager, TaskFiles::TaskId))
                    .col(ColumnDef::new(TaskFiles::FileUrl).text().not_null())
                    .col(ColumnDef::new(TaskFiles::FileKey).text().not_null())
                    .col(ColumnDef::new(TaskFiles::Filename).string_len(500).not_null())
                    .col(ColumnDef::new(TaskFiles::MimeType).string_len(100))
                    .col(ColumnDef::new(TaskFiles::SizeBytes).big_integer())
                    .col(fk_id_nullable_col(manager, TaskFiles::UploadedByUserId))
                    .col(timestamp_col(TaskFiles::UploadedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_files_uuid")
                    .table(TaskFiles::Table)
                    .col(TaskFiles::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_files_task_id")
                    .table(TaskFiles::Table)
                    .col(TaskFiles::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(GhlUsers::Table)
                    .col(pk_id_col(manager, GhlUsers::Id))
                    .col(uuid_col(GhlUsers::Uuid))
                    .col(ColumnDef::new(GhlUsers::GhlUserId).string_len(64).not_null())
                    .col(ColumnDef::new(GhlUsers::Name).string())
                    .col(ColumnDef::new(GhlUsers::Email).string_len(320))
                    .col(timestamp_col(GhlUsers::LastSyncedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_ghl_users_uuid")
                    .table(GhlUsers::Table)
                    .col(GhlUsers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_ghl_users_ghl_user_id")
                    .table(GhlUsers::Table)
                    .col(GhlUsers::GhlUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(AppSettings::Table)
                    .col(pk_id_col(manager, AppSettings::Id))
                    .col(uuid_col(AppSettings::Uuid))
                    .col(ColumnDef::new(AppSettings::Key).string_len(100).not_null())
                    .col(ColumnDef::new(AppSettings::Value).text())
                    .col(ColumnDef::new(AppSettings::Description).text())
                    .col(fk_id_nullable_col(manager, AppSettings::UpdatedByUserId))
                    .col(timestamp_col(AppSettings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_app_settings_uuid")
                    .table(AppSettings::Table)
                    .col(AppSettings::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_app_settings_key")
                    .table(AppSettings::Table)
                    .col(AppSettings::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(SyncOutbox::Table)
                    .col(pk_id_col(manager, SyncOutbox::Id))
                    .col(uuid_col(SyncOutbox::Uuid))
                    .col(ColumnDef::new(SyncOutbox::Op).string_len(32).not_null())
                    .col(uuid_col(SyncOutbox::TaskUuid))
                    .col(ColumnDef::new(SyncOutbox::Payload).json().not_null())
                    .col(timestamp_col(SyncOutbox::CreatedAt))
                    .col(ColumnDef::new(SyncOutbox::PublishedAt).timestamp())
                    .col(
                        ColumnDef::new(SyncOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(SyncOutbox::LastError).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_outbox_uuid")
                    .table(SyncOutbox::Table)
                    .col(SyncOutbox::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_outbox_published_at")
                    .table(SyncOutbox::Table)
                    .col(SyncOutbox::PublishedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncOutbox::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GhlUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    OpenId,
    Name,
    Email,
    LoginMethod,
    Role,
    CreatedAt,
    UpdatedAt,
    LastSignedIn,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    GhlTaskId,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    AssignedToGhlUserId,
    GhlContactId,
    CreatedByUserId,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskStatusHistory {
    Table,
    Id,
    Uuid,
    TaskUuid,
    OldStatus,
    NewStatus,
    ChangedByUserId,
    ChangedAt,
}

#[derive(Iden)]
enum TaskFiles {
    Table,
    Id,
    Uuid,
    TaskId,
    FileUrl,
    FileKey,
    Filename,
    MimeType,
    SizeBytes,
    UploadedByUserId,
    UploadedAt,
}

#[derive(Iden)]
enum GhlUsers {
    Table,
    Id,
    Uuid,
    GhlUserId,
    Name,
    Email,
    LastSyncedAt,
}

#[derive(Iden)]
enum AppSettings {
    Table,
    Id,
    Uuid,
    Key,
    Value,
    Description,
    UpdatedByUserId,
    UpdatedAt,
}

#[derive(Iden)]
enum SyncOutbox {
    Table,
    Id,
    Uuid,
    Op,
    TaskUuid,
    Payload,
    CreatedAt,
    PublishedAt,
    Attempts,
    LastError,
}
