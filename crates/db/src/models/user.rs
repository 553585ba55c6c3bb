use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::user, types::UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<UserRole>,
}

impl UpsertUser {
    pub fn from_open_id(open_id: String) -> Self {
        Self {
            open_id,
            name: None,
            email: None,
            login_method: None,
            role: None,
        }
    }
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            open_id: model.open_id,
            name: model.name,
            email: model.email,
            login_method: model.login_method,
            role: model.role,
            created_at: model.created_at.into(),
            last_signed_in: model.last_signed_in.into(),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_open_id<C: ConnectionTrait>(
        db: &C,
        open_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::OpenId.eq(open_id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Sign-in upsert keyed by `open_id`. Refreshes profile fields and
    /// `last_signed_in` on every call. The role is only changed when the
    /// caller supplies one, with a single exception: the configured owner
    /// open id is always promoted to admin so the deployment cannot lock
    /// itself out.
    pub async fn upsert_signin<C: ConnectionTrait>(
        db: &C,
        data: &UpsertUser,
        owner_open_id: Option<&str>,
    ) -> Result<Self, DbErr> {
        let is_owner = owner_open_id == Some(data.open_id.as_str());

        let existing = user::Entity::find()
            .filter(user::Column::OpenId.eq(data.open_id.as_str()))
            .one(db)
            .await?;

        let now = Utc::now();
        let model = match existing {
            Some(record) => {
                let current_role = record.role.clone();
                let mut active: user::ActiveModel = record.into();
                if data.name.is_some() {
                    active.name = Set(data.name.clone());
                }
                if data.email.is_some() {
                    active.email = Set(data.email.clone());
                }
                if data.login_method.is_some() {
                    active.login_method = Set(data.login_method.clone());
                }
                let role = if is_owner {
                    UserRole::Admin
                } else {
                    data.role.clone().unwrap_or(current_role)
                };
                active.role = Set(role);
                active.last_signed_in = Set(now.into());
                active.updated_at = Set(now.into());
                active.update(db).await?
            }
            None => {
                let role = if is_owner {
                    UserRole::Admin
                } else {
                    data.role.clone().unwrap_or_default()
                };
                let active = user::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    open_id: Set(data.open_id.clone()),
                    name: Set(data.name.clone()),
                    email: Set(data.email.clone()),
                    login_method: Set(data.login_method.clone()),
                    role: Set(role),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    last_signed_in: Set(now.into()),
                    ..Default::default()
                };
                active.insert(db).await?
            }
        };

        Ok(Self::from_model(model))
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
    async fn signin_upsert_is_keyed_by_open_id() {
        let db = setup_db().await;

        let first = User::upsert_signin(
            &db,
            &UpsertUser {
                open_id: "open-1".to_string(),
                name: Some("Anna".to_string()),
                email: Some("anna@example.com".to_string()),
                login_method: Some("google".to_string()),
                role: None,
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(first.role, UserRole::User);

        let second = User::upsert_signin(
            &db,
            &UpsertUser {
                open_id: "open-1".to_string(),
                name: Some("Anna B.".to_string()),
                email: None,
                login_method: None,
                role: None,
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Anna B."));
        // Omitted fields keep their stored values.
        assert_eq!(second.email.as_deref(), Some("anna@example.com"));
        assert!(second.last_signed_in >= first.last_signed_in);
        assert_eq!(User::find_all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_open_id_is_always_admin() {
        let db = setup_db().await;

        let owner = User::upsert_signin(
            &db,
            &UpsertUser::from_open_id("owner-1".to_string()),
            Some("owner-1"),
        )
        .await
        .unwrap();
        assert_eq!(owner.role, UserRole::Admin);

        // A later sign-in without an explicit role keeps the promotion.
        let again = User::upsert_signin(
            &db,
            &UpsertUser::from_open_id("owner-1".to_string()),
            Some("owner-1"),
        )
        .await
        .unwrap();
        assert_eq!(again.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn explicit_role_is_preserved_across_signins() {
        let db = setup_db().await;

        User::upsert_signin(
            &db,
            &UpsertUser {
                open_id: "open-2".to_string(),
                name: None,
                email: None,
                login_method: None,
                role: Some(UserRole::Admin),
            },
            None,
        )
        .await
        .unwrap();

        let later = User::upsert_signin(
            &db,
            &UpsertUser::from_open_id("open-2".to_string()),
            None,
        )
        .await
        .unwrap();
        assert_eq!(later.role, UserRole::Admin);
    }
}
