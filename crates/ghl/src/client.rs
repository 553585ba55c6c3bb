use chrono::{Duration, Utc};
use db::{ConnectionTrait, models::app_setting};
use reqwest::Response;

use crate::{
    error::GhlError,
    types::{
        ContactListResponse, CreateTaskRequest, CreatedTaskResponse, GhlContact, GhlRemoteUser,
        GhlTask, LocationResponse, TaskSearchResponse, UpdateTaskRequest,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://services.leadconnectorhq.com";
const API_VERSION: &str = "2021-07-28";

#[derive(Debug, Clone)]
pub struct GhlCredentials {
    pub token: String,
    pub location_id: String,
}

impl GhlCredentials {
    /// Loads the API token and location id from app settings. Both must be
    /// present and non-empty.
    pub async fn from_settings<C: ConnectionTrait>(db: &C) -> Result<Self, GhlError> {
        let token = app_setting::AppSetting::get_value(db, app_setting::GHL_API_TOKEN).await?;
        let location_id =
            app_setting::AppSetting::get_value(db, app_setting::GHL_LOCATION_ID).await?;

        match (token, location_id) {
            (Some(token), Some(location_id))
                if !token.trim().is_empty() && !location_id.trim().is_empty() =>
            {
                Ok(Self { token, location_id })
            }
            _ => Err(GhlError::NotConfigured),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GhlClient {
    http: reqwest::Client,
    base_url: String,
    credentials: GhlCredentials,
}

impl GhlClient {
    pub fn new(credentials: GhlCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(credentials: GhlCredentials, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    pub async fn from_settings<C: ConnectionTrait>(db: &C) -> Result<Self, GhlError> {
        Ok(Self::new(GhlCredentials::from_settings(db).await?))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.credentials.token)
            .header("Version", API_VERSION)
    }

    /// Creates a task under the given contact and returns the remote task id.
    /// GoHighLevel requires a due date, so a missing one defaults to a week
    /// out, matching what the board shows for undated tasks.
    pub async fn create_task(
        &self,
        contact_id: &str,
        request: CreateTaskRequest,
    ) -> Result<String, GhlError> {
        if contact_id.trim().is_empty() {
            return Err(GhlError::ContactRequired);
        }

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/contacts/{contact_id}/tasks"),
            )
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let created: CreatedTaskResponse = response.json().await?;
        created.into_id().ok_or(GhlError::MissingTaskId)
    }

    pub async fn update_task(
        &self,
        contact_id: &str,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<(), GhlError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/contacts/{contact_id}/tasks/{task_id}"),
            )
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete_task(&self, contact_id: &str, task_id: &str) -> Result<(), GhlError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/contacts/{contact_id}/tasks/{task_id}"),
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// All tasks in the location. The search endpoint takes an empty body for
    /// an unfiltered listing; there is no pagination on this path.
    pub async fn search_tasks(&self) -> Result<Vec<GhlTask>, GhlError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/locations/{}/tasks/search", self.credentials.location_id),
            )
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let data: TaskSearchResponse = response.json().await?;
        Ok(data.tasks)
    }

    /// Users attached to the location. The location detail endpoint carries
    /// them inline; there is no dedicated user listing.
    pub async fn list_users(&self) -> Result<Vec<GhlRemoteUser>, GhlError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/locations/{}", self.credentials.location_id),
            )
            .send()
            .await?;
        let response = Self::check(response).await?;

        let data: LocationResponse = response.json().await?;
        Ok(data.users)
    }

    pub async fn list_contacts(&self) -> Result<Vec<GhlContact>, GhlError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/contacts/?locationId={}", self.credentials.location_id),
            )
            .send()
            .await?;
        let response = Self::check(response).await?;

        let data: ContactListResponse = response.json().await?;
        Ok(data.contacts)
    }

    async fn check(response: Response) -> Result<Response, GhlError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|message| message.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());

        Err(GhlError::Api { status, message })
    }
}

impl CreateTaskRequest {
    /// Request body for a brand-new task. A task without a due date gets one
    /// a week out, which is what the CRM UI does for undated tasks.
    pub fn new(
        title: String,
        body: Option<String>,
        due_date: Option<chrono::DateTime<Utc>>,
        assigned_to: Option<String>,
    ) -> Self {
        Self {
            title,
            body,
            due_date: due_date.unwrap_or_else(|| Utc::now() + Duration::days(7)),
            completed: false,
            assigned_to: assigned_to.filter(|id| !id.is_empty() && id != "unassigned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use db::models::app_setting::{AppSetting, GHL_API_TOKEN, GHL_LOCATION_ID, UpsertAppSetting};

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn store_setting(db: &sea_orm::DatabaseConnection, key: &str, value: &str) {
        AppSetting::upsert(
            db,
            &UpsertAppSetting {
                key: key.to_string(),
                value: Some(value.to_string()),
                description: None,
                updated_by: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn credentials_require_both_settings() {
        let db = setup_db().await;

        assert!(matches!(
            GhlCredentials::from_settings(&db).await,
            Err(GhlError::NotConfigured)
        ));

        store_setting(&db, GHL_API_TOKEN, "pit-token").await;
        assert!(matches!(
            GhlCredentials::from_settings(&db).await,
            Err(GhlError::NotConfigured)
        ));

        store_setting(&db, GHL_LOCATION_ID, "loc-1").await;
        let credentials = GhlCredentials::from_settings(&db).await.unwrap();
        assert_eq!(credentials.token, "pit-token");
        assert_eq!(credentials.location_id, "loc-1");
    }

    #[tokio::test]
    async fn create_task_rejects_missing_contact_before_any_request() {
        let client = GhlClient::with_base_url(
            GhlCredentials {
                token: "t".to_string(),
                location_id: "l".to_string(),
            },
            // Unroutable on purpose; the call must fail before reaching it.
            "http://127.0.0.1:0".to_string(),
        );

        let result = client
            .create_task("", CreateTaskRequest::new("Titel".to_string(), None, None, None))
            .await;
        assert!(matches!(result, Err(GhlError::ContactRequired)));
    }

    #[test]
    fn unassigned_marker_is_dropped_from_create_request() {
        let request = CreateTaskRequest::new(
            "Titel".to_string(),
            None,
            None,
            Some("unassigned".to_string()),
        );
        assert!(request.assigned_to.is_none());
    }
}
