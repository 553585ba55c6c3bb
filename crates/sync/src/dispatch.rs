use async_trait::async_trait;
use ghl::{CreateTaskRequest, GhlClient, GhlError, GhlRemoteUser, GhlTask, UpdateTaskRequest};

/// Outbound CRM calls the outbox worker performs. A trait so tests can run
/// the worker against a recording fake instead of the network.
#[async_trait]
pub trait GhlDispatch: Send + Sync {
    async fn create_task(
        &self,
        contact_id: &str,
        request: CreateTaskRequest,
    ) -> Result<String, GhlError>;

    async fn update_task(
        &self,
        contact_id: &str,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<(), GhlError>;

    async fn delete_task(&self, contact_id: &str, task_id: &str) -> Result<(), GhlError>;
}

#[async_trait]
impl GhlDispatch for GhlClient {
    async fn create_task(
        &self,
        contact_id: &str,
        request: CreateTaskRequest,
    ) -> Result<String, GhlError> {
        GhlClient::create_task(self, contact_id, request).await
    }

    async fn update_task(
        &self,
        contact_id: &str,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<(), GhlError> {
        GhlClient::update_task(self, contact_id, task_id, request).await
    }

    async fn delete_task(&self, contact_id: &str, task_id: &str) -> Result<(), GhlError> {
        GhlClient::delete_task(self, contact_id, task_id).await
    }
}

/// Inbound CRM reads the pull procedures run through. Same seam as
/// [`GhlDispatch`]: tests feed canned collections instead of the network.
#[async_trait]
pub trait GhlFetch: Send + Sync {
    async fn search_tasks(&self) -> Result<Vec<GhlTask>, GhlError>;

    async fn list_users(&self) -> Result<Vec<GhlRemoteUser>, GhlError>;
}

#[async_trait]
impl GhlFetch for GhlClient {
    async fn search_tasks(&self) -> Result<Vec<GhlTask>, GhlError> {
        GhlClient::search_tasks(self).await
    }

    async fn list_users(&self) -> Result<Vec<GhlRemoteUser>, GhlError> {
        GhlClient::list_users(self).await
    }
}
