//! Resource client for the placeholder service
//!
//! Every method is a single call into the composed [`Transport`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use plumbline_common::{ApiError, ApiResponse, HttpMethod, Resource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::transport::Transport;

type ApiResult = Result<ApiResponse, ApiError>;

/// Liveness of the upstream as seen by one probe request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientHealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of [`PlaceholderClient::health_check`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientHealth {
    pub status: ClientHealthStatus,
    pub checked_at: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClientHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == ClientHealthStatus::Healthy
    }
}

/// CRUD helpers for posts, users, comments, albums, photos and todos
pub struct PlaceholderClient<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for PlaceholderClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> PlaceholderClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    // Generic

    pub async fn request(&self, method: HttpMethod, path: &str, body: Option<&Value>) -> ApiResult {
        self.transport.request(method, path, body).await
    }

    pub async fn list(&self, resource: Resource) -> ApiResult {
        self.get_path(resource.path()).await
    }

    pub async fn get(&self, resource: Resource, id: u64) -> ApiResult {
        self.get_path(&resource.item_path(id)).await
    }

    async fn get_path(&self, path: &str) -> ApiResult {
        self.transport.request(HttpMethod::Get, path, None).await
    }

    async fn create(&self, resource: Resource, body: &Value) -> ApiResult {
        self.transport
            .request(HttpMethod::Post, resource.path(), Some(body))
            .await
    }

    async fn replace(&self, resource: Resource, id: u64, body: &Value) -> ApiResult {
        self.transport
            .request(HttpMethod::Put, &resource.item_path(id), Some(body))
            .await
    }

    async fn patch(&self, resource: Resource, id: u64, body: &Value) -> ApiResult {
        self.transport
            .request(HttpMethod::Patch, &resource.item_path(id), Some(body))
            .await
    }

    async fn delete(&self, resource: Resource, id: u64) -> ApiResult {
        self.transport
            .request(HttpMethod::Delete, &resource.item_path(id), None)
            .await
    }

    async fn query(&self, resource: Resource, params: &[(&str, &str)]) -> ApiResult {
        self.get_path(&with_query(resource.path(), params)).await
    }

    // Posts

    pub async fn get_all_posts(&self) -> ApiResult {
        self.list(Resource::Posts).await
    }

    pub async fn get_post(&self, id: u64) -> ApiResult {
        self.get(Resource::Posts, id).await
    }

    pub async fn create_post(&self, body: &Value) -> ApiResult {
        self.create(Resource::Posts, body).await
    }

    pub async fn update_post(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Posts, id, body).await
    }

    pub async fn patch_post(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Posts, id, body).await
    }

    pub async fn delete_post(&self, id: u64) -> ApiResult {
        self.delete(Resource::Posts, id).await
    }

    pub async fn get_post_comments(&self, id: u64) -> ApiResult {
        self.get_path(&format!("/posts/{id}/comments")).await
    }

    pub async fn get_posts_with_query(&self, params: &[(&str, &str)]) -> ApiResult {
        self.query(Resource::Posts, params).await
    }

    // Users

    pub async fn get_all_users(&self) -> ApiResult {
        self.list(Resource::Users).await
    }

    pub async fn get_user(&self, id: u64) -> ApiResult {
        self.get(Resource::Users, id).await
    }

    pub async fn create_user(&self, body: &Value) -> ApiResult {
        self.create(Resource::Users, body).await
    }

    pub async fn update_user(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Users, id, body).await
    }

    pub async fn patch_user(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Users, id, body).await
    }

    pub async fn delete_user(&self, id: u64) -> ApiResult {
        self.delete(Resource::Users, id).await
    }

    pub async fn get_user_posts(&self, id: u64) -> ApiResult {
        self.get_path(&format!("/users/{id}/posts")).await
    }

    pub async fn get_user_albums(&self, id: u64) -> ApiResult {
        self.get_path(&format!("/users/{id}/albums")).await
    }

    pub async fn get_user_todos(&self, id: u64) -> ApiResult {
        self.get_path(&format!("/users/{id}/todos")).await
    }

    pub async fn get_users_with_query(&self, params: &[(&str, &str)]) -> ApiResult {
        self.query(Resource::Users, params).await
    }

    // Comments

    pub async fn get_all_comments(&self) -> ApiResult {
        self.list(Resource::Comments).await
    }

    pub async fn get_comment(&self, id: u64) -> ApiResult {
        self.get(Resource::Comments, id).await
    }

    pub async fn create_comment(&self, body: &Value) -> ApiResult {
        self.create(Resource::Comments, body).await
    }

    pub async fn update_comment(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Comments, id, body).await
    }

    pub async fn patch_comment(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Comments, id, body).await
    }

    pub async fn delete_comment(&self, id: u64) -> ApiResult {
        self.delete(Resource::Comments, id).await
    }

    pub async fn get_comments_with_query(&self, params: &[(&str, &str)]) -> ApiResult {
        self.query(Resource::Comments, params).await
    }

    // Albums

    pub async fn get_all_albums(&self) -> ApiResult {
        self.list(Resource::Albums).await
    }

    pub async fn get_album(&self, id: u64) -> ApiResult {
        self.get(Resource::Albums, id).await
    }

    pub async fn create_album(&self, body: &Value) -> ApiResult {
        self.create(Resource::Albums, body).await
    }

    pub async fn update_album(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Albums, id, body).await
    }

    pub async fn patch_album(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Albums, id, body).await
    }

    pub async fn delete_album(&self, id: u64) -> ApiResult {
        self.delete(Resource::Albums, id).await
    }

    pub async fn get_album_photos(&self, id: u64) -> ApiResult {
        self.get_path(&format!("/albums/{id}/photos")).await
    }

    // Photos

    pub async fn get_all_photos(&self) -> ApiResult {
        self.list(Resource::Photos).await
    }

    pub async fn get_photo(&self, id: u64) -> ApiResult {
        self.get(Resource::Photos, id).await
    }

    pub async fn create_photo(&self, body: &Value) -> ApiResult {
        self.create(Resource::Photos, body).await
    }

    pub async fn update_photo(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Photos, id, body).await
    }

    pub async fn patch_photo(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Photos, id, body).await
    }

    pub async fn delete_photo(&self, id: u64) -> ApiResult {
        self.delete(Resource::Photos, id).await
    }

    // Todos

    pub async fn get_all_todos(&self) -> ApiResult {
        self.list(Resource::Todos).await
    }

    pub async fn get_todo(&self, id: u64) -> ApiResult {
        self.get(Resource::Todos, id).await
    }

    pub async fn create_todo(&self, body: &Value) -> ApiResult {
        self.create(Resource::Todos, body).await
    }

    pub async fn update_todo(&self, id: u64, body: &Value) -> ApiResult {
        self.replace(Resource::Todos, id, body).await
    }

    pub async fn patch_todo(&self, id: u64, body: &Value) -> ApiResult {
        self.patch(Resource::Todos, id, body).await
    }

    pub async fn delete_todo(&self, id: u64) -> ApiResult {
        self.delete(Resource::Todos, id).await
    }

    /// Probe the upstream with a single `GET /posts/1`.
    pub async fn health_check(&self) -> ClientHealth {
        let start = Instant::now();
        let result = self.get_post(1).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                info!("💚 Upstream healthy ({}ms)", response_time_ms);
                ClientHealth {
                    status: ClientHealthStatus::Healthy,
                    checked_at: Utc::now(),
                    response_time_ms,
                    data: Some(resp.data),
                    error: None,
                }
            }
            Err(e) => {
                warn!("💔 Upstream unhealthy: {}", e);
                ClientHealth {
                    status: ClientHealthStatus::Unhealthy,
                    checked_at: Utc::now(),
                    response_time_ms,
                    data: None,
                    error: Some(e.message),
                }
            }
        }
    }
}

/// Append form-urlencoded query parameters to a path.
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().copied())
        .finish();
    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(HttpMethod, String, Option<Value>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn request(
            &self,
            method: HttpMethod,
            path: &str,
            body: Option<&Value>,
        ) -> Result<ApiResponse, ApiError> {
            self.calls
                .lock()
                .push((method, path.to_string(), body.cloned()));
            if self.fail {
                return Err(ApiError::transport("connection refused"));
            }
            Ok(ApiResponse::new(200, "OK", body.cloned().unwrap_or(json!({"id": 1}))))
        }

        fn base_url(&self) -> &str {
            "http://fake"
        }
    }

    fn client() -> (Arc<RecordingTransport>, PlaceholderClient<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        (transport.clone(), PlaceholderClient::new(transport))
    }

    #[tokio::test]
    async fn test_methods_map_to_paths() {
        let (transport, client) = client();
        let body = json!({"title": "foo"});

        client.get_all_posts().await.unwrap();
        client.get_user(3).await.unwrap();
        client.patch_post(1, &body).await.unwrap();
        client.delete_todo(9).await.unwrap();
        client.get_album_photos(2).await.unwrap();
        client.get_user_todos(5).await.unwrap();
        client.update_comment(4, &body).await.unwrap();

        let calls = transport.calls.lock();
        let seen: Vec<(HttpMethod, &str)> = calls.iter().map(|(m, p, _)| (*m, p.as_str())).collect();
        assert_eq!(
            seen,
            vec![
                (HttpMethod::Get, "/posts"),
                (HttpMethod::Get, "/users/3"),
                (HttpMethod::Patch, "/posts/1"),
                (HttpMethod::Delete, "/todos/9"),
                (HttpMethod::Get, "/albums/2/photos"),
                (HttpMethod::Get, "/users/5/todos"),
                (HttpMethod::Put, "/comments/4"),
            ]
        );
        assert_eq!(calls[2].2, Some(body));
    }

    #[tokio::test]
    async fn test_create_echoes_body() {
        let (_, client) = client();
        let body = json!({"title": "foo", "body": "bar", "userId": 1});
        let resp = client.create_post(&body).await.unwrap();
        assert_eq!(resp.data, body);
    }

    #[test]
    fn test_query_encoding() {
        assert_eq!(with_query("/posts", &[]), "/posts");
        assert_eq!(with_query("/posts", &[("userId", "1")]), "/posts?userId=1");
        assert_eq!(
            with_query("/comments", &[("email", "a b@x.io")]),
            "/comments?email=a+b%40x.io"
        );
    }

    #[tokio::test]
    async fn test_health_check_reports_failure() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let client = PlaceholderClient::new(transport.clone());
        let health = client.health_check().await;
        assert!(!health.is_healthy());
        assert_eq!(health.error.as_deref(), Some("connection refused"));
        assert_eq!(transport.calls.lock()[0].1, "/posts/1");
    }
}
