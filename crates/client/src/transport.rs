//! The request capability shared by the resource client and health probe

use std::sync::Arc;

use async_trait::async_trait;
use plumbline_common::{ApiError, ApiResponse, HttpMethod};
use serde_json::Value;

/// Something that can send one JSON request and return the captured
/// response. Non-2xx statuses are failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError>;

    /// Base URL requests are resolved against
    fn base_url(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        (**self).request(method, path, body).await
    }

    fn base_url(&self) -> &str {
        (**self).base_url()
    }
}
