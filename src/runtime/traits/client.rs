// ABOUTME: Client factory trait producing runtime clients scoped to an environment.
// ABOUTME: Lets the upgrade service stay independent of how endpoints are reached.

use super::image::ImageInspector;
use crate::environment::Environment;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_client(
        &self,
        environment: &Environment,
    ) -> Result<Arc<dyn ImageInspector>, ConnectionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("unsupported endpoint URL: {0}")]
    UnsupportedUrl(String),

    #[error("connection failed: {0}")]
    Failed(String),
}
