// ABOUTME: Image inspection trait for container runtimes.
// ABOUTME: List locally cached images and inspect registry distribution manifests.

use crate::types::ImageRef;
use async_trait::async_trait;

/// Read-only image queries the upgrade pre-flight check relies on.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// List local images whose reference matches exactly.
    async fn list_images(&self, reference: &ImageRef) -> Result<Vec<ImageSummary>, ImageError>;

    /// Ask the registry for the distribution manifest of an image.
    async fn inspect_distribution(
        &self,
        reference: &ImageRef,
    ) -> Result<DistributionInfo, ImageError>;
}

/// A locally cached image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub id: String,
    pub repo_tags: Vec<String>,
}

/// Registry-side view of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionInfo {
    pub digest: Option<String>,
    pub platforms: usize,
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("authentication failed for registry: {0}")]
    AuthenticationFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
