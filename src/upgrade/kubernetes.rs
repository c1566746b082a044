// ABOUTME: Kubernetes upgrade path seam.
// ABOUTME: Same contract shape as the Docker path; manifests and apply are the implementor's.

use async_trait::async_trait;

use crate::environment::Environment;

#[async_trait]
pub trait KubernetesUpgrader: Send + Sync {
    /// Replace the agent running in the cluster with `version`.
    async fn upgrade(
        &self,
        environment: &Environment,
        license_key: &str,
        version: &str,
    ) -> Result<(), KubernetesError>;
}

#[derive(Debug, thiserror::Error)]
pub enum KubernetesError {
    #[error("failed to create kubernetes client: {0}")]
    Client(String),

    #[error("failed to apply upgrade manifest: {0}")]
    Apply(String),
}
