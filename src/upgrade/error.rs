// ABOUTME: Upgrade error types with the SNAFU pattern.
// ABOUTME: Each variant names the failed action and keeps the underlying cause.

use snafu::Snafu;
use std::time::Duration;

use super::deployer::DeployError;
use super::guard::UpgradeInfo;
use super::kubernetes::KubernetesError;
use super::template::TemplateError;
use crate::runtime::{ConnectionError, ImageError};
use crate::storage::StoreError;
use crate::types::ParseImageRefError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum UpgradeError {
    #[snafu(display("unsupported platform {platform}"))]
    UnsupportedPlatform { platform: String },

    #[snafu(display("kubernetes upgrades are not configured"))]
    KubernetesUnavailable,

    #[snafu(display(
        "upgrade already in progress for {} (started on {} pid {} at {})",
        info.environment, info.holder, info.pid, info.started_at
    ))]
    InProgress { info: UpgradeInfo },

    #[snafu(display("invalid image reference {reference}: {source}"))]
    InvalidImage {
        reference: String,
        source: ParseImageRefError,
    },

    #[snafu(display("failed to create docker client: {source}"))]
    CreateClient { source: ConnectionError },

    #[snafu(display("failed to list images: {source}"))]
    ListImages { source: ImageError },

    #[snafu(display("image {image} not found locally"))]
    ImageNotFoundLocally { image: String },

    #[snafu(display("image {image} not found on registry: {source}"))]
    ImageNotFoundOnRegistry { image: String, source: ImageError },

    #[snafu(display("checking image {image} timed out after {timeout:?}"))]
    CheckTimeout { image: String, timeout: Duration },

    #[snafu(display("failed to render upgrade template: {source}"))]
    RenderTemplate { source: TemplateError },

    #[snafu(display("failed to create upgrade compose file: {source}"))]
    StoreArtifact { source: StoreError },

    #[snafu(display("failed to deploy upgrade stack {stack}: {source}"))]
    DeployStack { stack: String, source: DeployError },

    #[snafu(display("failed to upgrade kubernetes environment: {source}"))]
    KubernetesUpgrade { source: KubernetesError },

    #[snafu(display("upgrade cancelled"))]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeErrorKind {
    /// The request itself is not acceptable (platform, image override).
    Validation,
    /// Another upgrade holds the in-flight guard.
    InProgress,
    /// The agent image is not obtainable.
    PreFlight,
    /// Rendering or storing the stack file failed.
    ArtifactGeneration,
    /// The deployer or the Kubernetes path failed.
    Deployment,
    /// The caller cancelled the upgrade.
    Cancelled,
}

impl UpgradeError {
    pub fn kind(&self) -> UpgradeErrorKind {
        match self {
            UpgradeError::UnsupportedPlatform { .. }
            | UpgradeError::KubernetesUnavailable
            | UpgradeError::InvalidImage { .. } => UpgradeErrorKind::Validation,
            UpgradeError::InProgress { .. } => UpgradeErrorKind::InProgress,
            UpgradeError::CreateClient { .. }
            | UpgradeError::ListImages { .. }
            | UpgradeError::ImageNotFoundLocally { .. }
            | UpgradeError::ImageNotFoundOnRegistry { .. }
            | UpgradeError::CheckTimeout { .. } => UpgradeErrorKind::PreFlight,
            UpgradeError::RenderTemplate { .. } | UpgradeError::StoreArtifact { .. } => {
                UpgradeErrorKind::ArtifactGeneration
            }
            UpgradeError::DeployStack { .. } | UpgradeError::KubernetesUpgrade { .. } => {
                UpgradeErrorKind::Deployment
            }
            UpgradeError::Cancelled => UpgradeErrorKind::Cancelled,
        }
    }

    /// Holder of the in-flight guard when the upgrade was rejected as concurrent.
    pub fn in_progress_info(&self) -> Option<&UpgradeInfo> {
        match self {
            UpgradeError::InProgress { info } => Some(info),
            _ => None,
        }
    }
}
