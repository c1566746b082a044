// ABOUTME: Resolves the agent and updater image references for an upgrade.
// ABOUTME: Applies configured overrides on top of the vendor defaults.

use snafu::ResultExt;

use super::error::{InvalidImageSnafu, UpgradeError};
use crate::config::ImageOverrides;
use crate::types::ImageRef;

pub const DEFAULT_IMAGE_PREFIX: &str = "portainer/portainer-ee";
pub const DEFAULT_UPDATER_IMAGE: &str = "portainer/portainer-updater:latest";

/// Images and pull policy for one upgrade attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImages {
    pub agent: ImageRef,
    pub updater: ImageRef,
    pub skip_pull: bool,
}

pub fn resolve_images(
    overrides: &ImageOverrides,
    version: &str,
) -> Result<ResolvedImages, UpgradeError> {
    Ok(ResolvedImages {
        agent: agent_image(overrides, version)?,
        updater: updater_image(overrides)?,
        skip_pull: overrides.skip_pull(),
    })
}

/// `<prefix>:<version>` with the prefix overridable for pre-release builds.
pub fn agent_image(overrides: &ImageOverrides, version: &str) -> Result<ImageRef, UpgradeError> {
    let prefix = overrides.image_prefix().unwrap_or(DEFAULT_IMAGE_PREFIX);
    ImageRef::tagged(prefix, version).context(InvalidImageSnafu {
        reference: format!("{prefix}:{version}"),
    })
}

pub fn updater_image(overrides: &ImageOverrides) -> Result<ImageRef, UpgradeError> {
    let reference = overrides.updater_image().unwrap_or(DEFAULT_UPDATER_IMAGE);
    ImageRef::parse(reference).context(InvalidImageSnafu { reference })
}
