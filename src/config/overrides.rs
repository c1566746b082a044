// ABOUTME: Image override values read from environment variables.
// ABOUTME: Keeps raw values so absent, empty and set can be told apart.

use serde::Deserialize;

/// Overrides the agent image repository, useful for testing PR builds.
pub const IMAGE_PREFIX_ENV: &str = "UPGRADE_PORTAINER_IMAGE_PREFIX";

/// Overrides the updater image reference.
pub const UPDATER_IMAGE_ENV: &str = "UPGRADE_UPDATER_IMAGE";

/// Any non-empty value disables pulling and requires the image to exist locally.
pub const SKIP_PULL_ENV: &str = "UPGRADE_SKIP_PULL_PORTAINER_IMAGE";

/// Raw override values.
///
/// `None` means the override was never given. `Some("")` is kept as-is and
/// treated like absence by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageOverrides {
    #[serde(default)]
    pub image_prefix: Option<String>,
    #[serde(default)]
    pub updater_image: Option<String>,
    #[serde(default)]
    pub skip_pull: Option<String>,
}

impl ImageOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            image_prefix: lookup(IMAGE_PREFIX_ENV),
            updater_image: lookup(UPDATER_IMAGE_ENV),
            skip_pull: lookup(SKIP_PULL_ENV),
        }
    }

    /// Non-empty values in `other` replace ours; empty ones count as unset.
    pub fn merged_with(self, other: ImageOverrides) -> Self {
        Self {
            image_prefix: set(other.image_prefix).or(self.image_prefix),
            updater_image: set(other.updater_image).or(self.updater_image),
            skip_pull: set(other.skip_pull).or(self.skip_pull),
        }
    }

    pub fn image_prefix(&self) -> Option<&str> {
        non_empty(self.image_prefix.as_deref())
    }

    pub fn updater_image(&self) -> Option<&str> {
        non_empty(self.updater_image.as_deref())
    }

    pub fn skip_pull(&self) -> bool {
        non_empty(self.skip_pull.as_deref()).is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn set(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
