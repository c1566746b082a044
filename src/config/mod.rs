// ABOUTME: Upgrade service configuration, built once at startup.
// ABOUTME: Handles YAML parsing, defaults, and environment variable overrides.

mod overrides;

pub use overrides::{IMAGE_PREFIX_ENV, ImageOverrides, SKIP_PULL_ENV, UPDATER_IMAGE_ENV};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "upgrade.yml";
pub const CONFIG_FILENAME_ALT: &str = "upgrade.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".portainer/upgrade.yml";

/// Version of the running build; the upgrade targets the agent image tagged with it.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeConfig {
    /// Root holding `mustache-templates/`.
    #[serde(default = "default_assets_path")]
    pub assets_path: PathBuf,

    /// Root under which generated stack files are stored.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    #[serde(default = "default_version")]
    pub version: String,

    /// Upper bound on the pre-flight image check.
    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub check_timeout: Duration,

    #[serde(default, rename = "images")]
    pub overrides: ImageOverrides,
}

fn default_assets_path() -> PathBuf {
    PathBuf::from("assets")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            assets_path: default_assets_path(),
            data_path: default_data_path(),
            version: default_version(),
            check_timeout: default_check_timeout(),
            overrides: ImageOverrides::default(),
        }
    }
}

impl UpgradeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Apply the process environment on top of file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(ImageOverrides::from_env())
    }

    pub fn with_overrides(mut self, overrides: ImageOverrides) -> Self {
        self.overrides = self.overrides.merged_with(overrides);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::InvalidConfig("version cannot be empty".to_string()));
        }
        if self.check_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "check_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
