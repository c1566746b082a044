// ABOUTME: Container platform and environment type tags used for dispatch.
// ABOUTME: Closed enums so adding a platform forces every match to be updated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePlatformError {
    #[error("unsupported platform {0}")]
    Unsupported(String),
}

/// The container platform an environment runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerPlatform {
    DockerStandalone,
    DockerSwarm,
    Kubernetes,
}

impl ContainerPlatform {
    pub const ALL: [ContainerPlatform; 3] = [
        ContainerPlatform::DockerStandalone,
        ContainerPlatform::DockerSwarm,
        ContainerPlatform::Kubernetes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerPlatform::DockerStandalone => "docker-standalone",
            ContainerPlatform::DockerSwarm => "docker-swarm",
            ContainerPlatform::Kubernetes => "kubernetes",
        }
    }

    /// Environment type tag passed to the updater, `None` for Kubernetes
    /// which tags its own manifests.
    pub fn environment_type(&self) -> Option<EnvironmentType> {
        match self {
            ContainerPlatform::DockerStandalone => Some(EnvironmentType::Standalone),
            ContainerPlatform::DockerSwarm => Some(EnvironmentType::Swarm),
            ContainerPlatform::Kubernetes => None,
        }
    }
}

impl fmt::Display for ContainerPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerPlatform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParsePlatformError::Unsupported(s.to_string()))
    }
}

/// Docker environment flavour rendered into the updater manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Standalone,
    Swarm,
}

impl EnvironmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::Standalone => "standalone",
            EnvironmentType::Swarm => "swarm",
        }
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentType {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(EnvironmentType::Standalone),
            "swarm" => Ok(EnvironmentType::Swarm),
            other => Err(ParsePlatformError::Unsupported(other.to_string())),
        }
    }
}
