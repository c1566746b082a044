// ABOUTME: Managed environment handle consumed by the upgrade service.
// ABOUTME: Connection URL, platform kind and the registries attached to it.

use serde::{Deserialize, Serialize};

use crate::types::ContainerPlatform;

/// A registered container platform instance the upgrade acts upon.
///
/// The service only reads it; connection details are handed to the client
/// factory and the deployer as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: u32,
    pub name: String,
    /// Runtime endpoint, e.g. `unix:///var/run/docker.sock` or `tcp://10.0.0.4:2375`.
    pub url: String,
    pub platform: ContainerPlatform,
    #[serde(default)]
    pub registries: Vec<Registry>,
}

impl Environment {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        url: impl Into<String>,
        platform: ContainerPlatform,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
            platform,
            registries: Vec::new(),
        }
    }

    /// The local Docker socket, used when no endpoint is given.
    pub fn local(platform: ContainerPlatform) -> Self {
        Self::new(1, "local", LOCAL_DOCKER_URL, platform)
    }
}

pub const LOCAL_DOCKER_URL: &str = "unix:///var/run/docker.sock";

/// A container registry associated with an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub id: u32,
    pub name: String,
    pub url: String,
}
