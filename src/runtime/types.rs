// ABOUTME: Runtime endpoint parsing from environment URLs.
// ABOUTME: Distinguishes Unix socket endpoints from TCP/HTTP endpoints.

use super::traits::ConnectionError;
use std::fmt;

/// How to reach the Docker-compatible API of an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path to a Unix socket.
    Unix(String),
    /// `host:port` of a plain HTTP API.
    Http(String),
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, ConnectionError> {
        let url = url.trim();
        if let Some(path) = url.strip_prefix("unix://") {
            return non_empty(path, url).map(|p| Endpoint::Unix(p.to_string()));
        }
        if url.starts_with('/') {
            return Ok(Endpoint::Unix(url.to_string()));
        }
        if let Some(addr) = url
            .strip_prefix("tcp://")
            .or_else(|| url.strip_prefix("http://"))
        {
            let addr = addr.trim_end_matches('/');
            return non_empty(addr, url).map(|a| Endpoint::Http(a.to_string()));
        }
        Err(ConnectionError::UnsupportedUrl(url.to_string()))
    }

    /// Value suitable for `DOCKER_HOST`.
    pub fn docker_host(&self) -> String {
        self.to_string()
    }
}

fn non_empty<'a>(value: &'a str, url: &str) -> Result<&'a str, ConnectionError> {
    if value.is_empty() {
        Err(ConnectionError::UnsupportedUrl(url.to_string()))
    } else {
        Ok(value)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{path}"),
            Endpoint::Http(addr) => write!(f, "tcp://{addr}"),
        }
    }
}
