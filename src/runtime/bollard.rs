// ABOUTME: Bollard-based runtime client used by the pre-flight image check.
// ABOUTME: Works against Docker and Podman via the Docker-compatible API.

use crate::environment::Environment;
use crate::runtime::traits::{
    ClientFactory, ConnectionError, DistributionInfo, ImageError, ImageInspector, ImageSummary,
};
use crate::runtime::types::Endpoint;
use crate::types::ImageRef;
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::ListImagesOptions;
use std::collections::HashMap;
use std::sync::Arc;

/// Seconds before a request to the runtime API is abandoned.
const CLIENT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_list_images_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    ImageError::Runtime(format!("failed to list {}: {}", image_name, e))
}

fn map_distribution_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 401 || *status_code == 403 => {
            ImageError::AuthenticationFailed(message.clone())
        }
        _ => ImageError::Runtime(format!("failed to inspect {}: {}", image_name, e)),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Runtime client implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to the runtime API behind an endpoint.
    pub fn connect(endpoint: Endpoint) -> Result<Self, ConnectionError> {
        let client = match &endpoint {
            Endpoint::Unix(path) => {
                Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            Endpoint::Http(addr) => {
                Docker::connect_with_http(addr, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| ConnectionError::Failed(format!("{}: {}", endpoint, e)))?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl ImageInspector for BollardRuntime {
    async fn list_images(&self, reference: &ImageRef) -> Result<Vec<ImageSummary>, ImageError> {
        let image_name = reference.to_string();

        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("reference".to_string(), vec![image_name.clone()]);

        let opts = ListImagesOptions {
            filters: Some(filters),
            ..Default::default()
        };

        let images = self
            .client
            .list_images(Some(opts))
            .await
            .map_err(|e| map_list_images_error(e, &image_name))?;

        Ok(images
            .into_iter()
            .map(|image| ImageSummary {
                id: image.id,
                repo_tags: image.repo_tags,
            })
            .collect())
    }

    async fn inspect_distribution(
        &self,
        reference: &ImageRef,
    ) -> Result<DistributionInfo, ImageError> {
        let image_name = reference.to_string();

        let inspect = self
            .client
            .inspect_registry_image(&image_name, None)
            .await
            .map_err(|e| map_distribution_error(e, &image_name))?;

        Ok(DistributionInfo {
            digest: inspect.descriptor.digest,
            platforms: inspect.platforms.len(),
        })
    }
}

/// Creates a [`BollardRuntime`] for each environment from its URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollardClientFactory;

#[async_trait]
impl ClientFactory for BollardClientFactory {
    async fn create_client(
        &self,
        environment: &Environment,
    ) -> Result<Arc<dyn ImageInspector>, ConnectionError> {
        let endpoint = Endpoint::parse(&environment.url)?;
        tracing::debug!(
            environment = %environment.name,
            endpoint = %endpoint,
            "Connecting to container runtime"
        );
        let runtime = BollardRuntime::connect(endpoint)?;
        Ok(Arc::new(runtime))
    }
}
