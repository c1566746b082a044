// ABOUTME: Pre-flight check that the agent image can be obtained before upgrading.
// ABOUTME: Looks at the local image cache when pulls are skipped, the registry otherwise.

use snafu::{ResultExt, ensure};

use super::error::{
    CreateClientSnafu, ImageNotFoundLocallySnafu, ImageNotFoundOnRegistrySnafu, ListImagesSnafu,
    UpgradeError,
};
use crate::environment::Environment;
use crate::runtime::ClientFactory;
use crate::types::ImageRef;

/// Verify that `image` is available to the environment.
///
/// With `skip_pull` the image must already be cached on the host, since nothing
/// will pull it. Otherwise the registry must serve its distribution manifest.
/// Nothing is reserved, so the image can still disappear before it is used.
pub async fn check_image(
    clients: &dyn ClientFactory,
    environment: &Environment,
    image: &ImageRef,
    skip_pull: bool,
) -> Result<(), UpgradeError> {
    let client = clients
        .create_client(environment)
        .await
        .context(CreateClientSnafu)?;

    if skip_pull {
        tracing::debug!(%image, "Checking image in local cache");
        let images = client.list_images(image).await.context(ListImagesSnafu)?;
        ensure!(
            !images.is_empty(),
            ImageNotFoundLocallySnafu {
                image: image.to_string()
            }
        );
        return Ok(());
    }

    tracing::debug!(%image, "Checking image on registry");
    let distribution = client
        .inspect_distribution(image)
        .await
        .context(ImageNotFoundOnRegistrySnafu {
            image: image.to_string(),
        })?;
    tracing::debug!(
        %image,
        digest = distribution.digest.as_deref().unwrap_or("unknown"),
        "Image available on registry"
    );

    Ok(())
}
