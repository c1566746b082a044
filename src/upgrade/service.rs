// ABOUTME: Upgrade service: dispatches by platform and sequences check, generate, deploy.
// ABOUTME: Rejects concurrent upgrades and honours cancellation between steps.

use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::artifact::ArtifactGenerator;
use super::check::check_image;
use super::deployer::{DeployOptions, StackDeployer};
use super::error::{
    CancelledSnafu, CheckTimeoutSnafu, DeployStackSnafu, InProgressSnafu,
    KubernetesUnavailableSnafu, KubernetesUpgradeSnafu, UnsupportedPlatformSnafu, UpgradeError,
};
use super::guard::{UpgradeInfo, UpgradeState};
use super::images::resolve_images;
use super::kubernetes::KubernetesUpgrader;
use super::template::UpgradeParameters;
use crate::clock::{Clock, SystemClock};
use crate::config::UpgradeConfig;
use crate::environment::Environment;
use crate::runtime::ClientFactory;
use crate::storage::FileStore;
use crate::types::{ContainerPlatform, EnvironmentType};

/// Entry point for in-place agent upgrades.
///
/// One upgrade runs at a time per service instance; the in-flight marker is
/// cleared when the call returns, whatever the outcome.
pub struct UpgradeService {
    config: UpgradeConfig,
    clients: Arc<dyn ClientFactory>,
    generator: ArtifactGenerator,
    deployer: Arc<dyn StackDeployer>,
    kubernetes: Option<Arc<dyn KubernetesUpgrader>>,
    clock: Arc<dyn Clock>,
    state: UpgradeState,
}

impl UpgradeService {
    pub fn new(
        config: UpgradeConfig,
        clients: Arc<dyn ClientFactory>,
        store: Arc<dyn FileStore>,
        deployer: Arc<dyn StackDeployer>,
    ) -> Self {
        let generator = ArtifactGenerator::new(config.assets_path.clone(), store);
        Self {
            config,
            clients,
            generator,
            deployer,
            kubernetes: None,
            clock: Arc::new(SystemClock),
            state: UpgradeState::new(),
        }
    }

    pub fn with_kubernetes(mut self, kubernetes: Arc<dyn KubernetesUpgrader>) -> Self {
        self.kubernetes = Some(kubernetes);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.generator = self.generator.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    pub fn is_updating(&self) -> bool {
        self.state.is_updating()
    }

    pub fn current_upgrade(&self) -> Option<UpgradeInfo> {
        self.state.current()
    }

    /// Upgrade by platform wire name, rejecting unknown platforms up front.
    pub async fn upgrade_by_name(
        &self,
        platform: &str,
        environment: &Environment,
        license_key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), UpgradeError> {
        let platform = platform
            .parse::<ContainerPlatform>()
            .ok()
            .context(UnsupportedPlatformSnafu { platform })?;
        self.upgrade(platform, environment, license_key, cancel)
            .await
    }

    pub async fn upgrade(
        &self,
        platform: ContainerPlatform,
        environment: &Environment,
        license_key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), UpgradeError> {
        let info = UpgradeInfo::new(platform, environment, self.clock.now());
        let _guard = match self.state.try_begin(info) {
            Ok(guard) => guard,
            Err(holder) => return InProgressSnafu { info: holder }.fail(),
        };

        tracing::info!(
            %platform,
            environment = %environment.name,
            version = %self.config.version,
            "Starting upgrade process"
        );

        let version = self.config.version.as_str();
        let result = match platform.environment_type() {
            Some(env_type) => {
                self.upgrade_docker(environment, license_key, version, env_type, cancel)
                    .await
            }
            None => {
                self.upgrade_kubernetes(environment, license_key, version, cancel)
                    .await
            }
        };

        match &result {
            Ok(()) => tracing::info!(%platform, environment = %environment.name, "Upgrade handed off"),
            Err(e) => tracing::warn!(%platform, environment = %environment.name, "Upgrade failed: {}", e),
        }
        result
    }

    async fn upgrade_docker(
        &self,
        environment: &Environment,
        license_key: &str,
        version: &str,
        env_type: EnvironmentType,
        cancel: &CancellationToken,
    ) -> Result<(), UpgradeError> {
        let images = resolve_images(&self.config.overrides, version)?;
        tracing::debug!(
            agent = %images.agent,
            updater = %images.updater,
            skip_pull = images.skip_pull,
            "Resolved upgrade images"
        );

        let timeout = self.config.check_timeout;
        let check = check_image(
            self.clients.as_ref(),
            environment,
            &images.agent,
            images.skip_pull,
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return CancelledSnafu.fail(),
            checked = tokio::time::timeout(timeout, check) => match checked {
                Ok(result) => result?,
                Err(_) => {
                    return CheckTimeoutSnafu {
                        image: images.agent.to_string(),
                        timeout,
                    }
                    .fail();
                }
            },
        }

        if cancel.is_cancelled() {
            return CancelledSnafu.fail();
        }

        let parameters = UpgradeParameters {
            image: images.agent,
            skip_pull_image: images.skip_pull,
            updater_image: images.updater,
            license: license_key.to_string(),
            env_type,
            version: version.to_string(),
        };
        let stack = self.generator.generate(&parameters).await?;

        if cancel.is_cancelled() {
            self.generator.discard(&stack).await;
            return CancelledSnafu.fail();
        }

        let options = DeployOptions {
            detach: true,
            pull_image: !images.skip_pull,
        };
        self.deployer
            .deploy_compose_stack(&stack, environment, &[], options)
            .await
            .context(DeployStackSnafu {
                stack: stack.name.clone(),
            })
            .inspect_err(|_| {
                tracing::warn!(
                    path = %stack.file_path().display(),
                    "Keeping upgrade stack file for inspection"
                );
            })
    }

    async fn upgrade_kubernetes(
        &self,
        environment: &Environment,
        license_key: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<(), UpgradeError> {
        let kubernetes = self
            .kubernetes
            .as_ref()
            .context(KubernetesUnavailableSnafu)?;

        if cancel.is_cancelled() {
            return CancelledSnafu.fail();
        }

        kubernetes
            .upgrade(environment, license_key, version)
            .await
            .context(KubernetesUpgradeSnafu)
    }
}
