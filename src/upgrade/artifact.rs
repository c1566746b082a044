// ABOUTME: Generates the upgrade stack: renders the template and stores the compose file.
// ABOUTME: Stack and file names are derived from the clock and the target version.

use serde::Serialize;
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::{RenderTemplateSnafu, StoreArtifactSnafu, UpgradeError};
use super::template::{UpgradeParameters, UpgradeTemplate};
use crate::clock::{Clock, SystemClock};
use crate::storage::FileStore;

/// Directory under the assets root holding mustache templates.
pub const TEMPLATES_DIR: &str = "mustache-templates";

/// Template for the Docker standalone and Swarm upgrade stack.
pub const UPGRADE_DOCKER_TEMPLATE: &str = "upgrade-docker.yml.mustache";

/// Storage category for generated upgrade stacks.
pub const STACK_CATEGORY: &str = "upgrade";

/// A generated, stored upgrade stack ready to hand to a deployer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stack {
    pub name: String,
    /// Directory holding the compose file.
    pub project_path: PathBuf,
    /// Compose file name inside `project_path`.
    pub entry_point: String,
}

impl Stack {
    pub fn file_path(&self) -> PathBuf {
        self.project_path.join(&self.entry_point)
    }
}

/// `upgrade-<unix seconds>.yml`
pub fn stack_file_name(timestamp: i64) -> String {
    format!("upgrade-{timestamp}.yml")
}

/// `portainer-upgrade-<unix seconds>-<version with dots as dashes>`
pub fn stack_name(timestamp: i64, version: &str) -> String {
    format!(
        "portainer-upgrade-{}-{}",
        timestamp,
        version.replace('.', "-")
    )
}

pub struct ArtifactGenerator {
    assets_path: PathBuf,
    store: Arc<dyn FileStore>,
    clock: Arc<dyn Clock>,
}

impl ArtifactGenerator {
    pub fn new(assets_path: impl Into<PathBuf>, store: Arc<dyn FileStore>) -> Self {
        Self {
            assets_path: assets_path.into(),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn template_path(&self) -> PathBuf {
        self.assets_path
            .join(TEMPLATES_DIR)
            .join(UPGRADE_DOCKER_TEMPLATE)
    }

    /// Render the compose document without storing it.
    pub async fn render(&self, parameters: &UpgradeParameters) -> Result<String, UpgradeError> {
        let template = UpgradeTemplate::load(&self.template_path())
            .await
            .context(RenderTemplateSnafu)?;
        template.render(parameters).context(RenderTemplateSnafu)
    }

    /// Render, store, and describe the upgrade stack.
    pub async fn generate(&self, parameters: &UpgradeParameters) -> Result<Stack, UpgradeError> {
        let compose = self.render(parameters).await?;
        tracing::debug!(bytes = compose.len(), "Rendered upgrade compose file");

        let timestamp = self.clock.now().timestamp();
        let file_name = stack_file_name(timestamp);

        let project_path = self
            .store
            .store_stack_file(STACK_CATEGORY, &file_name, compose.as_bytes())
            .await
            .context(StoreArtifactSnafu)?;

        let stack = Stack {
            name: stack_name(timestamp, &parameters.version),
            project_path,
            entry_point: file_name,
        };
        tracing::info!(
            stack = %stack.name,
            path = %stack.file_path().display(),
            "Generated upgrade stack"
        );

        Ok(stack)
    }

    /// Remove a stack file that will not be deployed. Failures are only logged.
    pub async fn discard(&self, stack: &Stack) {
        if let Err(e) = self
            .store
            .remove_stack_file(&stack.project_path, &stack.entry_point)
            .await
        {
            tracing::warn!(stack = %stack.name, "Failed to remove upgrade stack file: {}", e);
        }
    }
}
