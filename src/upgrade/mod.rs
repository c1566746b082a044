// ABOUTME: In-place agent upgrade orchestration.
// ABOUTME: Image resolution, pre-flight check, stack generation and deployment handoff.

mod artifact;
mod check;
mod deployer;
mod error;
mod guard;
mod images;
mod kubernetes;
mod service;
mod template;

pub use artifact::{
    ArtifactGenerator, STACK_CATEGORY, Stack, TEMPLATES_DIR, UPGRADE_DOCKER_TEMPLATE,
    stack_file_name, stack_name,
};
pub use check::check_image;
pub use deployer::{ComposeDeployer, DeployError, DeployOptions, StackDeployer};
pub use error::{UpgradeError, UpgradeErrorKind};
pub use guard::{UpgradeGuard, UpgradeInfo, UpgradeState};
pub use images::{
    DEFAULT_IMAGE_PREFIX, DEFAULT_UPDATER_IMAGE, ResolvedImages, agent_image, resolve_images,
    updater_image,
};
pub use kubernetes::{KubernetesError, KubernetesUpgrader};
pub use service::UpgradeService;
pub use template::{TemplateError, UpgradeParameters, UpgradeTemplate, placeholders};
