// ABOUTME: Test support utilities.
// ABOUTME: Recording fakes for the runtime client, file store, deployer and Kubernetes path.

use async_trait::async_trait;
use parking_lot::Mutex;
use portainer_upgrade::clock::FixedClock;
use portainer_upgrade::config::{ImageOverrides, UpgradeConfig};
use portainer_upgrade::environment::{Environment, Registry};
use portainer_upgrade::runtime::{
    ClientFactory, ConnectionError, DistributionInfo, ImageError, ImageInspector, ImageSummary,
};
use portainer_upgrade::storage::{FileStore, StoreError};
use portainer_upgrade::types::{ContainerPlatform, ImageRef};
use portainer_upgrade::upgrade::{
    DeployError, DeployOptions, KubernetesError, KubernetesUpgrader, Stack, StackDeployer,
    UpgradeService,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("portainer_upgrade=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const VERSION: &str = "2.19.0";
pub const NOW: i64 = 1_700_000_000;

/// Assets shipped with the crate.
pub fn assets_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

pub fn config() -> UpgradeConfig {
    UpgradeConfig {
        assets_path: assets_path(),
        data_path: PathBuf::from("/data"),
        version: VERSION.to_string(),
        check_timeout: Duration::from_secs(5),
        overrides: ImageOverrides::default(),
    }
}

pub fn skip_pull_config() -> UpgradeConfig {
    UpgradeConfig {
        overrides: ImageOverrides {
            skip_pull: Some("1".to_string()),
            ..Default::default()
        },
        ..config()
    }
}

pub fn environment(platform: ContainerPlatform) -> Environment {
    Environment::new(3, "edge-01", "tcp://10.0.0.4:2375", platform)
}

/// The updater's command list from a rendered compose file.
#[allow(dead_code)]
pub fn updater_command(compose: &str) -> Vec<String> {
    let doc: serde_yaml::Value = serde_yaml::from_str(compose).unwrap();
    doc["services"]["updater"]["command"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|arg| arg.as_str().unwrap().to_string())
        .collect()
}

/// Value following `flag` in the updater's command list.
#[allow(dead_code)]
pub fn updater_arg(compose: &str, flag: &str) -> Option<String> {
    let command = updater_command(compose);
    let at = command.iter().position(|arg| arg == flag)?;
    command.get(at + 1).cloned()
}

/// The updater's image from a rendered compose file.
#[allow(dead_code)]
pub fn updater_image(compose: &str) -> String {
    let doc: serde_yaml::Value = serde_yaml::from_str(compose).unwrap();
    doc["services"]["updater"]["image"].as_str().unwrap().to_string()
}

// =============================================================================
// Runtime client
// =============================================================================

/// Answers image queries from fixed lists and records every call.
#[derive(Default)]
pub struct FakeClients {
    local: Vec<String>,
    registry: Vec<String>,
    fail_connect: bool,
    gate: Option<Arc<Notify>>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl FakeClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, references: &[&str]) -> Self {
        self.local = references.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_registry(mut self, references: &[&str]) -> Self {
        self.registry = references.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Image queries wait until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ClientFactory for FakeClients {
    async fn create_client(
        &self,
        environment: &Environment,
    ) -> Result<Arc<dyn ImageInspector>, ConnectionError> {
        self.calls.lock().push(format!("connect:{}", environment.name));
        if self.fail_connect {
            return Err(ConnectionError::Failed("connection refused".to_string()));
        }
        Ok(Arc::new(FakeInspector {
            local: self.local.clone(),
            registry: self.registry.clone(),
            gate: self.gate.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct FakeInspector {
    local: Vec<String>,
    registry: Vec<String>,
    gate: Option<Arc<Notify>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeInspector {
    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl ImageInspector for FakeInspector {
    async fn list_images(&self, reference: &ImageRef) -> Result<Vec<ImageSummary>, ImageError> {
        self.calls.lock().push(format!("list:{reference}"));
        self.wait_for_gate().await;
        let reference = reference.to_string();
        Ok(self
            .local
            .iter()
            .filter(|r| **r == reference)
            .map(|r| ImageSummary {
                id: format!("sha256:{}", r.len()),
                repo_tags: vec![r.clone()],
            })
            .collect())
    }

    async fn inspect_distribution(
        &self,
        reference: &ImageRef,
    ) -> Result<DistributionInfo, ImageError> {
        self.calls.lock().push(format!("inspect:{reference}"));
        self.wait_for_gate().await;
        let reference = reference.to_string();
        if self.registry.contains(&reference) {
            Ok(DistributionInfo {
                digest: Some("sha256:feedface".to_string()),
                platforms: 2,
            })
        } else {
            Err(ImageError::NotFound(reference))
        }
    }
}

// =============================================================================
// File store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub category: String,
    pub file_name: String,
    pub content: String,
}

#[derive(Default)]
pub struct FakeStore {
    stored: Mutex<Vec<StoredFile>>,
    removed: Mutex<Vec<PathBuf>>,
    fail: bool,
    cancel_on_store: Option<CancellationToken>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Cancel `token` as soon as a file is stored.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_store: Some(token),
            ..Default::default()
        }
    }

    pub fn stored(&self) -> Vec<StoredFile> {
        self.stored.lock().clone()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl FileStore for FakeStore {
    async fn store_stack_file(
        &self,
        category: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let project_path = PathBuf::from("/data/compose").join(category);
        if self.fail {
            return Err(StoreError::Write {
                path: project_path.join(file_name),
                source: std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"),
            });
        }
        self.stored.lock().push(StoredFile {
            category: category.to_string(),
            file_name: file_name.to_string(),
            content: String::from_utf8_lossy(content).into_owned(),
        });
        if let Some(token) = &self.cancel_on_store {
            token.cancel();
        }
        Ok(project_path)
    }

    async fn remove_stack_file(
        &self,
        project_path: &Path,
        file_name: &str,
    ) -> Result<(), StoreError> {
        self.removed.lock().push(project_path.join(file_name));
        Ok(())
    }
}

// =============================================================================
// Deployer
// =============================================================================

#[derive(Debug, Clone)]
pub struct DeployCall {
    pub stack: Stack,
    pub environment: String,
    pub registries: Vec<Registry>,
    pub options: DeployOptions,
}

#[derive(Default)]
pub struct FakeDeployer {
    calls: Mutex<Vec<DeployCall>>,
    fail: bool,
}

#[allow(dead_code)]
impl FakeDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<DeployCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl StackDeployer for FakeDeployer {
    async fn deploy_compose_stack(
        &self,
        stack: &Stack,
        environment: &Environment,
        registries: &[Registry],
        options: DeployOptions,
    ) -> Result<(), DeployError> {
        self.calls.lock().push(DeployCall {
            stack: stack.clone(),
            environment: environment.name.clone(),
            registries: registries.to_vec(),
            options,
        });
        if self.fail {
            return Err(DeployError::Failed {
                code: Some(1),
                stderr: "pull access denied".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Kubernetes
// =============================================================================

#[derive(Default)]
pub struct FakeKubernetes {
    calls: Mutex<Vec<(String, String, String)>>,
}

#[allow(dead_code)]
impl FakeKubernetes {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KubernetesUpgrader for FakeKubernetes {
    async fn upgrade(
        &self,
        environment: &Environment,
        license_key: &str,
        version: &str,
    ) -> Result<(), KubernetesError> {
        self.calls.lock().push((
            environment.name.clone(),
            license_key.to_string(),
            version.to_string(),
        ));
        Ok(())
    }
}

// =============================================================================
// Service
// =============================================================================

/// Collaborators wired into a service under test.
pub struct Harness {
    pub clients: Arc<FakeClients>,
    pub store: Arc<FakeStore>,
    pub deployer: Arc<FakeDeployer>,
    pub kubernetes: Arc<FakeKubernetes>,
    pub service: Arc<UpgradeService>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: UpgradeConfig, clients: FakeClients) -> Self {
        Self::with(config, clients, FakeStore::new(), FakeDeployer::new())
    }

    pub fn with(
        config: UpgradeConfig,
        clients: FakeClients,
        store: FakeStore,
        deployer: FakeDeployer,
    ) -> Self {
        let clients = Arc::new(clients);
        let store = Arc::new(store);
        let deployer = Arc::new(deployer);
        let kubernetes = Arc::new(FakeKubernetes::default());
        let service = UpgradeService::new(
            config,
            clients.clone(),
            store.clone(),
            deployer.clone(),
        )
        .with_kubernetes(kubernetes.clone())
        .with_clock(Arc::new(FixedClock::from_unix(NOW)));

        Self {
            clients,
            store,
            deployer,
            kubernetes,
            service: Arc::new(service),
        }
    }

    /// True when no collaborator has been touched.
    pub fn untouched(&self) -> bool {
        self.clients.calls().is_empty()
            && self.store.stored().is_empty()
            && self.deployer.calls().is_empty()
            && self.kubernetes.calls().is_empty()
    }
}
