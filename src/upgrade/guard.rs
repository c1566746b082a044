// ABOUTME: In-flight upgrade guard allowing one upgrade per process at a time.
// ABOUTME: The guard clears the state on drop, so every exit path releases it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::environment::Environment;
use crate::types::ContainerPlatform;

/// Who started the upgrade currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeInfo {
    /// Hostname of the process running the upgrade.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub platform: ContainerPlatform,
    pub environment: String,
}

impl UpgradeInfo {
    pub fn new(
        platform: ContainerPlatform,
        environment: &Environment,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at,
            platform,
            environment: environment.name.clone(),
        }
    }
}

/// Guarded "is updating" cell.
#[derive(Debug, Default)]
pub struct UpgradeState {
    current: Mutex<Option<UpgradeInfo>>,
}

impl UpgradeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an upgrade as started, or return the info of the one already running.
    pub fn try_begin(&self, info: UpgradeInfo) -> Result<UpgradeGuard<'_>, UpgradeInfo> {
        let mut current = self.current.lock();
        if let Some(existing) = current.as_ref() {
            return Err(existing.clone());
        }
        *current = Some(info);
        Ok(UpgradeGuard { state: self })
    }

    pub fn is_updating(&self) -> bool {
        self.current.lock().is_some()
    }

    pub fn current(&self) -> Option<UpgradeInfo> {
        self.current.lock().clone()
    }

    fn end(&self) {
        self.current.lock().take();
    }
}

/// A held in-flight marker that releases on drop.
pub struct UpgradeGuard<'a> {
    state: &'a UpgradeState,
}

impl std::fmt::Debug for UpgradeGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeGuard")
            .field("current", &self.state.current())
            .finish()
    }
}

impl UpgradeGuard<'_> {
    /// Release explicitly; same as dropping the guard.
    pub fn release(self) {}
}

impl Drop for UpgradeGuard<'_> {
    fn drop(&mut self) {
        self.state.end();
        tracing::debug!("Released upgrade guard");
    }
}
