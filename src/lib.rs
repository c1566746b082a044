// ABOUTME: Library root for portainer-upgrade - exposes the upgrade service and its seams.
// ABOUTME: The binary in main.rs wires the real collaborators together.

pub mod clock;
pub mod config;
pub mod environment;
pub mod error;
pub mod runtime;
pub mod storage;
pub mod types;
pub mod upgrade;
