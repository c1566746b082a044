// ABOUTME: Container runtime access for the upgrade pre-flight check.
// ABOUTME: Capability traits plus the bollard-backed client factory.

mod bollard;
pub mod traits;
mod types;

pub use self::bollard::{BollardClientFactory, BollardRuntime};
pub use traits::*;
pub use types::Endpoint;
