// ABOUTME: Validated domain types shared across the upgrade pipeline.
// ABOUTME: Image references, platform tags and environment type tags.

mod image_ref;
mod platform;

pub use image_ref::{ImageRef, ParseImageRefError};
pub use platform::{ContainerPlatform, EnvironmentType, ParsePlatformError};
