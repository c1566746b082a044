// ABOUTME: Capability traits for container runtime clients.
// ABOUTME: Defines ImageInspector and ClientFactory.

mod client;
mod image;

pub use client::{ClientFactory, ConnectionError};
pub use image::{DistributionInfo, ImageError, ImageInspector, ImageSummary};
