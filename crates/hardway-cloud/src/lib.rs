//! hardway cloud abstractions
//!
//! This crate holds the two seams between hardway and the outside world:
//! the machine image catalog that is queried once at start-up, and the
//! provisioning engine that receives the synthesized stack.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  hardway CLI                     │
//! │            (hardway synth / validate)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                hardway-cloud                     │
//! │  ┌──────────────────┐  ┌────────────────────┐   │
//! │  │  trait           │  │  trait             │   │
//! │  │  ImageCatalog    │  │  Provisioner       │   │
//! │  └──────────────────┘  └────────────────────┘   │
//! │  ┌──────────────────┐  ┌────────────────────┐   │
//! │  │  Image Selector  │  │  ManifestWriter    │   │
//! │  └──────────────────┘  └────────────────────┘   │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  EC2 catalog  │
//! │ (cloud-aws)   │
//! └───────────────┘
//! ```

pub mod error;
pub mod image;
pub mod manifest;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result};
pub use image::{
    CandidateImage, ImageCatalog, ImageFilter, resolve_latest_image, select_latest_image,
};
pub use manifest::{MANIFEST_VERSION, ManifestWriter, StackManifest};
pub use provider::{Provisioner, ResourceConfig, ResourceSet, ResourceSummary, Submission};
