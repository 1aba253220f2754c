//! hardway core
//!
//! Builds the cluster topology from [`Settings`], checks it, and flattens it
//! into the resource set handed to the provisioning engine.

pub mod builder;
pub mod error;
pub mod model;
pub mod synth;
pub mod validate;

pub use builder::{build_topology, parse_workstation};
pub use error::{Result, TopologyError};
pub use model::*;
pub use synth::{stack_manifest, synthesize};
pub use validate::{ensure_images_resolved, validate};

use hardway_cloud::ImageFilter;
use hardway_config::Settings;

/// Catalog filter for the tier image
pub fn image_filter(settings: &Settings) -> ImageFilter {
    ImageFilter::new(
        settings.image.name_pattern.clone(),
        settings.image.owners.clone(),
    )
}

/// Tier image as far as settings alone can tell
///
/// A pinned `ami_id` yields a concrete image; otherwise the result is a
/// lookup that must be resolved against the catalog before synthesis.
pub fn tier_image(settings: &Settings) -> MachineImage {
    match &settings.image.ami_id {
        Some(ami_id) => MachineImage::generic(&settings.region, ami_id),
        None => MachineImage::Lookup {
            name_pattern: settings.image.name_pattern.clone(),
            owners: settings.image.owners.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_image_pinned() {
        let mut settings = Settings::default();
        settings.image.ami_id = Some("ami-007".to_string());
        assert_eq!(
            tier_image(&settings),
            MachineImage::generic("us-west-2", "ami-007")
        );
    }

    #[test]
    fn test_tier_image_lookup() {
        let image = tier_image(&Settings::default());
        assert!(!image.is_resolved());
        assert_eq!(image.to_string(), "latest ubuntu18.04-**");

        let filter = image_filter(&Settings::default());
        assert_eq!(filter.name_pattern, "ubuntu18.04-**");
        assert_eq!(filter.owners, vec!["748666506640".to_string()]);
    }
}
