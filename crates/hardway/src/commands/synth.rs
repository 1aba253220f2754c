use super::{fail, with_workstation};
use colored::Colorize;
use hardway_cloud::{ManifestWriter, Provisioner, resolve_latest_image};
use hardway_cloud_aws::Ec2ImageCatalog;
use hardway_config::Settings;
use hardway_core::{
    MachineImage, build_topology, ensure_images_resolved, image_filter, stack_manifest,
    tier_image, validate,
};
use std::path::PathBuf;

pub struct SynthArgs {
    pub out: PathBuf,
    pub image: Option<String>,
    pub workstation: Option<String>,
    pub stdout: bool,
}

/// Image for the cluster tiers: flag, then pinned id, then catalog
async fn resolve_image(settings: &Settings, flag: Option<String>) -> anyhow::Result<MachineImage> {
    if let Some(image_id) = flag {
        return Ok(MachineImage::generic(&settings.region, image_id));
    }

    let image = tier_image(settings);
    if image.is_resolved() {
        return Ok(image);
    }

    let filter = image_filter(settings);
    eprintln!(
        "{} {} in {}",
        "Resolving latest image:".blue(),
        filter,
        settings.region
    );
    let catalog = Ec2ImageCatalog::new(&settings.region).await;
    let image_id = resolve_latest_image(&catalog, &filter).await?;
    eprintln!("  {} {}", "→".cyan(), image_id);

    Ok(MachineImage::generic(&settings.region, image_id))
}

pub async fn handle(settings: Settings, args: SynthArgs) -> anyhow::Result<()> {
    let settings = with_workstation(settings, args.workstation);

    // settings problems surface before the catalog is queried
    if let Err(e) = build_topology(&settings, tier_image(&settings)) {
        fail("Topology error", e);
    }

    let image = resolve_image(&settings, args.image).await?;
    let topology = match build_topology(&settings, image) {
        Ok(topology) => topology,
        Err(e) => fail("Topology error", e),
    };
    if let Err(e) = validate(&topology).and_then(|()| ensure_images_resolved(&topology)) {
        fail("Validation failed", e);
    }

    let manifest = stack_manifest(&topology);

    if args.stdout {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Synthesizing".blue(),
        manifest.stack_name.cyan()
    );
    let writer = ManifestWriter::new(&args.out);
    let submission = writer.submit(&manifest).await?;

    println!(
        "{}",
        format!("✓ {} resources handed off", submission.resource_count)
            .green()
            .bold()
    );
    println!("  {}", manifest.resources.summary());
    if let Some(location) = submission.location {
        println!("  Manifest: {}", location.display().to_string().cyan());
    }
    Ok(())
}
