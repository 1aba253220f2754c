use colored::Colorize;
use hardway_cloud::resolve_latest_image;
use hardway_cloud_aws::Ec2ImageCatalog;
use hardway_config::Settings;
use hardway_core::image_filter;

/// Print the newest image id matching the filter
pub async fn handle(
    settings: &Settings,
    region: Option<String>,
    name_pattern: Option<String>,
    owners: Vec<String>,
) -> anyhow::Result<()> {
    let region = region.unwrap_or_else(|| settings.region.clone());
    let mut filter = image_filter(settings);
    if let Some(name_pattern) = name_pattern {
        filter.name_pattern = name_pattern;
    }
    if !owners.is_empty() {
        filter.owners = owners;
    }

    eprintln!("{} {} in {}", "Querying images:".blue(), filter, region);
    let catalog = Ec2ImageCatalog::new(region).await;
    let image_id = resolve_latest_image(&catalog, &filter).await?;

    // stdout に id だけ出す (スクリプトから使う)
    println!("{}", image_id);
    Ok(())
}
