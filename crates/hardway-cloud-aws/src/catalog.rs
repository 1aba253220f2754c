//! `DescribeImages` backed catalog

use crate::error::classify_error;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::{Filter, Image};
use hardway_cloud::{CandidateImage, ImageCatalog, ImageFilter};
use tracing::debug;

/// EC2 machine image catalog for a single region
pub struct Ec2ImageCatalog {
    client: Client,
    region: String,
}

impl Ec2ImageCatalog {
    /// Create a catalog, loading AWS config from the environment
    pub async fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        Self::from_client(Client::new(&config), region)
    }

    /// Create a catalog from an existing client
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Convert an EC2 image into a candidate, skipping incomplete records
pub fn candidate_from_image(image: &Image) -> Option<CandidateImage> {
    match (image.image_id(), image.creation_date()) {
        (Some(id), Some(created)) => Some(CandidateImage::new(id, created)),
        (id, _) => {
            debug!(image_id = ?id, "Skipping image without id or creation date");
            None
        }
    }
}

#[async_trait]
impl ImageCatalog for Ec2ImageCatalog {
    fn name(&self) -> &str {
        "ec2"
    }

    async fn describe_images(
        &self,
        filter: &ImageFilter,
    ) -> hardway_cloud::Result<Vec<CandidateImage>> {
        let mut request = self.client.describe_images().filters(
            Filter::builder()
                .name("name")
                .values(filter.name_pattern.clone())
                .build(),
        );
        for owner in &filter.owners {
            request = request.owners(owner.clone());
        }

        let response = request.send().await.map_err(|e| {
            let message = e
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&e).to_string());
            classify_error(e.code(), Some(&message))
        })?;

        let candidates: Vec<CandidateImage> = response
            .images()
            .iter()
            .filter_map(candidate_from_image)
            .collect();

        debug!(
            region = %self.region(),
            filter = %filter,
            count = candidates.len(),
            "Described images"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardway_cloud::select_latest_image;

    #[test]
    fn test_from_client() {
        let config = aws_sdk_ec2::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-central-1"))
            .build();
        let catalog = Ec2ImageCatalog::from_client(Client::from_conf(config), "eu-central-1");

        assert_eq!(catalog.region(), "eu-central-1");
        assert_eq!(catalog.name(), "ec2");
    }

    #[test]
    fn test_candidate_from_image() {
        let image = Image::builder()
            .image_id("ami-0abc")
            .creation_date("2021-06-15T00:00:00.000Z")
            .name("ubuntu18.04-2021.06.15")
            .build();

        let candidate = candidate_from_image(&image).unwrap();
        assert_eq!(candidate.identifier, "ami-0abc");
        assert_eq!(candidate.creation_timestamp, "2021-06-15T00:00:00.000Z");
    }

    #[test]
    fn test_incomplete_images_skipped() {
        let no_date = Image::builder().image_id("ami-0abc").build();
        let no_id = Image::builder()
            .creation_date("2021-06-15T00:00:00.000Z")
            .build();

        assert!(candidate_from_image(&no_date).is_none());
        assert!(candidate_from_image(&no_id).is_none());
    }

    #[test]
    fn test_latest_from_describe_response() {
        let images = [
            Image::builder()
                .image_id("ami-older")
                .creation_date("2020-01-10T10:00:00.000Z")
                .build(),
            Image::builder()
                .image_id("ami-newer")
                .creation_date("2021-02-20T10:00:00.000Z")
                .build(),
            Image::builder().image_id("ami-broken").build(),
        ];

        let candidates: Vec<_> = images.iter().filter_map(candidate_from_image).collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(select_latest_image(&candidates).unwrap(), "ami-newer");
    }
}
