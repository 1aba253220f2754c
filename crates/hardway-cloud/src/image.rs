//! Machine image catalog and latest-image selection

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Name pattern used when no pattern is configured
pub const DEFAULT_NAME_PATTERN: &str = "ubuntu18.04-**";

/// Owner account publishing the default images
pub const DEFAULT_OWNER: &str = "748666506640";

/// A machine image returned by a catalog query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateImage {
    /// Image identifier (e.g. "ami-0123456789abcdef0")
    pub identifier: String,

    /// ISO-8601 creation timestamp as reported by the catalog
    pub creation_timestamp: String,
}

impl CandidateImage {
    pub fn new(identifier: impl Into<String>, creation_timestamp: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            creation_timestamp: creation_timestamp.into(),
        }
    }

    /// Parsed creation time, if the timestamp is valid RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.creation_timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Catalog query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilter {
    /// Image name pattern, wildcards allowed
    pub name_pattern: String,

    /// Owner account identifiers
    pub owners: Vec<String>,
}

impl ImageFilter {
    pub fn new(name_pattern: impl Into<String>, owners: Vec<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            owners,
        }
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PATTERN, vec![DEFAULT_OWNER.to_string()])
    }
}

impl std::fmt::Display for ImageFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name={} owners=[{}]",
            self.name_pattern,
            self.owners.join(", ")
        )
    }
}

/// Machine image catalog abstraction
///
/// Implementations perform exactly one query per call. Errors are returned
/// as-is; retrying is left to the caller.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Returns the catalog name (e.g. "ec2")
    fn name(&self) -> &str;

    /// List the images matching the filter, in no particular order
    async fn describe_images(&self, filter: &ImageFilter) -> Result<Vec<CandidateImage>>;
}

/// Newest first. Unparsable timestamps sort after every parsable one and
/// fall back to string order among themselves. Equal timestamps are broken
/// by ascending identifier.
fn newest_first(a: &CandidateImage, b: &CandidateImage) -> Ordering {
    let by_time = match (a.created_at(), b.created_at()) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.creation_timestamp.cmp(&a.creation_timestamp),
    };
    by_time.then_with(|| a.identifier.cmp(&b.identifier))
}

/// Return the identifier of the most recently created image
pub fn select_latest_image(candidates: &[CandidateImage]) -> Result<&str> {
    candidates
        .iter()
        .min_by(|a, b| newest_first(a, b))
        .map(|image| image.identifier.as_str())
        .ok_or_else(|| CloudError::EmptyResult("empty candidate set".to_string()))
}

/// Query the catalog and pick the newest matching image
pub async fn resolve_latest_image(
    catalog: &dyn ImageCatalog,
    filter: &ImageFilter,
) -> Result<String> {
    let candidates = catalog.describe_images(filter).await?;
    tracing::debug!(
        catalog = catalog.name(),
        count = candidates.len(),
        "Fetched candidate images"
    );

    if candidates.is_empty() {
        return Err(CloudError::EmptyResult(format!(
            "{} in {} catalog",
            filter,
            catalog.name()
        )));
    }

    let image_id = select_latest_image(&candidates)?.to_string();
    tracing::debug!(image_id = %image_id, "Selected latest image");
    Ok(image_id)
}
