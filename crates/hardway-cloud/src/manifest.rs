//! Synthesized stack manifest
//!
//! The manifest is what the provisioning engine consumes. It is written to
//! `<out_dir>/<stack_name>.manifest.json`; the previous manifest, if any, is
//! kept next to it as `.backup`.

use crate::error::{CloudError, Result};
use crate::provider::{Provisioner, ResourceSet, Submission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const MANIFEST_VERSION: u32 = 1;
const MANIFEST_SUFFIX: &str = "manifest.json";
const BACKUP_SUFFIX: &str = "backup";

/// Stack handed to the provisioning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackManifest {
    /// Manifest format version
    pub version: u32,

    /// Stack name
    pub stack_name: String,

    /// Target region
    pub region: String,

    /// When the manifest was synthesized
    pub generated_at: DateTime<Utc>,

    /// Tags applied to every taggable resource in the stack
    pub tags: BTreeMap<String, String>,

    pub resources: ResourceSet,
}

impl StackManifest {
    pub fn new(
        stack_name: impl Into<String>,
        region: impl Into<String>,
        tags: BTreeMap<String, String>,
        resources: ResourceSet,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            stack_name: stack_name.into(),
            region: region.into(),
            generated_at: Utc::now(),
            tags,
            resources,
        }
    }

    /// Reject manifests the engine could not resolve
    pub fn check(&self) -> Result<()> {
        if self.version > MANIFEST_VERSION {
            return Err(CloudError::UnsupportedVersion {
                found: self.version,
                supported: MANIFEST_VERSION,
            });
        }
        if self.stack_name.is_empty() {
            return Err(CloudError::InvalidManifest("stack name is empty".into()));
        }
        if self.resources.is_empty() {
            return Err(CloudError::InvalidManifest(format!(
                "stack {} has no resources",
                self.stack_name
            )));
        }

        let dangling = self.resources.dangling_references();
        if !dangling.is_empty() {
            let listed: Vec<String> = dangling
                .iter()
                .map(|(from, to)| format!("{} -> {}", from, to))
                .collect();
            return Err(CloudError::InvalidManifest(format!(
                "unresolved references: {}",
                listed.join(", ")
            )));
        }
        Ok(())
    }
}

/// Provisioner that writes the manifest into an output directory
pub struct ManifestWriter {
    out_dir: PathBuf,
}

impl ManifestWriter {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the manifest path for a stack
    pub fn manifest_path(&self, stack_name: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", stack_name, MANIFEST_SUFFIX))
    }

    fn backup_path(&self, stack_name: &str) -> PathBuf {
        self.out_dir.join(format!(
            "{}.{}.{}",
            stack_name, MANIFEST_SUFFIX, BACKUP_SUFFIX
        ))
    }

    async fn ensure_out_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
            tracing::debug!("Created output directory: {}", self.out_dir.display());
        }
        Ok(())
    }

    /// Load a previously written manifest
    pub async fn load(&self, stack_name: &str) -> Result<Option<StackManifest>> {
        let path = self.manifest_path(stack_name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let manifest: StackManifest = serde_json::from_str(&content)?;
        if manifest.version > MANIFEST_VERSION {
            return Err(CloudError::UnsupportedVersion {
                found: manifest.version,
                supported: MANIFEST_VERSION,
            });
        }

        tracing::debug!(
            "Loaded manifest with {} resources",
            manifest.resources.len()
        );
        Ok(Some(manifest))
    }

    /// Write the manifest, keeping the previous one as a backup
    pub async fn save(&self, manifest: &StackManifest) -> Result<PathBuf> {
        manifest.check()?;
        self.ensure_out_dir().await?;

        let path = self.manifest_path(&manifest.stack_name);
        let backup = self.backup_path(&manifest.stack_name);

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created manifest backup");
        }

        let content = serde_json::to_string_pretty(manifest)?;
        fs::write(&path, content).await?;

        tracing::debug!(
            "Saved manifest with {} resources to {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(path)
    }
}

#[async_trait]
impl Provisioner for ManifestWriter {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn submit(&self, manifest: &StackManifest) -> Result<Submission> {
        let path = self.save(manifest).await?;
        Ok(Submission {
            provisioner: self.name().to_string(),
            location: Some(path),
            resource_count: manifest.resources.len(),
        })
    }
}
