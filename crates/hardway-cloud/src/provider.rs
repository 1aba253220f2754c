//! Provisioning engine hand-off

use crate::error::Result;
use crate::manifest::StackManifest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Receiver of a synthesized stack
///
/// The provisioning engine behind this trait owns dependency ordering,
/// convergence and retries. hardway submits the manifest once and stops.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Returns the provisioner name (e.g. "manifest")
    fn name(&self) -> &str;

    /// Hand the manifest off to the engine
    async fn submit(&self, manifest: &StackManifest) -> Result<Submission>;
}

/// Outcome of a hand-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Name of the provisioner that accepted the manifest
    pub provisioner: String,

    /// Where the manifest ended up, when it was written locally
    pub location: Option<PathBuf>,

    /// Number of resources handed off
    pub resource_count: usize,
}

/// Set of resources to be provisioned
///
/// Keyed by `type:id` and kept ordered so synthesized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&ResourceConfig> {
        let key = format!("{}:{}", resource_type, id);
        self.resources.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Dependencies pointing at keys that are not in the set, as `(from, to)`
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        self.iter()
            .flat_map(|r| {
                r.depends_on
                    .iter()
                    .filter(|dep| !self.resources.contains_key(dep.as_str()))
                    .map(|dep| (r.key(), dep.clone()))
            })
            .collect()
    }

    /// Resource counts per type
    pub fn summary(&self) -> ResourceSummary {
        let mut counts = BTreeMap::new();
        for resource in self.iter() {
            *counts.entry(resource.resource_type.clone()).or_insert(0) += 1;
        }
        ResourceSummary { counts }
    }
}

/// Per-type resource counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSummary {
    pub counts: BTreeMap<String, usize>,
}

impl ResourceSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl std::fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Configuration for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g. "vpc", "security-group", "auto-scaling-group")
    pub resource_type: String,

    /// Resource identifier, unique within its type
    pub id: String,

    /// Provider name
    pub provider: String,

    /// Keys (`type:id`) of the resources this one references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Resource-specific configuration
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            provider: provider.into(),
            depends_on: Vec::new(),
            config,
        }
    }

    /// Record a dependency on another resource key
    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.depends_on.contains(&key) {
            self.depends_on.push(key);
        }
        self
    }

    /// Get the full resource key (type:id)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }

    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
