//! Instances and auto-scaling tiers

use super::topology::Tags;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Machine image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MachineImage {
    /// A specific image id in a specific region
    Generic { region: String, image_id: String },
    /// The provider's current Amazon Linux image
    AmazonLinux,
    /// Catalog lookup not yet performed
    Lookup {
        name_pattern: String,
        owners: Vec<String>,
    },
}

impl MachineImage {
    pub fn generic(region: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self::Generic {
            region: region.into(),
            image_id: image_id.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Lookup { .. })
    }
}

impl std::fmt::Display for MachineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic { image_id, .. } => write!(f, "{}", image_id),
            Self::AmazonLinux => write!(f, "amazon-linux"),
            Self::Lookup { name_pattern, .. } => write!(f, "latest {}", name_pattern),
        }
    }
}

/// Role of an auto-scaling tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierRole {
    Etcd,
    Controller,
    Worker,
}

impl TierRole {
    pub const ALL: [TierRole; 3] = [TierRole::Etcd, TierRole::Controller, TierRole::Worker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Etcd => "etcd",
            Self::Controller => "controller",
            Self::Worker => "worker",
        }
    }
}

impl std::fmt::Display for TierRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance count bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub min: u32,
    pub max: u32,
    pub desired: u32,
}

impl Capacity {
    pub fn new(min: u32, max: u32, desired: u32) -> Self {
        Self { min, max, desired }
    }

    /// `min <= desired <= max`
    pub fn is_valid(&self) -> bool {
        self.min <= self.desired && self.desired <= self.max
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{} (desired {})", self.min, self.max, self.desired)
    }
}

/// Single jump host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bastion {
    pub name: String,
    pub instance_type: String,
    pub image: MachineImage,
    pub subnet_group: String,
    pub key_name: Option<String>,
    pub security_group: String,
    pub tags: Tags,
}

/// Auto-scaling group for one cluster role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub role: TierRole,
    pub name: String,
    pub capacity: Capacity,
    pub instance_type: String,
    pub image: MachineImage,
    pub subnet_group: String,
    pub associate_public_ip_address: bool,
    pub key_name: Option<String>,
    pub security_group: String,

    /// Per-instance pod ranges; only the worker tier has them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_cidrs: Vec<Ipv4Net>,

    /// Propagated to launched instances
    pub tags: Tags,
}
