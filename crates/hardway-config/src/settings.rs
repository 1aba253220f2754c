//! Cluster settings
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock "Kubernetes the hard way" cluster.

use serde::{Deserialize, Serialize};

/// Settings for one auto-scaling tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierSettings {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub desired_capacity: u32,
    pub instance_type: String,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            min_capacity: 3,
            max_capacity: 3,
            desired_capacity: 3,
            instance_type: "t2.small".to_string(),
        }
    }
}

/// Machine image selection for the cluster tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageSettings {
    /// Pinned image id; when set the catalog is never queried
    pub ami_id: Option<String>,

    /// Catalog name filter
    pub name_pattern: String,

    /// Catalog owner accounts
    pub owners: Vec<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            ami_id: None,
            name_pattern: "ubuntu18.04-**".to_string(),
            owners: vec!["748666506640".to_string()],
        }
    }
}

/// Immutable settings record, loaded once at start-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Project name, used for resource names and the `Project`/`Name` tags
    pub project: String,

    /// Value of the `Owner` tag
    pub owner: String,

    pub stack_name: String,
    pub region: String,

    /// VPC address range
    pub vpc_cidr: String,

    /// First two octets of the pod network (e.g. "10.200")
    pub pod_cidr_prefix: String,

    /// Subnets per group, one per availability zone
    pub availability_zones: u8,

    /// Prefix length of every subnet
    pub subnet_cidr_mask: u8,

    /// EC2 key pair for the bastion host
    pub ssh_key_pair: String,

    /// Address (or CIDR) allowed to reach the bastion and the public API
    pub workstation: Option<String>,

    /// Kubernetes API server port
    pub api_port: u16,

    pub bastion_instance_type: String,
    pub etcd: TierSettings,
    pub controller: TierSettings,
    pub worker: TierSettings,
    pub image: ImageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: "kubernetes-the-hard-way".to_string(),
            owner: "lara".to_string(),
            stack_name: "K8STheHardWayAwsCdkStack".to_string(),
            region: "us-west-2".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            pod_cidr_prefix: "10.200".to_string(),
            availability_zones: 2,
            subnet_cidr_mask: 24,
            ssh_key_pair: "ssh-key-pair".to_string(),
            workstation: None,
            api_port: 6443,
            bastion_instance_type: "t2.small".to_string(),
            etcd: TierSettings::default(),
            controller: TierSettings::default(),
            worker: TierSettings::default(),
            image: ImageSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML; absent fields keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
