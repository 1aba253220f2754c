//! VPC and subnet layout

use super::topology::Tags;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Subnet reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetKind {
    Public,
    Private,
}

impl SubnetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subnet in one availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// `<group>-<az index>`
    pub id: String,
    pub availability_zone_index: u8,
    pub cidr: Ipv4Net,
}

/// Subnets sharing a name and kind, one per availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub kind: SubnetKind,
    pub cidr_mask: u8,
    pub subnets: Vec<Subnet>,
    pub tags: Tags,
}

/// VPC definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub cidr: Ipv4Net,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub subnet_groups: Vec<SubnetGroup>,

    /// First two octets of the pod network, e.g. "10.200"
    pub pod_cidr_prefix: String,
}

impl Network {
    pub fn subnet_group(&self, name: &str) -> Option<&SubnetGroup> {
        self.subnet_groups.iter().find(|g| g.name == name)
    }

    pub fn subnets(&self) -> impl Iterator<Item = (&SubnetGroup, &Subnet)> {
        self.subnet_groups
            .iter()
            .flat_map(|g| g.subnets.iter().map(move |s| (g, s)))
    }

    /// Pod CIDR for the worker with the given index (`<prefix>.<index>.0/24`)
    pub fn pod_cidr(&self, index: u32) -> Option<Ipv4Net> {
        if index > u8::MAX as u32 {
            return None;
        }
        format!("{}.{}.0/24", self.pod_cidr_prefix, index).parse().ok()
    }
}
