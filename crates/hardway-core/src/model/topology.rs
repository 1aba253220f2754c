//! Topology root

use super::compute::{Bastion, Tier, TierRole};
use super::load_balancer::LoadBalancer;
use super::network::Network;
use super::security::SecurityGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource tags, ordered by key
pub type Tags = BTreeMap<String, String>;

/// The whole desired cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub stack_name: String,
    pub region: String,

    /// Stack-wide tags
    pub tags: Tags,

    pub network: Network,
    pub bastion: Bastion,
    pub tiers: Vec<Tier>,
    pub load_balancers: Vec<LoadBalancer>,
    pub security_groups: Vec<SecurityGroup>,
}

impl Topology {
    pub fn tier(&self, role: TierRole) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.role == role)
    }

    pub fn security_group(&self, name: &str) -> Option<&SecurityGroup> {
        self.security_groups.iter().find(|g| g.name == name)
    }

    pub fn load_balancer(&self, name: &str) -> Option<&LoadBalancer> {
        self.load_balancers.iter().find(|lb| lb.name == name)
    }

    pub fn ingress_rule_count(&self) -> usize {
        self.security_groups.iter().map(|g| g.ingress.len()).sum()
    }
}
