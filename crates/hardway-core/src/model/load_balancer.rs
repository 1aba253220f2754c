//! Classic load balancers in front of the controllers

use super::security::Peer;
use super::topology::Tags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    InternetFacing,
    Internal,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InternetFacing => write!(f, "internet-facing"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Protocols a classic load balancer speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadBalancingProtocol {
    #[default]
    Tcp,
    Ssl,
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub port: u16,
    pub protocol: LoadBalancingProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub external_port: u16,
    pub external_protocol: LoadBalancingProtocol,

    /// Port on the targets; same as the external port
    pub internal_port: u16,

    pub allow_connections_from: Vec<Peer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub name: String,
    pub scheme: Scheme,
    pub subnet_group: String,
    pub health_check: HealthCheck,
    pub listeners: Vec<Listener>,

    /// Names of the tiers registered as targets
    pub targets: Vec<String>,

    pub security_group: String,
    pub tags: Tags,
}
