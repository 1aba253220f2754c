//! Security groups and ingress rules

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Traffic source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Peer {
    Ipv4(Ipv4Net),
    SecurityGroup(String),
}

impl Peer {
    pub fn group(name: impl Into<String>) -> Self {
        Self::SecurityGroup(name.into())
    }

    /// Referenced security group name, if any
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::SecurityGroup(name) => Some(name),
            Self::Ipv4(_) => None,
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4(net) => write!(f, "{}", net),
            Self::SecurityGroup(name) => write!(f, "{}", name),
        }
    }
}

/// Port or port range of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PortSpec {
    Tcp { port: u16 },
    TcpRange { start: u16, end: u16 },
    AllTraffic,
}

impl PortSpec {
    pub fn tcp(port: u16) -> Self {
        Self::Tcp { port }
    }

    pub fn tcp_range(start: u16, end: u16) -> Self {
        Self::TcpRange { start, end }
    }

    /// IP protocol as EC2 spells it ("-1" is every protocol)
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Tcp { .. } | Self::TcpRange { .. } => "tcp",
            Self::AllTraffic => "-1",
        }
    }

    /// Inclusive port bounds; `None` means every port
    pub fn port_bounds(&self) -> Option<(u16, u16)> {
        match self {
            Self::Tcp { port } => Some((*port, *port)),
            Self::TcpRange { start, end } => Some((*start, *end)),
            Self::AllTraffic => None,
        }
    }
}

impl std::fmt::Display for PortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp { port } => write!(f, "tcp {}", port),
            Self::TcpRange { start, end } => write!(f, "tcp {}-{}", start, end),
            Self::AllTraffic => write!(f, "all traffic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: PortSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: String,
    pub description: String,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    pub fn allow(&mut self, peer: Peer, port: PortSpec) {
        self.ingress.push(IngressRule { peer, port });
    }
}
