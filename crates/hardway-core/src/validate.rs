//! Topology consistency checks

use crate::error::{Result, TopologyError};
use crate::model::*;
use std::collections::BTreeSet;

/// Check reference consistency and capacity bounds
///
/// All problems are collected and reported together. Unresolved catalog
/// lookups are allowed here; see [`ensure_images_resolved`].
pub fn validate(topology: &Topology) -> Result<()> {
    let groups: BTreeSet<&str> = topology
        .security_groups
        .iter()
        .map(|g| g.name.as_str())
        .collect();
    let subnet_groups: BTreeSet<&str> = topology
        .network
        .subnet_groups
        .iter()
        .map(|g| g.name.as_str())
        .collect();
    let tiers: BTreeSet<&str> = topology.tiers.iter().map(|t| t.name.as_str()).collect();

    let mut problems = Vec::new();

    let mut check_group = |owner: &str, name: &str| {
        if !groups.contains(name) {
            problems.push(format!("{} references unknown security group '{}'", owner, name));
        }
    };

    for group in &topology.security_groups {
        for rule in &group.ingress {
            if let Some(peer) = rule.peer.group_name() {
                check_group(&format!("ingress rule on {}", group.name), peer);
            }
        }
    }
    check_group(&topology.bastion.name, &topology.bastion.security_group);
    for tier in &topology.tiers {
        check_group(&tier.name, &tier.security_group);
    }
    for lb in &topology.load_balancers {
        check_group(&lb.name, &lb.security_group);
        for listener in &lb.listeners {
            for peer in listener.allow_connections_from.iter().filter_map(Peer::group_name) {
                check_group(&format!("{} listener {}", lb.name, listener.external_port), peer);
            }
        }
    }

    let mut check_subnets = |owner: &str, name: &str| {
        if !subnet_groups.contains(name) {
            problems.push(format!("{} references unknown subnet group '{}'", owner, name));
        }
    };
    check_subnets(&topology.bastion.name, &topology.bastion.subnet_group);
    for tier in &topology.tiers {
        check_subnets(&tier.name, &tier.subnet_group);
    }
    for lb in &topology.load_balancers {
        check_subnets(&lb.name, &lb.subnet_group);
    }

    for lb in &topology.load_balancers {
        for target in &lb.targets {
            if !tiers.contains(target.as_str()) {
                problems.push(format!("{} targets unknown tier '{}'", lb.name, target));
            }
        }
    }

    for tier in &topology.tiers {
        if !tier.capacity.is_valid() {
            problems.push(format!(
                "{} capacity {} violates min <= desired <= max",
                tier.name, tier.capacity
            ));
        }
    }

    for group in &topology.security_groups {
        for rule in &group.ingress {
            if let Some((start, end)) = rule.port.port_bounds()
                && start > end
            {
                problems.push(format!(
                    "ingress rule on {} has an empty port range {}-{}",
                    group.name, start, end
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = problems.len(), "Topology validation failed");
        Err(TopologyError::Validation(problems))
    }
}

/// Fail if any tier still carries a catalog lookup instead of an image
pub fn ensure_images_resolved(topology: &Topology) -> Result<()> {
    let unresolved: Vec<String> = topology
        .tiers
        .iter()
        .filter(|t| !t.image.is_resolved())
        .map(|t| t.name.clone())
        .collect();

    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(TopologyError::UnresolvedImage(unresolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_topology;
    use hardway_config::Settings;

    fn topology() -> Topology {
        let settings = Settings {
            workstation: Some("203.0.113.10/32".to_string()),
            ..Default::default()
        };
        build_topology(&settings, MachineImage::generic("us-west-2", "ami-007")).unwrap()
    }

    fn problems(topology: &Topology) -> Vec<String> {
        match validate(topology) {
            Err(TopologyError::Validation(problems)) => problems,
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_topology_is_valid() {
        validate(&topology()).unwrap();
        ensure_images_resolved(&topology()).unwrap();
    }

    #[test]
    fn test_unknown_group_in_rule() {
        let mut topology = topology();
        topology.security_groups[0].allow(Peer::group("nope-sg"), PortSpec::tcp(22));

        let problems = problems(&topology);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("'nope-sg'"));
    }

    #[test]
    fn test_desired_above_max() {
        let mut topology = topology();
        topology.tiers[2].capacity = Capacity::new(1, 2, 3);

        let problems = problems(&topology);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("kubernetes-the-hard-way-worker capacity"));
    }

    #[test]
    fn test_collects_every_problem() {
        let mut topology = topology();
        topology.tiers[0].subnet_group = "isolated".to_string();
        topology.load_balancers[1].targets = vec!["missing-tier".to_string()];
        topology.security_groups[1].allow(Peer::group("x-sg"), PortSpec::tcp_range(2380, 2379));
        topology.load_balancers[0].listeners[0]
            .allow_connections_from
            .push(Peer::group("y-sg"));

        let problems = problems(&topology);
        assert_eq!(problems.len(), 5, "{problems:#?}");
        assert!(problems.iter().any(|p| p.contains("unknown subnet group 'isolated'")));
        assert!(problems.iter().any(|p| p.contains("unknown tier 'missing-tier'")));
        assert!(problems.iter().any(|p| p.contains("empty port range 2380-2379")));
        assert!(problems.iter().any(|p| p.contains("'x-sg'")));
        assert!(problems.iter().any(|p| p.contains("'y-sg'")));
    }

    #[test]
    fn test_unresolved_image() {
        let mut topology = topology();
        topology.tiers[1].image = MachineImage::Lookup {
            name_pattern: "ubuntu18.04-**".to_string(),
            owners: vec![],
        };

        validate(&topology).unwrap();
        match ensure_images_resolved(&topology) {
            Err(TopologyError::UnresolvedImage(names)) => {
                assert_eq!(names, vec!["kubernetes-the-hard-way-controller"])
            }
            other => panic!("Expected unresolved image, got {other:?}"),
        }
    }
}
