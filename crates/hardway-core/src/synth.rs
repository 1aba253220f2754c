//! Topology -> provisioning engine resources
//!
//! Every resource is keyed `type:id` and lists the keys it references, so
//! the engine can order creation without knowing the topology model.

use crate::model::*;
use hardway_cloud::{ResourceConfig, ResourceSet, StackManifest};
use serde_json::json;

const PROVIDER: &str = "aws";

fn key(resource_type: &str, id: &str) -> String {
    format!("{}:{}", resource_type, id)
}

fn with_deps(
    mut resource: ResourceConfig,
    deps: impl IntoIterator<Item = String>,
) -> ResourceConfig {
    for dep in deps {
        resource = resource.depends_on(dep);
    }
    resource
}

/// Subnet keys of a named subnet group
fn subnet_keys(network: &Network, group: &str) -> Vec<String> {
    network
        .subnet_group(group)
        .map(|g| g.subnets.iter().map(|s| key("subnet", &s.id)).collect())
        .unwrap_or_default()
}

fn peer_json(peer: &Peer) -> serde_json::Value {
    match peer {
        Peer::Ipv4(net) => json!({ "cidr_ipv4": net.to_string() }),
        Peer::SecurityGroup(name) => json!({ "source_security_group": name }),
    }
}

fn add_network(resources: &mut ResourceSet, network: &Network) {
    let vpc_key = key("vpc", &network.name);
    resources.add(ResourceConfig::new(
        "vpc",
        &network.name,
        PROVIDER,
        json!({
            "cidr_block": network.cidr.to_string(),
            "enable_dns_hostnames": network.enable_dns_hostnames,
            "enable_dns_support": network.enable_dns_support,
        }),
    ));

    for (group, subnet) in network.subnets() {
        resources.add(
            ResourceConfig::new(
                "subnet",
                &subnet.id,
                PROVIDER,
                json!({
                    "cidr_block": subnet.cidr.to_string(),
                    "availability_zone_index": subnet.availability_zone_index,
                    "map_public_ip_on_launch": group.kind == SubnetKind::Public,
                    "kind": group.kind,
                    "tags": group.tags,
                }),
            )
            .depends_on(vpc_key.clone()),
        );
    }
}

fn add_security_groups(resources: &mut ResourceSet, topology: &Topology) {
    let vpc_key = key("vpc", &topology.network.name);

    for group in &topology.security_groups {
        let group_key = key("security-group", &group.name);
        resources.add(
            ResourceConfig::new(
                "security-group",
                &group.name,
                PROVIDER,
                json!({
                    "group_name": group.name,
                    "description": group.description,
                    "allow_all_outbound": group.allow_all_outbound,
                }),
            )
            .depends_on(vpc_key.clone()),
        );

        for (index, rule) in group.ingress.iter().enumerate() {
            let (from_port, to_port) = rule.port.port_bounds().unwrap_or((0, u16::MAX));
            let mut config = json!({
                "group": group.name,
                "ip_protocol": rule.port.protocol(),
                "from_port": from_port,
                "to_port": to_port,
                "description": rule.port.to_string(),
            });
            if let (Some(map), serde_json::Value::Object(peer)) =
                (config.as_object_mut(), peer_json(&rule.peer))
            {
                map.extend(peer);
            }

            let deps = std::iter::once(group_key.clone()).chain(
                rule.peer
                    .group_name()
                    .map(|peer| key("security-group", peer)),
            );
            resources.add(with_deps(
                ResourceConfig::new(
                    "security-group-ingress",
                    format!("{}-ingress-{}", group.name, index),
                    PROVIDER,
                    config,
                ),
                deps,
            ));
        }
    }
}

fn add_compute(resources: &mut ResourceSet, topology: &Topology) {
    let bastion = &topology.bastion;
    let deps = subnet_keys(&topology.network, &bastion.subnet_group)
        .into_iter()
        .chain(std::iter::once(key("security-group", &bastion.security_group)));
    resources.add(with_deps(
        ResourceConfig::new(
            "instance",
            &bastion.name,
            PROVIDER,
            json!({
                "instance_type": bastion.instance_type,
                "image": bastion.image,
                "subnet_group": bastion.subnet_group,
                "key_name": bastion.key_name,
                "security_group": bastion.security_group,
                "tags": bastion.tags,
            }),
        ),
        deps,
    ));

    for tier in &topology.tiers {
        let deps = subnet_keys(&topology.network, &tier.subnet_group)
            .into_iter()
            .chain(std::iter::once(key("security-group", &tier.security_group)));
        let pod_cidrs: Vec<String> = tier.pod_cidrs.iter().map(|c| c.to_string()).collect();
        resources.add(with_deps(
            ResourceConfig::new(
                "auto-scaling-group",
                &tier.name,
                PROVIDER,
                json!({
                    "role": tier.role,
                    "min_capacity": tier.capacity.min,
                    "max_capacity": tier.capacity.max,
                    "desired_capacity": tier.capacity.desired,
                    "instance_type": tier.instance_type,
                    "image": tier.image,
                    "subnet_group": tier.subnet_group,
                    "associate_public_ip_address": tier.associate_public_ip_address,
                    "key_name": tier.key_name,
                    "security_group": tier.security_group,
                    "pod_cidrs": pod_cidrs,
                    "tags": tier.tags,
                    "propagate_tags_at_launch": true,
                }),
            ),
            deps,
        ));
    }
}

fn add_load_balancers(resources: &mut ResourceSet, topology: &Topology) {
    for lb in &topology.load_balancers {
        let listeners: Vec<serde_json::Value> = lb
            .listeners
            .iter()
            .map(|l| {
                let allowed: Vec<serde_json::Value> =
                    l.allow_connections_from.iter().map(peer_json).collect();
                json!({
                    "external_port": l.external_port,
                    "external_protocol": l.external_protocol,
                    "internal_port": l.internal_port,
                    "allow_connections_from": allowed,
                })
            })
            .collect();

        let listener_groups = lb
            .listeners
            .iter()
            .flat_map(|l| l.allow_connections_from.iter().filter_map(Peer::group_name))
            .map(|name| key("security-group", name));
        let deps = subnet_keys(&topology.network, &lb.subnet_group)
            .into_iter()
            .chain(std::iter::once(key("security-group", &lb.security_group)))
            .chain(listener_groups)
            .chain(lb.targets.iter().map(|t| key("auto-scaling-group", t)));

        resources.add(with_deps(
            ResourceConfig::new(
                "load-balancer",
                &lb.name,
                PROVIDER,
                json!({
                    "scheme": lb.scheme,
                    "subnet_group": lb.subnet_group,
                    "health_check": {
                        "port": lb.health_check.port,
                        "protocol": lb.health_check.protocol,
                    },
                    "listeners": listeners,
                    "targets": lb.targets,
                    "security_group": lb.security_group,
                    "tags": lb.tags,
                }),
            ),
            deps,
        ));
    }
}

/// Flatten a topology into provisioning engine resources
pub fn synthesize(topology: &Topology) -> ResourceSet {
    let mut resources = ResourceSet::new();
    add_network(&mut resources, &topology.network);
    add_security_groups(&mut resources, topology);
    add_compute(&mut resources, topology);
    add_load_balancers(&mut resources, topology);

    tracing::debug!("Synthesized {}", resources.summary());
    resources
}

/// Wrap the synthesized resources into a stack manifest
pub fn stack_manifest(topology: &Topology) -> StackManifest {
    StackManifest::new(
        &topology.stack_name,
        &topology.region,
        topology.tags.clone(),
        synthesize(topology),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_topology;
    use hardway_config::Settings;

    fn topology() -> Topology {
        let settings = Settings {
            workstation: Some("203.0.113.10".to_string()),
            ..Default::default()
        };
        build_topology(&settings, MachineImage::generic("us-west-2", "ami-007")).unwrap()
    }

    #[test]
    fn test_resource_counts() {
        let resources = synthesize(&topology());
        let summary = resources.summary();

        let count = |kind: &str| summary.counts.get(kind).copied().unwrap_or(0);
        assert_eq!(count("vpc"), 1);
        assert_eq!(count("subnet"), 4);
        assert_eq!(count("security-group"), 6);
        assert_eq!(count("security-group-ingress"), 14);
        assert_eq!(count("instance"), 1);
        assert_eq!(count("auto-scaling-group"), 3);
        assert_eq!(count("load-balancer"), 2);
        assert_eq!(summary.total(), 31);
    }

    #[test]
    fn test_no_dangling_references() {
        let resources = synthesize(&topology());
        assert!(resources.dangling_references().is_empty());
    }

    #[test]
    fn test_subnet_config() {
        let resources = synthesize(&topology());
        let subnet = resources.get("subnet", "public-1").unwrap();
        assert_eq!(
            subnet.get_config::<String>("cidr_block").as_deref(),
            Some("10.0.3.0/24")
        );
        assert_eq!(subnet.get_config::<bool>("map_public_ip_on_launch"), Some(true));
        assert_eq!(subnet.depends_on, vec!["vpc:kubernetes-the-hard-way"]);
    }

    #[test]
    fn test_ingress_rule_config() {
        let resources = synthesize(&topology());

        let worker_all = resources
            .get(
                "security-group-ingress",
                "kubernetes-the-hard-way-worker-sg-ingress-1",
            )
            .unwrap();
        assert_eq!(worker_all.get_config::<String>("ip_protocol").as_deref(), Some("-1"));
        assert_eq!(
            worker_all.get_config::<String>("source_security_group").as_deref(),
            Some("kubernetes-the-hard-way-controller-sg")
        );
        assert_eq!(
            worker_all.depends_on,
            vec![
                "security-group:kubernetes-the-hard-way-worker-sg",
                "security-group:kubernetes-the-hard-way-controller-sg",
            ]
        );

        let ssh = resources
            .get(
                "security-group-ingress",
                "kubernetes-the-hard-way-bastion-sg-ingress-0",
            )
            .unwrap();
        assert_eq!(
            ssh.get_config::<String>("cidr_ipv4").as_deref(),
            Some("203.0.113.10/32")
        );
        assert_eq!(ssh.get_config::<u16>("from_port"), Some(22));
        assert_eq!(ssh.get_config::<u16>("to_port"), Some(22));
    }

    #[test]
    fn test_load_balancer_dependencies() {
        let resources = synthesize(&topology());
        let lb = resources
            .get("load-balancer", "kubernetes-the-hard-way-controller-public-lb")
            .unwrap();

        assert!(lb.depends_on.contains(&"subnet:public-0".to_string()));
        assert!(lb.depends_on.contains(
            &"auto-scaling-group:kubernetes-the-hard-way-controller".to_string()
        ));
        assert!(lb.depends_on.contains(
            &"security-group:kubernetes-the-hard-way-controller-public-lb-sg".to_string()
        ));
        assert_eq!(lb.get_config::<String>("scheme").as_deref(), Some("internet-facing"));
    }

    #[test]
    fn test_worker_pod_cidrs_in_config() {
        let resources = synthesize(&topology());
        let worker = resources
            .get("auto-scaling-group", "kubernetes-the-hard-way-worker")
            .unwrap();
        assert_eq!(
            worker.get_config::<Vec<String>>("pod_cidrs"),
            Some(vec![
                "10.200.0.0/24".to_string(),
                "10.200.1.0/24".to_string(),
                "10.200.2.0/24".to_string(),
            ])
        );
        let image: MachineImage = worker.get_config("image").unwrap();
        assert_eq!(image, MachineImage::generic("us-west-2", "ami-007"));
    }

    #[test]
    fn test_stack_manifest() {
        let manifest = stack_manifest(&topology());
        assert_eq!(manifest.stack_name, "K8STheHardWayAwsCdkStack");
        assert_eq!(manifest.region, "us-west-2");
        assert_eq!(
            manifest.tags.get("Project").map(String::as_str),
            Some("kubernetes-the-hard-way")
        );
        manifest.check().unwrap();
    }
}
