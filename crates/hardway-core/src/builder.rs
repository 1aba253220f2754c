//! Settings -> Topology

use crate::error::{Result, TopologyError};
use crate::model::*;
use hardway_config::{Settings, TierSettings};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

const SSH_PORT: u16 = 22;
const ETCD_CLIENT_PORT: u16 = 2379;
const ETCD_PEER_PORT: u16 = 2380;

const PUBLIC_GROUP: &str = "public";
const PRIVATE_GROUP: &str = "private";

/// Resource and security group names derived from the project name
struct Names<'a> {
    project: &'a str,
}

impl Names<'_> {
    fn resource(&self, role: &str) -> String {
        format!("{}-{}", self.project, role)
    }

    fn group(&self, role: &str) -> String {
        format!("{}-{}-sg", self.project, role)
    }

    fn description(&self, role: &str) -> String {
        format!("{} - {} security group", self.project, role)
    }
}

/// Parse a network address; host bits must be zero
fn parse_cidr(field: &'static str, value: &str) -> Result<Ipv4Net> {
    let invalid = |reason: String| TopologyError::InvalidCidr {
        field,
        value: value.to_string(),
        reason,
    };

    let net = value
        .parse::<Ipv4Net>()
        .map_err(|e| invalid(e.to_string()))?;
    if net != net.trunc() {
        return Err(invalid(format!("host bits set, did you mean {}?", net.trunc())));
    }
    Ok(net)
}

/// Accepts a CIDR or a bare address (taken as /32)
pub fn parse_workstation(value: &str) -> Result<Ipv4Net> {
    let value = value.trim();
    if value.contains('/') {
        return parse_cidr("workstation", value);
    }
    value
        .parse::<Ipv4Addr>()
        .map(Ipv4Net::from)
        .map_err(|e| TopologyError::InvalidCidr {
            field: "workstation",
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Carve `private` then `public` subnet groups out of the VPC range
fn allocate_subnets(
    vpc: Ipv4Net,
    availability_zones: u8,
    cidr_mask: u8,
    base_tags: &Tags,
) -> Result<Vec<SubnetGroup>> {
    if availability_zones == 0 {
        return Err(TopologyError::SubnetAllocation(
            "at least one availability zone is required".to_string(),
        ));
    }

    let mut blocks = vpc.subnets(cidr_mask).map_err(|_| {
        TopologyError::SubnetAllocation(format!(
            "/{} subnets do not fit in {}",
            cidr_mask, vpc
        ))
    })?;

    let mut groups = Vec::new();
    for (name, kind) in [
        (PRIVATE_GROUP, SubnetKind::Private),
        (PUBLIC_GROUP, SubnetKind::Public),
    ] {
        let mut subnets = Vec::with_capacity(availability_zones as usize);
        for az in 0..availability_zones {
            let cidr = blocks.next().ok_or_else(|| {
                TopologyError::SubnetAllocation(format!(
                    "{} cannot hold {} /{} subnets",
                    vpc,
                    availability_zones as usize * 2,
                    cidr_mask
                ))
            })?;
            subnets.push(Subnet {
                id: format!("{}-{}", name, az),
                availability_zone_index: az,
                cidr,
            });
        }

        let mut tags = base_tags.clone();
        tags.insert("Attribute".to_string(), kind.as_str().to_string());
        groups.push(SubnetGroup {
            name: name.to_string(),
            kind,
            cidr_mask,
            subnets,
            tags,
        });
    }

    Ok(groups)
}

fn tier(
    role: TierRole,
    settings: &TierSettings,
    names: &Names<'_>,
    image: &MachineImage,
    tags: &Tags,
) -> Tier {
    Tier {
        role,
        name: names.resource(role.as_str()),
        capacity: Capacity::new(
            settings.min_capacity,
            settings.max_capacity,
            settings.desired_capacity,
        ),
        instance_type: settings.instance_type.clone(),
        image: image.clone(),
        subnet_group: PRIVATE_GROUP.to_string(),
        associate_public_ip_address: false,
        key_name: None,
        security_group: names.group(role.as_str()),
        pod_cidrs: Vec::new(),
        tags: tags.clone(),
    }
}

/// Build the cluster topology
///
/// `tier_image` is used by the etcd, controller and worker tiers; the
/// bastion always runs Amazon Linux.
pub fn build_topology(settings: &Settings, tier_image: MachineImage) -> Result<Topology> {
    let names = Names {
        project: &settings.project,
    };

    let vpc_cidr = parse_cidr("vpc_cidr", &settings.vpc_cidr)?;
    let workstation = settings
        .workstation
        .as_deref()
        .ok_or(TopologyError::MissingWorkstation)
        .and_then(parse_workstation)?;
    parse_cidr(
        "pod_cidr_prefix",
        &format!("{}.0.0/16", settings.pod_cidr_prefix),
    )?;

    let stack_tags: Tags = [
        ("Project".to_string(), settings.project.clone()),
        ("Owner".to_string(), settings.owner.clone()),
    ]
    .into_iter()
    .collect();
    let resource_tags: Tags = [
        ("Name".to_string(), settings.project.clone()),
        ("Owner".to_string(), settings.owner.clone()),
    ]
    .into_iter()
    .collect();

    let network = Network {
        name: settings.project.clone(),
        cidr: vpc_cidr,
        enable_dns_hostnames: true,
        enable_dns_support: true,
        subnet_groups: allocate_subnets(
            vpc_cidr,
            settings.availability_zones,
            settings.subnet_cidr_mask,
            &resource_tags,
        )?,
        pod_cidr_prefix: settings.pod_cidr_prefix.clone(),
    };

    let bastion = Bastion {
        name: names.resource("bastion"),
        instance_type: settings.bastion_instance_type.clone(),
        image: MachineImage::AmazonLinux,
        subnet_group: PUBLIC_GROUP.to_string(),
        key_name: Some(settings.ssh_key_pair.clone()),
        security_group: names.group("bastion"),
        tags: resource_tags.clone(),
    };

    let etcd = tier(
        TierRole::Etcd,
        &settings.etcd,
        &names,
        &tier_image,
        &resource_tags,
    );
    let controller = tier(
        TierRole::Controller,
        &settings.controller,
        &names,
        &tier_image,
        &resource_tags,
    );
    let mut worker = tier(
        TierRole::Worker,
        &settings.worker,
        &names,
        &tier_image,
        &resource_tags,
    );
    worker.pod_cidrs = (0..settings.worker.desired_capacity)
        .map(|index| {
            network.pod_cidr(index).ok_or_else(|| {
                TopologyError::SubnetAllocation(format!(
                    "no pod CIDR left for worker {} under {}",
                    index, settings.pod_cidr_prefix
                ))
            })
        })
        .collect::<Result<_>>()?;

    let bastion_sg = names.group("bastion");
    let etcd_sg = names.group("etcd");
    let worker_sg = names.group("worker");
    let controller_sg = names.group("controller");
    let public_lb_sg = names.group("controller-public-lb");
    let private_lb_sg = names.group("controller-private-lb");
    let api = PortSpec::tcp(settings.api_port);
    let ssh = PortSpec::tcp(SSH_PORT);
    let etcd_ports = PortSpec::tcp_range(ETCD_CLIENT_PORT, ETCD_PEER_PORT);

    let mut bastion_group = SecurityGroup::new(&bastion_sg, names.description("bastion"));
    bastion_group.allow(Peer::Ipv4(workstation), ssh);

    let mut etcd_group = SecurityGroup::new(&etcd_sg, names.description("etcd"));
    etcd_group.allow(Peer::group(&bastion_sg), ssh);
    etcd_group.allow(Peer::group(&controller_sg), etcd_ports);
    etcd_group.allow(Peer::group(&etcd_sg), etcd_ports);

    let mut controller_group =
        SecurityGroup::new(&controller_sg, names.description("controller"));
    controller_group.allow(Peer::group(&bastion_sg), ssh);
    controller_group.allow(Peer::group(&public_lb_sg), api);
    controller_group.allow(Peer::group(&private_lb_sg), api);
    controller_group.allow(Peer::group(&worker_sg), api);

    let mut public_lb_group = SecurityGroup::new(
        &public_lb_sg,
        names.description("controller public lb"),
    );
    public_lb_group.allow(Peer::Ipv4(workstation), api);
    public_lb_group.allow(Peer::group(&controller_sg), api);

    let mut private_lb_group = SecurityGroup::new(
        &private_lb_sg,
        names.description("controller private lb"),
    );
    private_lb_group.allow(Peer::group(&controller_sg), api);
    private_lb_group.allow(Peer::group(&worker_sg), api);

    let mut worker_group = SecurityGroup::new(&worker_sg, names.description("worker"));
    worker_group.allow(Peer::group(&bastion_sg), ssh);
    worker_group.allow(Peer::group(&controller_sg), PortSpec::AllTraffic);

    let health_check = HealthCheck {
        port: settings.api_port,
        protocol: LoadBalancingProtocol::Tcp,
    };
    let api_listener = |allow: Vec<Peer>| Listener {
        external_port: settings.api_port,
        external_protocol: LoadBalancingProtocol::Tcp,
        internal_port: settings.api_port,
        allow_connections_from: allow,
    };

    let public_lb = LoadBalancer {
        name: names.resource("controller-public-lb"),
        scheme: Scheme::InternetFacing,
        subnet_group: PUBLIC_GROUP.to_string(),
        health_check: health_check.clone(),
        listeners: vec![api_listener(vec![
            Peer::Ipv4(workstation),
            Peer::group(&controller_sg),
        ])],
        targets: vec![controller.name.clone()],
        security_group: public_lb_sg.clone(),
        tags: resource_tags.clone(),
    };
    let private_lb = LoadBalancer {
        name: names.resource("controller-private-lb"),
        scheme: Scheme::Internal,
        subnet_group: PRIVATE_GROUP.to_string(),
        health_check,
        listeners: vec![api_listener(vec![
            Peer::group(&controller_sg),
            Peer::group(&worker_sg),
        ])],
        targets: vec![controller.name.clone()],
        security_group: private_lb_sg.clone(),
        tags: resource_tags.clone(),
    };

    let topology = Topology {
        stack_name: settings.stack_name.clone(),
        region: settings.region.clone(),
        tags: stack_tags,
        network,
        bastion,
        tiers: vec![etcd, controller, worker],
        load_balancers: vec![public_lb, private_lb],
        security_groups: vec![
            bastion_group,
            etcd_group,
            worker_group,
            controller_group,
            public_lb_group,
            private_lb_group,
        ],
    };

    tracing::debug!(
        stack = %topology.stack_name,
        security_groups = topology.security_groups.len(),
        rules = topology.ingress_rule_count(),
        "Built topology"
    );

    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            workstation: Some("203.0.113.10".to_string()),
            ..Default::default()
        }
    }

    fn image() -> MachineImage {
        MachineImage::generic("us-west-2", "ami-007")
    }

    fn rules_of(topology: &Topology, group: &str) -> Vec<(String, String)> {
        topology
            .security_group(group)
            .unwrap()
            .ingress
            .iter()
            .map(|r| (r.peer.to_string(), r.port.to_string()))
            .collect()
    }

    #[test]
    fn test_default_topology_shape() {
        let topology = build_topology(&settings(), image()).unwrap();

        assert_eq!(topology.stack_name, "K8STheHardWayAwsCdkStack");
        assert_eq!(topology.region, "us-west-2");
        assert_eq!(topology.tiers.len(), 3);
        assert_eq!(topology.load_balancers.len(), 2);
        assert_eq!(topology.security_groups.len(), 6);
        assert_eq!(topology.ingress_rule_count(), 14);
        assert_eq!(
            topology.tags.get("Project").map(String::as_str),
            Some("kubernetes-the-hard-way")
        );
        assert_eq!(topology.tags.get("Owner").map(String::as_str), Some("lara"));
    }

    #[test]
    fn test_subnet_allocation() {
        let topology = build_topology(&settings(), image()).unwrap();
        let cidrs: Vec<(String, String)> = topology
            .network
            .subnets()
            .map(|(_, s)| (s.id.clone(), s.cidr.to_string()))
            .collect();

        assert_eq!(
            cidrs,
            vec![
                ("private-0".to_string(), "10.0.0.0/24".to_string()),
                ("private-1".to_string(), "10.0.1.0/24".to_string()),
                ("public-0".to_string(), "10.0.2.0/24".to_string()),
                ("public-1".to_string(), "10.0.3.0/24".to_string()),
            ]
        );

        let public = topology.network.subnet_group("public").unwrap();
        assert_eq!(public.tags.get("Attribute").map(String::as_str), Some("public"));
        assert_eq!(
            public.tags.get("Name").map(String::as_str),
            Some("kubernetes-the-hard-way")
        );
    }

    #[test]
    fn test_subnet_allocation_overflow() {
        let settings = Settings {
            vpc_cidr: "10.0.0.0/23".to_string(),
            ..settings()
        };
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(err, TopologyError::SubnetAllocation(_)));
    }

    #[test]
    fn test_mask_wider_than_vpc() {
        let settings = Settings {
            subnet_cidr_mask: 8,
            ..settings()
        };
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(err, TopologyError::SubnetAllocation(_)));
    }

    #[test]
    fn test_tiers() {
        let topology = build_topology(&settings(), image()).unwrap();

        for role in TierRole::ALL {
            let tier = topology.tier(role).unwrap();
            assert_eq!(tier.name, format!("kubernetes-the-hard-way-{}", role));
            assert_eq!(tier.capacity, Capacity::new(3, 3, 3));
            assert_eq!(tier.instance_type, "t2.small");
            assert_eq!(tier.image, image());
            assert_eq!(tier.subnet_group, "private");
            assert!(!tier.associate_public_ip_address);
            assert!(tier.key_name.is_none());
            assert_eq!(
                tier.security_group,
                format!("kubernetes-the-hard-way-{}-sg", role)
            );
        }

        assert_eq!(topology.bastion.image, MachineImage::AmazonLinux);
        assert_eq!(topology.bastion.subnet_group, "public");
        assert_eq!(topology.bastion.key_name.as_deref(), Some("ssh-key-pair"));
    }

    #[test]
    fn test_worker_pod_cidrs() {
        let topology = build_topology(&settings(), image()).unwrap();
        let worker = topology.tier(TierRole::Worker).unwrap();
        let pod_cidrs: Vec<String> = worker.pod_cidrs.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            pod_cidrs,
            vec!["10.200.0.0/24", "10.200.1.0/24", "10.200.2.0/24"]
        );
        assert!(topology.tier(TierRole::Etcd).unwrap().pod_cidrs.is_empty());
    }

    #[test]
    fn test_too_many_workers_for_pod_range() {
        let mut settings = settings();
        settings.worker.max_capacity = 300;
        settings.worker.desired_capacity = 300;
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(err, TopologyError::SubnetAllocation(_)));
    }

    #[test]
    fn test_security_rules() {
        let topology = build_topology(&settings(), image()).unwrap();
        let sg = |role: &str| format!("kubernetes-the-hard-way-{}-sg", role);
        let rule = |peer: &str, port: &str| (peer.to_string(), port.to_string());

        assert_eq!(
            rules_of(&topology, &sg("bastion")),
            vec![rule("203.0.113.10/32", "tcp 22")]
        );
        assert_eq!(
            rules_of(&topology, &sg("etcd")),
            vec![
                rule(&sg("bastion"), "tcp 22"),
                rule(&sg("controller"), "tcp 2379-2380"),
                rule(&sg("etcd"), "tcp 2379-2380"),
            ]
        );
        assert_eq!(
            rules_of(&topology, &sg("controller")),
            vec![
                rule(&sg("bastion"), "tcp 22"),
                rule(&sg("controller-public-lb"), "tcp 6443"),
                rule(&sg("controller-private-lb"), "tcp 6443"),
                rule(&sg("worker"), "tcp 6443"),
            ]
        );
        assert_eq!(
            rules_of(&topology, &sg("controller-public-lb")),
            vec![
                rule("203.0.113.10/32", "tcp 6443"),
                rule(&sg("controller"), "tcp 6443"),
            ]
        );
        assert_eq!(
            rules_of(&topology, &sg("controller-private-lb")),
            vec![
                rule(&sg("controller"), "tcp 6443"),
                rule(&sg("worker"), "tcp 6443"),
            ]
        );
        assert_eq!(
            rules_of(&topology, &sg("worker")),
            vec![
                rule(&sg("bastion"), "tcp 22"),
                rule(&sg("controller"), "all traffic"),
            ]
        );

        let etcd = topology.security_group(&sg("etcd")).unwrap();
        assert_eq!(etcd.description, "kubernetes-the-hard-way - etcd security group");
        assert!(etcd.allow_all_outbound);
    }

    #[test]
    fn test_load_balancers() {
        let topology = build_topology(&settings(), image()).unwrap();

        let public = topology
            .load_balancer("kubernetes-the-hard-way-controller-public-lb")
            .unwrap();
        assert_eq!(public.scheme, Scheme::InternetFacing);
        assert_eq!(public.subnet_group, "public");
        assert_eq!(public.health_check.port, 6443);
        assert_eq!(public.targets, vec!["kubernetes-the-hard-way-controller"]);
        let allowed: Vec<String> = public.listeners[0]
            .allow_connections_from
            .iter()
            .map(Peer::to_string)
            .collect();
        assert_eq!(
            allowed,
            vec![
                "203.0.113.10/32",
                "kubernetes-the-hard-way-controller-sg"
            ]
        );

        let private = topology
            .load_balancer("kubernetes-the-hard-way-controller-private-lb")
            .unwrap();
        assert_eq!(private.scheme, Scheme::Internal);
        assert_eq!(private.subnet_group, "private");
        assert_eq!(
            private.security_group,
            "kubernetes-the-hard-way-controller-private-lb-sg"
        );
    }

    #[test]
    fn test_custom_api_port() {
        let settings = Settings {
            api_port: 8443,
            ..settings()
        };
        let topology = build_topology(&settings, image()).unwrap();
        let lb = &topology.load_balancers[0];
        assert_eq!(lb.listeners[0].external_port, 8443);
        assert_eq!(lb.health_check.port, 8443);
    }

    #[test]
    fn test_missing_workstation() {
        let err = build_topology(&Settings::default(), image()).unwrap_err();
        assert!(matches!(err, TopologyError::MissingWorkstation));
    }

    #[test]
    fn test_invalid_cidrs() {
        let settings = Settings {
            workstation: Some("workstation-ip".to_string()),
            ..Default::default()
        };
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidCidr {
                field: "workstation",
                ..
            }
        ));

        let settings = Settings {
            vpc_cidr: "10.0.0.0/33".to_string(),
            ..self::settings()
        };
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidCidr {
                field: "vpc_cidr",
                ..
            }
        ));

        let settings = Settings {
            pod_cidr_prefix: "10.300".to_string(),
            ..self::settings()
        };
        let err = build_topology(&settings, image()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::InvalidCidr {
                field: "pod_cidr_prefix",
                ..
            }
        ));
    }

    #[test]
    fn test_host_bits_rejected() {
        let settings = Settings {
            vpc_cidr: "10.0.5.7/16".to_string(),
            ..settings()
        };
        match build_topology(&settings, image()).unwrap_err() {
            TopologyError::InvalidCidr { field, reason, .. } => {
                assert_eq!(field, "vpc_cidr");
                assert!(reason.contains("10.0.0.0/16"));
            }
            other => panic!("Expected InvalidCidr, got {other:?}"),
        }

        assert!(matches!(
            parse_workstation("198.51.100.7/24"),
            Err(TopologyError::InvalidCidr {
                field: "workstation",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_workstation() {
        assert_eq!(
            parse_workstation("198.51.100.4").unwrap().to_string(),
            "198.51.100.4/32"
        );
        assert_eq!(
            parse_workstation(" 198.51.100.0/24 ").unwrap().to_string(),
            "198.51.100.0/24"
        );
    }
}
