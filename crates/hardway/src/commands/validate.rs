use super::{fail, with_workstation};
use colored::Colorize;
use hardway_config::Settings;
use hardway_core::{Topology, build_topology, tier_image, validate};

pub fn handle(settings: Settings, workstation: Option<String>) -> anyhow::Result<()> {
    println!("{}", "Validating topology...".blue());

    let settings = with_workstation(settings, workstation);
    let topology = match build_topology(&settings, tier_image(&settings)) {
        Ok(topology) => topology,
        Err(e) => fail("Topology error", e),
    };

    if let Err(e) = validate(&topology) {
        fail("Validation failed", e);
    }

    println!("{}", "✓ Topology is consistent".green().bold());
    println!();
    print_summary(&topology);
    Ok(())
}

fn print_summary(topology: &Topology) {
    println!("Summary:");
    println!(
        "  Stack: {} ({})",
        topology.stack_name.cyan(),
        topology.region
    );
    println!("  VPC: {}", topology.network.cidr);
    for (group, subnet) in topology.network.subnets() {
        println!("    - {} {} ({})", subnet.id.cyan(), subnet.cidr, group.kind);
    }
    println!("  Bastion: {} ({})", topology.bastion.name.cyan(), topology.bastion.instance_type);
    println!("  Tiers: {}", topology.tiers.len());
    for tier in &topology.tiers {
        println!(
            "    - {} {} x {} [{}]",
            tier.name.cyan(),
            tier.capacity,
            tier.instance_type,
            tier.image
        );
    }
    println!("  Load balancers: {}", topology.load_balancers.len());
    for lb in &topology.load_balancers {
        println!("    - {} ({})", lb.name.cyan(), lb.scheme);
    }
    println!(
        "  Security groups: {} ({} ingress rules)",
        topology.security_groups.len(),
        topology.ingress_rule_count()
    );
}
