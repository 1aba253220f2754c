use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Invalid CIDR for {field}: '{value}' ({reason})")]
    InvalidCidr {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "No workstation address configured\n\
        Hint: set `workstation` in hardway.yaml, HARDWAY_WORKSTATION, or pass --workstation"
    )]
    MissingWorkstation,

    #[error("Subnet allocation failed: {0}")]
    SubnetAllocation(String),

    #[error("Topology is inconsistent:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("Machine image not resolved for: {}", .0.join(", "))]
    UnresolvedImage(Vec<String>),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
