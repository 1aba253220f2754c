//! Topology model
//!
//! Plain data describing the desired resources. Nothing here talks to a
//! cloud API; the provisioning engine reads the synthesized form.

mod compute;
mod load_balancer;
mod network;
mod security;
mod topology;

// Re-exports
pub use compute::*;
pub use load_balancer::*;
pub use network::*;
pub use security::*;
pub use topology::*;
