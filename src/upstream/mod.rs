pub mod client;
pub mod group;
pub mod health;
pub mod loadbalance;
pub mod registry;
pub mod target;

pub use client::{UpstreamClient, UpstreamResponse};
pub use group::TargetGroup;
pub use health::{run_health_check_round, HealthCheckClient};
pub use loadbalance::{Algorithm, AlgorithmRegistry};
pub use registry::build_target_groups;
pub use target::Target;
