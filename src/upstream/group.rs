use crate::upstream::loadbalance::Algorithm;
use crate::upstream::Target;
use std::sync::Arc;

/// Health-check policy for a target group (§3).
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub enabled: bool,
    pub path: String,
    pub interval_millis: u64,
    pub success_threshold: u32,
    pub failure_threshold: u32,
}

/// Immutable bundle of targets plus routing metadata (C2).
///
/// Built once at startup by the registry and never mutated afterward —
/// only the `Target`s it holds change state, via their own atomics.
pub struct TargetGroup {
    pub name: String,
    pub path_prefix: String,
    pub path_rewrite: Option<String>,
    pub health_check: Option<HealthCheck>,
    pub targets: Vec<Target>,
    /// Pre-bound at construction time, per §4.6 ("the algorithm pre-bound
    /// to this group"). Cloning the `Arc` is just a refcount bump — the
    /// underlying algorithm state (e.g. the shared round-robin counter)
    /// is process-wide, owned by the algorithm registry.
    pub algorithm: Arc<Algorithm>,
}

impl TargetGroup {
    /// Targets whose `healthy` flag is currently true, preserving order.
    pub fn healthy_targets(&self) -> Vec<Target> {
        self.targets.iter().filter(|t| t.is_healthy()).cloned().collect()
    }

    /// Select a target via this group's bound algorithm, operating only
    /// over currently healthy targets (§4.4). `None` means no healthy
    /// target is available and the caller should surface 503.
    pub fn select(&self, headers: &http::HeaderMap) -> Option<Target> {
        let healthy = self.healthy_targets();
        self.algorithm.select(&healthy, headers)
    }
}
