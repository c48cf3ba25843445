use crate::upstream::Target;

/// Least-requests-total: deterministic minimum active-connection count,
/// first-in-list wins ties (§4.4). Unlike the teacher's P2C estimator this
/// scans every healthy target — groups are small enough that an O(n) scan
/// per request is cheaper than maintaining a second data structure.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, healthy: &[Target]) -> Option<Target> {
        healthy
            .iter()
            .min_by_key(|t| t.active_connections())
            .cloned()
    }
}
