use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-backend runtime state (C1).
///
/// Cheap to clone — every mutable field lives behind an `Arc`, so all
/// clones of a `Target` observe and mutate the same counters. This is the
/// same "cheap handle, shared atomics" shape the teacher uses for
/// `UpstreamInstance`.
#[derive(Debug, Clone)]
pub struct Target {
    /// `scheme://ip:port` with no trailing slash, after DNS expansion.
    base_url: Arc<str>,
    /// Optional path prefix carried on the target URL itself (rarely used).
    path_prefix: Arc<str>,
    /// Pre-computed `ip:port` — avoids a `format!()` allocation on every
    /// selection and session-map lookup.
    endpoint: Arc<str>,

    weight: u32,

    healthy: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
    consecutive_successes: Arc<AtomicU32>,
    consecutive_failures: Arc<AtomicU32>,
    /// Epoch millis of the last health-check probe dispatch. Updated before
    /// the probe is issued so concurrent ticks do not double-fire (§4.7).
    last_health_check_millis: Arc<AtomicU64>,
}

impl Target {
    pub fn new(base_url: String, path_prefix: String, endpoint: String, weight: u32) -> Self {
        Self {
            base_url: Arc::from(base_url),
            path_prefix: Arc::from(path_prefix),
            endpoint: Arc::from(endpoint),
            weight,
            healthy: Arc::new(AtomicBool::new(true)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            consecutive_successes: Arc::new(AtomicU32::new(0)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            last_health_check_millis: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// `ip:port` — zero-allocation identity used as the session-map key and
    /// for health/metrics bookkeeping.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[inline]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    #[inline]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn inc_active(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement on every exit path of an upstream attempt (success, error,
    /// or timeout), regardless of retry (§4.6).
    pub fn dec_active(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a successful probe. Resets the failure streak first, then
    /// increments successes — the two are not updated atomically as one
    /// unit; a racing failure increment can produce one spurious extra
    /// count, which the threshold arithmetic tolerates (§5).
    pub fn record_health_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed probe. Mirrors `record_health_success`.
    pub fn record_health_failure(&self) {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn mark_healthy(&self) {
        self.healthy.store(true, Ordering::Release);
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }

    pub fn last_health_check_millis(&self) -> u64 {
        self.last_health_check_millis.load(Ordering::Relaxed)
    }

    pub fn set_last_health_check_millis(&self, millis: u64) {
        self.last_health_check_millis.store(millis, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target::new(
            "http://127.0.0.1:9001".to_string(),
            String::new(),
            "127.0.0.1:9001".to_string(),
            1,
        )
    }

    #[test]
    fn starts_healthy_with_zero_counters() {
        let t = target();
        assert!(t.is_healthy());
        assert_eq!(t.active_connections(), 0);
        assert_eq!(t.consecutive_successes(), 0);
        assert_eq!(t.consecutive_failures(), 0);
    }

    #[test]
    fn active_connections_never_underflows_semantics() {
        let t = target();
        t.inc_active();
        t.inc_active();
        assert_eq!(t.active_connections(), 2);
        t.dec_active();
        assert_eq!(t.active_connections(), 1);
    }

    #[test]
    fn success_resets_failure_counter() {
        let t = target();
        t.record_health_failure();
        t.record_health_failure();
        assert_eq!(t.consecutive_failures(), 2);
        t.record_health_success();
        assert_eq!(t.consecutive_failures(), 0);
        assert_eq!(t.consecutive_successes(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let t = target();
        let clone = t.clone();
        t.inc_active();
        assert_eq!(clone.active_connections(), 1);
    }
}
