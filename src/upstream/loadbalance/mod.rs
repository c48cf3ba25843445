mod least_conn;
mod round_robin;
mod sticky;
mod weighted;

use crate::upstream::Target;
use http::HeaderMap;
use least_conn::LeastConnections;
use round_robin::RoundRobin;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use sticky::Sticky;
use weighted::Weighted;

/// The four selection strategies named in §4.4. Enum dispatch, not trait
/// objects — matches the teacher's `LoadBalancer` shape.
#[derive(Debug)]
pub enum Algorithm {
    RoundRobin(RoundRobin),
    Weighted(Weighted),
    LeastRequestTotal(LeastConnections),
    Sticky(Sticky),
}

impl Algorithm {
    /// `healthy` must already be filtered to targets with `is_healthy() ==
    /// true` — every algorithm operates purely over that slice (§4.4).
    pub fn select(&self, healthy: &[Target], headers: &HeaderMap) -> Option<Target> {
        match self {
            Algorithm::RoundRobin(rr) => rr.select(healthy),
            Algorithm::Weighted(w) => w.select(healthy),
            Algorithm::LeastRequestTotal(lrt) => lrt.select(healthy),
            Algorithm::Sticky(s) => s.select(healthy, headers),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin(_) => "ROUND_ROBIN",
            Algorithm::Weighted(_) => "WEIGHTED",
            Algorithm::LeastRequestTotal(_) => "LRT",
            Algorithm::Sticky(_) => "STICKY",
        }
    }
}

fn new_algorithm(name: &str) -> Arc<Algorithm> {
    let algo = match name {
        "WEIGHTED" => Algorithm::Weighted(Weighted::new()),
        "LRT" => Algorithm::LeastRequestTotal(LeastConnections::new()),
        "STICKY" => Algorithm::Sticky(Sticky::new()),
        // ROUND_ROBIN and any unrecognized name both fall back to
        // round-robin — config validation does not constrain the
        // `algorithm` string to a closed set, so an unknown value degrades
        // gracefully instead of failing startup.
        _ => Algorithm::RoundRobin(RoundRobin::new()),
    };
    Arc::new(algo)
}

/// Process-wide table of algorithm instances, one per distinct algorithm
/// name actually referenced by configuration. Every `TargetGroup` bound to
/// the same name shares the same instance, so e.g. round-robin's counter
/// is shared across groups that both ask for `ROUND_ROBIN` (§9 design
/// note), while `WEIGHTED` and `STICKY` groups get their own.
#[derive(Debug, Default)]
pub struct AlgorithmRegistry {
    instances: RwLock<HashMap<String, Arc<Algorithm>>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Arc<Algorithm> {
        if let Some(existing) = self.instances.read().unwrap().get(name) {
            return existing.clone();
        }
        let mut instances = self.instances.write().unwrap();
        instances
            .entry(name.to_string())
            .or_insert_with(|| new_algorithm(name))
            .clone()
    }
}
