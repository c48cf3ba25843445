use crate::upstream::Target;
use std::sync::atomic::{AtomicU64, Ordering};

/// Round-robin: one monotonic counter shared across every group bound to
/// this algorithm instance (§4.4, §9 design note — shared-counter default).
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// `index = abs(counter.getAndIncrement()) mod n` where `n` is the
    /// healthy-target count at selection time.
    pub fn select(&self, healthy: &[Target]) -> Option<Target> {
        let n = healthy.len();
        if n == 0 {
            return None;
        }
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let idx = (count % n as u64) as usize;
        Some(healthy[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(n: usize) -> Vec<Target> {
        (0..n)
            .map(|i| {
                Target::new(
                    format!("http://127.0.0.1:900{i}"),
                    String::new(),
                    format!("127.0.0.1:900{i}"),
                    1,
                )
            })
            .collect()
    }

    #[test]
    fn empty_returns_none() {
        let rr = RoundRobin::new();
        assert!(rr.select(&[]).is_none());
    }

    #[test]
    fn single_always_returns_it() {
        let rr = RoundRobin::new();
        let t = targets(1);
        for _ in 0..5 {
            assert_eq!(rr.select(&t).unwrap().endpoint(), t[0].endpoint());
        }
    }

    #[test]
    fn cycles_evenly_over_n_times_k_selections() {
        let rr = RoundRobin::new();
        let t = targets(3);
        let mut counts = [0usize; 3];
        for _ in 0..30 {
            let picked = rr.select(&t).unwrap();
            let idx = t.iter().position(|x| x.endpoint() == picked.endpoint()).unwrap();
            counts[idx] += 1;
        }
        assert_eq!(counts, [10, 10, 10]);
    }

    #[test]
    fn shared_counter_observed_across_independent_calls() {
        let rr = RoundRobin::new();
        let t = targets(3);
        let sequence: Vec<usize> = (0..6)
            .map(|_| {
                let picked = rr.select(&t).unwrap();
                t.iter().position(|x| x.endpoint() == picked.endpoint()).unwrap()
            })
            .collect();
        assert_eq!(sequence, vec![0, 1, 2, 0, 1, 2]);
    }
}
