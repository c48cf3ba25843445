use crate::upstream::Target;
use rand::Rng;

/// Weighted random selection via prefix-sum + uniform draw (§4.4).
///
/// Stateless: weights live on the `Target`s themselves, so there is nothing
/// to share across groups beyond the RNG, which `rand::thread_rng()` already
/// manages per-thread.
#[derive(Debug, Default)]
pub struct Weighted;

impl Weighted {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, healthy: &[Target]) -> Option<Target> {
        if healthy.is_empty() {
            return None;
        }
        let total: u64 = healthy.iter().map(|t| t.weight() as u64).sum();
        if total == 0 {
            // Every weight is zero (should not happen post-validation) —
            // fall back to a uniform draw rather than dividing by zero.
            let idx = rand::thread_rng().gen_range(0..healthy.len());
            return Some(healthy[idx].clone());
        }
        let mut draw = rand::thread_rng().gen_range(0..total);
        for target in healthy {
            let w = target.weight() as u64;
            if draw < w {
                return Some(target.clone());
            }
            draw -= w;
        }
        // Unreachable under correct arithmetic; guards against float-style
        // rounding drift if weights ever become non-integer.
        healthy.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(endpoint: &str, weight: u32) -> Target {
        Target::new(
            format!("http://{endpoint}"),
            String::new(),
            endpoint.to_string(),
            weight,
        )
    }

    #[test]
    fn empty_returns_none() {
        assert!(Weighted::new().select(&[]).is_none());
    }

    #[test]
    fn single_target_always_wins() {
        let w = Weighted::new();
        let t = vec![target("a:1", 5)];
        for _ in 0..10 {
            assert_eq!(w.select(&t).unwrap().endpoint(), "a:1");
        }
    }

    #[test]
    fn zero_weight_target_is_never_picked_over_many_trials() {
        let w = Weighted::new();
        let t = vec![target("a:1", 0), target("b:1", 10)];
        for _ in 0..200 {
            assert_eq!(w.select(&t).unwrap().endpoint(), "b:1");
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform_draw() {
        let w = Weighted::new();
        let t = vec![target("a:1", 0), target("b:1", 0)];
        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..200 {
            match w.select(&t).unwrap().endpoint() {
                "a:1" => seen_a = true,
                "b:1" => seen_b = true,
                other => panic!("unexpected endpoint {other}"),
            }
        }
        assert!(seen_a && seen_b, "uniform fallback should eventually pick both");
    }

    #[test]
    fn distribution_trends_toward_weight_ratio() {
        let w = Weighted::new();
        let t = vec![target("a:1", 1), target("b:1", 3)];
        let mut b_count = 0;
        for _ in 0..4000 {
            if w.select(&t).unwrap().endpoint() == "b:1" {
                b_count += 1;
            }
        }
        let ratio = b_count as f64 / 4000.0;
        assert!((0.65..0.85).contains(&ratio), "ratio was {ratio}");
    }
}
