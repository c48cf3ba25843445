use crate::upstream::group::TargetGroup;
use bytes::Bytes;
use http_body_util::Empty;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use http::StatusCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Shared client used for every health probe (C9). A short, fixed timeout —
/// independent of the proxy's own `connection_timeout_millis` — since a
/// slow health check should not block the next tick.
#[derive(Clone)]
pub struct HealthCheckClient {
    inner: LegacyClient<HttpConnector, Empty<Bytes>>,
}

impl HealthCheckClient {
    pub fn new() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(2)));
        connector.enforce_http(true);
        Self {
            inner: LegacyClient::builder(TokioExecutor::new()).build(connector),
        }
    }
}

impl Default for HealthCheckClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one round of active health checks across every group that has
/// health checking enabled (§4.7). Intended to be called on a fixed tick
/// by the caller's scheduling loop; each target is only actually probed
/// once its own `interval_millis` has elapsed since its last probe.
pub async fn run_health_check_round(groups: &[TargetGroup], client: &HealthCheckClient) {
    let now = now_millis();

    for group in groups {
        let Some(hc) = &group.health_check else {
            continue;
        };
        if !hc.enabled {
            continue;
        }

        for target in &group.targets {
            let last = target.last_health_check_millis();
            if now.saturating_sub(last) < hc.interval_millis {
                continue;
            }
            target.set_last_health_check_millis(now);

            let url = format!("{}{}{}", target.base_url(), target.path_prefix(), hc.path);
            let healthy = probe(client, &url).await;

            if healthy {
                target.record_health_success();
                if !target.is_healthy()
                    && target.consecutive_successes() >= hc.success_threshold
                {
                    target.mark_healthy();
                    debug!(
                        target = target.endpoint(),
                        group = group.name.as_str(),
                        "health check: target recovered, marking healthy"
                    );
                }
            } else {
                target.record_health_failure();
                if target.is_healthy() && target.consecutive_failures() >= hc.failure_threshold {
                    target.mark_unhealthy();
                    warn!(
                        target = target.endpoint(),
                        group = group.name.as_str(),
                        consecutive_failures = target.consecutive_failures(),
                        "health check: target marked unhealthy"
                    );
                }
            }
        }
    }
}

async fn probe(client: &HealthCheckClient, url: &str) -> bool {
    let request = match hyper::Request::builder()
        .method(hyper::Method::GET)
        .uri(url)
        .body(Empty::<Bytes>::new())
    {
        Ok(req) => req,
        Err(_) => return false,
    };

    match tokio::time::timeout(Duration::from_secs(3), client.inner.request(request)).await {
        Ok(Ok(resp)) => resp.status() == StatusCode::OK,
        Ok(Err(_)) | Err(_) => false,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::group::HealthCheck;
    use crate::upstream::loadbalance::AlgorithmRegistry;
    use crate::upstream::target::Target;

    #[test]
    fn gating_skips_targets_probed_within_interval() {
        let target = Target::new(
            "http://127.0.0.1:1".to_string(),
            String::new(),
            "127.0.0.1:1".to_string(),
            1,
        );
        let now = now_millis();
        target.set_last_health_check_millis(now);
        assert!(now.saturating_sub(target.last_health_check_millis()) < 5000);
    }

    #[test]
    fn disabled_health_check_group_has_none() {
        let registry = AlgorithmRegistry::new();
        let group = TargetGroup {
            name: "g".to_string(),
            path_prefix: "/g".to_string(),
            path_rewrite: None,
            health_check: None::<HealthCheck>,
            targets: vec![],
            algorithm: registry.get("ROUND_ROBIN"),
        };
        assert!(group.health_check.is_none());
    }
}
