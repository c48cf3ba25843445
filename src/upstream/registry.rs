use crate::config::GatewayConfig;
use crate::upstream::group::{HealthCheck, TargetGroup};
use crate::upstream::loadbalance::AlgorithmRegistry;
use crate::upstream::target::Target;
use anyhow::{Context, Result};
use http::Uri;
use std::sync::Arc;
use tokio::net::lookup_host;

/// Builds the immutable `TargetGroup` table from configuration (C3).
///
/// Each configured target URL is DNS-expanded to one or more resolved
/// addresses via `tokio::net::lookup_host`, producing one `Target` per
/// resolved address — a hostname that round-robins across multiple A
/// records becomes multiple independent targets, all sharing the
/// configured weight and the group's algorithm.
pub async fn build_target_groups(
    config: &GatewayConfig,
    algorithms: &AlgorithmRegistry,
) -> Result<Vec<TargetGroup>> {
    let mut groups = Vec::with_capacity(config.target_groups.len());

    for (name, group_cfg) in &config.target_groups {
        let algorithm_name = group_cfg
            .algorithm
            .clone()
            .unwrap_or_else(|| config.algorithm.clone());
        let algorithm = algorithms.get(&algorithm_name);

        let health_check = group_cfg.health_check.as_ref().map(|hc| HealthCheck {
            enabled: hc.enabled,
            path: hc.path.clone(),
            interval_millis: hc.interval,
            success_threshold: hc.success_threshold,
            failure_threshold: hc.failure_threshold,
        });

        let mut targets = Vec::new();
        for target_cfg in &group_cfg.targets {
            targets.extend(resolve_target(&target_cfg.url, target_cfg.weight).await?);
        }

        groups.push(TargetGroup {
            name: name.clone(),
            path_prefix: group_cfg.path.clone(),
            path_rewrite: group_cfg.path_rewrite.clone(),
            health_check,
            targets,
            algorithm,
        });
    }

    Ok(groups)
}

/// Expand a single configured target URL into one `Target` per resolved
/// address (C3). Addresses that already carry a numeric host (the common
/// case for load balancer targets) resolve to exactly themselves without a
/// real DNS round-trip.
async fn resolve_target(url: &str, weight: u32) -> Result<Vec<Target>> {
    let uri: Uri = url
        .parse()
        .with_context(|| format!("invalid target url: {url}"))?;
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri
        .host()
        .with_context(|| format!("target url has no host: {url}"))?;
    let port = uri.port_u16().unwrap_or(if scheme == "https" { 443 } else { 80 });
    let path_prefix = uri.path();
    let path_prefix = if path_prefix == "/" { "" } else { path_prefix };

    let addrs = lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve target host: {host}"))?;

    let mut targets = Vec::new();
    for addr in addrs {
        let endpoint = addr.to_string();
        let base_url = format!("{scheme}://{endpoint}");
        targets.push(Target::new(base_url, path_prefix.to_string(), endpoint, weight));
    }

    if targets.is_empty() {
        anyhow::bail!("target host resolved to zero addresses: {host}");
    }

    Ok(targets)
}

pub fn new_algorithm_registry() -> Arc<AlgorithmRegistry> {
    Arc::new(AlgorithmRegistry::new())
}
