pub mod types;

pub use types::*;

use crate::error::ProxyError;
use anyhow::Result;
use std::path::Path;

impl GatewayConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used — the gateway will start with zero target groups (every
    /// request then 404s at the router).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: GatewayConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            GatewayConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            "loaded gateway configuration, target_groups={}",
            config.target_groups.len()
        );
        Ok(config)
    }

    /// Apply the environment variable overrides listed in §6.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LISTENER_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                self.listener_port = n;
            }
        }
        if let Ok(v) = std::env::var("CONNECTION_TIMEOUT") {
            if let Ok(n) = v.parse::<u64>() {
                self.connection_timeout_millis = n;
            }
        }
        if let Ok(v) = std::env::var("LOAD_BALANCING_ALGORITHM") {
            self.algorithm = v;
        }
        if let Ok(v) = std::env::var("HEADER_CONVENTION_ENABLE") {
            self.header_convention_enabled = is_truthy(&v);
        }
        if let Ok(v) = std::env::var("RETRY_ENABLE") {
            self.retry_enabled = is_truthy(&v);
        }
        if let Ok(v) = std::env::var("RETRY_BACKOFF") {
            if let Ok(n) = v.parse::<u64>() {
                self.retry_backoff_millis = n;
            }
        }
        if let Ok(v) = std::env::var("RETRY_COUNT") {
            if let Ok(n) = v.parse::<u32>() {
                self.retry_count = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, group) in &self.target_groups {
            if !group.path.starts_with('/') {
                return Err(ProxyError::Config(format!(
                    "target group '{name}': path must start with '/', got '{}'",
                    group.path
                ))
                .into());
            }
            if group.targets.is_empty() {
                return Err(ProxyError::Config(format!(
                    "target group '{name}': must have at least one target"
                ))
                .into());
            }
            if let Some(ref rewrite) = group.path_rewrite {
                if !rewrite.is_empty() && !rewrite.starts_with('/') {
                    return Err(ProxyError::Config(format!(
                        "target group '{name}': pathRewrite must start with '/', got '{rewrite}'"
                    ))
                    .into());
                }
            }
            if let Some(ref hc) = group.health_check {
                if !hc.path.starts_with('/') {
                    return Err(ProxyError::Config(format!(
                        "target group '{name}': healthCheck.path must start with '/', got '{}'",
                        hc.path
                    ))
                    .into());
                }
                if hc.interval == 0 {
                    return Err(ProxyError::Config(format!(
                        "target group '{name}': healthCheck.interval must be >= 1"
                    ))
                    .into());
                }
                if hc.success_threshold == 0 || hc.failure_threshold == 0 {
                    return Err(ProxyError::Config(format!(
                        "target group '{name}': healthCheck thresholds must be >= 1"
                    ))
                    .into());
                }
            }
            for target in &group.targets {
                if target.weight == 0 {
                    return Err(ProxyError::Config(format!(
                        "target group '{name}': target weight must be >= 1, got 0 for '{}'",
                        target.url
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }
}

fn is_truthy(v: &str) -> bool {
    v == "true" || v == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(path: &str) -> TargetGroupConfig {
        TargetGroupConfig {
            path: path.to_string(),
            algorithm: None,
            path_rewrite: None,
            health_check: None,
            targets: vec![TargetConfig {
                url: "http://127.0.0.1:9001".to_string(),
                weight: 1,
            }],
        }
    }

    #[test]
    fn validate_rejects_bad_prefix() {
        let mut cfg = GatewayConfig::default();
        cfg.target_groups.insert("echo".to_string(), group("echo"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_targets() {
        let mut cfg = GatewayConfig::default();
        let mut g = group("/echo");
        g.targets.clear();
        cfg.target_groups.insert("echo".to_string(), g);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let mut cfg = GatewayConfig::default();
        cfg.target_groups.insert("echo".to_string(), group("/echo"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn defaults_match_spec() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.algorithm, "ROUND_ROBIN");
        assert_eq!(cfg.connection_timeout_millis, 2000);
        assert!(cfg.header_convention_enabled);
        assert!(!cfg.retry_enabled);
        assert_eq!(cfg.retry_backoff_millis, 100);
        assert_eq!(cfg.retry_count, 3);
        assert!(cfg.target_groups.is_empty());
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("RETRY_ENABLE", "true");
        std::env::set_var("RETRY_COUNT", "5");
        let mut cfg = GatewayConfig::default();
        cfg.apply_env_overrides();
        std::env::remove_var("RETRY_ENABLE");
        std::env::remove_var("RETRY_COUNT");
        assert!(cfg.retry_enabled);
        assert_eq!(cfg.retry_count, 5);
    }
}
