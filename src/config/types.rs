use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level `lbConfig` tree (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_millis: u64,

    #[serde(default = "default_true")]
    pub header_convention_enabled: bool,

    #[serde(default)]
    pub retry_enabled: bool,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_millis: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default)]
    pub target_groups: HashMap<String, TargetGroupConfig>,

    /// Listener port. Not part of the `lbConfig` business tree in spirit,
    /// but the listener needs it from somewhere — lives alongside the rest
    /// of the infrastructure defaults and is overridable by `LISTENER_PORT`.
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            connection_timeout_millis: default_connection_timeout(),
            header_convention_enabled: true,
            retry_enabled: false,
            retry_backoff_millis: default_retry_backoff(),
            retry_count: default_retry_count(),
            target_groups: HashMap::new(),
            listener_port: default_listener_port(),
        }
    }
}

fn default_algorithm() -> String {
    "ROUND_ROBIN".to_string()
}

fn default_connection_timeout() -> u64 {
    2000
}

fn default_retry_backoff() -> u64 {
    100
}

fn default_retry_count() -> u32 {
    3
}

fn default_listener_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroupConfig {
    pub path: String,

    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(default)]
    pub path_rewrite: Option<String>,

    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_hc_path")]
    pub path: String,

    #[serde(default = "default_hc_interval")]
    pub interval: u64,

    #[serde(default = "default_hc_threshold")]
    pub success_threshold: u32,

    #[serde(default = "default_hc_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_hc_path(),
            interval: default_hc_interval(),
            success_threshold: default_hc_threshold(),
            failure_threshold: default_hc_failure_threshold(),
        }
    }
}

fn default_hc_path() -> String {
    "/".to_string()
}

fn default_hc_interval() -> u64 {
    5000
}

fn default_hc_threshold() -> u32 {
    1
}

fn default_hc_failure_threshold() -> u32 {
    3
}
