use crate::config::GatewayConfig;
use crate::routing::Router;
use crate::upstream::{UpstreamClient, TargetGroup};
use std::sync::Arc;

/// Shared gateway state, cheaply cloneable.
///
/// Built once at startup from configuration and never swapped afterward —
/// hot config reload is out of scope. The `Router` and the `TargetGroup`s
/// it holds are immutable; only the atomics inside each `Target` change at
/// runtime (active-connection counts, health status).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub router: Arc<Router>,
    pub client: UpstreamClient,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, groups: Vec<TargetGroup>, client: UpstreamClient) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(Router::new(groups)),
            client,
        }
    }
}
