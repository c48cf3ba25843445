use std::fmt;

/// Canonical proxy error kinds from the request pipeline (§7).
///
/// Every per-request variant maps to one of the fixed status codes the
/// proxy itself emits; none of these ever escape `proxy::handle_request`
/// to crash a worker.
#[derive(Debug)]
pub enum ProxyError {
    NoRouteMatch,
    NoHealthyTarget,
    UpstreamConnect(String),
    UpstreamTimeout,
    Config(String),
    Internal(String),
}

impl ProxyError {
    /// The canonical status code this error surfaces as, per §6/§7.
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            ProxyError::NoRouteMatch => http::StatusCode::NOT_FOUND,
            ProxyError::NoHealthyTarget => http::StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::UpstreamConnect(_) => http::StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout => http::StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Config(_) | ProxyError::Internal(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::NoRouteMatch => write!(f, "no listener rule matched"),
            ProxyError::NoHealthyTarget => write!(f, "no healthy target"),
            ProxyError::UpstreamConnect(msg) => write!(f, "upstream connect error: {}", msg),
            ProxyError::UpstreamTimeout => write!(f, "upstream timeout"),
            ProxyError::Config(msg) => write!(f, "config error: {}", msg),
            ProxyError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {}
