use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::error::ProxyError;

/// Response with a fully buffered body (§4.5 — "the full response body
/// buffer", not a stream), so the caller never holds an open upstream
/// connection past `send()` returning.
pub type UpstreamResponse = hyper::Response<Full<Bytes>>;
pub type OutboundBody = BoxBody<Bytes, hyper::Error>;

/// Pooled HTTP/1.1 client used for every upstream attempt (C8). No TLS — an
/// explicit non-goal — so the connector is plain `HttpConnector`.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: LegacyClient<HttpConnector, OutboundBody>,
    overall_timeout: Duration,
}

impl UpstreamClient {
    /// `connection_timeout_millis` is the overall per-attempt budget
    /// (§6, §9 design note). The TCP connect timeout is derived as
    /// `min(connection_timeout_millis, 2000ms)` so a slow connect cannot by
    /// itself consume the whole budget before a single byte is read.
    pub fn new(connection_timeout_millis: u64) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.enforce_http(true);
        let connect_timeout = Duration::from_millis(connection_timeout_millis.min(2000));
        connector.set_connect_timeout(Some(connect_timeout));

        let inner = LegacyClient::builder(TokioExecutor::new()).build(connector);

        Self {
            inner,
            overall_timeout: Duration::from_millis(connection_timeout_millis),
        }
    }

    /// Dispatch a request to a single upstream attempt, classifying any
    /// failure into the canonical connect/timeout buckets the retry state
    /// machine expects (§4.6). The overall timeout bounds the entire
    /// exchange — connect, headers, and full body receipt (§4.5) — since
    /// the body is buffered here before returning.
    pub async fn send(
        &self,
        request: hyper::Request<Full<Bytes>>,
    ) -> Result<UpstreamResponse, ProxyError> {
        let (parts, body) = request.into_parts();
        let boxed_body: OutboundBody = body.map_err(|e: std::convert::Infallible| match e {}).boxed();
        let request = hyper::Request::from_parts(parts, boxed_body);

        let exchange = async {
            let response = self.inner.request(request).await.map_err(|e| classify_legacy_error(&e))?;
            let (parts, body) = response.into_parts();
            let collected = body
                .collect()
                .await
                .map_err(|e| ProxyError::Internal(e.to_string()))?;
            Ok(hyper::Response::from_parts(parts, Full::new(collected.to_bytes())))
        };

        match tokio::time::timeout(self.overall_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::UpstreamTimeout),
        }
    }
}

fn classify_legacy_error(err: &hyper_util::client::legacy::Error) -> ProxyError {
    if err.is_connect() {
        ProxyError::UpstreamConnect(err.to_string())
    } else if err.is_timeout() {
        ProxyError::UpstreamTimeout
    } else {
        ProxyError::UpstreamConnect(err.to_string())
    }
}
