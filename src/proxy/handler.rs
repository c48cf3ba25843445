use crate::error::ProxyError;
use crate::proxy::context::{empty_body, BoxBody, RequestContext};
use crate::server::GatewayState;
use crate::upstream::UpstreamResponse;
use bytes::Bytes;
use http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle an incoming HTTP request through the pipeline described in §4.6:
///
/// 1. ROUTE_MATCH — longest-prefix match against configured groups
/// 2. HEADER_CONVENTION — inject/append X-Forwarded-* and X-Real-IP
/// 3. TARGET_SELECT — run the group's bound algorithm over healthy targets
/// 4. DISPATCH (with retry) — forward to the target, retrying on connect
///    failure or timeout up to `retryCount` times with exponential backoff
/// 5. RELAY — stream the upstream response back to the client
/// 6. LOG — one structured access-log line per request
pub async fn handle_request(
    req: Request<Incoming>,
    state: GatewayState,
    peer_addr: SocketAddr,
) -> Result<Response<BoxBody>, hyper::Error> {
    let uri_path = req.uri().path().to_string();
    let method = req.method().as_str().to_string();
    let mut ctx = RequestContext::new(uri_path.clone(), method);

    let group = match state.router.route(&uri_path) {
        Some(g) => g,
        None => {
            debug!(path = %uri_path, "no route matched");
            return Ok(error_response(StatusCode::NOT_FOUND, "not found"));
        }
    };
    ctx.group_name = group.name.clone();

    let (parts, body) = req.into_parts();
    let mut headers = parts.headers;

    let client_ip = extract_client_ip(&headers, peer_addr);
    ctx.client_ip = Some(client_ip);
    if state.config.header_convention_enabled {
        apply_header_conventions(&mut headers, client_ip, state.config.listener_port, &parts.uri);
    }
    remove_hop_headers(&mut headers);

    let target = match group.select(&headers) {
        Some(t) => t,
        None => {
            warn!(group = %group.name, "no healthy target available");
            return Ok(error_response(StatusCode::SERVICE_UNAVAILABLE, "service unavailable"));
        }
    };

    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Ok(error_response(StatusCode::BAD_REQUEST, "bad request"));
        }
    };

    let path_and_query = rewritten_path_and_query(&parts.uri, group.path_rewrite.as_deref());

    let max_attempts = if state.config.retry_enabled {
        state.config.retry_count + 1
    } else {
        1
    };

    target.inc_active();
    let upstream_start = Instant::now();
    let result = dispatch_with_retry(
        &state,
        &group.name,
        &target,
        &parts.method,
        &path_and_query,
        &headers,
        &body_bytes,
        max_attempts,
        state.config.retry_backoff_millis,
    )
    .await;
    target.dec_active();

    let final_resp = match result {
        Ok(resp) => build_downstream_response(resp),
        Err(err) => {
            warn!(group = %group.name, target = %target.endpoint(), error = %err, "upstream attempt exhausted");
            error_response(err.status_code(), &err.to_string())
        }
    };

    log_access(&ctx, &final_resp, upstream_start.elapsed(), target.endpoint());

    Ok(final_resp)
}

/// Execute the retry state machine (§4.6): INIT → DISPATCHED →
/// (RESPONDED | CONNECT_FAILED | TIMED_OUT) → CLASSIFIED →
/// (SURFACE | BACKOFF → INIT'). Only connect failures and timeouts are
/// retryable; any received response is surfaced immediately regardless of
/// status code. The same target is reused across attempts.
#[allow(clippy::too_many_arguments)]
async fn dispatch_with_retry(
    state: &GatewayState,
    group_name: &str,
    target: &crate::upstream::Target,
    method: &http::Method,
    path_and_query: &str,
    headers: &http::HeaderMap,
    body_bytes: &Bytes,
    max_attempts: u32,
    backoff_millis: u64,
) -> Result<UpstreamResponse, ProxyError> {
    let mut attempt = 0;
    loop {
        let uri = format!("{}{}{}", target.base_url(), target.path_prefix(), path_and_query);
        let mut builder = Request::builder().method(method.clone()).uri(&uri);
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        let request = match builder.body(Full::new(body_bytes.clone())) {
            Ok(r) => r,
            Err(e) => return Err(ProxyError::Internal(e.to_string())),
        };

        match state.client.send(request).await {
            Ok(resp) => return Ok(resp),
            Err(err) => {
                attempt += 1;
                let retryable = matches!(err, ProxyError::UpstreamConnect(_) | ProxyError::UpstreamTimeout);
                if retryable && attempt < max_attempts {
                    let backoff = backoff_millis.saturating_mul(1u64 << (attempt - 1).min(16));
                    debug!(
                        group = group_name,
                        target = target.endpoint(),
                        attempt,
                        backoff_ms = backoff,
                        "retrying upstream attempt after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

/// Strip the configured `pathRewrite` prefix `R` from the original path if
/// it begins with `R`, else pass the path through unchanged (§4.2). This is
/// a strip, not an Nginx-style replacement of the matched group prefix.
fn rewritten_path_and_query(uri: &http::Uri, rewrite: Option<&str>) -> String {
    let path = uri.path();
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();

    let rewritten_path = match rewrite {
        Some(r) if path.starts_with(r) => &path[r.len()..],
        _ => path,
    };
    let rewritten_path = if rewritten_path.is_empty() { "/" } else { rewritten_path };

    format!("{rewritten_path}{query}")
}

/// Inject/append standard `X-Forwarded-*` and `X-Real-IP` headers (§4.3).
/// `client_ip` must already be derived via `extract_client_ip` so the same
/// value backs both the outbound headers and the access log.
fn apply_header_conventions(headers: &mut http::HeaderMap, client_ip: IpAddr, listener_port: u16, uri: &http::Uri) {
    static XFF: HeaderName = HeaderName::from_static("x-forwarded-for");
    static XFP: HeaderName = HeaderName::from_static("x-forwarded-proto");
    static XFH: HeaderName = HeaderName::from_static("x-forwarded-host");
    static XFPORT: HeaderName = HeaderName::from_static("x-forwarded-port");
    static XRI: HeaderName = HeaderName::from_static("x-real-ip");
    static XRID: HeaderName = HeaderName::from_static("x-request-id");

    let client_ip = client_ip.to_string();

    let xff_value = match headers.get(&XFF).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip.clone(),
    };
    if let Ok(v) = HeaderValue::from_str(&xff_value) {
        headers.insert(XFF.clone(), v);
    }

    if !headers.contains_key(&XFP) {
        headers.insert(XFP.clone(), HeaderValue::from_static("http"));
    }

    if let Some(host) = headers.get(HOST).and_then(|v| v.to_str().ok()).map(str::to_string) {
        if let Ok(v) = HeaderValue::from_str(&host) {
            headers.insert(XFH.clone(), v);
        }
    } else if let Some(host) = uri.host() {
        if let Ok(v) = HeaderValue::from_str(host) {
            headers.insert(XFH.clone(), v);
        }
    }

    headers.insert(XFPORT.clone(), HeaderValue::from_str(&listener_port.to_string()).unwrap());

    if let Ok(v) = HeaderValue::from_str(&client_ip) {
        headers.insert(XRI.clone(), v);
    }

    if let Ok(v) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        headers.insert(XRID.clone(), v);
    }
}

/// Derive the client IP per §4.3: (a) last entry of incoming
/// `X-Forwarded-For` if present, else (b) incoming `X-Real-IP` if present,
/// else (c) the TCP peer address. Used uniformly for the outbound headers
/// and the access log.
fn extract_client_ip(headers: &http::HeaderMap, peer_addr: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        })
        .unwrap_or_else(|| peer_addr.ip())
}

fn remove_hop_headers(headers: &mut http::HeaderMap) {
    let hop_headers: &[HeaderName] = &[
        CONNECTION,
        HeaderName::from_static("keep-alive"),
        HeaderName::from_static("proxy-authenticate"),
        HeaderName::from_static("proxy-authorization"),
        HeaderName::from_static("te"),
        HeaderName::from_static("trailers"),
        TRANSFER_ENCODING,
        HeaderName::from_static("upgrade"),
    ];
    for h in hop_headers {
        headers.remove(h);
    }
}

fn build_downstream_response(upstream_resp: UpstreamResponse) -> Response<BoxBody> {
    let (parts, body) = upstream_resp.into_parts();
    let mut builder = Response::builder().status(parts.status);
    for (name, value) in &parts.headers {
        builder = builder.header(name, value);
    }
    builder.body(body.map_err(|never| match never {}).boxed()).unwrap()
}

/// Canonical proxy-emitted errors (404/502/503/504) carry an empty body (§6).
fn error_response(status: StatusCode, msg: &str) -> Response<BoxBody> {
    debug!(status = status.as_u16(), reason = msg, "emitting canonical error response");
    Response::builder()
        .status(status)
        .body(empty_body())
        .unwrap_or_else(|_| Response::new(empty_body()))
}

fn log_access(ctx: &RequestContext, resp: &Response<BoxBody>, upstream_elapsed: Duration, target_endpoint: &str) {
    let status = resp.status().as_u16();
    let total_ms = ctx.start.elapsed().as_millis();
    let client_ip = ctx
        .client_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info!(
        client_ip = %client_ip,
        method = %ctx.method,
        path = %ctx.uri_path,
        status,
        group = %ctx.group_name,
        target = %target_endpoint,
        latency_ms = %total_ms,
        upstream_ms = %upstream_elapsed.as_millis(),
        "access"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_strips_matching_prefix_from_original_path() {
        let uri: http::Uri = "/api/users?x=1".parse().unwrap();
        let out = rewritten_path_and_query(&uri, Some("/api"));
        assert_eq!(out, "/users?x=1");
    }

    #[test]
    fn rewrite_leaves_path_unchanged_when_it_does_not_start_with_r() {
        let uri: http::Uri = "/api/users?x=1".parse().unwrap();
        let out = rewritten_path_and_query(&uri, Some("/v1"));
        assert_eq!(out, "/api/users?x=1");
    }

    #[test]
    fn no_rewrite_passes_path_through() {
        let uri: http::Uri = "/api/users".parse().unwrap();
        let out = rewritten_path_and_query(&uri, None);
        assert_eq!(out, "/api/users");
    }

    #[test]
    fn client_ip_takes_last_xff_entry() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-forwarded-for", "1.1.1.1, 2.2.2.2".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        let ip = extract_client_ip(&headers, peer);
        assert_eq!(ip.to_string(), "2.2.2.2");
    }

    #[test]
    fn client_ip_falls_back_to_x_real_ip_when_no_xff() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-real-ip", "9.9.9.9".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        let ip = extract_client_ip(&headers, peer);
        assert_eq!(ip.to_string(), "9.9.9.9");
    }

    #[test]
    fn client_ip_falls_back_to_peer_when_no_headers() {
        let headers = http::HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        let ip = extract_client_ip(&headers, peer);
        assert_eq!(ip.to_string(), "127.0.0.1");
    }

    #[test]
    fn error_response_has_empty_body() {
        let resp = error_response(StatusCode::NOT_FOUND, "not found");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
