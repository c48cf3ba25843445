use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use proxylb::config::GatewayConfig;
use proxylb::server::GatewayState;
use proxylb::upstream::{self, AlgorithmRegistry, UpstreamClient};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build a `GatewayState` from configuration and spawn the proxy's request
/// handler on an ephemeral loopback port, returning the bound address.
/// A trimmed stand-in for `server::run_proxy_server` — tests only need a
/// single accept loop with no graceful-shutdown machinery.
pub async fn spawn_proxy(config: GatewayConfig) -> SocketAddr {
    let algorithms = AlgorithmRegistry::new();
    let groups = upstream::build_target_groups(&config, &algorithms)
        .await
        .expect("target group resolution");
    let client = UpstreamClient::new(config.connection_timeout_millis);
    let state = GatewayState::new(config, groups, client);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(v) => v,
                Err(_) => continue,
            };
            let state = state.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let svc = service_fn(move |req: Request<Incoming>| {
                    let state = state.clone();
                    async move { proxylb::proxy::handle_request(req, state, peer_addr).await }
                });
                let _ = auto::Builder::new(TokioExecutor::new())
                    .http1()
                    .serve_connection(io, svc)
                    .await;
            });
        }
    });

    addr
}

/// Issue a GET request against `addr` and return (status, body).
pub async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    request(addr, "GET", path, None).await
}

pub async fn request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    cookie: Option<&str>,
) -> (u16, String) {
    let connector = HttpConnector::new();
    let client: LegacyClient<_, Empty<Bytes>> = LegacyClient::builder(TokioExecutor::new()).build(connector);

    let uri = format!("http://{addr}{path}");
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(hyper::header::COOKIE, cookie);
    }
    let req = builder.body(Empty::<Bytes>::new()).unwrap();

    let resp = client.request(req).await.expect("request to proxy failed");
    let status = resp.status().as_u16();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).to_string())
}
