pub mod bootstrap;
pub mod runtime;
mod state;

pub use state::GatewayState;

use crate::proxy;
use anyhow::Result;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info};

/// Run the proxy's HTTP listener with graceful shutdown support (C10).
///
/// When `shutdown` is notified the server stops accepting new connections
/// and waits up to `DRAIN_TIMEOUT` for in-flight requests to complete
/// before forcibly dropping them.
pub async fn run_proxy_server(listen: &str, state: GatewayState, shutdown: Arc<Notify>) -> Result<()> {
    const DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

    let addr: SocketAddr = listen.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("server: proxy listening, addr={}", addr);

    let in_flight = Arc::new(tokio::sync::Semaphore::new(0));
    let active_conns = Arc::new(AtomicI64::new(0));

    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            _ = shutdown.notified() => {
                info!("server: stop accepting new connections, draining...");
                break;
            }
        };

        let (stream, peer_addr) = match accepted {
            Ok(v) => v,
            Err(e) => {
                error!("server: accept failed, error={}", e);
                continue;
            }
        };

        active_conns.fetch_add(1, Ordering::Relaxed);
        let state = state.clone();
        in_flight.add_permits(1);
        let in_flight = in_flight.clone();
        let active_conns = active_conns.clone();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let state_inner = state.clone();
            let svc = service_fn(move |req: Request<Incoming>| {
                let state = state_inner.clone();
                async move { proxy::handle_request(req, state, peer_addr).await }
            });

            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .http1()
                .keep_alive(true)
                .serve_connection_with_upgrades(io, svc)
                .await
            {
                if !e.to_string().contains("connection closed") {
                    error!("server: connection error, peer={}, error={}", peer_addr, e);
                }
            }

            active_conns.fetch_sub(1, Ordering::Relaxed);
            let _ = in_flight.acquire().await;
        });
    }

    let active = active_conns.load(Ordering::Relaxed);
    if active > 0 {
        info!("server: waiting for {} active connections to drain", active);
        let drain = async {
            loop {
                if active_conns.load(Ordering::Relaxed) == 0 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        };
        match tokio::time::timeout(DRAIN_TIMEOUT, drain).await {
            Ok(_) => info!("server: all connections drained"),
            Err(_) => {
                let remaining = active_conns.load(Ordering::Relaxed);
                info!(
                    "server: drain timeout ({}s), {} connections still active",
                    DRAIN_TIMEOUT.as_secs(),
                    remaining
                );
            }
        }
    }

    Ok(())
}
