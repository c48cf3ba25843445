use crate::config::GatewayConfig;
use crate::server;
use crate::upstream::{self, AlgorithmRegistry, HealthCheckClient, UpstreamClient};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: std::path::PathBuf,
    pub listen: Option<String>,
}

const HEALTH_CHECK_TICK: Duration = Duration::from_millis(1000);

/// Gateway lifecycle: init → load config → build state → serve → shutdown
/// (C3, C9, C10).
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let config = GatewayConfig::load(&args.config_path)?;
    let listen = args
        .listen
        .unwrap_or_else(|| format!("0.0.0.0:{}", config.listener_port));

    let algorithms = AlgorithmRegistry::new();
    let groups = upstream::build_target_groups(&config, &algorithms).await?;
    tracing::info!("upstream: resolved {} target group(s)", groups.len());

    let client = UpstreamClient::new(config.connection_timeout_millis);
    let state = server::GatewayState::new(config, groups, client);

    let shutdown = Arc::new(Notify::new());
    start_health_check_loop(&state, &shutdown);

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("server: failed to listen for shutdown signal, error={}", e);
            return;
        }
        tracing::info!("server: shutdown signal received");
        server_shutdown.notify_waiters();
    });

    server::run_proxy_server(&listen, state, shutdown).await
}

fn start_health_check_loop(state: &server::GatewayState, shutdown: &Arc<Notify>) {
    let router = state.router.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let client = HealthCheckClient::new();
        let mut ticker = tokio::time::interval(HEALTH_CHECK_TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    upstream::run_health_check_round(router.groups(), &client).await;
                }
                _ = shutdown.notified() => {
                    tracing::info!("health check: loop stopped");
                    break;
                }
            }
        }
    });
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}
