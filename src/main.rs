#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Result;
use clap::Parser;
use proxylb::server;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "proxylb", about = "HTTP reverse proxy and load balancer")]
struct Cli {
    /// Path to gateway config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address override (defaults to lbConfig listenerPort on 0.0.0.0)
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let worker_threads = server::runtime::get_container_cpu_limit();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    rt.block_on(server::bootstrap::run(server::bootstrap::BootstrapArgs {
        config_path: cli.config,
        listen: cli.listen,
    }))
}
