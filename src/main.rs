//! Timezone router server binary.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use timezone_router::config::load_config;
use timezone_router::lifecycle::wait_for_shutdown;
use timezone_router::observability::{logging, metrics};
use timezone_router::{Application, HttpServer, ServiceConfig, Shutdown};

#[derive(Parser)]
#[command(name = "timezone-router")]
#[command(about = "Current time in any IANA timezone over HTTP and WebSocket", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "timezone-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        ws_path = %config.realtime.path,
        update_interval_ms = config.realtime.update_interval_ms,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let application = Application::build(&config);

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        signal.trigger();
    });

    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config, &application);
    match tls {
        Some(tls) => {
            let addr: SocketAddr = server.config().listener.bind_address.parse()?;
            server.run_tls(addr, &tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
