use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use guestbook_api::config::load_config;
use guestbook_api::lifecycle::supervise;
use guestbook_api::observability::{logging, metrics};
use guestbook_api::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "guestbook-api")]
#[command(about = "Rate-limited guestbook message API")]
struct Args {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init(&config.observability)?;
    tracing::info!("guestbook-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        per_minute = config.rate_limit.per_minute,
        per_hour = config.rate_limit.per_hour,
        allowed_origins = ?config.cors.allowed_origins,
        log_format = %config.observability.log_format,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    supervise(server_task, &shutdown, tokio::signal::ctrl_c()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
