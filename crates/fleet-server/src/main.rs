use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fleet_server::{api, setup_app_state, start_registry};
use infrastructure::ServerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding default.toml and the RUN_MODE overlay
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// API port, overrides server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fleet_server=debug,application=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Fleet server starting...");

    let mut config = ServerConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from '{}'", args.config_dir))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!(gateways = config.gateways.len(), "Configuration loaded");

    let registry = start_registry(&config).context("Invalid gateway configuration")?;
    let state = setup_app_state(registry.clone(), config.stream.keep_alive());
    let shutdown = state.shutdown.clone();

    let app = api::create_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    registry.shutdown().await;
    info!("Fleet server stopped");
    Ok(())
}
