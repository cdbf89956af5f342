use clap::Parser;
use guildhall::{Cli, Gatekeeper, GuildhallConfig, api, init_tracing};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Installed before loading so config resolution is logged.
    let telemetry = init_tracing("info")?;

    let config = match &cli.config {
        Some(path) => GuildhallConfig::from_file(path)?,
        None => GuildhallConfig::load()?,
    };

    telemetry.apply_level(config.server.log_level())?;

    let bind = cli
        .bind
        .clone()
        .unwrap_or_else(|| config.server.bind_addr().clone());

    let gatekeeper = Arc::new(Gatekeeper::new(config)?);
    gatekeeper.start();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutdown signal received");
    };

    let result = api::serve(gatekeeper.clone(), &bind, shutdown).await;
    gatekeeper.close();
    result?;

    Ok(())
}
