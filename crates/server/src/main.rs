mod bootstrap;
mod events;
mod health;

use std::time::Duration;

use anyhow::Result;

use hindsight_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use hindsight_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = health::router(app.db_pool.clone()).merge(events::router(app.dispatcher.clone()));
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(bind_address = %address, "hindsight-server started");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router).await {
            tracing::error!(error = %error, "event server terminated unexpectedly");
        }
    });

    wait_for_shutdown().await?;
    tracing::info!("hindsight-server stopping");

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let abandoned = app.tasks.drain(grace).await;
    if abandoned > 0 {
        tracing::warn!(abandoned, "shutdown deadline reached with tasks still running");
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
