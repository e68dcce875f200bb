mod bootstrap;
mod catalog_feed;
mod handler;
mod health;
mod llm;
mod tasks;

use std::time::Duration;

use anyhow::Result;
use tendero_core::config::{AppConfig, LoadOptions, TransportKind};
use tracing_subscriber::EnvFilter;

use crate::health::HealthState;

fn init_logging(config: &AppConfig) {
    use tendero_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(true).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        HealthState { db_pool: app.db_pool.clone(), catalog: app.catalog.clone() },
    )
    .await?;

    let sweeper = tasks::spawn_order_sweeper(
        app.runtime.clone(),
        app.chat_runner.mailboxes().clone(),
        Duration::from_secs(app.config.funnel.sweep_interval_secs),
    );
    let refresher = tasks::spawn_catalog_refresher(
        app.catalog.clone(),
        app.config.catalog.source_key.clone(),
        Duration::from_secs(app.config.catalog.refresh_interval_secs),
    );

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        transport = ?app.config.transport.kind,
        "tendero-server started"
    );

    let runner = app.chat_runner.clone();
    let chat = tokio::spawn(async move { runner.start().await });

    match app.config.transport.kind {
        // The noop transport closes immediately; keep serving health checks until a signal.
        TransportKind::Noop => wait_for_shutdown().await?,
        TransportKind::Console => {
            tokio::select! {
                finished = chat => finished??,
                signal = wait_for_shutdown() => signal?,
            }
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        pending_turns = app.chat_runner.mailboxes().pending(),
        "tendero-server stopping"
    );

    sweeper.abort();
    if let Some(refresher) = refresher {
        refresher.abort();
    }

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, app.chat_runner.mailboxes().drain()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            pending_turns = app.chat_runner.mailboxes().pending(),
            "in-flight turns abandoned after grace period"
        );
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
