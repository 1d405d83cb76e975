// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use nomad_external_dns::{
    cluster::NomadClient,
    config::{Config, LoadNotice},
    provider::build_provider,
    scheduler::{App, RunContext},
    telemetry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Publish DNS records for tagged Nomad services.
#[derive(Debug, Parser)]
#[command(name = "nomad-external-dns", version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, notices) =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("nomad-external-dns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config, notices))
}

async fn async_main(config: Config, notices: Vec<LoadNotice>) -> Result<()> {
    telemetry::init(&config.app.log_level, config.app.log_format)?;
    notices.iter().for_each(LoadNotice::log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = %config.dns.provider,
        domains = ?config.domains(),
        update_interval = ?config.app.update_interval,
        prune_interval = ?config.app.prune_interval,
        dry_run = config.app.dry_run,
        "Starting nomad-external-dns"
    );

    debug!(address = config.nomad.address(), "Initializing Nomad client");
    let cluster = Arc::new(NomadClient::new(&config.nomad)?);
    let provider = build_provider(&config)?;
    let app = App::new(&config, provider, cluster)?;

    let ctx = RunContext::new();
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            shutdown_signal().await;
            ctx.cancel();
        }
    });

    app.start(ctx).await;

    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown..."),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
