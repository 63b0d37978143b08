// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! texeld: hosts the conversion orchestration engine.
//!
//! The HTTP surface lives elsewhere; this process owns the engine
//! lifecycle — configuration, the sweeper, and graceful drain on SIGTERM /
//! SIGINT.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use texel_core::{Config, SystemClock};
use texel_engine::{spawn_sweeper, Orchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    info!(
        max_concurrent = config.max_concurrent,
        upload_root = %config.upload_root.display(),
        output_root = %config.output_root.display(),
        "starting texel conversion engine"
    );

    for root in [&config.upload_root, &config.output_root] {
        if let Err(err) = tokio::fs::create_dir_all(root).await {
            error!(root = %root.display(), %err, "cannot create data root");
            return ExitCode::FAILURE;
        }
    }

    let orchestrator = Orchestrator::new(config, SystemClock);
    let sweeper = spawn_sweeper(&orchestrator);

    if let Err(err) = wait_for_termination().await {
        error!(%err, "signal handling failed");
    }

    // Drain: no new admissions, running jobs cancelled, 30 s grace.
    orchestrator.shutdown().await;
    let _ = sweeper.await;
    info!("texeld exiting");
    ExitCode::SUCCESS
}

/// Block until SIGTERM or SIGINT arrives.
async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = term.recv() => info!("received SIGTERM"),
        _ = int.recv() => info!("received SIGINT"),
    }
    Ok(())
}
