// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background cleanup sweeper.
//!
//! A single task wakes every sweep interval, transitions terminal jobs past
//! the retention window to `cleaned`, and deletes their directories.
//! Deletion failures are logged, never raised.

use std::sync::Arc;

use texel_core::Clock;

use crate::orchestrator::Orchestrator;

/// Spawn the sweeper loop. It stops when the orchestrator shuts down.
pub fn spawn_sweeper<C: Clock>(orchestrator: &Arc<Orchestrator<C>>) -> tokio::task::JoinHandle<()> {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        let interval = orchestrator.config().sweep_interval;
        tracing::debug!(interval_secs = interval.as_secs(), "sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let cleaned = orchestrator.sweep_once();
                    if cleaned > 0 {
                        tracing::info!(cleaned, "sweep reclaimed expired jobs");
                    }
                }
                _ = orchestrator.shutdown_token().cancelled() => {
                    tracing::debug!("sweeper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
