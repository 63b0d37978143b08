// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::*;
use std::time::Duration;
use texel_core::{JobOptions, JobStatus};

#[tokio::test]
async fn sweep_cleans_expired_terminal_jobs() {
    let harness = Harness::new(HarnessOptions::default());
    let id = harness
        .orchestrator
        .submit(&harness.hello_archive(), JobOptions::default())
        .await
        .unwrap();
    assert!(
        wait_for(10_000, {
            let orchestrator = std::sync::Arc::clone(&harness.orchestrator);
            let id = id.clone();
            move || {
                orchestrator
                    .registry()
                    .job_clone(&id)
                    .map(|j| j.status.is_terminal())
                    .unwrap_or(false)
            }
        })
        .await
    );

    let job = harness.orchestrator.registry().job_clone(&id).unwrap();
    assert!(job.work_dir.exists());
    assert!(job.output_dir.exists());

    // Inside the retention window nothing is reclaimed.
    assert_eq!(harness.orchestrator.sweep_once(), 0);

    harness.clock.advance(Duration::from_secs(25 * 3600));
    assert_eq!(harness.orchestrator.sweep_once(), 1);

    let job = harness.orchestrator.registry().job_clone(&id).unwrap();
    assert_eq!(job.status, JobStatus::Cleaned);
    assert!(!job.work_dir.exists());
    assert!(!job.output_dir.exists());

    // Idempotent: a second sweep finds nothing.
    assert_eq!(harness.orchestrator.sweep_once(), 0);
}

#[tokio::test]
async fn sweep_ignores_active_jobs() {
    let harness = Harness::new(HarnessOptions {
        converter: CONVERTER_SLOW,
        ..HarnessOptions::default()
    });
    let id = harness
        .orchestrator
        .submit(&harness.hello_archive(), JobOptions::default())
        .await
        .unwrap();

    harness.clock.advance(Duration::from_secs(48 * 3600));
    assert_eq!(harness.orchestrator.sweep_once(), 0);
    let job = harness.orchestrator.registry().job_clone(&id).unwrap();
    assert!(!job.status.is_terminal());

    harness.orchestrator.cancel(&id).unwrap();
    assert!(
        wait_for(10_000, {
            let orchestrator = std::sync::Arc::clone(&harness.orchestrator);
            let id = id.clone();
            move || {
                orchestrator
                    .registry()
                    .job_clone(&id)
                    .map(|j| j.status.is_terminal())
                    .unwrap_or(false)
            }
        })
        .await
    );

    // Cancelled artifacts persist until the retention window passes.
    let job = harness.orchestrator.registry().job_clone(&id).unwrap();
    assert!(job.work_dir.exists());
    harness.clock.advance(Duration::from_secs(25 * 3600));
    assert_eq!(harness.orchestrator.sweep_once(), 1);
    assert!(!job.work_dir.exists());
}

#[tokio::test]
async fn sweeper_task_stops_on_shutdown() {
    let harness = Harness::new(HarnessOptions::default());
    let handle = spawn_sweeper(&harness.orchestrator);
    harness.orchestrator.shutdown().await;
    // The loop observes the shutdown token and exits.
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop")
        .expect("sweeper should not panic");
}
