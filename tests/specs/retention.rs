// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention and cleanup specs.

use super::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn terminal_jobs_are_cleaned_after_retention() {
    let engine = Engine::new(EngineOptions::default());
    let id = engine.submit(&engine.hello_archive()).await.unwrap();
    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Completed);

    let job = engine.orchestrator.registry().job_clone(&id).unwrap();
    assert!(job.work_dir.exists());
    assert!(job.output_dir.exists());

    // Within retention: untouched.
    engine.clock.advance(Duration::from_secs(3600));
    assert_eq!(engine.orchestrator.sweep_once(), 0);
    assert!(job.work_dir.exists());

    // Past retention: status flips to cleaned and directories are gone.
    engine.clock.advance(Duration::from_secs(24 * 3600));
    assert_eq!(engine.orchestrator.sweep_once(), 1);
    assert_eq!(engine.job_status(&id), JobStatus::Cleaned);
    assert!(!job.work_dir.exists());
    assert!(!job.output_dir.exists());

    // The record itself remains queryable after cleaning.
    let snapshot = engine.orchestrator.status(&id).unwrap();
    assert_eq!(snapshot.status, JobStatus::Cleaned);
}

#[tokio::test]
async fn cancelled_artifacts_survive_until_sweep() {
    let engine = Engine::new(EngineOptions {
        converter: CONVERTER_SLOW,
        ..EngineOptions::default()
    });
    let id = engine.submit(&engine.hello_archive()).await.unwrap();
    engine.orchestrator.cancel(&id).unwrap();
    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Cancelled);

    let job = engine.orchestrator.registry().job_clone(&id).unwrap();
    assert!(job.work_dir.exists(), "partial artifacts stay inspectable");

    engine.clock.advance(Duration::from_secs(25 * 3600));
    assert_eq!(engine.orchestrator.sweep_once(), 1);
    assert!(!job.work_dir.exists());
    assert_eq!(engine.job_status(&id), JobStatus::Cleaned);
}
