// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation specs.

use super::prelude::*;

#[tokio::test]
async fn cancel_during_conversion_terminates_within_grace() {
    let engine = Engine::new(EngineOptions {
        converter: CONVERTER_SLOW,
        ..EngineOptions::default()
    });
    let id = engine.submit(&engine.hello_archive()).await.unwrap();

    // Wait for the convert stage to report running.
    let probe_id = id.clone();
    let orchestrator = std::sync::Arc::clone(&engine.orchestrator);
    let converting = wait_for(15_000, move || {
        orchestrator
            .status(&probe_id)
            .ok()
            .and_then(|s| {
                s.stages.iter().find(|st| st.name == StageName::Convert).map(|st| st.status)
            })
            .map(|status| status == StageStatus::Running)
            .unwrap_or(false)
    })
    .await;
    assert!(converting, "convert stage should report running");

    let begun = std::time::Instant::now();
    engine.orchestrator.cancel(&id).unwrap();
    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Cancelled);
    assert!(
        begun.elapsed() <= std::time::Duration::from_secs(6),
        "cancel took {:?}",
        begun.elapsed()
    );

    // Partial artifacts remain for inspection until the sweeper runs.
    let job = engine.orchestrator.registry().job_clone(&id).unwrap();
    assert!(job.work_dir.exists());
    assert!(job.output_dir.exists());

    let JobOutcome::Failed(error) = engine.orchestrator.outcome(&id).unwrap() else {
        panic!("cancelled job must not expose a success payload");
    };
    assert_eq!(error.kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn double_cancel_is_indistinguishable_from_single() {
    let slow = Engine::new(EngineOptions {
        converter: CONVERTER_SLOW,
        ..EngineOptions::default()
    });

    let once = slow.submit(&slow.hello_archive()).await.unwrap();
    slow.orchestrator.cancel(&once).unwrap();
    slow.wait_terminal(&once).await;

    let twice = slow.submit(&slow.hello_archive()).await.unwrap();
    slow.orchestrator.cancel(&twice).unwrap();
    slow.orchestrator.cancel(&twice).unwrap();
    slow.wait_terminal(&twice).await;

    let a = slow.orchestrator.registry().job_clone(&once).unwrap();
    let b = slow.orchestrator.registry().job_clone(&twice).unwrap();
    assert_eq!(a.status, JobStatus::Cancelled);
    assert_eq!(b.status, JobStatus::Cancelled);
    assert_eq!(a.status, b.status);
}

#[tokio::test]
async fn cancelled_job_never_completes() {
    let engine = Engine::new(EngineOptions {
        converter: CONVERTER_SLOW,
        ..EngineOptions::default()
    });
    let id = engine.submit(&engine.hello_archive()).await.unwrap();
    engine.orchestrator.cancel(&id).unwrap();
    let status = engine.wait_terminal(&id).await;
    assert_eq!(status, JobStatus::Cancelled);

    // Give any straggling worker activity a moment, then re-check.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(engine.job_status(&id), JobStatus::Cancelled);
}
