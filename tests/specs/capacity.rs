// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission-control specs.

use super::prelude::*;

#[tokio::test]
async fn third_submission_is_rejected_at_cap_two() {
    let engine = Engine::new(EngineOptions {
        max_concurrent: 2,
        converter: CONVERTER_SLOW,
        ..EngineOptions::default()
    });

    let first = engine.submit(&engine.hello_archive()).await.unwrap();
    let second = engine.submit(&engine.hello_archive()).await.unwrap();
    assert_ne!(first, second);

    let err = engine.submit(&engine.hello_archive()).await.unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded));
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

    // The rejected submission left no directory behind.
    let uploads: Vec<_> = std::fs::read_dir(engine.dir.path().join("uploads"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(uploads.len(), 2);

    // The registry never counts more than the cap as active.
    assert!(engine.orchestrator.registry().active_count() <= 2);

    for id in [&first, &second] {
        engine.orchestrator.cancel(id).unwrap();
        engine.wait_terminal(id).await;
    }
}

#[tokio::test]
async fn capacity_frees_after_completion() {
    let engine = Engine::new(EngineOptions { max_concurrent: 1, ..EngineOptions::default() });

    let first = engine.submit(&engine.hello_archive()).await.unwrap();
    assert_eq!(engine.wait_terminal(&first).await, JobStatus::Completed);

    // Terminal jobs stop counting toward admission.
    let second = engine.submit(&engine.hello_archive()).await.unwrap();
    assert_eq!(engine.wait_terminal(&second).await, JobStatus::Completed);
}
