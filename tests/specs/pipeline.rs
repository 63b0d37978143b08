// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-pipeline specs: the happy path and the compile-skipped fallback.

use super::prelude::*;

#[tokio::test]
async fn happy_path_small_input() {
    let engine = Engine::new(EngineOptions::default());
    let start = std::time::Instant::now();
    let id = engine.submit(&engine.hello_archive()).await.unwrap();

    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Completed);
    assert!(start.elapsed() < std::time::Duration::from_secs(60));

    let snapshot = engine.orchestrator.status(&id).unwrap();
    assert_eq!(snapshot.progress, 100);
    for stage in &snapshot.stages {
        assert!(
            matches!(stage.status, StageStatus::Completed | StageStatus::Skipped),
            "stage {} ended {}",
            stage.name,
            stage.status
        );
    }

    let JobOutcome::Completed(result) = engine.orchestrator.outcome(&id).unwrap() else {
        panic!("expected a completed outcome");
    };
    assert!(result.score >= 90, "score was {}", result.score);
    assert!(result.assets.is_empty());

    let html = std::fs::read_to_string(&result.html_path).unwrap();
    assert!(html.contains("Hello"));
    // The injected renderer and responsive meta are present.
    assert!(html.contains("mathjax"));
    assert!(html.contains("viewport"));
}

#[tokio::test]
async fn compile_skipped_fallback() {
    let engine = Engine::new(EngineOptions {
        compiler: COMPILER_MISSING_PKG,
        ..EngineOptions::default()
    });
    let archive = engine.archive(
        "missing-pkg.zip",
        &[(
            "main.tex",
            "\\documentclass{article}\\usepackage{siunitx}\\begin{document}x\\end{document}",
        )],
    );
    let id = engine.submit(&archive).await.unwrap();
    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Completed);

    let snapshot = engine.orchestrator.status(&id).unwrap();
    let compile = snapshot
        .stages
        .iter()
        .find(|s| s.name == StageName::Compile)
        .unwrap();
    assert_eq!(compile.status, StageStatus::Skipped);
    assert!(compile.error.is_some(), "skip reason should be recorded");

    let JobOutcome::Completed(result) = engine.orchestrator.outcome(&id).unwrap() else {
        panic!("expected a completed outcome");
    };
    assert!(result.warnings.iter().any(|w| w.contains("compilation skipped")));
    assert!(result.html_path.is_file());
}

#[tokio::test]
async fn download_bundle_packages_output() {
    let engine = Engine::new(EngineOptions::default());
    let id = engine.submit(&engine.hello_archive()).await.unwrap();

    // Not ready until the job completes.
    assert!(matches!(
        engine.orchestrator.download_bundle(&id).await,
        Err(EngineError::NotReady(_))
    ));
    assert_eq!(engine.wait_terminal(&id).await, JobStatus::Completed);

    let bundle = engine.orchestrator.download_bundle(&id).await.unwrap();
    assert!(bundle.is_file());

    let file = std::fs::File::open(&bundle).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<String> =
        (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
    assert!(names.contains(&"final.html".to_string()), "members: {names:?}");
    // A second request reuses the cached bundle.
    assert_eq!(engine.orchestrator.download_bundle(&id).await.unwrap(), bundle);
}

#[tokio::test]
async fn status_surface_serializes() {
    let engine = Engine::new(EngineOptions::default());
    let id = engine.submit(&engine.hello_archive()).await.unwrap();
    engine.wait_terminal(&id).await;

    let snapshot = engine.orchestrator.status(&id).unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["stages"].as_array().unwrap().len(), 5);
    assert!(json["created_at"].as_u64().is_some());
    assert!(json["updated_at"].as_u64().is_some());
}
