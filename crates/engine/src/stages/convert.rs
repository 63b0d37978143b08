// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Convert stage: invoke the TeX→HTML converter with discovered search
//! paths. Non-zero exit is fatal for the job.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use texel_core::{Clock, ConversionError, ErrorKind, JobId, StageName};
use texel_ingest::scan;
use texel_runner::{run as run_command, CommandPolicy, RunRequest};

use crate::orchestrator::Orchestrator;
use crate::pipeline::{PipelineState, MAX_WALK_DEPTH};
use crate::stages::tool_timeout;

/// Modules pre-loaded into the converter for every job.
const PRELOAD_MODULES: [&str; 4] = ["amsmath", "amssymb", "graphicx", "overpic"];

/// How many ancestor levels of a supporting file feed the search path.
const ANCESTOR_LEVELS: usize = 5;

pub(crate) async fn run<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    state: &mut PipelineState,
    cancel: &CancellationToken,
    stage_timeout: Duration,
) -> Result<(), ConversionError> {
    let project = state.project.as_ref().ok_or_else(|| {
        ConversionError::new(ErrorKind::Internal, "convert reached without analysis")
            .stage(StageName::Convert)
    })?;

    let dest_dir = state.output_dir.join("converter");
    tokio::fs::create_dir_all(&dest_dir).await.map_err(|err| {
        ConversionError::new(ErrorKind::Internal, err.to_string()).stage(StageName::Convert)
    })?;
    let dest = dest_dir.join("index.html");

    let search_paths = search_paths(&state.extract_root, project);
    let converter = orchestrator.config().converter_path.to_string_lossy().into_owned();
    let mut argv = vec![
        converter.clone(),
        project.main_source.to_string_lossy().into_owned(),
        format!("--dest={}", dest.display()),
        "--nocomments".to_string(),
        "--cache".to_string(),
        "--parallel=4".to_string(),
    ];
    for module in PRELOAD_MODULES {
        argv.push(format!("--preload={module}"));
    }
    for path in &search_paths {
        argv.push(format!("--path={}", path.display()));
    }

    let cwd = project
        .main_source
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let policy = CommandPolicy::new([converter]);
    let request = RunRequest::new(argv, cwd, tool_timeout(stage_timeout)).cancel(cancel.clone());
    let outcome = run_command(&policy, request).await.map_err(|err| {
        ConversionError::new(ErrorKind::ConverterFailure, err.to_string())
            .stage(StageName::Convert)
    })?;

    let now = orchestrator.now();
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(StageName::Convert);
        record.diagnostics.insert("exit_code".to_string(), outcome.exit_code.to_string());
        record
            .diagnostics
            .insert("duration_ms".to_string(), outcome.duration.as_millis().to_string());
        record
            .diagnostics
            .insert("search_paths".to_string(), search_paths.len().to_string());
        job.set_stage_progress(StageName::Convert, 90, now);
    });

    if outcome.cancelled {
        return Err(ConversionError::new(ErrorKind::Cancelled, "conversion cancelled")
            .stage(StageName::Convert));
    }
    if outcome.timed_out {
        return Err(ConversionError::new(
            ErrorKind::ConverterFailure,
            "converter timed out",
        )
        .stage(StageName::Convert)
        .with_stderr(&outcome.stderr));
    }
    if !outcome.success() {
        return Err(ConversionError::new(
            ErrorKind::ConverterFailure,
            format!("converter exited with code {}", outcome.exit_code),
        )
        .stage(StageName::Convert)
        .with_stderr(&outcome.stderr));
    }
    if !dest.is_file() {
        return Err(ConversionError::new(
            ErrorKind::ConverterFailure,
            "converter reported success but produced no HTML",
        )
        .stage(StageName::Convert)
        .with_stderr(&outcome.stderr));
    }

    state.converter_html = Some(dest);
    Ok(())
}

/// Search paths: the project directory, ancestors of every supporting
/// source (bounded), and every subdirectory of the extraction root.
fn search_paths(extract_root: &Path, project: &texel_ingest::ProjectStructure) -> Vec<PathBuf> {
    let mut ordered = Vec::new();
    let mut seen = BTreeSet::new();
    let mut push = |path: PathBuf, ordered: &mut Vec<PathBuf>| {
        if seen.insert(path.clone()) {
            ordered.push(path);
        }
    };

    if let Some(parent) = project.main_source.parent() {
        push(parent.to_path_buf(), &mut ordered);
    }
    for source in &project.sources {
        let mut cursor = source.parent();
        for _ in 0..ANCESTOR_LEVELS {
            match cursor {
                Some(dir) if dir.starts_with(extract_root) => {
                    push(dir.to_path_buf(), &mut ordered);
                    cursor = dir.parent();
                }
                _ => break,
            }
        }
    }
    for dir in scan::subdirectories(extract_root, Some(MAX_WALK_DEPTH)) {
        push(dir, &mut ordered);
    }
    ordered
}
