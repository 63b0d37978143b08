// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compile stage: invoke the LaTeX compiler. Failure here is recoverable —
//! the pipeline records it and proceeds to conversion without PDF artifacts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use texel_core::{Clock, ConversionError, ErrorKind, JobId, StageName};
use texel_runner::{run as run_command, CommandPolicy, RunRequest};

use crate::orchestrator::Orchestrator;
use crate::pipeline::PipelineState;
use crate::stages::tool_timeout;

pub(crate) async fn run<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    state: &mut PipelineState,
    cancel: &CancellationToken,
    stage_timeout: Duration,
) -> Result<(), ConversionError> {
    let project = state.project.as_ref().ok_or_else(|| {
        ConversionError::new(ErrorKind::Internal, "compile reached without analysis")
            .stage(StageName::Compile)
    })?;

    let compiler = orchestrator.config().compiler_path.to_string_lossy().into_owned();
    let out_dir = state.output_dir.join("compiler");
    tokio::fs::create_dir_all(&out_dir).await.map_err(|err| {
        ConversionError::new(ErrorKind::Internal, err.to_string()).stage(StageName::Compile)
    })?;

    let main = project.main_source.clone();
    let cwd = main.parent().unwrap_or(Path::new(".")).to_path_buf();
    let argv = vec![
        compiler.clone(),
        "-interaction=nonstopmode".to_string(),
        "-halt-on-error".to_string(),
        "-no-shell-escape".to_string(),
        format!("-output-directory={}", out_dir.display()),
        main.to_string_lossy().into_owned(),
    ];

    let policy = CommandPolicy::new([compiler]);
    let request = RunRequest::new(argv, cwd, tool_timeout(stage_timeout)).cancel(cancel.clone());
    let outcome = run_command(&policy, request).await.map_err(|err| {
        ConversionError::new(ErrorKind::CompilerFailure, err.to_string())
            .stage(StageName::Compile)
    })?;

    let now = orchestrator.now();
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(StageName::Compile);
        record.diagnostics.insert("exit_code".to_string(), outcome.exit_code.to_string());
        record
            .diagnostics
            .insert("duration_ms".to_string(), outcome.duration.as_millis().to_string());
        if !outcome.stderr.is_empty() {
            record.diagnostics.insert(
                "stderr".to_string(),
                texel_core::truncate_tail(&outcome.stderr, texel_core::STDERR_CAP),
            );
        }
        job.set_stage_progress(StageName::Compile, 90, now);
    });

    if outcome.cancelled {
        return Err(ConversionError::new(ErrorKind::Cancelled, "compile cancelled")
            .stage(StageName::Compile));
    }
    if !outcome.success() {
        // LaTeX reports errors on stdout; fold both streams into the
        // diagnosis so suggestions can key off either.
        let detail = if outcome.stderr.trim().is_empty() {
            outcome.stdout.clone()
        } else {
            outcome.stderr.clone()
        };
        return Err(ConversionError::new(
            ErrorKind::CompilerFailure,
            format!("compiler exited with code {}", outcome.exit_code),
        )
        .stage(StageName::Compile)
        .with_stderr(&detail));
    }

    Ok(())
}
