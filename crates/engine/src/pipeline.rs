// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job worker: drives the five stages in order under the job's budget.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use texel_core::{
    Clock, ConversionError, ConversionResult, ErrorKind, Job, JobId, JobOptions, JobStatus,
    StageName, StageStatus,
};
use texel_ingest::{ProjectStructure, TimeoutBudget};

use crate::orchestrator::Orchestrator;
use crate::stages;

/// Depth bound for every project walk.
pub(crate) const MAX_WALK_DEPTH: usize = 12;

/// Mutable state threaded through the stages of one job.
pub(crate) struct PipelineState {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub options: JobOptions,
    pub archive_path: PathBuf,
    pub extract_root: PathBuf,
    pub project: Option<ProjectStructure>,
    pub compile_skipped: bool,
    pub converter_html: Option<PathBuf>,
    pub final_html: Option<PathBuf>,
    pub assets: Vec<PathBuf>,
    pub warnings: Vec<String>,
    /// Merged diagnostics surfaced in the final result.
    pub diagnostics: BTreeMap<String, String>,
    pub score: u8,
}

impl PipelineState {
    fn new(job: &Job) -> Self {
        Self {
            archive_path: job.work_dir.join(&job.source_filename),
            extract_root: job.work_dir.join("extracted"),
            work_dir: job.work_dir.clone(),
            output_dir: job.output_dir.clone(),
            options: job.options.clone(),
            project: None,
            compile_skipped: false,
            converter_html: None,
            final_html: None,
            assets: Vec::new(),
            warnings: Vec::new(),
            diagnostics: BTreeMap::new(),
            score: 0,
        }
    }
}

/// Why the pipeline stopped early.
enum PipelineEnd {
    Cancelled,
    Failed(ConversionError),
}

/// Entry point for the worker task owning one job.
pub(crate) async fn run_job<C: Clock>(
    orchestrator: Arc<Orchestrator<C>>,
    id: JobId,
    cancel: CancellationToken,
) {
    let started = orchestrator.now();
    let proceed = orchestrator
        .registry()
        .with_job(&id, |job| job.transition(JobStatus::Running, started))
        .unwrap_or(false);
    if !proceed {
        // Cancelled between admission and dispatch.
        tracing::debug!(job_id = %id, "job no longer runnable; worker standing down");
        orchestrator.finish_job(&id);
        return;
    }

    let Some(job) = orchestrator.registry().job_clone(&id) else {
        orchestrator.finish_job(&id);
        return;
    };
    let mut state = PipelineState::new(&job);

    let end = drive(&orchestrator, &id, &cancel, &mut state, started).await;
    let now = orchestrator.now();
    orchestrator.registry().with_job(&id, |job| {
        job.warnings = state.warnings.clone();
        match &end {
            Ok(result) => {
                job.result = Some(result.clone());
                job.transition(JobStatus::Completed, now);
            }
            Err(PipelineEnd::Cancelled) => {
                if job.error.is_none() {
                    job.error = Some(ConversionError::new(
                        ErrorKind::Cancelled,
                        "cancelled by request",
                    ));
                }
                job.transition(JobStatus::Cancelled, now);
            }
            Err(PipelineEnd::Failed(error)) => {
                job.error = Some(error.clone());
                job.transition(JobStatus::Failed, now);
            }
        }
    });
    orchestrator.finish_job(&id);

    match &end {
        Ok(result) => {
            tracing::info!(job_id = %id, score = result.score, "conversion completed");
        }
        Err(PipelineEnd::Cancelled) => tracing::info!(job_id = %id, "conversion cancelled"),
        Err(PipelineEnd::Failed(error)) => {
            tracing::warn!(job_id = %id, kind = %error.kind, "conversion failed: {}", error.message);
        }
    }
}

async fn drive<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    cancel: &CancellationToken,
    state: &mut PipelineState,
    started_ms: u64,
) -> Result<ConversionResult, PipelineEnd> {
    for stage in StageName::ALL {
        if cancel.is_cancelled() {
            return Err(PipelineEnd::Cancelled);
        }

        let budget_secs = orchestrator
            .registry()
            .with_job(id, |job| job.timeout_secs)
            .unwrap_or(600);
        let elapsed_ms = orchestrator.now().saturating_sub(started_ms);
        let total_ms = budget_secs.saturating_mul(1000);
        if elapsed_ms >= total_ms {
            let error = budget_error(stage);
            fail_stage(orchestrator, id, stage, &error);
            return Err(PipelineEnd::Failed(error));
        }
        let remaining = Duration::from_millis(total_ms - elapsed_ms);
        // Conversion is capped at its 60% share; other stages may use
        // whatever budget is left.
        let stage_timeout = match stage {
            StageName::Convert => TimeoutBudget::split(budget_secs).convert.min(remaining),
            _ => remaining,
        };

        let now = orchestrator.now();
        orchestrator.registry().with_job(id, |job| job.begin_stage(stage, now));
        tracing::debug!(job_id = %id, %stage, timeout_secs = stage_timeout.as_secs(), "stage starting");

        let outcome = tokio::time::timeout(
            stage_timeout,
            execute_stage(orchestrator, id, stage, state, cancel, stage_timeout),
        )
        .await;

        match outcome {
            Err(_) => {
                // The stage future itself overran; the runner's own timeout
                // normally fires first, so this is the budget backstop.
                let error = budget_error(stage);
                fail_stage(orchestrator, id, stage, &error);
                return Err(PipelineEnd::Failed(error));
            }
            Ok(Err(error)) if error.kind == ErrorKind::Cancelled || cancel.is_cancelled() => {
                fail_stage(orchestrator, id, stage, &error);
                return Err(PipelineEnd::Cancelled);
            }
            Ok(Err(error)) if stage == StageName::Compile => {
                // The one recoverable stage: record, warn, move on.
                let warning = format!("compilation skipped: {}", error.message);
                state.warnings.push(warning.clone());
                state.compile_skipped = true;
                let now = orchestrator.now();
                orchestrator.registry().with_job(id, |job| {
                    let record = job.stage_mut(StageName::Compile);
                    record.error = Some(error.message.clone());
                    job.finish_stage(StageName::Compile, StageStatus::Skipped, now);
                });
                tracing::info!(job_id = %id, "compile failed; continuing without PDF artifacts");
            }
            Ok(Err(error)) => {
                fail_stage(orchestrator, id, stage, &error);
                return Err(PipelineEnd::Failed(error));
            }
            Ok(Ok(())) => {
                let now = orchestrator.now();
                orchestrator
                    .registry()
                    .with_job(id, |job| job.finish_stage(stage, StageStatus::Completed, now));
            }
        }
    }

    Ok(ConversionResult {
        html_path: state
            .final_html
            .clone()
            .unwrap_or_else(|| state.output_dir.join("final.html")),
        assets: state.assets.clone(),
        score: state.score,
        warnings: state.warnings.clone(),
        diagnostics: state.diagnostics.clone(),
    })
}

async fn execute_stage<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    stage: StageName,
    state: &mut PipelineState,
    cancel: &CancellationToken,
    stage_timeout: Duration,
) -> Result<(), ConversionError> {
    match stage {
        StageName::Analyze => stages::analyze::run(orchestrator, id, state, cancel).await,
        StageName::Compile => {
            stages::compile::run(orchestrator, id, state, cancel, stage_timeout).await
        }
        StageName::Convert => {
            stages::convert::run(orchestrator, id, state, cancel, stage_timeout).await
        }
        StageName::Postprocess => stages::postprocess::run(orchestrator, id, state, cancel).await,
        StageName::Validate => stages::validate::run(orchestrator, id, state).await,
    }
}

fn budget_error(stage: StageName) -> ConversionError {
    ConversionError::new(
        ErrorKind::TimeoutExceeded,
        "job exceeded its processing budget",
    )
    .stage(stage)
}

fn fail_stage<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    stage: StageName,
    error: &ConversionError,
) {
    let now = orchestrator.now();
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(stage);
        record.error = Some(error.message.clone());
        job.finish_stage(stage, StageStatus::Failed, now);
    });
}
