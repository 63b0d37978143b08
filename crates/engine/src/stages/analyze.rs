// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analyze stage: extraction, project discovery, package availability,
//! budget refinement.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use texel_core::{Clock, ConversionError, ErrorKind, JobId, StageName};
use texel_ingest::{analyze, extract, ExtractLimits, IngestError};

use crate::orchestrator::Orchestrator;
use crate::pipeline::{PipelineState, MAX_WALK_DEPTH};

pub(crate) async fn run<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    state: &mut PipelineState,
    cancel: &CancellationToken,
) -> Result<(), ConversionError> {
    let limits = ExtractLimits { max_depth: MAX_WALK_DEPTH, ..ExtractLimits::default() };
    let extraction = extract(&state.archive_path, &state.extract_root, &limits)
        .await
        .map_err(|err| ingest_error(err, StageName::Analyze))?;
    orchestrator.registry().with_job(id, |job| {
        job.set_stage_progress(StageName::Analyze, 40, orchestrator.now());
        let record = job.stage_mut(StageName::Analyze);
        record.diagnostics.insert("members".to_string(), extraction.member_count.to_string());
        record
            .diagnostics
            .insert("extracted_bytes".to_string(), extraction.total_bytes.to_string());
    });

    let structure = analyze(&state.extract_root, Some(MAX_WALK_DEPTH))
        .map_err(|err| ingest_error(err, StageName::Analyze))?;

    // Refine the budget now that the real input totals are known. The
    // caller-supplied ceiling still applies.
    let base = orchestrator.config().default_timeout.as_secs();
    let ceiling = orchestrator.config().max_timeout.as_secs();
    let now = orchestrator.now();
    if let Ok(budget) =
        orchestrator.budget_cache.budget_for(&state.extract_root, base, ceiling, now)
    {
        let capped = state.options.cap_timeout(budget);
        orchestrator.registry().with_job(id, |job| {
            job.timeout_secs = capped;
            job.set_stage_progress(StageName::Analyze, 70, now);
        });
    }

    // Best-effort package availability; never fails the stage.
    let report = orchestrator
        .installer
        .ensure_available(&structure.packages, &state.extract_root, now, cancel)
        .await;
    if !report.failed.is_empty() {
        state
            .warnings
            .push(format!("packages unavailable: {}", report.failed.join(", ")));
    }

    let main_display = structure.main_source.display().to_string();
    state.diagnostics.insert("main_source".to_string(), main_display.clone());
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(StageName::Analyze);
        record.diagnostics.insert("main_source".to_string(), main_display);
        record.diagnostics.insert("packages".to_string(), report.summary());
        if let Some(class) = &structure.document_class {
            record.diagnostics.insert("document_class".to_string(), class.clone());
        }
    });

    state.project = Some(structure);
    Ok(())
}

fn ingest_error(err: IngestError, stage: StageName) -> ConversionError {
    let kind = match &err {
        IngestError::NoMainSource => ErrorKind::NoMainSource,
        IngestError::Io(_) => ErrorKind::Internal,
        // Policy refusals, malformed containers, and the extraction
        // deadline all classify as an unsafe submission.
        _ => ErrorKind::UnsafeArchive,
    };
    ConversionError::new(kind, err.to_string()).stage(stage)
}
