// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate stage: confirm the final artifact is usable and score it.

use std::sync::Arc;

use texel_core::{Clock, ConversionError, ErrorKind, JobId, StageName};

use crate::orchestrator::Orchestrator;
use crate::pipeline::PipelineState;

pub(crate) async fn run<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    state: &mut PipelineState,
) -> Result<(), ConversionError> {
    let final_path = state.final_html.clone().ok_or_else(|| {
        ConversionError::new(ErrorKind::Internal, "validate reached without final HTML")
            .stage(StageName::Validate)
    })?;

    let html = tokio::fs::read_to_string(&final_path).await.map_err(|err| {
        ConversionError::new(ErrorKind::PostProcessingFailure, err.to_string())
            .stage(StageName::Validate)
    })?;
    let report = texel_html::inspect(&html);
    if !report.has_body {
        return Err(ConversionError::new(
            ErrorKind::PostProcessingFailure,
            "final HTML has no body element",
        )
        .stage(StageName::Validate));
    }

    let empty_body = report.body_text_len == 0 && report.image_count == 0;
    if empty_body {
        state.warnings.push("document body is empty".to_string());
    }

    // Score: start from 100, charge for every degradation observed.
    let mut score: i32 = 100;
    score -= 5 * state.warnings.len() as i32;
    if state.compile_skipped {
        score -= 10;
    }
    if empty_body {
        score -= 20;
    }
    state.score = score.clamp(0, 100) as u8;

    let now = orchestrator.now();
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(StageName::Validate);
        record.diagnostics.insert("score".to_string(), state.score.to_string());
        record
            .diagnostics
            .insert("body_text_len".to_string(), report.body_text_len.to_string());
        record
            .diagnostics
            .insert("math_renderer".to_string(), report.has_math_renderer.to_string());
        job.set_stage_progress(StageName::Validate, 100, now);
    });
    state.diagnostics.insert("score".to_string(), state.score.to_string());

    Ok(())
}
