// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-process stage: apply the transformation set to the converter's HTML
//! and assemble the final artifact layout.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use texel_core::{Clock, ConversionError, ErrorKind, JobId, StageName};

use crate::orchestrator::Orchestrator;
use crate::pipeline::PipelineState;

pub(crate) async fn run<C: Clock>(
    orchestrator: &Arc<Orchestrator<C>>,
    id: &JobId,
    state: &mut PipelineState,
    cancel: &CancellationToken,
) -> Result<(), ConversionError> {
    let converter_html = state.converter_html.clone().ok_or_else(|| {
        ConversionError::new(ErrorKind::Internal, "postprocess reached without converter output")
            .stage(StageName::Postprocess)
    })?;
    let converter_dir = converter_html
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let raw = tokio::fs::read_to_string(&converter_html).await.map_err(|err| {
        ConversionError::new(ErrorKind::PostProcessingFailure, err.to_string())
            .stage(StageName::Postprocess)
    })?;

    let outcome = orchestrator
        .postprocessor
        .process(
            &raw,
            &converter_dir,
            &orchestrator.asset_converter,
            state.options.skip_images,
            cancel,
        )
        .await
        .map_err(|err| {
            ConversionError::new(ErrorKind::PostProcessingFailure, err.to_string())
                .stage(StageName::Postprocess)
        })?;

    if cancel.is_cancelled() {
        return Err(ConversionError::new(ErrorKind::Cancelled, "postprocess cancelled")
            .stage(StageName::Postprocess));
    }

    // Relocate referenced assets into the final `assets/` subtree and write
    // the artifact.
    let (final_html, relocated) =
        relocate(&outcome.html, &converter_dir, &state.output_dir).map_err(|err| {
            ConversionError::new(ErrorKind::PostProcessingFailure, err.to_string())
                .stage(StageName::Postprocess)
        })?;
    let final_path = state.output_dir.join("final.html");
    tokio::fs::write(&final_path, final_html).await.map_err(|err| {
        ConversionError::new(ErrorKind::PostProcessingFailure, err.to_string())
            .stage(StageName::Postprocess)
    })?;

    state.warnings.extend(outcome.warnings.iter().cloned());
    for (key, value) in &outcome.diagnostics {
        state.diagnostics.insert(key.clone(), value.clone());
    }
    state.assets = relocated;
    state.final_html = Some(final_path);

    let now = orchestrator.now();
    orchestrator.registry().with_job(id, |job| {
        let record = job.stage_mut(StageName::Postprocess);
        for (key, value) in &outcome.diagnostics {
            record.diagnostics.insert(key.clone(), value.clone());
        }
        job.set_stage_progress(StageName::Postprocess, 95, now);
    });

    Ok(())
}

/// Synchronous DOM scope for relocation; keeps non-Send trees off awaits.
fn relocate(
    html: &str,
    converter_dir: &Path,
    output_dir: &Path,
) -> std::io::Result<(String, Vec<std::path::PathBuf>)> {
    let document = texel_html::dom::parse_document(html);
    let relocated = texel_html::relocate_assets(&document, converter_dir, output_dir)?;
    let serialized = texel_html::dom::serialize(&document)
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok((serialized, relocated))
}
