// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset conversion: PDFs and TikZ fragments become SVG siblings.
//!
//! Conversions run through the process runner with a bounded pool; any
//! failure keeps the original reference and surfaces as a warning, never as
//! a stage failure.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use texel_runner::{run, CommandPolicy, RunRequest};

/// Per-conversion tool timeout.
pub const ASSET_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound on concurrent conversions within one job.
pub const MAX_PARALLEL: usize = 4;

/// A reference to a convertible asset, as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub src: String,
}

/// Result of one conversion pass.
#[derive(Debug, Default)]
pub struct AssetOutcome {
    /// Original attribute value → rewritten value.
    pub rewrites: HashMap<String, String>,
    /// Files produced, in input order.
    pub produced: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Converts referenced PDFs and TikZ fragments to SVG.
#[derive(Debug, Clone)]
pub struct AssetConverter {
    compiler: PathBuf,
    vectorizer: PathBuf,
    policy: CommandPolicy,
}

impl AssetConverter {
    pub fn new(compiler: impl Into<PathBuf>, vectorizer: impl Into<PathBuf>) -> Self {
        let compiler = compiler.into();
        let vectorizer = vectorizer.into();
        let policy = CommandPolicy::new([
            compiler.to_string_lossy().into_owned(),
            vectorizer.to_string_lossy().into_owned(),
        ]);
        Self { compiler, vectorizer, policy }
    }

    /// Whether a reference points at something this converter handles.
    pub fn wants(src: &str) -> bool {
        if src.is_empty() || src.contains("://") || src.starts_with("data:") {
            return false;
        }
        matches!(extension_of(src).as_str(), "pdf" | "tikz" | "pgf")
    }

    /// Convert every reference, at most [`MAX_PARALLEL`] at a time.
    ///
    /// Duplicate references convert once; input order is preserved in
    /// `produced`.
    pub async fn convert_all(
        &self,
        refs: Vec<AssetRef>,
        base_dir: &Path,
        cancel: &CancellationToken,
    ) -> AssetOutcome {
        let semaphore = Arc::new(Semaphore::new(MAX_PARALLEL));
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        for reference in refs {
            if !seen.insert(reference.src.clone()) {
                continue;
            }
            let converter = self.clone();
            let base_dir = base_dir.to_path_buf();
            let cancel = cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            let src = reference.src;
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                let result = converter.convert_one(&src, &base_dir, &cancel).await;
                (src, result)
            }));
        }

        let mut outcome = AssetOutcome::default();
        for handle in handles {
            let Ok((src, result)) = handle.await else { continue };
            match result {
                Ok(svg) => {
                    outcome.rewrites.insert(src.clone(), swap_extension(&src));
                    outcome.produced.push(svg);
                }
                Err(why) => {
                    tracing::warn!(asset = %src, %why, "asset conversion failed");
                    outcome.warnings.push(format!(
                        "asset {src}: {why}; keeping original reference"
                    ));
                }
            }
        }
        outcome
    }

    async fn convert_one(
        &self,
        src: &str,
        base_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, String> {
        let source = if Path::new(src).is_absolute() {
            PathBuf::from(src)
        } else {
            base_dir.join(src)
        };
        if !source.is_file() {
            return Err(format!("source file {} not found", source.display()));
        }
        match extension_of(src).as_str() {
            "pdf" => self.pdf_to_svg(&source, cancel).await,
            "tikz" | "pgf" => self.tikz_to_svg(&source, cancel).await,
            other => Err(format!("unsupported asset extension {other:?}")),
        }
    }

    /// First page of a PDF to SVG; on failure, fall back to rasterizing and
    /// wrapping the raster as an embedded image.
    async fn pdf_to_svg(&self, pdf: &Path, cancel: &CancellationToken) -> Result<PathBuf, String> {
        let target = pdf.with_extension("svg");
        let outcome = self
            .invoke(
                vec![
                    self.vectorizer.to_string_lossy().into_owned(),
                    "-svg".to_string(),
                    "-f".to_string(),
                    "1".to_string(),
                    "-l".to_string(),
                    "1".to_string(),
                    pdf.to_string_lossy().into_owned(),
                    target.to_string_lossy().into_owned(),
                ],
                pdf.parent().unwrap_or(Path::new(".")),
                cancel,
            )
            .await?;
        if outcome && target.is_file() {
            return Ok(target);
        }
        self.raster_fallback(pdf, &target, cancel).await
    }

    async fn raster_fallback(
        &self,
        pdf: &Path,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, String> {
        let prefix = pdf.with_extension("");
        let ok = self
            .invoke(
                vec![
                    self.vectorizer.to_string_lossy().into_owned(),
                    "-png".to_string(),
                    "-singlefile".to_string(),
                    "-f".to_string(),
                    "1".to_string(),
                    "-l".to_string(),
                    "1".to_string(),
                    pdf.to_string_lossy().into_owned(),
                    prefix.to_string_lossy().into_owned(),
                ],
                pdf.parent().unwrap_or(Path::new(".")),
                cancel,
            )
            .await?;
        let png = prefix.with_extension("png");
        if !ok || !png.is_file() {
            return Err("vector and raster conversion both failed".to_string());
        }
        let png_name = png
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\">\
             <image xlink:href=\"{png_name}\"/></svg>"
        );
        std::fs::write(target, svg).map_err(|e| e.to_string())?;
        Ok(target.to_path_buf())
    }

    /// Compile a TikZ fragment with a minimal standalone preamble, then
    /// vectorize the resulting PDF.
    async fn tikz_to_svg(
        &self,
        fragment: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, String> {
        let body = std::fs::read_to_string(fragment).map_err(|e| e.to_string())?;
        let parent = fragment.parent().unwrap_or(Path::new("."));
        let stem = fragment
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fragment".to_string());
        let build_dir = parent.join(format!(".tikz-build-{stem}"));
        std::fs::create_dir_all(&build_dir).map_err(|e| e.to_string())?;

        let wrapper = build_dir.join("wrapper.tex");
        let preamble = format!(
            "\\documentclass[tikz]{{standalone}}\n\
             \\usepackage{{pgfplots}}\n\
             \\begin{{document}}\n{body}\n\\end{{document}}\n"
        );
        std::fs::write(&wrapper, preamble).map_err(|e| e.to_string())?;

        let compiled = self
            .invoke(
                vec![
                    self.compiler.to_string_lossy().into_owned(),
                    "-interaction=nonstopmode".to_string(),
                    "-halt-on-error".to_string(),
                    "-no-shell-escape".to_string(),
                    format!("-output-directory={}", build_dir.display()),
                    wrapper.to_string_lossy().into_owned(),
                ],
                &build_dir,
                cancel,
            )
            .await;

        let pdf = build_dir.join("wrapper.pdf");
        let result = match compiled {
            Ok(true) if pdf.is_file() => {
                let target = fragment.with_extension("svg");
                let vectorized = self
                    .invoke(
                        vec![
                            self.vectorizer.to_string_lossy().into_owned(),
                            "-svg".to_string(),
                            "-f".to_string(),
                            "1".to_string(),
                            "-l".to_string(),
                            "1".to_string(),
                            pdf.to_string_lossy().into_owned(),
                            target.to_string_lossy().into_owned(),
                        ],
                        parent,
                        cancel,
                    )
                    .await;
                match vectorized {
                    Ok(true) if target.is_file() => Ok(target),
                    Ok(_) => Err("vectorizing compiled fragment failed".to_string()),
                    Err(why) => Err(why),
                }
            }
            Ok(_) => Err("fragment compilation failed".to_string()),
            Err(why) => Err(why),
        };

        // The scratch dir is disposable either way.
        let _ = std::fs::remove_dir_all(&build_dir);
        result
    }

    /// Run one tool invocation; `Ok(true)` means clean exit.
    async fn invoke(
        &self,
        argv: Vec<String>,
        cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<bool, String> {
        let request = RunRequest::new(argv, cwd.to_path_buf(), ASSET_TIMEOUT)
            .cancel(cancel.clone());
        match run(&self.policy, request).await {
            Ok(outcome) => Ok(outcome.success()),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn extension_of(src: &str) -> String {
    Path::new(src)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// `figs/plot.pdf` → `figs/plot.svg`, preserving the directory part.
fn swap_extension(src: &str) -> String {
    Path::new(src).with_extension("svg").to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
