// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed post-processing transformation set, applied in order:
//! parse → sanitize → asset conversion → citation repair → equation
//! merging → path normalization → math renderer injection → cleanup.
//!
//! The whole pass is idempotent: running it over its own output changes
//! nothing.

use std::collections::HashMap;
use std::path::Path;

use kuchikiki::NodeRef;
use tokio_util::sync::CancellationToken;

use crate::assets::{AssetConverter, AssetRef};
use crate::citations::{repair_citations, CitationPatterns};
use crate::dom;
use crate::equations::{merge_equation_tables, merge_math_containers};
use crate::error::PostProcessError;
use crate::paths::normalize_refs;
use crate::sanitize::sanitize_scripts;

/// Marker id on the injected renderer configuration block.
pub const MATH_CONFIG_ID: &str = "texel-mathjax-config";

/// Default math renderer location.
pub const MATHJAX_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Renderer configuration enabling `\( \)`, `\[ \]`, and dollar pairs.
const MATH_CONFIG: &str = "window.MathJax = {tex: {inlineMath: [[\"\\\\(\", \"\\\\)\"], \
                           [\"$\", \"$\"]], displayMath: [[\"\\\\[\", \"\\\\]\"]]}};";

/// Post-processor knobs.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    pub math_renderer_url: String,
    /// Script sources surviving sanitization.
    pub safe_script_prefixes: Vec<String>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            math_renderer_url: MATHJAX_URL.to_string(),
            safe_script_prefixes: vec!["https://cdn.jsdelivr.net/npm/mathjax".to_string()],
        }
    }
}

/// Result of one post-processing pass.
#[derive(Debug)]
pub struct PostProcessOutcome {
    pub html: String,
    pub warnings: Vec<String>,
    /// Converted asset files, in document order.
    pub assets: Vec<std::path::PathBuf>,
    /// Counters for stage diagnostics.
    pub diagnostics: HashMap<String, String>,
}

/// Applies the transformation set. Regexes compile once per instance.
pub struct PostProcessor {
    config: PostProcessConfig,
    citation_patterns: CitationPatterns,
}

impl PostProcessor {
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config, citation_patterns: CitationPatterns::default() }
    }

    /// Run the full pass over `raw_html`.
    ///
    /// `html_dir` is where the final HTML will live (asset references are
    /// resolved and normalized against it). Asset conversion is skipped when
    /// `skip_assets` is set; every other transformation always runs.
    pub async fn process(
        &self,
        raw_html: &str,
        html_dir: &Path,
        converter: &AssetConverter,
        skip_assets: bool,
        cancel: &CancellationToken,
    ) -> Result<PostProcessOutcome, PostProcessError> {
        let mut warnings = Vec::new();

        // 1. Parse (lenient). A payload with no element content at all gets
        //    the minimal skeleton so downstream stages always see a document.
        let source = if raw_html.trim().is_empty() {
            warnings.push("converter produced no HTML; emitted minimal skeleton".to_string());
            dom::SKELETON.to_string()
        } else {
            raw_html.to_string()
        };

        // 3 (first half). Collect asset references in a sync scope so the
        // non-Send DOM never crosses an await point.
        let asset_refs = if skip_assets { Vec::new() } else { collect_asset_refs(&source) };
        let asset_outcome = if asset_refs.is_empty() {
            crate::assets::AssetOutcome::default()
        } else {
            converter.convert_all(asset_refs, html_dir, cancel).await
        };
        warnings.extend(asset_outcome.warnings.iter().cloned());

        // 2, 3 (second half), 4–8: one DOM session applies everything else.
        let (html, mut diagnostics) =
            self.transform(&source, html_dir, &asset_outcome.rewrites)?;
        diagnostics
            .insert("assets_converted".to_string(), asset_outcome.produced.len().to_string());

        Ok(PostProcessOutcome { html, warnings, assets: asset_outcome.produced, diagnostics })
    }

    /// The synchronous DOM portion of the pass.
    fn transform(
        &self,
        source: &str,
        html_dir: &Path,
        asset_rewrites: &HashMap<String, String>,
    ) -> Result<(String, HashMap<String, String>), PostProcessError> {
        let mut diagnostics = HashMap::new();
        let document = dom::parse_document(source);

        let dropped = sanitize_scripts(&document, &self.config.safe_script_prefixes);
        diagnostics.insert("scripts_dropped".to_string(), dropped.to_string());

        apply_asset_rewrites(&document, asset_rewrites);

        let citations = repair_citations(&document, &self.citation_patterns);
        diagnostics.insert("citations_repaired".to_string(), citations.to_string());

        let tables = merge_equation_tables(&document);
        let containers = merge_math_containers(&document);
        diagnostics.insert("equation_tables_merged".to_string(), tables.to_string());
        diagnostics.insert("math_containers_merged".to_string(), containers.to_string());

        let normalized = normalize_refs(&document, html_dir);
        diagnostics.insert("refs_normalized".to_string(), normalized.to_string());

        self.inject_math_renderer(&document);
        finish_cleanup(&document);

        let html = dom::serialize(&document)?;
        Ok((html, diagnostics))
    }

    /// Add the renderer script and its configuration block, once.
    fn inject_math_renderer(&self, document: &NodeRef) {
        let Ok(head) = document.select_first("head") else { return };
        let head = head.as_node();

        let already_injected = document
            .select("script")
            .map(|mut scripts| {
                scripts.any(|s| {
                    dom::attr(s.as_node(), "src")
                        .is_some_and(|src| src == self.config.math_renderer_url)
                })
            })
            .unwrap_or(false);
        if already_injected {
            return;
        }

        let config = dom::new_element("script", [("id", MATH_CONFIG_ID.to_string())]);
        config.append(NodeRef::new_text(MATH_CONFIG));
        head.append(config);

        let loader = dom::new_element(
            "script",
            [
                ("src", self.config.math_renderer_url.clone()),
                ("async", String::new()),
            ],
        );
        head.append(loader);
    }
}

/// Pull out the references the asset converter should look at.
///
/// Runs in its own scope so the DOM is dropped before any await.
fn collect_asset_refs(source: &str) -> Vec<AssetRef> {
    let document = dom::parse_document(source);
    let mut refs = Vec::new();
    for (tag, attr_name) in [("img", "src"), ("object", "data"), ("embed", "src")] {
        let Ok(matches) = document.select(tag) else { continue };
        for m in matches {
            if let Some(value) = dom::attr(m.as_node(), attr_name) {
                if AssetConverter::wants(&value) {
                    refs.push(AssetRef { src: value });
                }
            }
        }
    }
    refs
}

/// Point rewritten references at their converted SVG siblings.
fn apply_asset_rewrites(document: &NodeRef, rewrites: &HashMap<String, String>) {
    if rewrites.is_empty() {
        return;
    }
    for (tag, attr_name) in [("img", "src"), ("object", "data"), ("embed", "src")] {
        let Ok(matches) = document.select(tag) else { continue };
        let nodes: Vec<NodeRef> = matches.map(|m| m.as_node().clone()).collect();
        for node in nodes {
            if let Some(value) = dom::attr(&node, attr_name) {
                if let Some(new_value) = rewrites.get(&value) {
                    dom::set_attr(&node, attr_name, new_value);
                }
            }
        }
    }
}

/// Responsive viewport meta and a root `lang` attribute.
fn finish_cleanup(document: &NodeRef) {
    if let Ok(html) = document.select_first("html") {
        let node = html.as_node();
        if dom::attr(node, "lang").is_none() {
            dom::set_attr(node, "lang", "en");
        }
    }
    if let Ok(head) = document.select_first("head") {
        let has_viewport = head
            .as_node()
            .select("meta")
            .map(|mut metas| {
                metas.any(|m| dom::attr(m.as_node(), "name").as_deref() == Some("viewport"))
            })
            .unwrap_or(false);
        if !has_viewport {
            let meta = dom::new_element(
                "meta",
                [
                    ("name", "viewport".to_string()),
                    ("content", "width=device-width, initial-scale=1".to_string()),
                ],
            );
            head.as_node().append(meta);
        }
    }
}

#[cfg(test)]
#[path = "postprocess_tests.rs"]
mod tests;
