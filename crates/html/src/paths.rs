// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Link and image-path normalization.

use std::path::{Component, Path, PathBuf};

use kuchikiki::NodeRef;

use crate::dom;

/// Attributes that may carry local references, per element.
const REF_ATTRS: [(&str, &str); 3] = [("img", "src"), ("a", "href"), ("object", "data")];

/// Rewrite local references to be relative to the final HTML location.
///
/// Absolute filesystem paths that point inside `html_dir` are relativized
/// with their subdirectory structure preserved (which also keeps two
/// same-named assets from different subtrees distinct). External URLs,
/// fragments, and already-relative paths pass through untouched.
///
/// Returns the number of attributes rewritten.
pub fn normalize_refs(document: &NodeRef, html_dir: &Path) -> usize {
    let mut rewritten = 0;
    for (tag, attr_name) in REF_ATTRS {
        let nodes: Vec<NodeRef> = match document.select(tag) {
            Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
            Err(()) => Vec::new(),
        };
        for node in nodes {
            let Some(value) = dom::attr(&node, attr_name) else { continue };
            if let Some(relative) = relativize(&value, html_dir) {
                dom::set_attr(&node, attr_name, &relative);
                rewritten += 1;
            }
        }
    }
    if rewritten > 0 {
        tracing::debug!(rewritten, "normalized local references");
    }
    rewritten
}

/// Compute the normalized form of `value`, or `None` when it should stay.
fn relativize(value: &str, html_dir: &Path) -> Option<String> {
    if value.is_empty() || is_external(value) {
        return None;
    }
    let path = Path::new(value);
    if !path.is_absolute() {
        return None;
    }
    let relative = path.strip_prefix(html_dir).ok()?;
    // Preserve subdirectory structure below the HTML location.
    let clean: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    Some(clean.to_string_lossy().into_owned())
}

/// Relocate referenced local assets into an `assets/` subtree next to the
/// final HTML, rewriting references accordingly.
///
/// Files are copied from `source_dir` (where the converter left them) into
/// `dest_dir`/`assets`, preserving subdirectory structure so same-named
/// files from different subtrees never collide. References already under
/// `assets/` are left alone, which keeps the operation idempotent.
///
/// Returns the relocated files as paths relative to `dest_dir`, in document
/// order.
pub fn relocate_assets(
    document: &NodeRef,
    source_dir: &Path,
    dest_dir: &Path,
) -> std::io::Result<Vec<PathBuf>> {
    let mut relocated = Vec::new();
    for (tag, attr_name) in [("img", "src"), ("object", "data"), ("embed", "src")] {
        let nodes: Vec<NodeRef> = match document.select(tag) {
            Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
            Err(()) => Vec::new(),
        };
        for node in nodes {
            let Some(value) = dom::attr(&node, attr_name) else { continue };
            if value.is_empty()
                || is_external(&value)
                || Path::new(&value).is_absolute()
                || value.starts_with("assets/")
            {
                continue;
            }
            let source = source_dir.join(&value);
            if !source.is_file() {
                continue;
            }
            let relative = Path::new("assets").join(&value);
            let target = dest_dir.join(&relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&source, &target)?;
            dom::set_attr(&node, attr_name, &relative.to_string_lossy());
            relocated.push(relative);
        }
    }
    Ok(relocated)
}

fn is_external(value: &str) -> bool {
    value.starts_with('#')
        || value.starts_with("http://")
        || value.starts_with("https://")
        || value.starts_with("data:")
        || value.starts_with("mailto:")
        || value.starts_with("//")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
