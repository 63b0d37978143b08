// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only inspection of a produced document, used by the validate stage.

use crate::dom;

/// What validation needs to know about the final HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlReport {
    pub has_body: bool,
    /// Length of the body's visible text, whitespace-squashed.
    pub body_text_len: usize,
    pub has_math_renderer: bool,
    pub image_count: usize,
}

/// Inspect `html` without mutating it.
pub fn inspect(html: &str) -> HtmlReport {
    let document = dom::parse_document(html);
    let body = document.select_first("body").ok();
    let body_text_len = body
        .as_ref()
        .map(|b| dom::squash_whitespace(&b.as_node().text_contents()).len())
        .unwrap_or(0);
    let has_math_renderer = document
        .select("script")
        .map(|mut scripts| {
            scripts.any(|s| {
                dom::attr(s.as_node(), "src")
                    .is_some_and(|src| src.contains("mathjax"))
            })
        })
        .unwrap_or(false);
    let image_count = document.select("img").map(|m| m.count()).unwrap_or(0);

    HtmlReport { has_body: body.is_some(), body_text_len, has_math_renderer, image_count }
}

#[cfg(test)]
#[path = "inspect_tests.rs"]
mod tests;
