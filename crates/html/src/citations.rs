// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Citation repair.
//!
//! Converters frequently split an author-year citation across several
//! children where only the year carries the bibliography hyperlink:
//!
//! ```html
//! <cite><span>Mora, </span><span>(</span><a href="#b1">1989</a><span>)</span></cite>
//! ```
//!
//! The repair rewraps the whole `Author(s), (Year)` run inside one anchor
//! pointing at the same bibliography target:
//!
//! ```html
//! <cite><a href="#b1">Mora, (1989)</a></cite>
//! ```
//!
//! Multi-citation groups (semicolon-separated) are a known gap and are left
//! untouched.

use kuchikiki::NodeRef;
use regex::Regex;

use crate::dom;

/// Compiled-once patterns for the citation shapes.
pub struct CitationPatterns {
    /// Full citation text: `Author(s), (Year)`.
    author_year: Regex,
    /// A bare year, possibly with a disambiguation letter.
    year_only: Regex,
}

impl Default for CitationPatterns {
    fn default() -> Self {
        Self {
            author_year: built_in(r"^[^();]+?,?\s*\(\s*\d{4}[a-z]?\s*\)$"),
            year_only: built_in(r"^\d{4}[a-z]?$"),
        }
    }
}

fn built_in(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are compile-time constants and always parse.
        Err(_) => unreachable!("invalid built-in regex"),
    }
}

/// Repair split author-year citations in one enumeration pass.
///
/// Returns the number of citations rewrapped.
pub fn repair_citations(document: &NodeRef, patterns: &CitationPatterns) -> usize {
    let candidates: Vec<NodeRef> = match document.select("cite, .ltx_cite") {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    };

    let mut repaired = 0;
    for cite in candidates {
        // Text extraction happens once per element and is reused for every
        // check below.
        let text = dom::squash_whitespace(&cite.text_contents());
        if !patterns.author_year.is_match(&text) {
            continue;
        }

        let anchors: Vec<NodeRef> = cite
            .descendants()
            .filter(|n| dom::tag_name(n) == "a")
            .collect();
        // Exactly one hyperlink, covering only the year: the split shape.
        let [anchor] = anchors.as_slice() else { continue };
        let anchor_text = dom::squash_whitespace(&anchor.text_contents());
        if !patterns.year_only.is_match(&anchor_text) {
            continue;
        }
        let Some(href) = dom::attr(anchor, "href") else { continue };

        // Collect before detaching: removal severs the sibling links the
        // iterator walks.
        let children: Vec<NodeRef> = cite.children().collect();
        for child in children {
            child.detach();
        }
        let wrapped = dom::new_element("a", [("href", href)]);
        wrapped.append(NodeRef::new_text(text));
        cite.append(wrapped);
        repaired += 1;
    }

    if repaired > 0 {
        tracing::debug!(repaired, "rewrapped split citations");
    }
    repaired
}

#[cfg(test)]
#[path = "citations_tests.rs"]
mod tests;
