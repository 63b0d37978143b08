// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dom::{parse_document, serialize};

fn repair(html: &str) -> (usize, String) {
    let document = parse_document(html);
    let count = repair_citations(&document, &CitationPatterns::default());
    let out = serialize(&document).unwrap();
    (count, out)
}

#[test]
fn rewraps_split_author_year() {
    let (count, out) = repair(
        r##"<body><cite><span>Mora, </span><span>(</span><a href="#b1">1989</a><span>)</span></cite></body>"##,
    );
    assert_eq!(count, 1);
    assert!(out.contains(r##"<cite><a href="#b1">Mora, (1989)</a></cite>"##), "got {out}");
}

#[test]
fn rewraps_class_based_citation() {
    let (count, out) = repair(
        r##"<body><span class="ltx_cite">Knuth &amp; Plass, (<a href="#bib.knuth">1981</a>)</span></body>"##,
    );
    assert_eq!(count, 1);
    assert!(out.contains(r##"<a href="#bib.knuth">Knuth &amp; Plass, (1981)</a>"##), "got {out}");
}

#[test]
fn year_with_suffix_letter() {
    let (count, out) = repair(
        r##"<body><cite>Smith, (<a href="#b2">2004a</a>)</cite></body>"##,
    );
    assert_eq!(count, 1);
    assert!(out.contains(">Smith, (2004a)</a>"));
}

#[test]
fn already_wrapped_citation_is_untouched() {
    let html = r##"<body><cite><a href="#b1">Mora, (1989)</a></cite></body>"##;
    let (count, out) = repair(html);
    assert_eq!(count, 0);
    assert!(out.contains(r##"<cite><a href="#b1">Mora, (1989)</a></cite>"##));
}

#[test]
fn repair_is_idempotent() {
    let html = r##"<body><cite><span>Mora, </span><span>(</span><a href="#b1">1989</a><span>)</span></cite></body>"##;
    let document = parse_document(html);
    repair_citations(&document, &CitationPatterns::default());
    let once = serialize(&document).unwrap();

    let document = parse_document(&once);
    let second = repair_citations(&document, &CitationPatterns::default());
    assert_eq!(second, 0);
    assert_eq!(serialize(&document).unwrap(), once);
}

#[test]
fn multi_citation_groups_are_left_alone() {
    // Semicolon-separated groups are a documented gap.
    let html = r##"<body><cite><a href="#b1">Mora, 1989</a>; <a href="#b2">Lee, 1990</a></cite></body>"##;
    let (count, _) = repair(html);
    assert_eq!(count, 0);
}

#[test]
fn citation_without_anchor_is_skipped() {
    let (count, _) = repair("<body><cite>Mora, (1989)</cite></body>");
    assert_eq!(count, 0);
}

#[test]
fn non_citation_text_is_skipped() {
    let (count, _) = repair(
        r##"<body><cite>see <a href="#b1">chapter 4</a> for details</cite></body>"##,
    );
    assert_eq!(count, 0);
}
