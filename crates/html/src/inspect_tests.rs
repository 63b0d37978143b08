// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn reports_body_text() {
    let report = inspect("<html><body><p>Hello world</p></body></html>");
    assert!(report.has_body);
    assert_eq!(report.body_text_len, "Hello world".len());
}

#[test]
fn reports_renderer_and_images() {
    let report = inspect(
        r#"<html><head><script src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script></head>
        <body><img src="a.svg"><img src="b.svg"></body></html>"#,
    );
    assert!(report.has_math_renderer);
    assert_eq!(report.image_count, 2);
}

#[test]
fn empty_document_reports_zero_text() {
    let report = inspect("");
    assert_eq!(report.body_text_len, 0);
    assert!(!report.has_math_renderer);
}
