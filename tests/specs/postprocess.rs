// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-processor fixtures from the design's concrete scenarios.

use std::path::Path;

use texel_html::{AssetConverter, PostProcessConfig, PostProcessor};
use tokio_util::sync::CancellationToken;

fn processor() -> PostProcessor {
    PostProcessor::new(PostProcessConfig::default())
}

fn converter() -> AssetConverter {
    // Never invoked: the fixtures skip asset conversion.
    AssetConverter::new("pdflatex", "pdftocairo")
}

async fn process(html: &str) -> String {
    let dir = tempfile::TempDir::new().unwrap();
    processor()
        .process(html, dir.path(), &converter(), true, &CancellationToken::new())
        .await
        .unwrap()
        .html
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn citation_repair_fixture() {
    let output = process(
        r##"<html><body><cite><span>Mora, </span><span>(</span><a href="#b1">1989</a><span>)</span></cite></body></html>"##,
    )
    .await;
    assert!(
        output.contains(r##"<cite><a href="#b1">Mora, (1989)</a></cite>"##),
        "citation was not rewrapped: {output}"
    );
}

#[tokio::test]
async fn equation_table_merge_fixture() {
    let output = process(
        r#"<html><body><table class="ltx_equation">
            <tr><td><math><mi>E</mi></math></td></tr>
            <tr><td><math><mo>=</mo><mi>m</mi></math></td></tr>
        </table></body></html>"#,
    )
    .await;

    // One row, one cell, fragments concatenated in document order.
    assert_eq!(output.matches("<tr").count(), 1, "{output}");
    assert_eq!(output.matches("<td").count(), 1, "{output}");
    let e = output.find("<mi>E</mi>").unwrap();
    let m = output.find("<mi>m</mi>").unwrap();
    assert!(e < m);
}

#[tokio::test]
async fn postprocessor_is_idempotent_on_its_own_output() {
    let input = r##"<html><head></head><body>
        <cite><span>Mora, </span><span>(</span><a href="#b1">1989</a><span>)</span></cite>
        <table class="ltx_equation"><tr><td>a</td></tr><tr><td>b</td></tr></table>
        <script>alert("gone")</script>
        <p>Hello</p>
    </body></html>"##;

    let once = process(input).await;
    let twice = process(&once).await;
    similar_asserts::assert_eq!(squash(&once), squash(&twice));
}

#[tokio::test]
async fn relocation_spec_preserves_member_paths() {
    // Extract-then-repack law: relocating assets preserves the member path
    // set (the subtree layout), not the bytes.
    let source = tempfile::TempDir::new().unwrap();
    let dest = tempfile::TempDir::new().unwrap();
    for rel in ["figs/a.svg", "figs/deep/b.svg", "c.svg"] {
        let path = source.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"<svg/>").unwrap();
    }
    let html = r#"<html><body>
        <img src="figs/a.svg"><img src="figs/deep/b.svg"><img src="c.svg">
    </body></html>"#;

    let document = texel_html::dom::parse_document(html);
    let relocated =
        texel_html::relocate_assets(&document, source.path(), dest.path()).unwrap();

    let expected: Vec<&Path> = vec![
        Path::new("assets/figs/a.svg"),
        Path::new("assets/figs/deep/b.svg"),
        Path::new("assets/c.svg"),
    ];
    assert_eq!(relocated.iter().map(|p| p.as_path()).collect::<Vec<_>>(), expected);
    for rel in expected {
        assert!(dest.path().join(rel).is_file());
    }
}
