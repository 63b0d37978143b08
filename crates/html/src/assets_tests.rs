// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use yare::parameterized;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Vectorizer stub: `-svg` writes the target, `-png` writes `prefix.png`.
fn good_vectorizer(dir: &Path) -> PathBuf {
    script(
        dir,
        "fakecairo",
        concat!(
            "mode=\"$1\"\n",
            "prev=\"\"; last=\"\"\n",
            "for a in \"$@\"; do prev=\"$last\"; last=\"$a\"; done\n",
            "case \"$mode\" in\n",
            "  -svg) printf '<svg xmlns=\"http://www.w3.org/2000/svg\"/>' > \"$last\" ;;\n",
            "  -png) printf 'PNG' > \"$last.png\" ;;\n",
            "esac\n",
            "exit 0\n",
        ),
    )
}

/// Vectorizer stub that cannot produce SVG but can rasterize.
fn raster_only_vectorizer(dir: &Path) -> PathBuf {
    script(
        dir,
        "rasteronly",
        concat!(
            "mode=\"$1\"\n",
            "prev=\"\"; last=\"\"\n",
            "for a in \"$@\"; do prev=\"$last\"; last=\"$a\"; done\n",
            "case \"$mode\" in\n",
            "  -svg) exit 1 ;;\n",
            "  -png) printf 'PNG' > \"$last.png\"; exit 0 ;;\n",
            "esac\n",
            "exit 1\n",
        ),
    )
}

fn broken_vectorizer(dir: &Path) -> PathBuf {
    script(dir, "broken", "exit 1\n")
}

/// Compiler stub: honors `-output-directory=` and drops a wrapper.pdf there.
fn fake_compiler(dir: &Path) -> PathBuf {
    script(
        dir,
        "fakelatex",
        concat!(
            "outdir=.\n",
            "for a in \"$@\"; do case \"$a\" in -output-directory=*) outdir=\"${a#*=}\" ;; esac; done\n",
            "printf '%%PDF-1.5' > \"$outdir/wrapper.pdf\"\n",
            "exit 0\n",
        ),
    )
}

#[parameterized(
    pdf = { "figs/plot.pdf", true },
    tikz = { "diagram.tikz", true },
    pgf = { "d.pgf", true },
    png = { "photo.png", false },
    url = { "https://example.org/a.pdf", false },
    data = { "data:application/pdf;base64,AA", false },
    empty = { "", false },
)]
fn wants_matrix(src: &str, expected: bool) {
    assert_eq!(AssetConverter::wants(src), expected);
}

#[tokio::test]
async fn pdf_becomes_svg_sibling() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("figs")).unwrap();
    std::fs::write(dir.path().join("figs/plot.pdf"), b"%PDF-1.5").unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), good_vectorizer(dir.path()));

    let outcome = converter
        .convert_all(
            vec![AssetRef { src: "figs/plot.pdf".to_string() }],
            dir.path(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.rewrites.get("figs/plot.pdf").map(String::as_str), Some("figs/plot.svg"));
    assert!(dir.path().join("figs/plot.svg").is_file());
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn raster_fallback_wraps_png() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("plot.pdf"), b"%PDF-1.5").unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), raster_only_vectorizer(dir.path()));

    let outcome = converter
        .convert_all(
            vec![AssetRef { src: "plot.pdf".to_string() }],
            dir.path(),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.warnings.is_empty());
    let svg = std::fs::read_to_string(dir.path().join("plot.svg")).unwrap();
    assert!(svg.contains("xlink:href=\"plot.png\""), "got {svg}");
}

#[tokio::test]
async fn failure_keeps_original_reference() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("plot.pdf"), b"%PDF-1.5").unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), broken_vectorizer(dir.path()));

    let outcome = converter
        .convert_all(
            vec![AssetRef { src: "plot.pdf".to_string() }],
            dir.path(),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.rewrites.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("keeping original reference"));
}

#[tokio::test]
async fn missing_source_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), good_vectorizer(dir.path()));
    let outcome = converter
        .convert_all(
            vec![AssetRef { src: "ghost.pdf".to_string() }],
            dir.path(),
            &CancellationToken::new(),
        )
        .await;
    assert!(outcome.rewrites.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test]
async fn tikz_fragment_compiles_then_vectorizes() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("diagram.tikz"), "\\tikz{\\draw (0,0) -- (1,1);}").unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), good_vectorizer(dir.path()));

    let outcome = converter
        .convert_all(
            vec![AssetRef { src: "diagram.tikz".to_string() }],
            dir.path(),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.warnings.is_empty(), "warnings: {:?}", outcome.warnings);
    assert_eq!(
        outcome.rewrites.get("diagram.tikz").map(String::as_str),
        Some("diagram.svg")
    );
    assert!(dir.path().join("diagram.svg").is_file());
    // Scratch dir is cleaned up.
    assert!(!dir.path().join(".tikz-build-diagram").exists());
}

#[tokio::test]
async fn duplicate_references_convert_once() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("plot.pdf"), b"%PDF-1.5").unwrap();
    let converter =
        AssetConverter::new(fake_compiler(dir.path()), good_vectorizer(dir.path()));

    let refs = vec![
        AssetRef { src: "plot.pdf".to_string() },
        AssetRef { src: "plot.pdf".to_string() },
    ];
    let outcome = converter.convert_all(refs, dir.path(), &CancellationToken::new()).await;
    assert_eq!(outcome.produced.len(), 1);
}
