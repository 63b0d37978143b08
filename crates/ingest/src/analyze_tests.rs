// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    dir
}

#[test]
fn known_name_wins_over_larger_files() {
    let dir = project(&[
        ("main.tex", "\\documentclass{article}"),
        ("huge.tex", &"x".repeat(10_000)),
    ]);
    let structure = analyze(dir.path(), None).unwrap();
    assert!(structure.main_source.ends_with("main.tex"));
}

#[test]
fn known_names_are_ordered() {
    let dir = project(&[
        ("document.tex", "\\documentclass{book}"),
        ("finalmanuscript.tex", "\\documentclass{article}"),
    ]);
    let structure = analyze(dir.path(), None).unwrap();
    assert!(structure.main_source.ends_with("document.tex"));
}

#[test]
fn largest_shallowest_tex_fallback() {
    let dir = project(&[
        ("intro.tex", "small"),
        ("thesis.tex", &"y".repeat(5_000)),
        ("deep/bigger.tex", &"z".repeat(50_000)),
    ]);
    let structure = analyze(dir.path(), None).unwrap();
    // Depth beats size; thesis.tex is the largest at depth zero.
    assert!(structure.main_source.ends_with("thesis.tex"));
}

#[test]
fn size_tie_breaks_lexicographically() {
    let dir = project(&[("bbb.tex", "same"), ("aaa.tex", "same")]);
    let structure = analyze(dir.path(), None).unwrap();
    assert!(structure.main_source.ends_with("aaa.tex"));
}

#[test]
fn no_tex_is_an_error() {
    let dir = project(&[("readme.md", "no latex here")]);
    let err = analyze(dir.path(), None).unwrap_err();
    assert!(matches!(err, IngestError::NoMainSource));
}

#[test]
fn categorizes_supporting_files() {
    let dir = project(&[
        ("main.tex", "\\documentclass{svjour3}"),
        ("svjour3.cls", "% class"),
        ("macros.sty", "% style"),
        ("refs.bib", "@misc{}"),
        ("spbasic.bst", "% bst"),
        ("figs/plot.pdf", "%PDF"),
        ("figs/diagram.tikz", "\\tikz{}"),
    ]);
    let structure = analyze(dir.path(), None).unwrap();
    assert_eq!(structure.class_files, vec!["svjour3".to_string()]);
    assert_eq!(structure.style_files.len(), 1);
    assert_eq!(structure.bibliographies.len(), 1);
    assert_eq!(structure.bibliography_styles.len(), 1);
    assert_eq!(structure.graphics.len(), 2);
    assert!(structure.uses_custom_class());
}

#[test]
fn parses_packages_class_and_references() {
    let dir = project(&[(
        "main.tex",
        concat!(
            "\\documentclass[11pt]{article}\n",
            "\\usepackage{amsmath, amssymb}\n",
            "\\usepackage[utf8]{inputenc}\n",
            "% \\usepackage{commented-out}\n",
            "\\begin{document}\n",
            "\\input{sections/intro}\n",
            "\\includegraphics[width=\\linewidth]{figs/plot.pdf}\n",
            "\\end{document}\n",
        ),
    )]);
    let structure = analyze(dir.path(), None).unwrap();
    assert_eq!(structure.document_class.as_deref(), Some("article"));
    assert_eq!(structure.packages, vec!["amsmath", "amssymb", "inputenc"]);
    assert_eq!(structure.includes, vec!["sections/intro"]);
    assert_eq!(structure.referenced_graphics, vec!["figs/plot.pdf"]);
}

#[test]
fn escaped_percent_is_not_a_comment() {
    let dir = project(&[(
        "main.tex",
        "\\documentclass{article}\n50\\% done \\usepackage{xcolor}\n",
    )]);
    let structure = analyze(dir.path(), None).unwrap();
    assert_eq!(structure.packages, vec!["xcolor"]);
}

#[test]
fn totals_cover_all_files() {
    let dir = project(&[("main.tex", "12345"), ("refs.bib", "123")]);
    let structure = analyze(dir.path(), None).unwrap();
    assert_eq!(structure.file_count, 2);
    assert_eq!(structure.total_bytes, 8);
}
