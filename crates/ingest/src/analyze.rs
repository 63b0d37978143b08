// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project analysis: locate the main source, categorize supporting files,
//! and parse declared packages and references out of the LaTeX text.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::IngestError;
use crate::scan::{walk_files, FileEntry};

/// Known main-file names, tried in order before any size heuristic.
const KNOWN_MAIN_NAMES: [&str; 3] = ["main.tex", "document.tex", "finalmanuscript.tex"];

static DOCUMENT_CLASS: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"\\documentclass(?:\[[^\]]*\])?\{([^}]+)\}"));
static USE_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"\\usepackage(?:\[[^\]]*\])?\{([^}]+)\}"));
static INCLUDE_GRAPHICS: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"\\includegraphics(?:\[[^\]]*\])?\{([^}]+)\}"));
static INPUT_OR_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"\\(?:input|include)\{([^}]+)\}"));

fn built_in(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are compile-time constants and always parse.
        Err(_) => unreachable!("invalid built-in regex"),
    }
}

/// What the analyzer learned about an extracted project.
#[derive(Debug, Clone, Default)]
pub struct ProjectStructure {
    pub main_source: PathBuf,
    /// All `.tex` files, the main source included.
    pub sources: Vec<PathBuf>,
    /// Local class files, by bare name (`foo` for `foo.cls`).
    pub class_files: Vec<String>,
    pub style_files: Vec<PathBuf>,
    pub bibliographies: Vec<PathBuf>,
    pub bibliography_styles: Vec<PathBuf>,
    pub graphics: Vec<PathBuf>,
    /// Packages declared by `\usepackage` in the main source.
    pub packages: Vec<String>,
    pub document_class: Option<String>,
    /// Raw arguments of `\includegraphics` in the main source.
    pub referenced_graphics: Vec<String>,
    /// Raw arguments of `\input` / `\include` in the main source.
    pub includes: Vec<String>,
    pub total_bytes: u64,
    pub file_count: usize,
}

impl ProjectStructure {
    /// Whether the declared document class resolves to a local `.cls` file.
    pub fn uses_custom_class(&self) -> bool {
        match &self.document_class {
            Some(class) => self.class_files.iter().any(|c| c == class),
            None => false,
        }
    }
}

/// Analyze the extraction root.
///
/// Fails with [`IngestError::NoMainSource`] when no `.tex` file exists.
pub fn analyze(root: &Path, max_depth: Option<usize>) -> Result<ProjectStructure, IngestError> {
    let entries = walk_files(root, max_depth)?;
    let main_source = select_main_source(&entries).ok_or(IngestError::NoMainSource)?;

    let mut structure = ProjectStructure {
        main_source: main_source.clone(),
        total_bytes: entries.iter().map(|e| e.size).sum(),
        file_count: entries.len(),
        ..ProjectStructure::default()
    };

    for entry in &entries {
        let ext = entry
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tex" => structure.sources.push(entry.path.clone()),
            "cls" => {
                if let Some(stem) = entry.path.file_stem().and_then(|s| s.to_str()) {
                    structure.class_files.push(stem.to_string());
                }
            }
            "sty" => structure.style_files.push(entry.path.clone()),
            "bib" => structure.bibliographies.push(entry.path.clone()),
            "bst" => structure.bibliography_styles.push(entry.path.clone()),
            "png" | "jpg" | "jpeg" | "gif" | "pdf" | "eps" | "svg" | "tikz" | "pgf" => {
                structure.graphics.push(entry.path.clone());
            }
            _ => {}
        }
    }

    let text = uncommented(&std::fs::read_to_string(&main_source).unwrap_or_default());
    structure.document_class =
        DOCUMENT_CLASS.captures(&text).map(|c| c[1].trim().to_string());
    for captures in USE_PACKAGE.captures_iter(&text) {
        for name in captures[1].split(',') {
            let name = name.trim();
            if !name.is_empty() && !structure.packages.iter().any(|p| p == name) {
                structure.packages.push(name.to_string());
            }
        }
    }
    for captures in INCLUDE_GRAPHICS.captures_iter(&text) {
        structure.referenced_graphics.push(captures[1].trim().to_string());
    }
    for captures in INPUT_OR_INCLUDE.captures_iter(&text) {
        structure.includes.push(captures[1].trim().to_string());
    }

    tracing::debug!(
        main = %structure.main_source.display(),
        sources = structure.sources.len(),
        packages = structure.packages.len(),
        class = structure.document_class.as_deref().unwrap_or("-"),
        "analyzed project"
    );

    Ok(structure)
}

/// Main-file selection: first known name in order, else the largest `.tex`
/// at the shallowest depth, ties broken lexicographically.
fn select_main_source(entries: &[FileEntry]) -> Option<PathBuf> {
    for known in KNOWN_MAIN_NAMES {
        let mut hits: Vec<&FileEntry> = entries
            .iter()
            .filter(|e| {
                e.path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(known))
            })
            .collect();
        hits.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));
        if let Some(hit) = hits.first() {
            return Some(hit.path.clone());
        }
    }

    let tex: Vec<&FileEntry> = entries
        .iter()
        .filter(|e| {
            e.path
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| x.eq_ignore_ascii_case("tex"))
        })
        .collect();
    let shallowest = tex.iter().map(|e| e.depth).min()?;
    tex.into_iter()
        .filter(|e| e.depth == shallowest)
        .max_by(|a, b| a.size.cmp(&b.size).then_with(|| b.path.cmp(&a.path)))
        .map(|e| e.path.clone())
}

/// Strip LaTeX comments: everything from an unescaped `%` to end of line.
fn uncommented(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut kept = line;
        let mut search_from = 0;
        while let Some(pos) = kept[search_from..].find('%') {
            let abs = search_from + pos;
            if abs > 0 && kept.as_bytes()[abs - 1] == b'\\' {
                search_from = abs + 1;
                continue;
            }
            kept = &kept[..abs];
            break;
        }
        out.push_str(kept);
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "analyze_tests.rs"]
mod tests;
