// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal job outcomes: results, errors, and suggestion lookup.

use crate::job::StageName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Captured tool stderr is bounded to 64 KiB; the tail is kept because LaTeX
/// tools report the fatal error last.
pub const STDERR_CAP: usize = 64 * 1024;

/// Classification of a conversion failure, surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CapacityExceeded,
    NotFound,
    NotReady,
    UnsafeArchive,
    NoMainSource,
    CompilerFailure,
    ConverterFailure,
    PostProcessingFailure,
    TimeoutExceeded,
    Cancelled,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        CapacityExceeded => "capacity_exceeded",
        NotFound => "not_found",
        NotReady => "not_ready",
        UnsafeArchive => "unsafe_archive",
        NoMainSource => "no_main_source",
        CompilerFailure => "compiler_failure",
        ConverterFailure => "converter_failure",
        PostProcessingFailure => "post_processing_failure",
        TimeoutExceeded => "timeout_exceeded",
        Cancelled => "cancelled",
        Internal => "internal",
    }
}

/// Populated when a job terminates in `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Final HTML artifact, inside the job's output directory.
    pub html_path: PathBuf,
    /// Converted assets referenced by the HTML, in document order.
    pub assets: Vec<PathBuf>,
    /// Quality score, 0–100.
    pub score: u8,
    pub warnings: Vec<String>,
    /// Merged per-stage diagnostics.
    pub diagnostics: BTreeMap<String, String>,
}

/// Populated when a job terminates in `failed` (or `cancelled`).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ConversionError {
    #[serde(rename = "error_kind")]
    pub kind: ErrorKind,
    pub message: String,
    /// Stage where the failure occurred, if stage-local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageName>,
    pub suggestions: Vec<String>,
    /// Captured tool stderr, tail-truncated to [`STDERR_CAP`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl ConversionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stage: None,
            suggestions: Vec::new(),
            stderr: String::new(),
        }
    }

    crate::setters! {
        option {
            stage: StageName,
        }
    }

    /// Attach captured stderr, truncating and deriving suggestions from it.
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = truncate_tail(stderr, STDERR_CAP);
        self.suggestions = suggestions_for(stderr);
        self
    }
}

/// Keep the trailing `cap` bytes of `s`, on a char boundary, prepending a
/// truncation marker when content was dropped.
pub fn truncate_tail(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }
    let mut start = s.len() - cap;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("[...truncated...]\n{}", &s[start..])
}

/// Derive actionable suggestions from tool stderr.
///
/// The lookup is substring-keyed over the four failure classes LaTeX tooling
/// actually produces; unknown stderr yields no suggestions.
pub fn suggestions_for(stderr: &str) -> Vec<String> {
    let mut suggestions = Vec::new();
    let lower = stderr.to_lowercase();

    if lower.contains(".sty' not found") || lower.contains(".cls' not found") {
        suggestions.push(
            "A required package or class is not installed; declare it in the archive \
             or rely on the automatic package installation pass"
                .to_string(),
        );
    }
    if lower.contains("undefined control sequence") {
        suggestions.push(
            "The document uses a macro no loaded package defines; check \\usepackage \
             declarations in the main source"
                .to_string(),
        );
    }
    if lower.contains("no such file or directory") || lower.contains("file not found") {
        suggestions.push(
            "A referenced file is missing from the archive; verify \\input and \
             \\includegraphics paths are relative to the main source"
                .to_string(),
        );
    }
    if lower.contains("tex capacity exceeded") || lower.contains("out of memory") {
        suggestions.push(
            "The document exhausted tool memory; split very large files or reduce \
             embedded graphics complexity"
                .to_string(),
        );
    }

    suggestions
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
