// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingest error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Extraction refused by policy (traversal, bomb, depth, member count).
    #[error("unsafe archive: {reason}")]
    UnsafeArchive { reason: String },

    /// The extraction wall-clock deadline elapsed.
    #[error("archive extraction exceeded {0} seconds")]
    ExtractionTimeout(u64),

    /// The payload is not one of the accepted archive formats.
    #[error("unsupported archive format: {name:?}")]
    UnsupportedFormat { name: String },

    /// The archive container itself is malformed.
    #[error("malformed archive: {0}")]
    Malformed(String),

    /// No `.tex` candidate was found after extraction.
    #[error("no main LaTeX source found in project")]
    NoMainSource,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn unsafe_archive(reason: impl Into<String>) -> Self {
        Self::UnsafeArchive { reason: reason.into() }
    }
}
