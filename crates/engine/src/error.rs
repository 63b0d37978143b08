// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-surface errors and the terminal result payload.

use texel_core::{ConversionError, ConversionResult, ErrorKind, JobId};
use thiserror::Error;

/// Errors the orchestrator's public operations can fail with.
///
/// Conversion failures are not errors at this surface — they are terminal
/// job states delivered through [`JobOutcome`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {0} has not finished")]
    NotReady(JobId),

    #[error("conversion capacity exhausted")]
    CapacityExceeded,

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Classification for the external error surface.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::CapacityExceeded => ErrorKind::CapacityExceeded,
            Self::Rejected(_) => ErrorKind::UnsafeArchive,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// What a terminal job delivers through the result surface.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(ConversionResult),
    Failed(ConversionError),
}
