// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-processing error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostProcessError {
    /// Serializing the transformed tree back to bytes failed.
    #[error("failed to serialize document: {0}")]
    Serialize(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
