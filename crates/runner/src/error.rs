// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner error types.

use thiserror::Error;

/// Precondition violations and spawn failures.
///
/// Anything that happens after the process starts (non-zero exit, timeout,
/// cancellation) is reported inside [`crate::RunOutcome`], never as an error.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("empty argument vector")]
    EmptyArgv,

    #[error("command {0:?} is not on the allow-list")]
    CommandNotAllowed(String),

    #[error("failed to spawn {command:?}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o failure while supervising {command:?}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
