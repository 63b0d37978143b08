// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission options.

use serde::{Deserialize, Serialize};

/// The only output format currently produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Html,
}

crate::simple_display! {
    OutputFormat {
        Html => "html",
    }
}

/// Closed record of the options a submission may carry.
///
/// Unknown keys are rejected at the deserialization boundary rather than
/// silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JobOptions {
    /// Skip PDF/TikZ asset conversion in the post-processor.
    pub skip_images: bool,
    /// Caller-supplied ceiling on the computed timeout budget, in seconds.
    pub max_processing_time: Option<u64>,
    pub output_format: OutputFormat,
}

impl JobOptions {
    crate::setters! {
        set {
            skip_images: bool,
        }
        option {
            max_processing_time: u64,
        }
    }

    /// Clamp a computed budget by the caller-supplied ceiling, if any.
    pub fn cap_timeout(&self, computed_secs: u64) -> u64 {
        match self.max_processing_time {
            Some(cap) => computed_secs.min(cap),
            None => computed_secs,
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
