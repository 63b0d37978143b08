// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive timeout budget.
//!
//! The wall-clock budget for a job scales with input size and file count:
//! the first 50 MiB cost 1 s/MiB, the next 50 MiB 2 s/MiB, anything beyond
//! 100 MiB 5 s/MiB, plus 1 s per 10 files, on top of the configured base —
//! all capped at the configured ceiling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

const MIB: u64 = 1024 * 1024;

/// Measurement cache TTL; avoids re-walking an input root within a burst.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Compute the total budget in seconds.
pub fn compute_budget(base_secs: u64, ceiling_secs: u64, total_bytes: u64, file_count: usize) -> u64 {
    let tier1 = total_bytes.min(50 * MIB) / MIB;
    let tier2 = 2 * (total_bytes.saturating_sub(50 * MIB).min(50 * MIB) / MIB);
    let tier3 = 5 * (total_bytes.saturating_sub(100 * MIB) / MIB);
    let count = file_count as u64 / 10;
    (base_secs + tier1 + tier2 + tier3 + count).min(ceiling_secs)
}

/// The computed budget, split across pipeline phases.
///
/// Conversion is the dominant cost and gets 60% of the total; the remaining
/// stages share the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    pub total: Duration,
    pub convert: Duration,
    pub rest: Duration,
}

impl TimeoutBudget {
    pub fn split(total_secs: u64) -> Self {
        let convert = total_secs * 60 / 100;
        Self {
            total: Duration::from_secs(total_secs),
            convert: Duration::from_secs(convert),
            rest: Duration::from_secs(total_secs - convert),
        }
    }
}

/// TTL cache of per-root input measurements.
#[derive(Debug, Default)]
pub struct BudgetCache {
    entries: Mutex<HashMap<PathBuf, Measured>>,
}

#[derive(Debug, Clone, Copy)]
struct Measured {
    total_bytes: u64,
    file_count: usize,
    expires_at_ms: u64,
}

impl BudgetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure `root` (cached) and compute its budget in seconds.
    pub fn budget_for(
        &self,
        root: &Path,
        base_secs: u64,
        ceiling_secs: u64,
        now_ms: u64,
    ) -> std::io::Result<u64> {
        let (total_bytes, file_count) = self.measure(root, now_ms)?;
        Ok(compute_budget(base_secs, ceiling_secs, total_bytes, file_count))
    }

    fn measure(&self, root: &Path, now_ms: u64) -> std::io::Result<(u64, usize)> {
        let cached =
            self.entries.lock().get(root).filter(|m| m.expires_at_ms > now_ms).copied();
        if let Some(hit) = cached {
            return Ok((hit.total_bytes, hit.file_count));
        }
        let entries = crate::scan::walk_files(root, None)?;
        let total_bytes: u64 = entries.iter().map(|e| e.size).sum();
        let file_count = entries.len();
        self.entries.lock().insert(
            root.to_path_buf(),
            Measured {
                total_bytes,
                file_count,
                expires_at_ms: now_ms + CACHE_TTL.as_millis() as u64,
            },
        );
        Ok((total_bytes, file_count))
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
