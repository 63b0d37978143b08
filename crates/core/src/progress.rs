// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overall progress accounting.

use crate::job::{StageRecord, StageStatus};

/// Time-based minimum so the UI always advances on long-running jobs:
/// (elapsed seconds, floor percent).
const TIME_FLOORS: [(u64, u8); 4] = [(600, 4), (300, 3), (120, 2), (30, 1)];

/// Overall progress 0–100 for a set of stage records.
///
/// Settled (completed or skipped) stages contribute their full share of the
/// bar; the running stage contributes its own 0–100 fraction of one share.
/// The result is floored by elapsed wall-clock time per [`TIME_FLOORS`].
pub fn overall(stages: &[StageRecord], started_at_ms: Option<u64>, now_ms: u64) -> u8 {
    let total = stages.len().max(1) as u32;
    let settled = stages.iter().filter(|s| s.status.is_settled()).count() as u32;
    let running: u32 = stages
        .iter()
        .find(|s| s.status == StageStatus::Running)
        .map(|s| s.progress.min(100) as u32)
        .unwrap_or(0);

    let computed = ((settled * 100 + running) / total).min(100) as u8;
    computed.max(time_floor(started_at_ms, now_ms))
}

fn time_floor(started_at_ms: Option<u64>, now_ms: u64) -> u8 {
    let Some(started) = started_at_ms else { return 0 };
    let elapsed_secs = now_ms.saturating_sub(started) / 1000;
    TIME_FLOORS
        .iter()
        .find(|(secs, _)| elapsed_secs >= *secs)
        .map(|&(_, pct)| pct)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
