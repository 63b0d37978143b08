// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and pipeline state machine.

use crate::options::JobOptions;
use crate::outcome::{ConversionError, ConversionResult};
use crate::progress;
use crate::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Lifecycle status of a job.
///
/// Transitions follow a strict graph: `Pending → Running → {Completed,
/// Failed, Cancelled}`, with cancellation also allowed from `Pending` and
/// every terminal status reclaimable to `Cleaned` by the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Cleaned,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Cleaned => "cleaned",
    }
}

impl JobStatus {
    /// Terminal statuses never transition again, except to `Cleaned`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::Cleaned)
    }

    /// Active jobs count against the admission cap.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Whether the transition `self → next` is allowed by the state graph.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, Running) | (Pending, Cancelled) => true,
            (Running, Completed) | (Running, Failed) | (Running, Cancelled) => true,
            (Completed, Cleaned) | (Failed, Cleaned) | (Cancelled, Cleaned) => true,
            _ => false,
        }
    }
}

/// The fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Analyze,
    Compile,
    Convert,
    Postprocess,
    Validate,
}

crate::simple_display! {
    StageName {
        Analyze => "analyze",
        Compile => "compile",
        Convert => "convert",
        Postprocess => "postprocess",
        Validate => "validate",
    }
}

impl StageName {
    /// All stages in pipeline order.
    pub const ALL: [StageName; 5] = [
        StageName::Analyze,
        StageName::Compile,
        StageName::Convert,
        StageName::Postprocess,
        StageName::Validate,
    ];
}

/// Status of a single stage within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

crate::simple_display! {
    StageStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

impl StageStatus {
    /// A settled stage counts toward overall progress.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Record of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: StageName,
    pub status: StageStatus,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    /// Progress within the stage, 0–100.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-stage diagnostics (tool argv, exit code, truncated stderr, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub diagnostics: BTreeMap<String, String>,
}

impl StageRecord {
    fn new(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            started_at_ms: None,
            ended_at_ms: None,
            progress: 0,
            error: None,
            diagnostics: BTreeMap::new(),
        }
    }
}

/// A conversion job.
///
/// The job owns its working and output directories exclusively; the registry
/// hands out cloned snapshots for reads and all mutation goes through the
/// orchestrator while holding the registry lock.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Original filename of the submitted archive.
    pub source_filename: String,
    /// Directory holding the uploaded archive and its extraction.
    pub work_dir: PathBuf,
    /// Directory receiving the final HTML and assets.
    pub output_dir: PathBuf,
    pub status: JobStatus,
    /// One record per pipeline stage, in order.
    pub stages: Vec<StageRecord>,
    /// Computed wall-clock budget for the whole pipeline, in seconds.
    pub timeout_secs: u64,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    /// Last mutation timestamp, surfaced as `updated_at`.
    pub updated_at_ms: u64,
    pub error: Option<ConversionError>,
    pub result: Option<ConversionResult>,
    pub options: JobOptions,
    /// Non-fatal findings accumulated across stages.
    pub warnings: Vec<String>,
    /// High-water mark for overall progress; reads never go backward.
    progress_floor: u8,
}

impl Job {
    pub fn new(
        id: JobId,
        source_filename: impl Into<String>,
        work_dir: PathBuf,
        output_dir: PathBuf,
        options: JobOptions,
        timeout_secs: u64,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            source_filename: source_filename.into(),
            work_dir,
            output_dir,
            status: JobStatus::Pending,
            stages: StageName::ALL.iter().map(|&name| StageRecord::new(name)).collect(),
            timeout_secs,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            updated_at_ms: now_ms,
            error: None,
            result: None,
            options,
            warnings: Vec::new(),
            progress_floor: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status transition, stamping `started_at`/`completed_at`.
    ///
    /// Returns `false` (and leaves the job untouched) when the graph forbids
    /// the transition — callers treat that as an idempotent no-op.
    pub fn transition(&mut self, next: JobStatus, now_ms: u64) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at_ms = now_ms;
        match next {
            JobStatus::Running => self.started_at_ms = Some(now_ms),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                self.completed_at_ms = Some(now_ms);
            }
            _ => {}
        }
        true
    }

    pub fn stage(&self, name: StageName) -> &StageRecord {
        // Stages are created for every StageName in new(); index is total.
        &self.stages[StageName::ALL.iter().position(|&s| s == name).unwrap_or(0)]
    }

    pub fn stage_mut(&mut self, name: StageName) -> &mut StageRecord {
        &mut self.stages[StageName::ALL.iter().position(|&s| s == name).unwrap_or(0)]
    }

    /// Mark a stage running.
    pub fn begin_stage(&mut self, name: StageName, now_ms: u64) {
        self.updated_at_ms = now_ms;
        let record = self.stage_mut(name);
        record.status = StageStatus::Running;
        record.started_at_ms = Some(now_ms);
    }

    /// Settle a stage with a final status.
    pub fn finish_stage(&mut self, name: StageName, status: StageStatus, now_ms: u64) {
        self.updated_at_ms = now_ms;
        let record = self.stage_mut(name);
        record.status = status;
        record.ended_at_ms = Some(now_ms);
        if status == StageStatus::Completed {
            record.progress = 100;
        }
    }

    /// Update the running stage's internal 0–100 progress.
    pub fn set_stage_progress(&mut self, name: StageName, pct: u8, now_ms: u64) {
        self.updated_at_ms = now_ms;
        let record = self.stage_mut(name);
        record.progress = record.progress.max(pct.min(100));
    }

    /// The stage currently running, if any.
    pub fn running_stage(&self) -> Option<StageName> {
        self.stages.iter().find(|s| s.status == StageStatus::Running).map(|s| s.name)
    }

    /// Overall progress, 0–100, monotonic non-decreasing.
    ///
    /// Completed jobs report 100; other terminal jobs freeze at the
    /// high-water mark reached before termination.
    pub fn progress(&mut self, now_ms: u64) -> u8 {
        if self.status == JobStatus::Completed {
            self.progress_floor = 100;
            return 100;
        }
        if self.status.is_terminal() {
            return self.progress_floor;
        }
        let computed = progress::overall(&self.stages, self.started_at_ms, now_ms);
        self.progress_floor = self.progress_floor.max(computed);
        self.progress_floor
    }

    /// Human-readable one-liner for the status surface.
    pub fn message(&self) -> String {
        match self.status {
            JobStatus::Pending => "queued for conversion".to_string(),
            JobStatus::Running => match self.running_stage() {
                Some(stage) => format!("running {stage}"),
                None => "running".to_string(),
            },
            JobStatus::Completed => "conversion complete".to_string(),
            JobStatus::Failed => self
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "conversion failed".to_string()),
            JobStatus::Cancelled => "cancelled".to_string(),
            JobStatus::Cleaned => "artifacts reclaimed".to_string(),
        }
    }

    /// Build the serializable status snapshot.
    pub fn snapshot(&mut self, now_ms: u64) -> JobSnapshot {
        let progress = self.progress(now_ms);
        JobSnapshot {
            id: self.id.clone(),
            status: self.status,
            progress,
            stages: self
                .stages
                .iter()
                .map(|s| StageSnapshot {
                    name: s.name,
                    status: s.status,
                    progress: s.progress,
                    started_at: s.started_at_ms,
                    ended_at: s.ended_at_ms,
                    error: s.error.clone(),
                })
                .collect(),
            message: self.message(),
            created_at: self.created_at_ms,
            updated_at: self.updated_at_ms,
        }
    }
}

/// Consistent copy of a job's externally visible state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub stages: Vec<StageSnapshot>,
    pub message: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// One stage entry of the status surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub name: StageName,
    pub status: StageStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl Job {
    /// A minimal job for tests.
    pub fn stub(id: &str, now_ms: u64) -> Self {
        Self::new(
            JobId::from_string(id),
            "paper.zip",
            PathBuf::from("/tmp/texel-test/uploads").join(id),
            PathBuf::from("/tmp/texel-test/outputs").join(id),
            JobOptions::default(),
            600,
            now_ms,
        )
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
