// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: admission, status, cancellation, results, shutdown.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use texel_core::{
    Clock, Config, ConversionError, ErrorKind, Job, JobId, JobOptions, JobSnapshot, JobStatus,
    SystemClock,
};
use texel_html::{AssetConverter, PostProcessConfig, PostProcessor};
use texel_ingest::{compute_budget, BudgetCache, PackageInstaller};

use crate::error::{EngineError, JobOutcome};
use crate::pipeline;
use crate::registry::JobRegistry;

/// How long shutdown waits for running workers to drain.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// The conversion orchestration engine.
///
/// Constructed once at startup and shared behind an [`Arc`]; every
/// collaborator (registry, caches, tool wrappers) is owned here and passed
/// down explicitly.
pub struct Orchestrator<C: Clock = SystemClock> {
    config: Config,
    clock: C,
    registry: Arc<JobRegistry>,
    /// Cancellation token per non-terminal job.
    tokens: Mutex<HashMap<JobId, CancellationToken>>,
    pub(crate) budget_cache: BudgetCache,
    pub(crate) installer: PackageInstaller,
    pub(crate) postprocessor: PostProcessor,
    pub(crate) asset_converter: AssetConverter,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(config: Config, clock: C) -> Arc<Self> {
        let installer = PackageInstaller::new(&config.package_installer_path);
        let asset_converter =
            AssetConverter::new(&config.compiler_path, &config.vectorizer_path);
        Arc::new(Self {
            installer,
            asset_converter,
            postprocessor: PostProcessor::new(PostProcessConfig::default()),
            budget_cache: BudgetCache::new(),
            registry: Arc::new(JobRegistry::new()),
            tokens: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            clock,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Accept a submission and schedule its pipeline.
    ///
    /// Registry insertion and directory creation succeed or fail together:
    /// a rejected admission removes the directories it created, and the
    /// capacity pre-check rejects before anything touches disk.
    pub async fn submit(
        self: &Arc<Self>,
        archive: &Path,
        options: JobOptions,
    ) -> Result<JobId, EngineError> {
        if self.shutdown.is_cancelled() {
            return Err(EngineError::CapacityExceeded);
        }
        if self.registry.active_count() >= self.config.max_concurrent {
            return Err(EngineError::CapacityExceeded);
        }

        let filename = archive
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Rejected("archive has no filename".to_string()))?;
        let metadata = tokio::fs::metadata(archive).await?;
        if metadata.len() > self.config.max_file_size {
            return Err(EngineError::Rejected(format!(
                "archive exceeds {} bytes",
                self.config.max_file_size
            )));
        }

        let id = JobId::generate();
        let work_dir = self.config.upload_root.join(id.as_str());
        let output_dir = self.config.output_root.join(id.as_str());
        tokio::fs::create_dir_all(&work_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;
        tokio::fs::copy(archive, work_dir.join(&filename)).await?;

        // Budget from what is known pre-extraction; the analyze stage
        // refines it from the real file totals.
        let base = self.config.default_timeout.as_secs();
        let ceiling = self.config.max_timeout.as_secs();
        let budget = options.cap_timeout(compute_budget(base, ceiling, metadata.len(), 1));

        let now = self.now();
        let job = Job::new(
            id.clone(),
            filename,
            work_dir.clone(),
            output_dir.clone(),
            options,
            budget,
            now,
        );

        if let Err(err) = self.registry.admit(job, self.config.max_concurrent) {
            let _ = tokio::fs::remove_dir_all(&work_dir).await;
            let _ = tokio::fs::remove_dir_all(&output_dir).await;
            return Err(err);
        }

        let token = CancellationToken::new();
        self.tokens.lock().insert(id.clone(), token.clone());

        tracing::info!(job_id = %id, budget_secs = budget, "job admitted");
        let orchestrator = Arc::clone(self);
        let job_id = id.clone();
        self.tracker.spawn(pipeline::run_job(orchestrator, job_id, token));

        Ok(id)
    }

    /// Consistent status snapshot.
    pub fn status(&self, id: &JobId) -> Result<JobSnapshot, EngineError> {
        self.registry
            .snapshot(id, self.now())
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Request cancellation. Idempotent; a no-op on terminal jobs.
    pub fn cancel(&self, id: &JobId) -> Result<(), EngineError> {
        let now = self.now();
        let handled = self.registry.with_job(id, |job| match job.status {
            JobStatus::Pending => {
                // Not yet running: terminal immediately. The worker observes
                // the refused pending→running transition and stands down.
                job.error = Some(ConversionError::new(
                    ErrorKind::Cancelled,
                    "cancelled before the pipeline started",
                ));
                job.transition(JobStatus::Cancelled, now);
            }
            JobStatus::Running => {
                // The worker finalizes the record once the active stage stops.
            }
            _ => {}
        });
        if handled.is_none() {
            return Err(EngineError::NotFound(id.clone()));
        }

        if let Some(token) = self.tokens.lock().get(id).cloned() {
            token.cancel();
        }
        tracing::info!(job_id = %id, "cancellation requested");
        Ok(())
    }

    /// Terminal result or error payload.
    pub fn outcome(&self, id: &JobId) -> Result<JobOutcome, EngineError> {
        let job = self
            .registry
            .job_clone(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if !job.status.is_terminal() {
            return Err(EngineError::NotReady(id.clone()));
        }
        if let Some(result) = job.result {
            return Ok(JobOutcome::Completed(result));
        }
        if let Some(error) = job.error {
            return Ok(JobOutcome::Failed(error));
        }
        // Terminal without a payload: an invariant violation.
        Ok(JobOutcome::Failed(ConversionError::new(
            ErrorKind::Internal,
            "job terminated without a recorded outcome",
        )))
    }

    /// Package a completed job's output directory for download.
    ///
    /// The bundle is built lazily and cached inside the output directory, so
    /// the sweeper reclaims it with everything else.
    pub async fn download_bundle(&self, id: &JobId) -> Result<std::path::PathBuf, EngineError> {
        let job = self
            .registry
            .job_clone(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if job.status != JobStatus::Completed {
            return Err(EngineError::NotReady(id.clone()));
        }
        let dest = job.output_dir.join("bundle.zip");
        if dest.is_file() {
            return Ok(dest);
        }
        let output_dir = job.output_dir.clone();
        let bundle = dest.clone();
        let members = tokio::task::spawn_blocking(move || {
            texel_ingest::pack_directory(&output_dir, &bundle, |relative| {
                relative == std::path::Path::new("final.html")
                    || relative.starts_with("assets")
            })
        })
        .await
        .map_err(|err| EngineError::Io(std::io::Error::other(err.to_string())))?
        .map_err(|err| EngineError::Io(std::io::Error::other(err.to_string())))?;
        tracing::debug!(job_id = %id, members, "packaged download bundle");
        Ok(dest)
    }

    /// Drop the cancellation token of a finished job.
    pub(crate) fn finish_job(&self, id: &JobId) {
        self.tokens.lock().remove(id);
    }

    /// Reclaim artifacts of terminal jobs past the retention window.
    ///
    /// Status transitions happen under the registry lock; directory deletion
    /// runs outside it and never raises.
    pub fn sweep_once(&self) -> usize {
        let retention_ms = self.config.retention.as_millis() as u64;
        let expired = self.registry.expire_terminal(self.now(), retention_ms);
        let count = expired.len();
        for (id, work_dir, output_dir) in expired {
            for dir in [&work_dir, &output_dir] {
                if let Err(err) = std::fs::remove_dir_all(dir) {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(job_id = %id, dir = %dir.display(), %err, "cleanup failed");
                    }
                }
            }
            tracing::info!(job_id = %id, "job cleaned");
        }
        count
    }

    /// Graceful shutdown: refuse new work, cancel running jobs, stop the
    /// sweeper, and wait out the drain window.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down conversion engine");
        self.shutdown.cancel();
        let tokens: Vec<CancellationToken> = self.tokens.lock().values().cloned().collect();
        for token in tokens {
            token.cancel();
        }
        self.tracker.close();
        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait()).await.is_err() {
            tracing::warn!("drain window elapsed with workers still running");
        }
        tracing::info!("conversion engine stopped");
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
