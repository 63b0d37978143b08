// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package availability probing and installation.
//!
//! The installer is advisory: it records what it attempted but NEVER fails
//! the stage. A package that is genuinely required and still missing shows
//! up later as a compiler exit code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use texel_runner::{run, CommandPolicy, RunRequest};

/// Availability cache TTL.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache eviction bound.
const CACHE_CAP: usize = 1000;

/// Per-invocation timeout for probe/install commands.
const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// TTL cache of package availability, bounded to [`CACHE_CAP`] entries.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    available: bool,
    expires_at_ms: u64,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, package: &str, now_ms: u64) -> Option<bool> {
        let entries = self.entries.lock();
        entries.get(package).filter(|e| e.expires_at_ms > now_ms).map(|e| e.available)
    }

    pub fn put(&self, package: &str, available: bool, now_ms: u64) {
        let mut entries = self.entries.lock();
        entries.insert(
            package.to_string(),
            CacheEntry { available, expires_at_ms: now_ms + CACHE_TTL.as_millis() as u64 },
        );
        if entries.len() > CACHE_CAP {
            evict_oldest(&mut entries);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Drop the oldest entries (earliest expiry) until back under the cap.
fn evict_oldest(entries: &mut HashMap<String, CacheEntry>) {
    while entries.len() > CACHE_CAP {
        let oldest = entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at_ms)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(key) => entries.remove(&key),
            None => break,
        };
    }
}

/// What one `ensure_available` pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages already present (cache hit or probe success).
    pub available: Vec<String>,
    /// Packages installed by this pass.
    pub installed: Vec<String>,
    /// Packages the tool could not provide.
    pub failed: Vec<String>,
}

impl InstallReport {
    /// Render for stage diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "available={} installed={} failed={}",
            self.available.len(),
            self.installed.len(),
            self.failed.join(",")
        )
    }
}

/// Wrapper over the system package tool.
pub struct PackageInstaller {
    tool: PathBuf,
    policy: CommandPolicy,
    cache: AvailabilityCache,
}

impl PackageInstaller {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        let tool = tool.into();
        let policy = CommandPolicy::new([tool.to_string_lossy().into_owned()]);
        Self { tool, policy, cache: AvailabilityCache::new() }
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    /// Probe and, where missing, install each declared package.
    ///
    /// One tool invocation per missing package; failures are recorded, never
    /// raised. Cache hits skip the probe entirely.
    pub async fn ensure_available(
        &self,
        packages: &[String],
        cwd: &Path,
        now_ms: u64,
        cancel: &CancellationToken,
    ) -> InstallReport {
        let mut report = InstallReport::default();
        for package in packages {
            if cancel.is_cancelled() {
                break;
            }
            match self.cache.get(package, now_ms) {
                Some(true) => {
                    report.available.push(package.clone());
                    continue;
                }
                Some(false) => {
                    report.failed.push(package.clone());
                    continue;
                }
                None => {}
            }

            if self.probe(package, cwd, cancel).await {
                self.cache.put(package, true, now_ms);
                report.available.push(package.clone());
                continue;
            }

            if self.install(package, cwd, cancel).await {
                tracing::info!(package, "installed missing package");
                self.cache.put(package, true, now_ms);
                report.installed.push(package.clone());
            } else {
                tracing::warn!(package, "package unavailable and install failed");
                self.cache.put(package, false, now_ms);
                report.failed.push(package.clone());
            }
        }
        report
    }

    async fn probe(&self, package: &str, cwd: &Path, cancel: &CancellationToken) -> bool {
        self.invoke(&["info", "--only-installed", package], cwd, cancel).await
    }

    async fn install(&self, package: &str, cwd: &Path, cancel: &CancellationToken) -> bool {
        self.invoke(&["install", package], cwd, cancel).await
    }

    async fn invoke(&self, args: &[&str], cwd: &Path, cancel: &CancellationToken) -> bool {
        let mut argv = vec![self.tool.to_string_lossy().into_owned()];
        argv.extend(args.iter().map(|s| s.to_string()));
        let request = RunRequest::new(argv, cwd.to_path_buf(), TOOL_TIMEOUT)
            .cancel(cancel.clone());
        match run(&self.policy, request).await {
            Ok(outcome) => outcome.success(),
            Err(err) => {
                tracing::warn!(%err, "package tool invocation failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "packages_tests.rs"]
mod tests;
