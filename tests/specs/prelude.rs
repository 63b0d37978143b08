// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared spec fixtures: stub tools, archives, and an engine on temp dirs.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

pub use texel_core::{
    Config, ErrorKind, FakeClock, JobId, JobOptions, JobStatus, StageName, StageStatus,
};
pub use texel_engine::{EngineError, JobOutcome, Orchestrator};

/// Compiler stub that succeeds instantly.
pub const COMPILER_OK: &str = "exit 0\n";

/// Compiler stub failing with a missing-package diagnostic.
pub const COMPILER_MISSING_PKG: &str =
    "echo \"! LaTeX Error: File 'siunitx.sty' not found.\" >&2\nexit 1\n";

/// Converter stub writing a small document to `--dest=`.
pub const CONVERTER_OK: &str = concat!(
    "dest=out.html\n",
    "for a in \"$@\"; do case \"$a\" in --dest=*) dest=\"${a#*=}\" ;; esac; done\n",
    "printf '<html><head></head><body><p>Hello</p></body></html>' > \"$dest\"\n",
    "exit 0\n",
);

/// Converter stub that hangs until killed.
pub const CONVERTER_SLOW: &str = "sleep 600\nexit 0\n";

/// A configured engine over stub tools and temp directories.
pub struct Engine {
    pub dir: TempDir,
    pub clock: FakeClock,
    pub orchestrator: Arc<Orchestrator<FakeClock>>,
}

pub struct EngineOptions {
    pub max_concurrent: usize,
    pub compiler: &'static str,
    pub converter: &'static str,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { max_concurrent: 5, compiler: COMPILER_OK, converter: CONVERTER_OK }
    }
}

pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir_all(&tools).unwrap();

        let config = Config {
            max_concurrent: options.max_concurrent,
            compiler_path: script(&tools, "compiler", options.compiler),
            converter_path: script(&tools, "converter", options.converter),
            vectorizer_path: script(&tools, "vectorizer", "exit 0\n"),
            package_installer_path: script(&tools, "installer", "exit 0\n"),
            upload_root: dir.path().join("uploads"),
            output_root: dir.path().join("outputs"),
            ..Config::default()
        };
        let clock = FakeClock::new();
        let orchestrator = Orchestrator::new(config, clock.clone());
        Self { dir, clock, orchestrator }
    }

    /// Write a ZIP archive and return its path.
    pub fn archive(&self, name: &str, members: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        for (member, content) in members {
            zip.start_file(member.to_string(), opts).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    /// The tiny single-file project from the happy-path scenario.
    pub fn hello_archive(&self) -> PathBuf {
        self.archive(
            "paper.zip",
            &[(
                "main.tex",
                "\\documentclass{article}\\begin{document}Hello\\end{document}",
            )],
        )
    }

    pub async fn submit(&self, archive: &Path) -> Result<JobId, EngineError> {
        self.orchestrator.submit(archive, JobOptions::default()).await
    }

    pub fn job_status(&self, id: &JobId) -> JobStatus {
        self.orchestrator.status(id).map(|s| s.status).unwrap_or(JobStatus::Cleaned)
    }

    pub async fn wait_terminal(&self, id: &JobId) -> JobStatus {
        let probe_id = id.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let done = wait_for(15_000, move || {
            orchestrator
                .status(&probe_id)
                .map(|s| s.status.is_terminal())
                .unwrap_or(false)
        })
        .await;
        assert!(done, "job did not reach a terminal status in time");
        self.job_status(id)
    }
}

/// Poll until `f` is true or `ms` elapses.
pub async fn wait_for(ms: u64, f: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(ms);
    while std::time::Instant::now() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    f()
}
