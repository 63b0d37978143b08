// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests: stub tool scripts, archives, and a
//! configured orchestrator on temp directories.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use texel_core::{Config, FakeClock};

use crate::orchestrator::Orchestrator;

/// A stub-tool environment with everything the orchestrator touches.
pub(crate) struct Harness {
    pub dir: TempDir,
    pub clock: FakeClock,
    pub orchestrator: Arc<Orchestrator<FakeClock>>,
}

pub(crate) struct HarnessOptions {
    pub max_concurrent: usize,
    pub compiler: &'static str,
    pub converter: &'static str,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self { max_concurrent: 5, compiler: COMPILER_OK, converter: CONVERTER_OK }
    }
}

/// Compiler stub that succeeds instantly.
pub(crate) const COMPILER_OK: &str = "exit 0\n";

/// Compiler stub that fails with a missing-package diagnostic.
pub(crate) const COMPILER_MISSING_PKG: &str =
    "echo \"! LaTeX Error: File 'siunitx.sty' not found.\" >&2\nexit 1\n";

/// Converter stub that writes a small document to `--dest=`.
pub(crate) const CONVERTER_OK: &str = concat!(
    "dest=out.html\n",
    "for a in \"$@\"; do case \"$a\" in --dest=*) dest=\"${a#*=}\" ;; esac; done\n",
    "printf '<html><head></head><body><p>Hello</p></body></html>' > \"$dest\"\n",
    "exit 0\n",
);

/// Converter stub that fails loudly.
pub(crate) const CONVERTER_FAIL: &str = "echo 'Fatal:perl:died' >&2\nexit 2\n";

/// Converter stub that hangs until killed.
pub(crate) const CONVERTER_SLOW: &str = "sleep 600\nexit 0\n";

pub(crate) fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir_all(&tools).unwrap();

        let config = Config {
            max_concurrent: options.max_concurrent,
            retention: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(3600),
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

    /// Write a ZIP archive with the given members and return its path.
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

    /// The canonical tiny project from the happy-path scenario.
    pub fn hello_archive(&self) -> PathBuf {
        self.archive(
            "paper.zip",
            &[(
                "main.tex",
                "\\documentclass{article}\\begin{document}Hello\\end{document}",
            )],
        )
    }
}

/// Poll until `f` is true or `ms` elapses.
pub(crate) async fn wait_for(ms: u64, f: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(ms);
    while std::time::Instant::now() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    f()
}
