// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-backed configuration.
//!
//! Every knob has a default; the daemon reads the environment once at
//! startup and the resulting [`Config`] value is passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the conversion engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admission cap on jobs in `pending` or `running` (`MAX_CONCURRENT`).
    pub max_concurrent: usize,
    /// How long terminal jobs keep their artifacts (`RETENTION_HOURS`).
    pub retention: Duration,
    /// Sweeper period (`SWEEP_INTERVAL_SECONDS`).
    pub sweep_interval: Duration,
    /// Base pipeline budget before size scaling (`DEFAULT_TIMEOUT_SECONDS`).
    pub default_timeout: Duration,
    /// Ceiling on the computed pipeline budget (`MAX_TIMEOUT_SECONDS`).
    pub max_timeout: Duration,
    /// LaTeX compiler executable (`COMPILER_PATH`).
    pub compiler_path: PathBuf,
    /// TeX→HTML converter executable (`CONVERTER_PATH`).
    pub converter_path: PathBuf,
    /// Vector graphics converter executable (`VECTORIZER_PATH`).
    pub vectorizer_path: PathBuf,
    /// System package tool executable (`PACKAGE_INSTALLER_PATH`).
    pub package_installer_path: PathBuf,
    /// Directory receiving uploads, one subdirectory per job (`UPLOAD_ROOT`).
    pub upload_root: PathBuf,
    /// Directory receiving outputs, one subdirectory per job (`OUTPUT_ROOT`).
    pub output_root: PathBuf,
    /// Largest accepted archive (`MAX_FILE_SIZE_BYTES`).
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            retention: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(3600),
            default_timeout: Duration::from_secs(600),
            max_timeout: Duration::from_secs(1800),
            compiler_path: PathBuf::from("pdflatex"),
            converter_path: PathBuf::from("latexmlc"),
            vectorizer_path: PathBuf::from("pdftocairo"),
            package_installer_path: PathBuf::from("tlmgr"),
            upload_root: PathBuf::from("data/uploads"),
            output_root: PathBuf::from("data/outputs"),
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent: env_parse("MAX_CONCURRENT").unwrap_or(defaults.max_concurrent),
            retention: env_parse("RETENTION_HOURS")
                .map(|h: u64| Duration::from_secs(h * 3600))
                .unwrap_or(defaults.retention),
            sweep_interval: env_parse("SWEEP_INTERVAL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            default_timeout: env_parse("DEFAULT_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            max_timeout: env_parse("MAX_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_timeout),
            compiler_path: env_path("COMPILER_PATH").unwrap_or(defaults.compiler_path),
            converter_path: env_path("CONVERTER_PATH").unwrap_or(defaults.converter_path),
            vectorizer_path: env_path("VECTORIZER_PATH").unwrap_or(defaults.vectorizer_path),
            package_installer_path: env_path("PACKAGE_INSTALLER_PATH")
                .unwrap_or(defaults.package_installer_path),
            upload_root: env_path("UPLOAD_ROOT").unwrap_or(defaults.upload_root),
            output_root: env_path("OUTPUT_ROOT").unwrap_or(defaults.output_root),
            max_file_size: env_parse("MAX_FILE_SIZE_BYTES").unwrap_or(defaults.max_file_size),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
