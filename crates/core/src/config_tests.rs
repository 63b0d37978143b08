// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn defaults_without_env() {
    for key in ["MAX_CONCURRENT", "RETENTION_HOURS", "COMPILER_PATH"] {
        std::env::remove_var(key);
    }
    let config = Config::from_env();
    assert_eq!(config.max_concurrent, 5);
    assert_eq!(config.retention, Duration::from_secs(86_400));
    assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    assert_eq!(config.max_timeout, Duration::from_secs(1800));
    assert_eq!(config.compiler_path, PathBuf::from("pdflatex"));
}

#[test]
#[serial]
fn env_overrides_apply() {
    std::env::set_var("MAX_CONCURRENT", "2");
    std::env::set_var("RETENTION_HOURS", "1");
    std::env::set_var("COMPILER_PATH", "/opt/texlive/bin/pdflatex");
    let config = Config::from_env();
    assert_eq!(config.max_concurrent, 2);
    assert_eq!(config.retention, Duration::from_secs(3600));
    assert_eq!(config.compiler_path, PathBuf::from("/opt/texlive/bin/pdflatex"));
    for key in ["MAX_CONCURRENT", "RETENTION_HOURS", "COMPILER_PATH"] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn malformed_values_fall_back() {
    std::env::set_var("MAX_CONCURRENT", "not-a-number");
    let config = Config::from_env();
    assert_eq!(config.max_concurrent, 5);
    std::env::remove_var("MAX_CONCURRENT");
}
