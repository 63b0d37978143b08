// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safe archive extraction.
//!
//! ZIP, TAR, and TAR.GZ payloads are unpacked into the job's working
//! directory under a refusal policy: no absolute member paths, no escape
//! above the extraction root, bounded component length and depth, a
//! decompression-bomb guard, a member-count cap, and a wall-clock deadline.
//! Symbolic links in archives are dropped, never recreated.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::IngestError;

/// Refusal thresholds for one extraction.
#[derive(Debug, Clone)]
pub struct ExtractLimits {
    pub max_members: usize,
    /// Hard cap on combined extracted bytes.
    pub max_total_bytes: u64,
    /// Expansion ratio over the archive's own size.
    pub max_ratio: u64,
    /// Longest accepted path component, in bytes.
    pub max_component_len: usize,
    /// Deepest accepted member path.
    pub max_depth: usize,
    pub timeout: Duration,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_members: 50_000,
            max_total_bytes: 2 * 1024 * 1024 * 1024,
            max_ratio: 10,
            max_component_len: 255,
            max_depth: 12,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Accepted archive container formats, detected from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    pub fn detect(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Summary of a completed extraction.
#[derive(Debug)]
pub struct Extraction {
    pub root: PathBuf,
    pub member_count: usize,
    pub total_bytes: u64,
    /// Members skipped (symlinks and other non-file specials).
    pub skipped: usize,
}

/// Unpack `archive` into `dest` under `limits`.
///
/// The blocking work runs on the blocking pool; the wall-clock deadline is
/// enforced from async context.
pub async fn extract(
    archive: &Path,
    dest: &Path,
    limits: &ExtractLimits,
) -> Result<Extraction, IngestError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let limits = limits.clone();
    let deadline = limits.timeout;

    let work = tokio::task::spawn_blocking(move || extract_sync(&archive, &dest, &limits));
    match tokio::time::timeout(deadline, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(IngestError::Malformed(format!("extraction task failed: {join}"))),
        Err(_) => Err(IngestError::ExtractionTimeout(deadline.as_secs())),
    }
}

fn extract_sync(
    archive: &Path,
    dest: &Path,
    limits: &ExtractLimits,
) -> Result<Extraction, IngestError> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let format = ArchiveFormat::detect(&filename)
        .ok_or(IngestError::UnsupportedFormat { name: filename })?;

    let archive_size = std::fs::metadata(archive)?.len();
    if archive_size == 0 {
        return Err(IngestError::unsafe_archive("empty archive"));
    }
    let byte_budget = limits.max_total_bytes.min(archive_size.saturating_mul(limits.max_ratio));

    std::fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest, limits, byte_budget),
        ArchiveFormat::Tar | ArchiveFormat::TarGz => {
            extract_tar(archive, dest, limits, byte_budget, format)
        }
    }
}

/// Validate one member path against the policy. Returns the normalized
/// relative path.
fn vet_member_path(raw: &Path, limits: &ExtractLimits) -> Result<PathBuf, IngestError> {
    if raw.is_absolute() {
        return Err(IngestError::unsafe_archive(format!(
            "absolute member path {}",
            raw.display()
        )));
    }
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;
    for component in raw.components() {
        match component {
            Component::Normal(part) => {
                if part.as_encoded_bytes().len() > limits.max_component_len {
                    return Err(IngestError::unsafe_archive(format!(
                        "path component longer than {} bytes",
                        limits.max_component_len
                    )));
                }
                normalized.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // Normalizing above the extraction root is refused outright,
                // even when a later component would descend back.
                return Err(IngestError::unsafe_archive(format!(
                    "member path escapes extraction root: {}",
                    raw.display()
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(IngestError::unsafe_archive(format!(
                    "absolute member path {}",
                    raw.display()
                )));
            }
        }
    }
    if depth > limits.max_depth {
        return Err(IngestError::unsafe_archive(format!(
            "member path deeper than {} levels",
            limits.max_depth
        )));
    }
    if normalized.as_os_str().is_empty() {
        return Err(IngestError::unsafe_archive("empty member path"));
    }
    Ok(normalized)
}

/// Copy an entry's bytes, charging them against the shared budget.
fn copy_bounded(
    reader: &mut impl Read,
    target: &Path,
    written: &mut u64,
    byte_budget: u64,
) -> Result<(), IngestError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    let remaining = byte_budget.saturating_sub(*written);
    // Read one byte past the budget so overflow is detected, not silently cut.
    let copied = std::io::copy(&mut reader.take(remaining + 1), &mut out)?;
    *written += copied;
    if *written > byte_budget {
        return Err(IngestError::unsafe_archive(
            "extracted size exceeds decompression bomb guard",
        ));
    }
    Ok(())
}

fn extract_zip(
    archive_path: &Path,
    dest: &Path,
    limits: &ExtractLimits,
    byte_budget: u64,
) -> Result<Extraction, IngestError> {
    let file = File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| IngestError::Malformed(e.to_string()))?;

    if archive.len() > limits.max_members {
        return Err(IngestError::unsafe_archive(format!(
            "archive holds {} members (cap {})",
            archive.len(),
            limits.max_members
        )));
    }

    // Validation pass: vet every path and size up front so a poisoned
    // archive is refused before anything touches the filesystem.
    let mut declared_bytes = 0u64;
    let mut keep = vec![false; archive.len()];
    let mut skipped = 0usize;
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| IngestError::Malformed(e.to_string()))?;
        let raw_name = entry.name().to_string();
        vet_member_path(Path::new(&raw_name), limits)?;
        if is_zip_symlink(entry.unix_mode()) {
            skipped += 1;
            continue;
        }
        declared_bytes = declared_bytes.saturating_add(entry.size());
        keep[index] = true;
    }
    if declared_bytes > byte_budget {
        return Err(IngestError::unsafe_archive(
            "declared extracted size exceeds decompression bomb guard",
        ));
    }

    let kept = keep.iter().filter(|&&k| k).count();
    let bulk = archive.len() >= 50 && kept * 100 >= archive.len() * 80;
    tracing::debug!(members = archive.len(), kept, bulk, "extracting zip archive");

    let mut written = 0u64;
    let mut member_count = 0usize;
    for index in 0..archive.len() {
        if !keep[index] {
            continue;
        }
        let mut entry = archive
            .by_index(index)
            .map_err(|e| IngestError::Malformed(e.to_string()))?;
        let raw_name = entry.name().to_string();
        let relative = if bulk {
            // Paths were vetted wholesale above.
            Path::new(&raw_name).to_path_buf()
        } else {
            // Member-by-member: re-vet right before the write.
            vet_member_path(Path::new(&raw_name), limits)?
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        copy_bounded(&mut entry, &target, &mut written, byte_budget)?;
        member_count += 1;
    }

    Ok(Extraction { root: dest.to_path_buf(), member_count, total_bytes: written, skipped })
}

fn is_zip_symlink(unix_mode: Option<u32>) -> bool {
    matches!(unix_mode, Some(mode) if mode & 0o170000 == 0o120000)
}

fn extract_tar(
    archive_path: &Path,
    dest: &Path,
    limits: &ExtractLimits,
    byte_budget: u64,
    format: ArchiveFormat,
) -> Result<Extraction, IngestError> {
    // Streaming container: validate in a first pass, extract in a second.
    let mut member_total = 0usize;
    let mut declared_bytes = 0u64;
    {
        let mut archive = open_tar(archive_path, format)?;
        let entries = archive.entries().map_err(|e| IngestError::Malformed(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| IngestError::Malformed(e.to_string()))?;
            member_total += 1;
            if member_total > limits.max_members {
                return Err(IngestError::unsafe_archive(format!(
                    "archive holds more than {} members",
                    limits.max_members
                )));
            }
            let path = entry.path().map_err(|e| IngestError::Malformed(e.to_string()))?;
            vet_member_path(&path, limits)?;
            declared_bytes = declared_bytes.saturating_add(entry.header().size().unwrap_or(0));
        }
    }
    if declared_bytes > byte_budget {
        return Err(IngestError::unsafe_archive(
            "declared extracted size exceeds decompression bomb guard",
        ));
    }

    let mut archive = open_tar(archive_path, format)?;
    let entries = archive.entries().map_err(|e| IngestError::Malformed(e.to_string()))?;
    let mut written = 0u64;
    let mut member_count = 0usize;
    let mut skipped = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| IngestError::Malformed(e.to_string()))?;
        let relative = {
            let path = entry.path().map_err(|e| IngestError::Malformed(e.to_string()))?;
            vet_member_path(&path, limits)?
        };
        let target = dest.join(relative);
        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&target)?;
            }
            tar::EntryType::Regular => {
                copy_bounded(&mut entry, &target, &mut written, byte_budget)?;
                member_count += 1;
            }
            // Symlinks and other specials are dropped.
            _ => skipped += 1,
        }
    }

    Ok(Extraction { root: dest.to_path_buf(), member_count, total_bytes: written, skipped })
}

fn open_tar(
    path: &Path,
    format: ArchiveFormat,
) -> Result<tar::Archive<Box<dyn Read>>, IngestError> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(tar::Archive::new(reader))
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
