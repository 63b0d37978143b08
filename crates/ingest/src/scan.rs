// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breadth-first project traversal.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// One file discovered by [`walk_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Directory depth below the walk root (files at the root have depth 0).
    pub depth: usize,
    pub size: u64,
}

/// Breadth-first file enumeration under `root`.
///
/// Directories are visited level by level so shallow files come first.
/// Symbolic-link cycles are broken by tracking canonicalized directory
/// identities; `max_depth` (when set) bounds how deep the walk descends.
pub fn walk_files(root: &Path, max_depth: Option<usize>) -> std::io::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();

    if let Ok(canonical) = root.canonicalize() {
        visited.insert(canonical);
    }
    queue.push_back((root.to_path_buf(), 0));

    while let Some((dir, depth)) = queue.pop_front() {
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            // A directory vanishing mid-walk is not fatal.
            Err(_) => continue,
        };
        let mut level: Vec<_> = read.flatten().collect();
        level.sort_by_key(|e| e.file_name());
        for entry in level {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
                if max_depth.is_some_and(|max| depth + 1 > max) {
                    continue;
                }
                // Canonical identity check breaks symlink cycles.
                if let Ok(canonical) = path.canonicalize() {
                    if !visited.insert(canonical) {
                        continue;
                    }
                }
                queue.push_back((path, depth + 1));
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                entries.push(FileEntry { path, depth, size });
            }
        }
    }

    Ok(entries)
}

/// All directories under `root` (including `root`), breadth-first, bounded
/// by `max_depth`. Used to build converter search paths.
pub fn subdirectories(root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    let mut visited: HashSet<PathBuf> = HashSet::new();
    if let Ok(canonical) = root.canonicalize() {
        visited.insert(canonical);
    }
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
    queue.push_back((root.to_path_buf(), 0));

    while let Some((dir, depth)) = queue.pop_front() {
        let Ok(read) = std::fs::read_dir(&dir) else { continue };
        let mut level: Vec<_> = read.flatten().collect();
        level.sort_by_key(|e| e.file_name());
        for entry in level {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if max_depth.is_some_and(|max| depth + 1 > max) {
                continue;
            }
            if let Ok(canonical) = path.canonicalize() {
                if !visited.insert(canonical) {
                    continue;
                }
            }
            dirs.push(path.clone());
            queue.push_back((path, depth + 1));
        }
    }

    dirs
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
