// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output packaging: zip a directory tree for download.

use std::fs::File;
use std::path::Path;

use crate::error::IngestError;
use crate::scan::walk_files;

/// Zip the files under `dir` whose relative path passes `keep` into `dest`,
/// preserving relative member paths. `dest` itself is skipped when it lives
/// inside `dir`.
///
/// Returns the number of members written.
pub fn pack_directory(
    dir: &Path,
    dest: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<usize, IngestError> {
    let entries = walk_files(dir, None)?;
    let file = File::create(dest)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let mut members = 0;
    for entry in entries {
        if entry.path == dest {
            continue;
        }
        let Ok(relative) = entry.path.strip_prefix(dir) else { continue };
        if !keep(relative) {
            continue;
        }
        zip.start_file(relative.to_string_lossy().into_owned(), options)
            .map_err(|e| IngestError::Malformed(e.to_string()))?;
        let mut reader = File::open(&entry.path)?;
        std::io::copy(&mut reader, &mut zip)?;
        members += 1;
    }
    zip.finish().map_err(|e| IngestError::Malformed(e.to_string()))?;
    Ok(members)
}

#[cfg(test)]
#[path = "pack_tests.rs"]
mod tests;
