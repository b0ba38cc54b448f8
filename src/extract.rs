//! Archive extraction with top-level directory rewriting
//!
//! Upstream archives wrap their contents in a version-qualified root such as
//! `SDL2-2.28.5/`. Extraction replaces that root with the canonical,
//! version-independent directory name so native build include paths never
//! change across version bumps.

use crate::error::{ExtractionErrorKind, StageError, StageResult};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Counts of what an extraction produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
}

/// Rewrite an archive entry path so it lives under `canonical_dir_name`.
///
/// The first component after any leading `./` is the archive's root
/// directory and is replaced. A lone directory entry is the root itself; a
/// lone file entry is placed directly inside the canonical directory.
pub fn rewrite_entry_path(entry: &Path, is_dir: bool, canonical_dir_name: &str) -> Option<PathBuf> {
    let mut components = entry.components();
    let root = loop {
        match components.next()? {
            Component::CurDir => continue,
            component => break component,
        }
    };
    let rest = components.as_path();

    let canonical = Path::new(canonical_dir_name);
    if rest.as_os_str().is_empty() {
        if is_dir {
            Some(canonical.to_path_buf())
        } else {
            Some(canonical.join(root))
        }
    } else {
        Some(canonical.join(rest))
    }
}

/// True when every component is a plain name, so the path cannot leave
/// the directory it is joined onto
fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

/// Extract `archive_path` into `target_root/canonical_dir_name`.
///
/// Entries are processed in archive order. Parent directories are always
/// created before a file is written, so directory entries may appear
/// before or after their contents. Existing files are truncated.
pub fn extract(
    archive_path: &Path,
    target_root: &Path,
    canonical_dir_name: &str,
) -> StageResult<ExtractSummary> {
    let archive_err = |reason: String| {
        StageError::extraction(archive_path, ExtractionErrorKind::Archive(reason))
    };
    let write_err = |path: &Path, source: io::Error| {
        StageError::extraction(
            archive_path,
            ExtractionErrorKind::Write {
                path: path.to_path_buf(),
                source,
            },
        )
    };

    let file = File::open(archive_path).map_err(|e| archive_err(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(BufReader::with_capacity(1024 * 1024, file))
        .map_err(|e| archive_err(e.to_string()))?;

    let mut summary = ExtractSummary::default();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| archive_err(e.to_string()))?;

        let name = entry.name().to_string();
        let enclosed = entry.enclosed_name().ok_or_else(|| {
            StageError::extraction(archive_path, ExtractionErrorKind::UnsafePath(name.clone()))
        })?;
        let is_dir = entry.is_dir();

        let Some(relative) = rewrite_entry_path(&enclosed, is_dir, canonical_dir_name) else {
            // Entries like "./" have no components
            continue;
        };
        // The original root may be escaped once it has been swapped out
        if !is_contained(&relative) {
            return Err(StageError::extraction(
                archive_path,
                ExtractionErrorKind::UnsafePath(name),
            ));
        }
        let dest = target_root.join(&relative);

        if is_dir {
            fs::create_dir_all(&dest).map_err(|e| write_err(&dest, e))?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }

        let mut out = File::create(&dest).map_err(|e| write_err(&dest, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            // Decompression and CRC failures surface as InvalidData
            if e.kind() == io::ErrorKind::InvalidData {
                archive_err(format!("{}: {}", name, e))
            } else {
                write_err(&dest, e)
            }
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            let mode = mode & 0o777;
            if mode != 0 {
                fs::set_permissions(&dest, fs::Permissions::from_mode(mode))
                    .map_err(|e| write_err(&dest, e))?;
            }
        }

        summary.files += 1;
    }

    debug!(
        "Extracted {} files and {} directories from {} into {}",
        summary.files,
        summary.directories,
        archive_path.display(),
        target_root.join(canonical_dir_name).display()
    );
    Ok(summary)
}
