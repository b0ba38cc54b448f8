//! Staging orchestration
//!
//! [`Stager::ensure_staged`] is the single entry point the build calls
//! before any native compilation. The staging marker inside the canonical
//! directory is the only record of completed work:
//!
//! | Marker | Action |
//! |--------|--------|
//! | present | return immediately, no writes |
//! | absent | lock, re-check, fetch, verify, extract, clean up |
//!
//! On failure the canonical directory is either removed or left without
//! its marker, so the next invocation re-attempts staging.

use crate::dependency::Dependency;
use crate::error::{ExtractionErrorKind, StageError, StageResult};
use crate::extract::extract;
use crate::fetch::Fetcher;
use crate::integrity::verify_sha256;
use crate::journal::Journal;
use crate::lock::StageLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a staging run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Marker was already present; nothing was touched
    AlreadyStaged,
    /// Archive was downloaded and extracted
    Staged(StageReport),
}

/// Work performed by a staging run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Archive size in bytes
    pub bytes: u64,
    pub files: usize,
    pub directories: usize,
}

/// Stages dependencies using a fetcher and a scratch directory
pub struct Stager<F> {
    fetcher: F,
    scratch_dir: PathBuf,
    journal: Journal,
}

impl<F: Fetcher> Stager<F> {
    pub fn new(fetcher: F, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            scratch_dir: scratch_dir.into(),
            journal: Journal::disabled(),
        }
    }

    /// Record staging events in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Temporary archive location for a dependency
    pub fn archive_path(&self, dep: &Dependency) -> PathBuf {
        self.scratch_dir.join(dep.archive_file_name())
    }

    /// Make sure `dep` is present under its canonical directory.
    ///
    /// Repeated calls after a successful run only check the marker.
    pub fn ensure_staged(&self, dep: &Dependency) -> StageResult<StageOutcome> {
        let marker = dep.marker_path();
        if marker.is_file() {
            debug!("{} already staged ({})", dep.name(), marker.display());
            return Ok(StageOutcome::AlreadyStaged);
        }

        fs::create_dir_all(&self.scratch_dir).map_err(|e| {
            StageError::filesystem("creating scratch directory", &self.scratch_dir, e)
        })?;

        let _lock = StageLock::acquire(&self.scratch_dir, dep.name())?;
        if marker.is_file() {
            info!("{} was staged by another process", dep.name());
            return Ok(StageOutcome::AlreadyStaged);
        }

        let result = self.stage_locked(dep);
        match &result {
            Ok(StageOutcome::Staged(report)) => self.journal.record(
                "stage.completed",
                &serde_json::json!({
                    "name": dep.name(),
                    "version": dep.version(),
                    "url": dep.source_url(),
                    "path": dep.canonical_dir(),
                    "bytes": report.bytes,
                    "files": report.files,
                }),
            ),
            Ok(StageOutcome::AlreadyStaged) => {}
            Err(e) => self.journal.record(
                "stage.failed",
                &serde_json::json!({
                    "name": dep.name(),
                    "version": dep.version(),
                    "category": e.category().as_str(),
                    "error": e.to_string(),
                }),
            ),
        }
        result
    }

    /// Remove the staged directory and stage again from scratch
    pub fn restage(&self, dep: &Dependency) -> StageResult<StageOutcome> {
        self.clean(dep)?;
        self.ensure_staged(dep)
    }

    /// Remove the canonical directory and any leftover archive.
    ///
    /// Returns whether anything was removed.
    pub fn clean(&self, dep: &Dependency) -> StageResult<bool> {
        fs::create_dir_all(&self.scratch_dir).map_err(|e| {
            StageError::filesystem("creating scratch directory", &self.scratch_dir, e)
        })?;
        let _lock = StageLock::acquire(&self.scratch_dir, dep.name())?;

        let mut removed = false;
        let canonical = dep.canonical_dir();
        if canonical.exists() {
            fs::remove_dir_all(&canonical)
                .map_err(|e| StageError::filesystem("removing staged directory", &canonical, e))?;
            removed = true;
        }

        let archive = self.archive_path(dep);
        if archive.exists() {
            fs::remove_file(&archive)
                .map_err(|e| StageError::filesystem("removing archive", &archive, e))?;
            removed = true;
        }

        if removed {
            info!("Removed staged {} at {}", dep.name(), canonical.display());
            self.journal.record(
                "stage.cleaned",
                &serde_json::json!({ "name": dep.name(), "path": canonical }),
            );
        }
        Ok(removed)
    }

    fn stage_locked(&self, dep: &Dependency) -> StageResult<StageOutcome> {
        fs::create_dir_all(dep.target_root()).map_err(|e| {
            StageError::filesystem("creating target root", dep.target_root(), e)
        })?;

        let canonical = dep.canonical_dir();
        let existed_before = canonical.exists();
        let archive = self.archive_path(dep);

        info!(
            "Staging {} {} into {}",
            dep.name(),
            dep.version(),
            canonical.display()
        );

        match self.fetch_and_extract(dep, &archive) {
            Ok(report) => {
                remove_archive(&archive);
                info!(
                    "Staged {} ({} files, {} bytes downloaded)",
                    dep.name(),
                    report.files,
                    report.bytes
                );
                Ok(StageOutcome::Staged(report))
            }
            Err(e) => {
                self.discard_partial(dep, &archive, existed_before);
                Err(e)
            }
        }
    }

    fn fetch_and_extract(&self, dep: &Dependency, archive: &Path) -> StageResult<StageReport> {
        let bytes = self.fetcher.fetch(dep.source_url(), archive)?;

        if let Some(expected) = dep.sha256() {
            verify_sha256(archive, expected, dep.source_url())?;
        }

        let summary = extract(archive, dep.target_root(), dep.canonical_dir_name())?;

        if !dep.marker_path().is_file() {
            return Err(StageError::extraction(
                archive,
                ExtractionErrorKind::MarkerMissing(dep.marker().to_path_buf()),
            ));
        }

        Ok(StageReport {
            bytes,
            files: summary.files,
            directories: summary.directories,
        })
    }

    /// Best-effort removal of everything a failed run may have written
    fn discard_partial(&self, dep: &Dependency, archive: &Path, existed_before: bool) {
        remove_archive(archive);

        let canonical = dep.canonical_dir();
        if existed_before {
            // Leave a pre-existing directory alone but make sure it does not look staged
            let marker = dep.marker_path();
            if let Err(e) = fs::remove_file(&marker) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove marker {}: {}", marker.display(), e);
                }
            }
        } else if canonical.exists() {
            match fs::remove_dir_all(&canonical) {
                Ok(()) => debug!("Removed partial {}", canonical.display()),
                Err(e) => warn!(
                    "Failed to remove partial directory {}: {}",
                    canonical.display(),
                    e
                ),
            }
        }
    }
}

fn remove_archive(archive: &Path) {
    match fs::remove_file(archive) {
        Ok(()) => debug!("Removed {}", archive.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove temporary archive {}: {}",
            archive.display(),
            e
        ),
    }
}
