//! Whole-file source backups.
//!
//! Taken once per clock-period attempt before the first edit. Abandoning the
//! attempt restores every file; a successful attempt discards the copies.

use crate::error::PatchError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Backup copies of a set of source files, each stored next to its original
/// as `<stem>_backup.<ext>`.
#[derive(Debug)]
pub struct SourceBackup {
    entries: Vec<(PathBuf, PathBuf)>,
}

/// Returns the backup location for `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_backup.{}", ext.to_string_lossy()),
        None => format!("{stem}_backup"),
    };
    path.with_file_name(name)
}

impl SourceBackup {
    /// Copies every file in `files` to its backup location.
    ///
    /// If any copy fails, the backups already written are removed again.
    pub fn take(files: &[PathBuf]) -> Result<Self, PatchError> {
        let mut taken = Self {
            entries: Vec::with_capacity(files.len()),
        };
        for original in files {
            let backup = backup_path(original);
            if let Err(e) = std::fs::copy(original, &backup) {
                if let Err(cleanup) = taken.discard() {
                    warn!(error = %cleanup, "failed to remove partial source backup");
                }
                return Err(PatchError::io(original, e));
            }
            taken.entries.push((original.clone(), backup));
        }
        debug!(files = taken.entries.len(), "took source backup");
        Ok(taken)
    }

    /// Copies every backup over its original, then removes the backups.
    pub fn restore(self) -> Result<(), PatchError> {
        for (original, backup) in &self.entries {
            std::fs::copy(backup, original).map_err(|e| PatchError::io(backup, e))?;
        }
        debug!(files = self.entries.len(), "restored source backup");
        self.discard()
    }

    /// Removes the backups, keeping the current sources.
    pub fn discard(self) -> Result<(), PatchError> {
        for (_, backup) in &self.entries {
            match std::fs::remove_file(backup) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(PatchError::io(backup, e)),
            }
        }
        Ok(())
    }
}
