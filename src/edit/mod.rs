//! Archive rewriting.
//!
//! Every modification produces a complete new archive in a temporary file
//! created in the target's directory, which is renamed over the target only
//! once the new archive has been fully written. A failure at any point leaves
//! the target untouched and removes the temporary file.
//!
//! - [`add`] copies the existing entries through and appends new files and
//!   directories from the file system.
//! - [`delete`] drops the entries selected by a remove plan.
//! - [`copy`] writes the entries selected by a keep plan to another path, or
//!   copies the archive byte for byte when no patterns are given.
//!
//! Existing entries are always copied as raw compressed bytes, never
//! decompressed and recompressed.

mod add;
mod rewrite;

pub use add::add;
pub use rewrite::{copy, delete};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::fs::{discard, persist};
use crate::write::{WriteOptions, Writer};
use crate::{Error, Result};

/// Writer over a staging file.
pub(crate) type StagedWriter<'a> = Writer<BufWriter<&'a mut File>>;

/// Result of an add operation.
#[must_use = "add result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddResult {
    /// Entries carried over from the existing archive.
    pub entries_copied: usize,
    /// New entries written from the file system.
    pub entries_added: usize,
    /// File-system items skipped because the archive already had the name.
    pub entries_skipped: usize,
    /// Content bytes read from added files.
    pub bytes_added: u64,
}

impl AddResult {
    /// Returns the number of entries in the resulting archive.
    pub fn total_entries(&self) -> usize {
        self.entries_copied + self.entries_added
    }
}

/// Result of a delete or filtered copy.
#[must_use = "edit result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResult {
    /// Source entries written to the new archive.
    pub entries_kept: usize,
    /// Source entries left out of the new archive.
    pub entries_removed: usize,
    /// Directory entries created for ancestors the source lacked.
    pub entries_synthesized: usize,
}

impl EditResult {
    /// Returns the number of entries in the resulting archive.
    pub fn total_entries(&self) -> usize {
        self.entries_kept + self.entries_synthesized
    }
}

/// Directory a staging file for `target` is created in.
pub(crate) fn staging_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Creates an empty staging file next to `target`.
pub(crate) fn stage_beside(target: &Path, prefix: &str) -> Result<NamedTempFile> {
    let dir = staging_dir(target);
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io_at(dir, e))?;
    log::debug!(
        "staging {} in {}",
        target.display(),
        temp.path().display()
    );
    Ok(temp)
}

/// Builds a new archive in a staging file and renames it onto `target`.
///
/// `build` receives a writer over the staging file. The staging file is
/// removed if `build`, finishing the archive, or the rename fails.
pub(crate) fn write_staged<T>(
    target: &Path,
    prefix: &str,
    options: WriteOptions,
    build: impl FnOnce(&mut StagedWriter<'_>) -> Result<T>,
) -> Result<T> {
    let mut temp = stage_beside(target, prefix)?;
    let written = write_archive(temp.as_file_mut(), options, build);
    match written {
        Ok(value) => {
            // staging files are created 0600; a replaced archive keeps its mode
            if let Ok(existing) = std::fs::metadata(target) {
                if let Err(e) = temp.as_file().set_permissions(existing.permissions()) {
                    log::warn!("failed to carry permissions over to {}: {e}", target.display());
                }
            }
            persist(temp, target)?;
            Ok(value)
        }
        Err(e) => Err(discard(temp, e)),
    }
}

fn write_archive<T>(
    file: &mut File,
    options: WriteOptions,
    build: impl FnOnce(&mut StagedWriter<'_>) -> Result<T>,
) -> Result<T> {
    let mut writer = Writer::create(BufWriter::new(file))?.options(options);
    let value = build(&mut writer)?;
    let (result, sink) = writer.finish_into_inner()?;
    sink.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    log::debug!(
        "wrote {} entries ({} copied)",
        result.entries_written,
        result.entries_copied
    );
    Ok(value)
}
