//! Post-copy byte-count validation.
//!
//! After every content transfer, whether a file going into an archive or an
//! entry coming out of one, the number of bytes moved must equal the size
//! recorded for it. The direction decides which error a mismatch becomes.

use std::path::Path;

use crate::{Error, Result};

/// Which way content travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer<'a> {
    /// A file-system file was stored as an archive entry.
    IntoArchive,
    /// An archive entry was written to the file system.
    OutOfArchive {
        /// Name of the entry that was extracted.
        entry_name: &'a str,
    },
}

/// Verifies that `written` equals `expected` for the copy at `path`.
///
/// The path must still exist; a vanished file is reported as
/// [`Error::NotFound`].
///
/// # Errors
///
/// - [`Error::CopyMismatch`] for [`Transfer::IntoArchive`]
/// - [`Error::SizeMismatch`] for [`Transfer::OutOfArchive`]
pub fn validate_copy(path: &Path, written: u64, expected: u64, transfer: Transfer<'_>) -> Result<()> {
    std::fs::metadata(path).map_err(|e| Error::io_at(path, e))?;

    if written == expected {
        return Ok(());
    }

    log::debug!(
        "byte count mismatch for {}: expected {expected}, wrote {written}",
        path.display()
    );
    Err(match transfer {
        Transfer::IntoArchive => Error::CopyMismatch {
            path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
            expected,
            actual: written,
        },
        Transfer::OutOfArchive { entry_name } => Error::SizeMismatch {
            entry_name: entry_name.to_string(),
            expected,
            actual: written,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_equal_counts_pass() {
        let file = NamedTempFile::new().unwrap();
        validate_copy(file.path(), 5, 5, Transfer::IntoArchive).unwrap();
    }

    #[test]
    fn test_into_archive_mismatch() {
        let file = NamedTempFile::new().unwrap();
        let err = validate_copy(file.path(), 4, 5, Transfer::IntoArchive).unwrap_err();
        assert!(matches!(
            err,
            Error::CopyMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_archive_mismatch() {
        let file = NamedTempFile::new().unwrap();
        let err = validate_copy(
            file.path(),
            9,
            10,
            Transfer::OutOfArchive { entry_name: "a.txt" },
        )
        .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { ref entry_name, .. } if entry_name == "a.txt"));
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_copy(&dir.path().join("gone"), 1, 1, Transfer::IntoArchive).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
