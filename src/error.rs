//! Error types for ZIP archive operations.
//!
//! This module provides the [`Error`] enum which represents every failure
//! mode of the archive operations, along with a convenient [`Result<T>`]
//! type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. The
//! semantic variants let callers tell a missing archive apart from a
//! damaged one or from a failed integrity check:
//!
//! ```rust,no_run
//! use zippy::Error;
//!
//! match zippy::extract_all("backup.zip", "restore") {
//!     Ok(entries) => println!("extracted {} entries", entries.len()),
//!     Err(Error::NotFound { path }) => eprintln!("no such archive: {}", path.display()),
//!     Err(e) if e.is_integrity_failure() => eprintln!("archive data is damaged: {e}"),
//!     Err(e) => eprintln!("extraction failed: {e}"),
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Error type for archive operations.
///
/// Every public operation returns a single terminal error. Failures that
/// happen while cleaning up after an earlier error never replace it; they are
/// attached through [`Error::WithCleanup`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error that is not tied to a specific path.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive or a source file/directory does not exist.
    #[error("not found: {}", .path.display())]
    NotFound {
        /// The path that could not be found.
        path: PathBuf,
    },

    /// The operating system rejected access to a path.
    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The central directory or a local header failed to parse.
    ///
    /// The offset is the byte position in the archive file where the
    /// structure was expected.
    #[error("corrupt archive at offset {offset:#x}: {reason}")]
    CorruptArchive {
        /// Byte offset of the damaged structure.
        offset: u64,
        /// Description of the problem.
        reason: String,
    },

    /// A glob pattern is syntactically malformed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use zippy::{Error, PatternSet};
    ///
    /// let result = PatternSet::new(["[abc"]);
    /// assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    /// ```
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Description of why the pattern is invalid.
        reason: String,
    },

    /// The number of bytes stored while adding a file differs from its
    /// size on disk.
    #[error("failed to copy '{}': expected {expected} bytes, got {actual} bytes", .path.display())]
    CopyMismatch {
        /// The source file.
        path: PathBuf,
        /// Size reported by the file system.
        expected: u64,
        /// Bytes actually transferred.
        actual: u64,
    },

    /// The CRC-32 of extracted content differs from the stored value.
    ///
    /// This signals corrupted archive data or a truncated read, as opposed
    /// to a plain I/O failure. It is also reported when the compressed stream
    /// of the entry cannot be decoded at all.
    #[error("checksum mismatch for '{entry_name}': expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// The entry whose content failed verification.
        entry_name: String,
        /// CRC-32 stored in the archive.
        expected: u32,
        /// CRC-32 of the data produced.
        actual: u32,
    },

    /// The number of bytes written during extraction differs from the stored
    /// uncompressed size.
    #[error("size mismatch for '{entry_name}': expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        /// The entry whose content failed verification.
        entry_name: String,
        /// Uncompressed size stored in the archive.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// The final atomic replace could not complete.
    #[error("failed to rename '{}' to '{}': {source}", .from.display(), .to.display())]
    RenameFailed {
        /// The staged temporary file.
        from: PathBuf,
        /// The path that should have been replaced.
        to: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Two entries with the same name were written to one archive.
    #[error("duplicate entry: {name}")]
    DuplicateEntry {
        /// The repeated entry name.
        name: String,
    },

    /// An entry uses a compression method other than store or deflate.
    #[error("unsupported compression method: {method}")]
    UnsupportedMethod {
        /// Method identifier from the header.
        method: u16,
    },

    /// The archive uses a ZIP feature this crate does not implement.
    #[error("unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Name of the feature.
        feature: &'static str,
    },

    /// An entry name would resolve outside the extraction directory.
    #[error("unsafe entry path: {name}")]
    UnsafePath {
        /// The offending entry name.
        name: String,
    },

    /// Extraction target exists and the overwrite policy forbids replacing it.
    #[error("destination already exists: {}", .path.display())]
    DestinationExists {
        /// The existing destination path.
        path: PathBuf,
    },

    /// An invalid compression level was provided.
    ///
    /// Deflate levels must be in the range 0-9.
    ///
    /// ```rust
    /// use zippy::{EngineOptions, Error};
    ///
    /// assert!(EngineOptions::new().compression_level(6).is_ok());
    /// let result = EngineOptions::new().compression_level(12);
    /// assert!(matches!(result, Err(Error::InvalidCompressionLevel { level: 12 })));
    /// ```
    #[error("invalid compression level {level}: must be 0-9")]
    InvalidCompressionLevel {
        /// The invalid level that was provided.
        level: u32,
    },

    /// A cleanup step failed after the operation had already failed.
    ///
    /// The primary error is the one that aborted the operation; the cleanup
    /// error is kept as context instead of being discarded.
    #[error("{primary}; additionally failed to {action}: {cleanup}")]
    WithCleanup {
        /// The error that aborted the operation.
        #[source]
        primary: Box<Error>,
        /// The cleanup step that also failed.
        action: &'static str,
        /// The cleanup failure.
        cleanup: io::Error,
    },
}

impl Error {
    /// Maps an I/O error on `path` to the semantic variant for its kind.
    ///
    /// `NotFound` and `PermissionDenied` keep the path; every other kind is
    /// wrapped as [`Error::Io`].
    pub fn io_at(path: impl AsRef<Path>, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.as_ref().to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                path: path.as_ref().to_path_buf(),
                source: err,
            },
            _ => Error::Io(err),
        }
    }

    /// Creates a [`Error::CorruptArchive`] error.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptArchive {
            offset,
            reason: reason.into(),
        }
    }

    /// Attaches a cleanup failure to this error.
    pub(crate) fn with_cleanup(self, action: &'static str, cleanup: io::Error) -> Self {
        Error::WithCleanup {
            primary: Box::new(self),
            action,
            cleanup,
        }
    }

    /// Returns the error that aborted the operation, looking through
    /// attached cleanup failures.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithCleanup { primary, .. } => primary.root(),
            other => other,
        }
    }

    /// Returns `true` if this is a structural archive corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(self.root(), Error::CorruptArchive { .. })
    }

    /// Returns `true` if extracted or added content failed verification.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self.root(),
            Error::ChecksumMismatch { .. } | Error::SizeMismatch { .. } | Error::CopyMismatch { .. }
        )
    }

    /// Returns `true` if a file or archive was missing.
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Error::NotFound { .. } => true,
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns `true` if this error is related to unsupported features or methods.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self.root(),
            Error::UnsupportedMethod { .. } | Error::UnsupportedFeature { .. }
        )
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self.root() {
            Error::ChecksumMismatch { entry_name, .. } | Error::SizeMismatch { entry_name, .. } => {
                Some(entry_name)
            }
            Error::DuplicateEntry { name } | Error::UnsafePath { name } => Some(name),
            _ => None,
        }
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_at_maps_not_found() {
        let err = Error::io_at("a.zip", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::NotFound { ref path } if path == Path::new("a.zip")));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_io_at_maps_permission_denied() {
        let err = Error::io_at("/root", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[test]
    fn test_io_at_passes_other_kinds() {
        let err = Error::io_at("x", io::Error::from(io::ErrorKind::WriteZero));
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_cleanup_keeps_primary() {
        let err = Error::corrupt(4, "bad signature")
            .with_cleanup("remove temporary file", io::Error::other("busy"));
        assert!(err.is_corruption());
        let msg = err.to_string();
        assert!(msg.starts_with("corrupt archive at offset 0x4: bad signature"));
        assert!(msg.contains("additionally failed to remove temporary file: busy"));
    }

    #[test]
    fn test_checksum_display() {
        let err = Error::ChecksumMismatch {
            entry_name: "a.txt".into(),
            expected: 0xdeadbeef,
            actual: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch for 'a.txt': expected deadbeef, got 00000001"
        );
        assert_eq!(err.entry_name(), Some("a.txt"));
        assert!(err.is_integrity_failure());
    }
}
