//! File placement helpers.
//!
//! Rewrites stage their output in a temporary file next to the target and
//! then rename it into place. A rename only works within one file system, so
//! moves that cross devices fall back to copying into a temporary file in the
//! target directory, persisting that copy, and removing the source.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Returns `true` if `a` and `b` live on different storage devices.
///
/// `b` does not need to exist; its closest existing ancestor is examined
/// instead, which is where a new file at `b` would be created.
///
/// # Errors
///
/// Returns an error if `a` cannot be examined.
pub fn is_cross_device(a: &Path, b: &Path) -> Result<bool> {
    let b = existing_ancestor(b);
    device_differs(a, &b)
}

#[cfg(unix)]
fn device_differs(a: &Path, b: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let a_dev = std::fs::metadata(a).map_err(|e| Error::io_at(a, e))?.dev();
    let b_dev = std::fs::metadata(b).map_err(|e| Error::io_at(b, e))?.dev();
    Ok(a_dev != b_dev)
}

#[cfg(not(unix))]
fn device_differs(a: &Path, b: &Path) -> Result<bool> {
    use std::path::Component;

    let a = std::fs::canonicalize(a).map_err(|e| Error::io_at(a, e))?;
    let b = std::fs::canonicalize(b).map_err(|e| Error::io_at(b, e))?;
    let prefix = |p: &Path| match p.components().next() {
        Some(Component::Prefix(prefix)) => Some(prefix.as_os_str().to_ascii_lowercase()),
        _ => None,
    };
    Ok(prefix(&a) != prefix(&b))
}

fn existing_ancestor(path: &Path) -> PathBuf {
    let mut current = path;
    loop {
        if current.as_os_str().is_empty() {
            return PathBuf::from(".");
        }
        if current.exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return PathBuf::from("."),
        }
    }
}

fn is_cross_device_error(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Moves a file, replacing anything at `to`.
///
/// A plain rename is tried first. When it fails because the paths are on
/// different devices, the file is copied into a temporary file in the
/// directory of `to`, that copy is renamed into place, and `from` is removed.
///
/// # Errors
///
/// - [`Error::NotFound`] if `from` does not exist
/// - [`Error::RenameFailed`] if the rename fails for any other reason, or
///   the fallback copy cannot be completed
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    let err = match std::fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if err.kind() == io::ErrorKind::NotFound && !from.exists() {
        return Err(Error::NotFound {
            path: from.to_path_buf(),
        });
    }
    if !is_cross_device_error(&err) && !is_cross_device(from, to).unwrap_or(false) {
        return Err(rename_failed(from, to, err));
    }

    log::warn!(
        "{} and {} are on different devices, copying instead of renaming",
        from.display(),
        to.display()
    );
    copy_across(from, to)?;
    if let Err(e) = std::fs::remove_file(from) {
        log::warn!("failed to remove {} after copying it: {e}", from.display());
    }
    Ok(())
}

/// Renames a staged temporary file onto `target`.
///
/// Falls back to [`move_file`]'s copy strategy if the rename crosses devices.
/// On any failure the temporary file is removed.
pub(crate) fn persist(temp: NamedTempFile, target: &Path) -> Result<()> {
    let staged = temp.path().to_path_buf();
    log::debug!("renaming {} to {}", staged.display(), target.display());

    let err = match temp.persist(target) {
        Ok(_) => return Ok(()),
        Err(e) => e,
    };
    if !is_cross_device_error(&err.error) {
        return Err(discard(err.file, rename_failed(&staged, target, err.error)));
    }

    log::warn!(
        "{} is on a different device than {}, copying instead of renaming",
        staged.display(),
        target.display()
    );
    let file = err.file;
    match copy_across(file.path(), target) {
        Ok(()) => {
            if let Err(e) = file.close() {
                log::warn!("failed to remove {}: {e}", staged.display());
            }
            Ok(())
        }
        Err(e) => Err(discard(file, e)),
    }
}

/// Removes a staging file after `err` aborted an operation.
///
/// A removal failure is attached to `err` instead of replacing it.
pub(crate) fn discard(file: NamedTempFile, err: Error) -> Error {
    match file.close() {
        Ok(()) => err,
        Err(cleanup) => err.with_cleanup("remove temporary file", cleanup),
    }
}

/// Copies `from` into a temporary file beside `to` and renames it into place.
fn copy_across(from: &Path, to: &Path) -> Result<()> {
    let dir = match to.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".zippy-move-")
        .tempfile_in(dir)
        .map_err(|e| rename_failed(from, to, e))?;

    let copied = (|| -> io::Result<()> {
        let mut reader = BufReader::new(File::open(from)?);
        let mut writer = BufWriter::new(staged.as_file_mut());
        io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        drop(writer);
        staged.as_file().sync_all()
    })();
    if let Err(e) = copied {
        return Err(discard(staged, rename_failed(from, to, e)));
    }

    staged
        .persist(to)
        .map(drop)
        .map_err(|e| rename_failed(from, to, e.error))
}

fn rename_failed(from: &Path, to: &Path, source: io::Error) -> Error {
    Error::RenameFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_directory_is_same_device() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"x").unwrap();
        assert!(!is_cross_device(&a, &dir.path().join("missing/b")).unwrap());
    }

    #[test]
    fn test_move_file_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        std::fs::write(&from, b"new").unwrap();
        std::fs::write(&to, b"old").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"new");
    }

    #[test]
    fn test_move_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = move_file(&dir.path().join("nope"), &dir.path().join("to")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_move_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        std::fs::write(&from, b"x").unwrap();
        let err = move_file(&from, &dir.path().join("no/such/dir/to")).unwrap_err();
        assert!(matches!(err, Error::RenameFailed { .. }));
        assert!(from.exists());
    }

    #[test]
    fn test_copy_across_leaves_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        std::fs::write(&from, b"payload").unwrap();
        copy_across(&from, &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");
        assert!(from.exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn test_persist_moves_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = NamedTempFile::new_in(dir.path()).unwrap();
        staged.write_all(b"archive").unwrap();
        let target = dir.path().join("out.zip");
        persist(staged, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"archive");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
