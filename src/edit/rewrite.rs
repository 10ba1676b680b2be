//! Filtered rewrites: delete and copy.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::engine::EngineOptions;
use crate::fs::{discard, persist};
use crate::matcher::{PatternSet, Planned, keep_plan, remove_plan};
use crate::read::ArchiveReader;
use crate::{Error, Result};

use super::{EditResult, stage_beside, staging_dir, write_staged};

/// Removes the entries selected by `patterns` from `archive`.
///
/// Entries matching a pattern are removed together with everything below a
/// matching directory. Directories emptied by the removal are pruned as
/// well; directories that were empty to begin with are kept. A pattern set
/// that selects nothing rewrites the archive with the same entries.
///
/// # Errors
///
/// - [`Error::NotFound`] if the archive does not exist
/// - [`Error::CorruptArchive`] if it cannot be parsed
/// - [`Error::RenameFailed`] if the rewritten archive cannot replace it
pub fn delete(archive: &Path, patterns: &PatternSet, options: &EngineOptions) -> Result<EditResult> {
    let source = ArchiveReader::open_path(archive)?;
    let plan: Vec<Planned> = {
        let names: Vec<&str> = source.entries().iter().map(|e| e.name.as_str()).collect();
        remove_plan(&names, patterns)
            .into_iter()
            .map(Planned::Copy)
            .collect()
    };
    log::debug!(
        "deleting from {}: keeping {} of {} entries",
        archive.display(),
        plan.len(),
        source.len()
    );
    rewrite(source, archive, &plan, options)
}

/// Writes the entries of `archive` selected by `patterns` to `dest`.
///
/// Every ancestor directory of a selected entry is written too, synthesised
/// if the source has no entry for it. With an empty pattern set the archive
/// file is copied byte for byte.
///
/// `dest` is replaced if it exists; its parent directory is created if
/// missing.
///
/// # Errors
///
/// - [`Error::NotFound`] if the archive does not exist
/// - [`Error::CorruptArchive`] if it cannot be parsed
/// - [`Error::RenameFailed`] if the new archive cannot be moved to `dest`
pub fn copy(archive: &Path, dest: &Path, patterns: &PatternSet, options: &EngineOptions) -> Result<EditResult> {
    let source = ArchiveReader::open_path(archive)?;
    let dir = staging_dir(dest);
    std::fs::create_dir_all(dir).map_err(|e| Error::io_at(dir, e))?;

    if patterns.is_empty() {
        let result = EditResult {
            entries_kept: source.len(),
            ..Default::default()
        };
        drop(source);
        copy_file(archive, dest, options)?;
        return Ok(result);
    }

    let plan = {
        let names: Vec<&str> = source.entries().iter().map(|e| e.name.as_str()).collect();
        keep_plan(&names, patterns)
    };
    log::debug!(
        "copying {} planned entries from {} to {}",
        plan.len(),
        archive.display(),
        dest.display()
    );
    rewrite(source, dest, &plan, options)
}

/// Writes the planned entries of `source` to a new archive at `target`.
fn rewrite<R: Read + Seek>(
    mut source: ArchiveReader<R>,
    target: &Path,
    plan: &[Planned],
    options: &EngineOptions,
) -> Result<EditResult> {
    let total = source.len();
    let comment = source.comment().to_vec();

    write_staged(target, &options.temp_prefix, options.write_options(), move |writer| {
        writer.set_comment(comment);
        let mut result = EditResult::default();
        for step in plan {
            match step {
                Planned::Copy(index) => {
                    let entry = source.entries()[*index].clone();
                    writer.raw_copy(&mut source, &entry)?;
                    result.entries_kept += 1;
                }
                Planned::Synthesize { name, template } => {
                    let template = &source.entries()[*template];
                    log::trace!("synthesising directory '{name}'");
                    writer.add_directory_like(name, template)?;
                    result.entries_synthesized += 1;
                }
            }
        }
        result.entries_removed = total - result.entries_kept;
        Ok(result)
    })
}

/// Copies an archive file verbatim through a staging file beside `dest`.
fn copy_file(archive: &Path, dest: &Path, options: &EngineOptions) -> Result<()> {
    log::debug!(
        "no patterns given, copying {} to {} verbatim",
        archive.display(),
        dest.display()
    );
    let source = File::open(archive).map_err(|e| Error::io_at(archive, e))?;
    let mut temp = stage_beside(dest, &options.temp_prefix)?;

    let copied = (|| -> io::Result<()> {
        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(temp.as_file_mut());
        io::copy(&mut reader, &mut writer)?;
        writer.flush()
    })();
    match copied {
        Ok(()) => persist(temp, dest),
        Err(e) => Err(discard(temp, Error::Io(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::{EntryMeta, Writer};

    fn fixture(path: &Path, names: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = Writer::create(BufWriter::new(file)).unwrap();
        for name in names {
            if name.ends_with('/') {
                writer.add_directory(EntryMeta::directory(*name)).unwrap();
            } else {
                writer
                    .add_bytes(EntryMeta::file(*name), name.as_bytes())
                    .unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn names(path: &Path) -> Vec<String> {
        ArchiveReader::open_path(path)
            .unwrap()
            .into_entries()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn test_delete_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        fixture(&path, &["d/", "d/x.txt", "keep.txt"]);

        let patterns = PatternSet::new(["d/x.txt"]).unwrap();
        let result = delete(&path, &patterns, &EngineOptions::default()).unwrap();
        assert_eq!(result.entries_kept, 1);
        assert_eq!(result.entries_removed, 2);
        assert_eq!(names(&path), ["keep.txt"]);
    }

    #[test]
    fn test_copy_synthesises_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        let dest = dir.path().join("out/b.zip");
        fixture(&path, &["a/b/c.txt", "other.txt"]);

        let patterns = PatternSet::new(["a/b/c.txt"]).unwrap();
        let result = copy(&path, &dest, &patterns, &EngineOptions::default()).unwrap();
        assert_eq!(result.entries_kept, 1);
        assert_eq!(result.entries_synthesized, 2);
        assert_eq!(names(&dest), ["a/", "a/b/", "a/b/c.txt"]);
        assert_eq!(names(&path), ["a/b/c.txt", "other.txt"]);
    }

    #[test]
    fn test_copy_without_patterns_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        let dest = dir.path().join("b.zip");
        fixture(&path, &["x/", "x/y.txt"]);

        let result = copy(&path, &dest, &PatternSet::default(), &EngineOptions::default()).unwrap();
        assert_eq!(result.entries_kept, 2);
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&dest).unwrap());
    }

    #[test]
    fn test_corrupt_source_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zip");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let err = delete(&path, &PatternSet::default(), &EngineOptions::default()).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
