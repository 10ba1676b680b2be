//! Entry extraction to the file system.
//!
//! Every selected entry is materialised in archive order. File content is
//! streamed through a CRC-32 writer so the checksum and length can be
//! verified without a second read, and each entry's modification time is
//! restored as the last step of processing it.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use filetime::FileTime;

use crate::archive_path::{base_name, join_under};
use crate::checksum::Crc32Writer;
use crate::matcher::PatternSet;
use crate::validate::{Transfer, validate_copy};
use crate::{Error, READ_BUFFER_SIZE, Result};

use super::{ArchiveReader, Entry, ExtractOptions, OverwritePolicy, stream_error};

impl<R: Read + Seek> ArchiveReader<R> {
    /// Extracts entries to a destination directory.
    ///
    /// With an empty pattern set every entry is extracted; otherwise only
    /// entries whose name matches one of the patterns. There is no ancestor
    /// rule here: selecting `a/b.txt` does not extract the `a/` entry, but
    /// parent directories are still created as needed.
    ///
    /// Returns the processed entries, named as they were written (base names
    /// in junk-path mode, directories keeping their trailing `/`). Entries
    /// skipped by [`OverwritePolicy::Skip`] are left out.
    ///
    /// # Errors
    ///
    /// The first failure aborts the extraction. Files already written stay
    /// on disk.
    ///
    /// - [`Error::ChecksumMismatch`] or [`Error::SizeMismatch`] when entry
    ///   content fails verification
    /// - [`Error::UnsafePath`] when an entry name would escape `dest`
    /// - [`Error::DestinationExists`] under [`OverwritePolicy::Error`]
    pub fn extract(
        &mut self,
        dest: impl AsRef<Path>,
        patterns: &PatternSet,
        options: &ExtractOptions,
    ) -> Result<Vec<Entry>> {
        let dest = dest.as_ref();
        std::fs::create_dir_all(dest).map_err(|e| Error::io_at(dest, e))?;

        let selected: Vec<Entry> = self
            .entries()
            .iter()
            .filter(|e| patterns.is_empty() || patterns.matches(&e.name))
            .cloned()
            .collect();
        log::debug!(
            "extracting {} of {} entries to {}",
            selected.len(),
            self.len(),
            dest.display()
        );

        let mut extracted = Vec::with_capacity(selected.len());
        for mut entry in selected {
            let effective = effective_name(&entry, options.junk_paths);
            let target = join_under(dest, &effective)?;
            log::trace!("extracting '{}' to {}", entry.name, target.display());

            if entry.is_directory {
                create_dir(&target, entry.mode, options.preserve_metadata.mode)
                    .map_err(|e| Error::io_at(&target, e))?;
            } else {
                if let Ok(existing) = target.symlink_metadata() {
                    match options.overwrite {
                        // replace the link itself, never the file it points at
                        OverwritePolicy::Overwrite if existing.file_type().is_symlink() => {
                            log::debug!("removing symlink {}", target.display());
                            std::fs::remove_file(&target).map_err(|e| Error::io_at(&target, e))?;
                        }
                        OverwritePolicy::Overwrite => {}
                        OverwritePolicy::Skip => {
                            log::debug!("skipping existing {}", target.display());
                            continue;
                        }
                        OverwritePolicy::Error => {
                            return Err(Error::DestinationExists { path: target });
                        }
                    }
                }
                self.extract_file(&entry, &target, options)?;
            }

            if options.preserve_metadata.modification_time {
                let mtime = FileTime::from_system_time(entry.modified);
                filetime::set_file_times(&target, mtime, mtime)
                    .map_err(|e| Error::io_at(&target, e))?;
            }

            entry.name = effective;
            extracted.push(entry);
        }
        Ok(extracted)
    }

    fn extract_file(&mut self, entry: &Entry, target: &Path, options: &ExtractOptions) -> Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        let file = create_file(target, entry.mode, options.preserve_metadata.mode)
            .map_err(|e| Error::io_at(target, e))?;
        let mut out = Crc32Writer::new(file);

        let mut input = self.open_entry(entry)?;
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(stream_error(entry, out.crc(), e)),
            };
            out.write_all(&buffer[..n])
                .map_err(|e| Error::io_at(target, e))?;
        }
        drop(input);
        out.flush().map_err(|e| Error::io_at(target, e))?;

        let (crc, written) = (out.crc(), out.bytes_written());
        drop(out.into_inner());

        if crc != entry.crc32 {
            return Err(Error::ChecksumMismatch {
                entry_name: entry.name.clone(),
                expected: entry.crc32,
                actual: crc,
            });
        }
        validate_copy(
            target,
            written,
            entry.size,
            Transfer::OutOfArchive {
                entry_name: &entry.name,
            },
        )
    }
}

/// Name an entry is written under, honouring junk-path mode.
fn effective_name(entry: &Entry, junk_paths: bool) -> String {
    if !junk_paths {
        return entry.name.clone();
    }
    let base = base_name(&entry.name);
    if entry.is_directory {
        format!("{base}/")
    } else {
        base.to_string()
    }
}

fn create_dir(path: &Path, mode: u32, preserve_mode: bool) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    if preserve_mode {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = (mode, preserve_mode);
    builder.create(path)
}

fn create_file(path: &Path, mode: u32, preserve_mode: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if preserve_mode {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = (mode, preserve_mode);
    options.open(path)
}
