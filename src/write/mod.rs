//! Archive writing API.
//!
//! [`Writer`] streams entries into any `Write + Seek` sink. New file content
//! is deflated on the fly and the CRC and sizes are patched into the local
//! header afterwards, so no data descriptors are emitted. Entries from an
//! existing archive can be copied through without recompression.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use zippy::write::{EntryMeta, Writer};
//!
//! let mut buffer = Cursor::new(Vec::new());
//! let mut writer = Writer::create(&mut buffer)?;
//! writer.add_directory(EntryMeta::directory("docs/"))?;
//! writer.add_bytes(EntryMeta::file("docs/hello.txt"), b"Hello, World!")?;
//! let result = writer.finish()?;
//! assert_eq!(result.entries_written, 2);
//! # Ok::<(), zippy::Error>(())
//! ```

mod entry_input;
mod options;

pub use options::{DEFAULT_LEVEL, WriteOptions, WriteResult};

use std::collections::HashSet;
use std::fs::Metadata;
use std::io::{self, Seek, Write};
use std::time::SystemTime;

use crate::attributes::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, mode_of};
use crate::format::{CentralDirectoryHeader, EndOfCentralDirectory};
use crate::{Error, Result};

/// Metadata for an entry being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Archive name. Directory names end in `/`.
    pub name: String,
    /// Modification time.
    pub modified: SystemTime,
    /// Unix permission bits.
    pub mode: u32,
}

impl EntryMeta {
    /// Metadata for a file entry stamped with the current time.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: SystemTime::now(),
            mode: DEFAULT_FILE_MODE,
        }
    }

    /// Metadata for a directory entry stamped with the current time.
    ///
    /// A trailing `/` is appended to the name if missing.
    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            modified: SystemTime::now(),
            mode: DEFAULT_DIR_MODE,
        }
    }

    /// Metadata taken from a file-system object.
    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> Self {
        let meta = Self {
            name: name.into(),
            modified: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
            mode: mode_of(metadata),
        };
        if metadata.is_dir() {
            Self::directory(meta.name).modified(meta.modified).mode(meta.mode)
        } else {
            meta
        }
    }

    /// Sets the modification time.
    pub fn modified(mut self, modified: SystemTime) -> Self {
        self.modified = modified;
        self
    }

    /// Sets the permission bits.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Returns `true` if this describes a directory.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Counts bytes passed to the inner writer.
pub(crate) struct CountingWriter<'a, W> {
    inner: &'a mut W,
    count: u64,
}

impl<'a, W> CountingWriter<'a, W> {
    pub(crate) fn new(inner: &'a mut W) -> Self {
        Self { inner, count: 0 }
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A ZIP archive writer.
pub struct Writer<W: Write + Seek> {
    sink: W,
    /// Position of the next local header, relative to the archive start.
    offset: u64,
    /// Position of the archive start in the sink.
    base: u64,
    central: Vec<CentralDirectoryHeader>,
    names: HashSet<String>,
    options: WriteOptions,
    comment: Vec<u8>,
    result: WriteResult,
}

impl<W: Write + Seek> std::fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("offset", &self.offset)
            .field("entries", &self.central.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Creates a writer that starts the archive at the sink's current position.
    pub fn create(mut sink: W) -> Result<Self> {
        let base = sink.stream_position()?;
        Ok(Self {
            sink,
            offset: 0,
            base,
            central: Vec::new(),
            names: HashSet::new(),
            options: WriteOptions::default(),
            comment: Vec::new(),
            result: WriteResult::default(),
        })
    }

    /// Sets the write options.
    pub fn options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the archive comment.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) {
        self.comment = comment.into();
    }

    /// Returns `true` if an entry with this name was already written.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the number of entries written so far.
    pub fn len(&self) -> usize {
        self.central.len()
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.central.is_empty()
    }

    /// Reserves an entry name.
    fn claim_name(&mut self, name: &str) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::DuplicateEntry {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the current local header offset as a 32-bit field value.
    fn header_offset(&self) -> Result<u32> {
        u32::try_from(self.offset).map_err(|_| Error::UnsupportedFeature {
            feature: "Zip64 (archive larger than 4 GiB)",
        })
    }

    /// Writes the central directory and end record.
    ///
    /// The sink is flushed but not closed.
    pub fn finish(self) -> Result<WriteResult> {
        self.finish_into_inner().map(|(result, _)| result)
    }

    /// Like [`finish`](Self::finish), returning the sink as well.
    pub fn finish_into_inner(mut self) -> Result<(WriteResult, W)> {
        let cd_offset = self.header_offset()?;
        let mut cd_size = 0u64;
        for header in &self.central {
            header.write_to(&mut self.sink)?;
            cd_size += header.size();
        }

        let too_many = || Error::UnsupportedFeature {
            feature: "Zip64 (more than 65534 entries)",
        };
        let count = u16::try_from(self.central.len()).map_err(|_| too_many())?;
        if count == u16::MAX {
            return Err(too_many());
        }
        let eocd = EndOfCentralDirectory {
            entries_on_disk: count,
            total_entries: count,
            central_directory_size: u32::try_from(cd_size).map_err(|_| too_many())?,
            central_directory_offset: cd_offset,
            comment: std::mem::take(&mut self.comment),
            ..Default::default()
        };
        eocd.write_to(&mut self.sink)?;
        self.sink.flush()?;

        log::debug!(
            "finished archive: {} entries, {} bytes",
            self.central.len(),
            u64::from(cd_offset) + cd_size + eocd.comment.len() as u64 + 22
        );
        Ok((self.result, self.sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::ArchiveReader;
    use std::io::Cursor;

    #[test]
    fn test_empty_archive_is_22_bytes() {
        let mut buffer = Cursor::new(Vec::new());
        let result = Writer::create(&mut buffer).unwrap().finish().unwrap();
        assert_eq!(result.entries_written, 0);
        assert_eq!(buffer.get_ref().len(), 22);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut writer = Writer::create(Cursor::new(Vec::new())).unwrap();
        writer.add_bytes(EntryMeta::file("a.txt"), b"1").unwrap();
        let err = writer.add_bytes(EntryMeta::file("a.txt"), b"2").unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { ref name } if name == "a.txt"));
    }

    #[test]
    fn test_comment_is_written() {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = Writer::create(&mut buffer).unwrap();
        writer.set_comment("built by tests");
        writer.finish().unwrap();
        buffer.set_position(0);
        let archive = ArchiveReader::open(buffer).unwrap();
        assert_eq!(archive.comment(), b"built by tests");
    }

    #[test]
    fn test_directory_meta_gets_slash() {
        let meta = EntryMeta::directory("docs");
        assert_eq!(meta.name, "docs/");
        assert!(meta.is_directory());
        assert!(!EntryMeta::file("docs").is_directory());
    }
}
