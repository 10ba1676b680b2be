//! Archive reading API.
//!
//! [`ArchiveReader`] parses the central directory once on open and then
//! gives access to entry metadata, decompressed entry streams, and the raw
//! compressed bytes used for copy-through rewrites.
//!
//! # Example
//!
//! ```rust,no_run
//! use zippy::read::ArchiveReader;
//! use std::io::Read;
//!
//! let mut archive = ArchiveReader::open_path("archive.zip")?;
//!
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//!
//! if let Some(entry) = archive.entry("readme.txt").cloned() {
//!     let text = archive.read_entry(&entry)?;
//!     println!("{}", String::from_utf8_lossy(&text));
//! }
//! # Ok::<(), zippy::Error>(())
//! ```

mod entry;
mod extraction;
mod options;

pub use entry::Entry;
pub use options::{ExtractOptions, OverwritePolicy, PreserveMetadata};

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::ops::Range;
use std::path::Path;

use crate::checksum::Crc32;
use crate::format::{CompressionMethod, LocalFileHeader, read_central_directory};
use crate::{Error, Result};

/// A ZIP archive reader.
pub struct ArchiveReader<R> {
    reader: R,
    entries: Vec<Entry>,
    comment: Vec<u8>,
    central_directory_offset: u64,
}

impl<R> std::fmt::Debug for ArchiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("entries", &self.entries.len())
            .field("central_directory_offset", &self.central_directory_offset)
            .finish_non_exhaustive()
    }
}

impl ArchiveReader<BufReader<File>> {
    /// Opens an archive from a file path.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the file does not exist
    /// - [`Error::PermissionDenied`] if it cannot be opened
    /// - [`Error::CorruptArchive`] if it is not a valid ZIP archive
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        log::debug!("opening archive {}", path.display());
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Opens an archive from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the central directory cannot be read or parsed.
    pub fn open(mut reader: R) -> Result<Self> {
        let (headers, eocd) = read_central_directory(&mut reader)?;
        let entries = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| Entry::from_central(index, header))
            .collect();

        Ok(Self {
            reader,
            entries,
            comment: eocd.comment,
            central_directory_offset: u64::from(eocd.central_directory_offset),
        })
    }

    /// Returns the entries in central directory order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consumes the reader and returns its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds an entry by exact name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns the raw archive comment.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Returns the byte range of the entry's compressed data in the archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptArchive`] if the local header is missing or
    /// the data would overlap the central directory.
    pub fn data_range(&mut self, entry: &Entry) -> Result<Range<u64>> {
        let offset = u64::from(entry.header.local_header_offset);
        if offset >= self.central_directory_offset {
            return Err(Error::corrupt(
                offset,
                format!("local header of '{}' points past the entry data", entry.name),
            ));
        }
        self.reader.seek(SeekFrom::Start(offset))?;
        let local = LocalFileHeader::read_from(&mut self.reader, offset)?;

        let start = offset + local.size();
        let end = start + entry.compressed_size;
        if end > self.central_directory_offset {
            return Err(Error::corrupt(
                offset,
                format!("data of '{}' overlaps the central directory", entry.name),
            ));
        }
        Ok(start..end)
    }

    /// Returns a reader over the entry's compressed bytes.
    pub(crate) fn raw_data(&mut self, entry: &Entry) -> Result<Take<&mut R>> {
        let range = self.data_range(entry)?;
        self.reader.seek(SeekFrom::Start(range.start))?;
        Ok((&mut self.reader).take(range.end - range.start))
    }

    /// Opens a stream of the entry's decompressed content.
    ///
    /// The stream yields at most one byte more than the recorded size, so a
    /// damaged entry cannot expand without bound; callers compare the CRC
    /// and length afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFeature`] for encrypted entries
    /// - [`Error::UnsupportedMethod`] for methods other than store and deflate
    pub fn open_entry(&mut self, entry: &Entry) -> Result<Box<dyn Read + '_>> {
        if entry.is_encrypted() {
            return Err(Error::UnsupportedFeature {
                feature: "encrypted entries",
            });
        }
        let limit = entry.size.saturating_add(1);
        match entry.method {
            CompressionMethod::Stored => Ok(Box::new(self.raw_data(entry)?.take(limit))),
            CompressionMethod::Deflate => {
                let raw = self.raw_data(entry)?;
                Ok(Box::new(flate2::read::DeflateDecoder::new(raw).take(limit)))
            }
            CompressionMethod::Other(method) => Err(Error::UnsupportedMethod { method }),
        }
    }

    /// Reads an entry fully and verifies its checksum and size.
    ///
    /// # Errors
    ///
    /// - [`Error::ChecksumMismatch`] if the content is damaged
    /// - [`Error::SizeMismatch`] if the content length differs
    pub fn read_entry(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(entry.size.min(1 << 20) as usize);
        let read = self.open_entry(entry)?.read_to_end(&mut data);
        if let Err(e) = read {
            return Err(stream_error(entry, Crc32::compute(&data), e));
        }

        let actual = Crc32::compute(&data);
        if actual != entry.crc32 {
            return Err(Error::ChecksumMismatch {
                entry_name: entry.name.clone(),
                expected: entry.crc32,
                actual,
            });
        }
        if data.len() as u64 != entry.size {
            return Err(Error::SizeMismatch {
                entry_name: entry.name.clone(),
                expected: entry.size,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }
}

/// Maps a failure while decoding entry content.
///
/// Undecodable or truncated data is an integrity failure of the entry, not
/// an I/O problem of the caller.
pub(crate) fn stream_error(entry: &Entry, crc_so_far: u32, err: std::io::Error) -> Error {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
            log::debug!("entry '{}' failed to decode: {err}", entry.name);
            Error::ChecksumMismatch {
                entry_name: entry.name.clone(),
                expected: entry.crc32,
                actual: crc_so_far,
            }
        }
        _ => Error::Io(err),
    }
}
