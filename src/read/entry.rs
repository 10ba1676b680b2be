//! Archive entry metadata.

use std::time::SystemTime;

use crate::attributes::decode_mode;
use crate::format::{CentralDirectoryHeader, CompressionMethod, flags};
use crate::timestamp::{DosDateTime, parse_extended_mtime, system_time_from_unix};

/// One record of an archive, as described by its central directory entry.
///
/// Entries are never mutated in place; every rewrite produces a new archive
/// from a new entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Archive-relative name using `/` separators. Directories end in `/`.
    pub name: String,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// CRC-32 checksum of the uncompressed content.
    pub crc32: u32,
    /// Modification time.
    ///
    /// Taken from the extended timestamp field when present, otherwise from
    /// the MS-DOS date/time interpreted as UTC.
    pub modified: SystemTime,
    /// Unix permission bits.
    pub mode: u32,
    /// Compression method.
    pub method: CompressionMethod,
    /// Position of the entry in the central directory.
    pub index: usize,
    pub(crate) header: CentralDirectoryHeader,
}

impl Entry {
    pub(crate) fn from_central(index: usize, header: CentralDirectoryHeader) -> Self {
        let name = String::from_utf8_lossy(&header.name).into_owned();
        let is_directory = name.ends_with('/');
        let modified = match parse_extended_mtime(&header.extra) {
            Some(secs) => system_time_from_unix(secs),
            None => system_time_from_unix(
                DosDateTime {
                    time: header.last_mod_time,
                    date: header.last_mod_date,
                }
                .to_unix_secs(),
            ),
        };

        Self {
            mode: decode_mode(
                header.version_made_by,
                header.external_attributes,
                is_directory,
            ),
            size: u64::from(header.uncompressed_size),
            compressed_size: u64::from(header.compressed_size),
            crc32: header.crc32,
            method: CompressionMethod::from_id(header.method),
            name,
            is_directory,
            modified,
            index,
            header,
        }
    }

    /// Returns `true` if the entry content is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.header.flags & flags::ENCRYPTED != 0
    }

    /// Returns the entry comment, if any.
    pub fn comment(&self) -> Option<String> {
        if self.header.comment.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.header.comment).into_owned())
        }
    }

    /// Returns the compression ratio (compressed / uncompressed).
    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.size as f64
        }
    }
}
