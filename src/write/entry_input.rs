//! Entry input methods.
//!
//! This module provides methods for adding entries to an archive from
//! various sources: files, streams, byte slices, and entries of another
//! archive copied without recompression.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::write::DeflateEncoder;

use crate::attributes::{VERSION_MADE_BY, VERSION_NEEDED, encode_external};
use crate::checksum::Crc32Reader;
use crate::format::{CentralDirectoryHeader, CompressionMethod, LocalFileHeader, flags};
use crate::read::{ArchiveReader, Entry};
use crate::timestamp::{DosDateTime, extended_timestamp_field, unix_secs};
use crate::{Error, Result};

use super::{CountingWriter, EntryMeta, Writer};

fn zip64_required() -> Error {
    Error::UnsupportedFeature {
        feature: "Zip64 (entry larger than 4 GiB)",
    }
}

/// Header fields shared by the local and central records of a new entry.
struct NewHeader {
    flags: u16,
    method: u16,
    dos: DosDateTime,
    name: Vec<u8>,
    extra: Vec<u8>,
}

impl NewHeader {
    fn new(meta: &EntryMeta, method: CompressionMethod) -> Self {
        let flags = if meta.name.is_ascii() { 0 } else { flags::UTF8 };
        let extra = extended_timestamp_field(unix_secs(meta.modified))
            .map(|field| field.to_vec())
            .unwrap_or_default();
        Self {
            flags,
            method: method.id(),
            dos: DosDateTime::from_system_time(meta.modified),
            name: meta.name.as_bytes().to_vec(),
            extra,
        }
    }

    fn local(&self, crc32: u32, compressed_size: u32, uncompressed_size: u32) -> LocalFileHeader {
        LocalFileHeader {
            version_needed: VERSION_NEEDED,
            flags: self.flags,
            method: self.method,
            last_mod_time: self.dos.time,
            last_mod_date: self.dos.date,
            crc32,
            compressed_size,
            uncompressed_size,
            name: self.name.clone(),
            extra: self.extra.clone(),
        }
    }

    fn central(self, local: &LocalFileHeader, mode: u32, is_directory: bool, offset: u32) -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_NEEDED,
            flags: self.flags,
            method: self.method,
            last_mod_time: self.dos.time,
            last_mod_date: self.dos.date,
            crc32: local.crc32,
            compressed_size: local.compressed_size,
            uncompressed_size: local.uncompressed_size,
            external_attributes: encode_external(mode, is_directory),
            local_header_offset: offset,
            name: self.name,
            extra: self.extra,
            ..Default::default()
        }
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Adds a file or directory from the file system.
    ///
    /// Returns the number of content bytes read from disk, zero for
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be read, or
    /// [`Error::DuplicateEntry`] if `name` was already written.
    pub fn add_path(&mut self, disk_path: impl AsRef<Path>, name: impl Into<String>) -> Result<u64> {
        let disk_path = disk_path.as_ref();
        let metadata = std::fs::metadata(disk_path).map_err(|e| Error::io_at(disk_path, e))?;
        let meta = EntryMeta::from_metadata(name, &metadata);

        if meta.is_directory() {
            self.add_directory(meta)?;
            Ok(0)
        } else {
            let file = File::open(disk_path).map_err(|e| Error::io_at(disk_path, e))?;
            let mut reader = BufReader::new(file);
            self.add_stream(meta, &mut reader)
        }
    }

    /// Adds a directory entry.
    ///
    /// Directories are stored with zero sizes. A trailing `/` is appended to
    /// the name if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] if the name was already written.
    pub fn add_directory(&mut self, meta: EntryMeta) -> Result<()> {
        let meta = if meta.is_directory() {
            meta
        } else {
            EntryMeta::directory(meta.name)
                .modified(meta.modified)
                .mode(meta.mode)
        };
        self.claim_name(&meta.name)?;
        let offset = self.header_offset()?;

        let header = NewHeader::new(&meta, CompressionMethod::Stored);
        let local = header.local(0, 0, 0);
        local.write_to(&mut self.sink)?;
        self.offset += local.size();
        self.central
            .push(header.central(&local, meta.mode, true, offset));

        self.result.entries_written += 1;
        self.result.directories_written += 1;
        log::trace!("added directory '{}'", meta.name);
        Ok(())
    }

    /// Adds a file entry whose content is read from `source`.
    ///
    /// The content is deflated at the configured level. Returns the number of
    /// bytes consumed from `source`.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateEntry`] if the name was already written
    /// - [`Error::UnsupportedFeature`] if the entry needs Zip64
    pub fn add_stream(&mut self, meta: EntryMeta, source: &mut dyn Read) -> Result<u64> {
        if meta.is_directory() {
            self.add_directory(meta)?;
            return Ok(0);
        }
        self.claim_name(&meta.name)?;
        let offset = self.header_offset()?;

        let header = NewHeader::new(&meta, CompressionMethod::Deflate);
        let mut local = header.local(0, 0, 0);
        local.write_to(&mut self.sink)?;
        let data_start = self.offset + local.size();

        let compression = self.options.compression();
        let mut input = Crc32Reader::new(source);
        let counter = CountingWriter::new(&mut self.sink);
        let mut encoder = DeflateEncoder::new(counter, compression);
        io::copy(&mut input, &mut encoder)?;
        let compressed = encoder.finish()?.count();
        let (crc, size) = (input.crc(), input.bytes_read());

        local.crc32 = crc;
        local.compressed_size = u32::try_from(compressed).map_err(|_| zip64_required())?;
        local.uncompressed_size = u32::try_from(size).map_err(|_| zip64_required())?;

        // patch crc and sizes in place, they are contiguous
        let end = self.base + data_start + compressed;
        self.sink.seek(SeekFrom::Start(
            self.base + self.offset + LocalFileHeader::CRC_OFFSET,
        ))?;
        self.sink.write_all(&local.crc32.to_le_bytes())?;
        self.sink.write_all(&local.compressed_size.to_le_bytes())?;
        self.sink.write_all(&local.uncompressed_size.to_le_bytes())?;
        self.sink.seek(SeekFrom::Start(end))?;

        self.offset = data_start + compressed;
        self.central
            .push(header.central(&local, meta.mode, false, offset));

        self.result.entries_written += 1;
        self.result.total_size += size;
        self.result.compressed_size += compressed;
        log::trace!("added '{}' ({size} -> {compressed} bytes)", meta.name);
        Ok(size)
    }

    /// Adds a file entry from a byte slice.
    ///
    /// # Errors
    ///
    /// See [`add_stream`](Self::add_stream).
    pub fn add_bytes(&mut self, meta: EntryMeta, data: &[u8]) -> Result<()> {
        let mut cursor = data;
        self.add_stream(meta, &mut cursor)?;
        Ok(())
    }

    /// Copies an entry of another archive without recompressing it.
    ///
    /// The entry keeps its name, method, checksum, attributes and extra
    /// fields. A data descriptor flag is dropped, since the local header
    /// written here already carries the final sizes.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateEntry`] if the name was already written
    /// - [`Error::CorruptArchive`] if the source data is truncated
    pub fn raw_copy<R: Read + Seek>(&mut self, source: &mut ArchiveReader<R>, entry: &Entry) -> Result<()> {
        self.claim_name(&entry.name)?;
        let offset = self.header_offset()?;

        let mut central = entry.header.clone();
        central.flags &= !flags::DATA_DESCRIPTOR;
        central.local_header_offset = offset;

        let local = LocalFileHeader {
            version_needed: central.version_needed,
            flags: central.flags,
            method: central.method,
            last_mod_time: central.last_mod_time,
            last_mod_date: central.last_mod_date,
            crc32: central.crc32,
            compressed_size: central.compressed_size,
            uncompressed_size: central.uncompressed_size,
            name: central.name.clone(),
            extra: central.extra.clone(),
        };
        local.write_to(&mut self.sink)?;

        let mut raw = source.raw_data(entry)?;
        let copied = io::copy(&mut raw, &mut self.sink)?;
        if copied != entry.compressed_size {
            return Err(Error::corrupt(
                u64::from(entry.header.local_header_offset),
                format!(
                    "data of '{}' truncated: {copied} of {} bytes",
                    entry.name, entry.compressed_size
                ),
            ));
        }

        self.offset += local.size() + copied;
        self.central.push(central);
        self.result.entries_written += 1;
        self.result.entries_copied += 1;
        if entry.is_directory {
            self.result.directories_written += 1;
        }
        log::trace!("copied '{}' ({copied} bytes)", entry.name);
        Ok(())
    }

    /// Synthesizes a directory entry, copying the timestamp of `template`.
    pub(crate) fn add_directory_like(&mut self, name: &str, template: &Entry) -> Result<()> {
        self.add_directory(
            EntryMeta::directory(name)
                .modified(template.modified)
                .mode(crate::attributes::DEFAULT_DIR_MODE),
        )
    }
}
