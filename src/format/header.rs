//! Fixed-layout ZIP header records.
//!
//! Each record knows how to parse itself from a reader positioned at its
//! signature and how to serialise itself. Parsing failures carry the byte
//! offset of the record so callers can report [`Error::CorruptArchive`].

use std::io::{self, Read, Write};

use super::reader::{field_len, read_bytes, read_u16_le, read_u32_le, write_u16_le, write_u32_le};
use super::{
    CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE, LOCAL_FILE_HEADER_SIGNATURE,
};
use crate::{Error, Result};

/// Maps a read failure inside a record to a corruption error.
fn truncated(offset: u64, what: &'static str) -> impl Fn(io::Error) -> Error {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::corrupt(offset, format!("truncated {what}"))
        } else {
            Error::Io(e)
        }
    }
}

/// Local file header preceding each entry's data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method id.
    pub method: u16,
    /// MS-DOS modification time.
    pub last_mod_time: u16,
    /// MS-DOS modification date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the compressed data.
    pub compressed_size: u32,
    /// Size of the uncompressed data.
    pub uncompressed_size: u32,
    /// Raw entry name.
    pub name: Vec<u8>,
    /// Extra field block.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Size of the fixed part of the record, including the signature.
    pub const FIXED_SIZE: u64 = 30;

    /// Offset of the CRC-32 field from the start of the record.
    pub const CRC_OFFSET: u64 = 14;

    /// Parses a local header whose signature starts at `offset`.
    pub fn read_from<R: Read>(r: &mut R, offset: u64) -> Result<Self> {
        let map = truncated(offset, "local file header");
        let signature = read_u32_le(r).map_err(&map)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(Error::corrupt(
                offset,
                format!("bad local file header signature {signature:#010x}"),
            ));
        }
        let version_needed = read_u16_le(r).map_err(&map)?;
        let flags = read_u16_le(r).map_err(&map)?;
        let method = read_u16_le(r).map_err(&map)?;
        let last_mod_time = read_u16_le(r).map_err(&map)?;
        let last_mod_date = read_u16_le(r).map_err(&map)?;
        let crc32 = read_u32_le(r).map_err(&map)?;
        let compressed_size = read_u32_le(r).map_err(&map)?;
        let uncompressed_size = read_u32_le(r).map_err(&map)?;
        let name_len = read_u16_le(r).map_err(&map)?;
        let extra_len = read_u16_le(r).map_err(&map)?;
        let name = read_bytes(r, usize::from(name_len)).map_err(&map)?;
        let extra = read_bytes(r, usize::from(extra_len)).map_err(&map)?;

        Ok(Self {
            version_needed,
            flags,
            method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
        })
    }

    /// Total record size, including name and extra field.
    pub fn size(&self) -> u64 {
        Self::FIXED_SIZE + self.name.len() as u64 + self.extra.len() as u64
    }

    /// Serialises the record.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let name_len = field_len(&self.name, "entry name")?;
        let extra_len = field_len(&self.extra, "extra field")?;
        write_u32_le(w, LOCAL_FILE_HEADER_SIGNATURE)?;
        write_u16_le(w, self.version_needed)?;
        write_u16_le(w, self.flags)?;
        write_u16_le(w, self.method)?;
        write_u16_le(w, self.last_mod_time)?;
        write_u16_le(w, self.last_mod_date)?;
        write_u32_le(w, self.crc32)?;
        write_u32_le(w, self.compressed_size)?;
        write_u32_le(w, self.uncompressed_size)?;
        write_u16_le(w, name_len)?;
        write_u16_le(w, extra_len)?;
        w.write_all(&self.name)?;
        w.write_all(&self.extra)
    }
}

/// Central directory record describing one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    /// Host system (high byte) and format version (low byte).
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method id.
    pub method: u16,
    /// MS-DOS modification time.
    pub last_mod_time: u16,
    /// MS-DOS modification date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the compressed data.
    pub compressed_size: u32,
    /// Size of the uncompressed data.
    pub uncompressed_size: u32,
    /// Disk on which the entry starts.
    pub disk_number_start: u16,
    /// Internal file attributes.
    pub internal_attributes: u16,
    /// External (host-specific) file attributes.
    pub external_attributes: u32,
    /// Offset of the local header from the start of the archive.
    pub local_header_offset: u32,
    /// Raw entry name.
    pub name: Vec<u8>,
    /// Extra field block.
    pub extra: Vec<u8>,
    /// Entry comment.
    pub comment: Vec<u8>,
}

impl CentralDirectoryHeader {
    /// Size of the fixed part of the record, including the signature.
    pub const FIXED_SIZE: u64 = 46;

    /// Parses a central directory record whose signature starts at `offset`.
    pub fn read_from<R: Read>(r: &mut R, offset: u64) -> Result<Self> {
        let map = truncated(offset, "central directory record");
        let signature = read_u32_le(r).map_err(&map)?;
        if signature != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(Error::corrupt(
                offset,
                format!("bad central directory signature {signature:#010x}"),
            ));
        }
        let version_made_by = read_u16_le(r).map_err(&map)?;
        let version_needed = read_u16_le(r).map_err(&map)?;
        let flags = read_u16_le(r).map_err(&map)?;
        let method = read_u16_le(r).map_err(&map)?;
        let last_mod_time = read_u16_le(r).map_err(&map)?;
        let last_mod_date = read_u16_le(r).map_err(&map)?;
        let crc32 = read_u32_le(r).map_err(&map)?;
        let compressed_size = read_u32_le(r).map_err(&map)?;
        let uncompressed_size = read_u32_le(r).map_err(&map)?;
        let name_len = read_u16_le(r).map_err(&map)?;
        let extra_len = read_u16_le(r).map_err(&map)?;
        let comment_len = read_u16_le(r).map_err(&map)?;
        let disk_number_start = read_u16_le(r).map_err(&map)?;
        let internal_attributes = read_u16_le(r).map_err(&map)?;
        let external_attributes = read_u32_le(r).map_err(&map)?;
        let local_header_offset = read_u32_le(r).map_err(&map)?;
        let name = read_bytes(r, usize::from(name_len)).map_err(&map)?;
        let extra = read_bytes(r, usize::from(extra_len)).map_err(&map)?;
        let comment = read_bytes(r, usize::from(comment_len)).map_err(&map)?;

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number_start,
            internal_attributes,
            external_attributes,
            local_header_offset,
            name,
            extra,
            comment,
        })
    }

    /// Total record size, including the variable-length fields.
    pub fn size(&self) -> u64 {
        Self::FIXED_SIZE
            + self.name.len() as u64
            + self.extra.len() as u64
            + self.comment.len() as u64
    }

    /// Serialises the record.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let name_len = field_len(&self.name, "entry name")?;
        let extra_len = field_len(&self.extra, "extra field")?;
        let comment_len = field_len(&self.comment, "entry comment")?;
        write_u32_le(w, CENTRAL_DIRECTORY_SIGNATURE)?;
        write_u16_le(w, self.version_made_by)?;
        write_u16_le(w, self.version_needed)?;
        write_u16_le(w, self.flags)?;
        write_u16_le(w, self.method)?;
        write_u16_le(w, self.last_mod_time)?;
        write_u16_le(w, self.last_mod_date)?;
        write_u32_le(w, self.crc32)?;
        write_u32_le(w, self.compressed_size)?;
        write_u32_le(w, self.uncompressed_size)?;
        write_u16_le(w, name_len)?;
        write_u16_le(w, extra_len)?;
        write_u16_le(w, comment_len)?;
        write_u16_le(w, self.disk_number_start)?;
        write_u16_le(w, self.internal_attributes)?;
        write_u32_le(w, self.external_attributes)?;
        write_u32_le(w, self.local_header_offset)?;
        w.write_all(&self.name)?;
        w.write_all(&self.extra)?;
        w.write_all(&self.comment)
    }
}

/// End of central directory record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk where the central directory starts.
    pub central_directory_disk: u16,
    /// Central directory records on this disk.
    pub entries_on_disk: u16,
    /// Total central directory records.
    pub total_entries: u16,
    /// Size of the central directory in bytes.
    pub central_directory_size: u32,
    /// Offset of the central directory from the start of the archive.
    pub central_directory_offset: u32,
    /// Archive comment.
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Size of the fixed part of the record, including the signature.
    pub const FIXED_SIZE: u64 = 22;

    /// Parses the record from a buffer starting at its signature.
    ///
    /// `offset` is the position of the buffer in the archive and is only
    /// used for error reporting. The comment is truncated to what the
    /// buffer holds.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        if (buf.len() as u64) < Self::FIXED_SIZE {
            return Err(Error::corrupt(offset, "truncated end of central directory"));
        }
        let u16_at = |pos: usize| u16::from_le_bytes([buf[pos], buf[pos + 1]]);
        let u32_at =
            |pos: usize| u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);

        if u32_at(0) != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(Error::corrupt(offset, "bad end of central directory signature"));
        }
        let comment_len = usize::from(u16_at(20));
        let comment_end = (Self::FIXED_SIZE as usize + comment_len).min(buf.len());

        Ok(Self {
            disk_number: u16_at(4),
            central_directory_disk: u16_at(6),
            entries_on_disk: u16_at(8),
            total_entries: u16_at(10),
            central_directory_size: u32_at(12),
            central_directory_offset: u32_at(16),
            comment: buf[Self::FIXED_SIZE as usize..comment_end].to_vec(),
        })
    }

    /// Serialises the record.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let comment_len = field_len(&self.comment, "archive comment")?;
        write_u32_le(w, END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
        write_u16_le(w, self.disk_number)?;
        write_u16_le(w, self.central_directory_disk)?;
        write_u16_le(w, self.entries_on_disk)?;
        write_u16_le(w, self.total_entries)?;
        write_u32_le(w, self.central_directory_size)?;
        write_u32_le(w, self.central_directory_offset)?;
        write_u16_le(w, comment_len)?;
        w.write_all(&self.comment)
    }
}
