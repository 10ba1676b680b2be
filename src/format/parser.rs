//! Locating and parsing the central directory.
//!
//! Reading a ZIP archive starts at its end:
//!
//! 1. Find the end of central directory (EOCD) record by scanning backwards
//!    over the largest possible archive comment.
//! 2. Reject multi-disk and Zip64 archives.
//! 3. Read every central directory record in one pass.

use std::io::{Read, Seek, SeekFrom};

use super::header::{CentralDirectoryHeader, EndOfCentralDirectory};
use super::{END_OF_CENTRAL_DIRECTORY_SIGNATURE, MAX_COMMENT_SIZE, ZIP64_LOCATOR_SIGNATURE};
use crate::{Error, Result};

/// Size of the Zip64 end of central directory locator.
const ZIP64_LOCATOR_SIZE: u64 = 20;

/// Finds the EOCD record and returns it with its offset in the archive.
///
/// # Errors
///
/// Returns [`Error::CorruptArchive`] if no record can be found.
pub fn find_eocd<R: Read + Seek>(reader: &mut R) -> Result<(EndOfCentralDirectory, u64)> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    if file_len < EndOfCentralDirectory::FIXED_SIZE {
        return Err(Error::corrupt(0, "file too small to be a ZIP archive"));
    }

    let search_len = file_len.min(EndOfCentralDirectory::FIXED_SIZE + MAX_COMMENT_SIZE as u64);
    let search_start = file_len - search_len;
    reader.seek(SeekFrom::Start(search_start))?;
    let mut tail = vec![0u8; search_len as usize];
    reader.read_exact(&mut tail)?;

    let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
    let fixed = EndOfCentralDirectory::FIXED_SIZE as usize;
    let mut trailing_garbage = None;
    for pos in (0..=tail.len() - fixed).rev() {
        if tail[pos..pos + 4] != signature {
            continue;
        }
        let comment_len = usize::from(u16::from_le_bytes([tail[pos + 20], tail[pos + 21]]));
        let record_end = pos + fixed + comment_len;
        if record_end == tail.len() {
            return parse_at(&tail, search_start, pos);
        }
        // Tolerate bytes after the record, but only if nothing better exists.
        if record_end < tail.len() && trailing_garbage.is_none() {
            trailing_garbage = Some(pos);
        }
    }

    match trailing_garbage {
        Some(pos) => parse_at(&tail, search_start, pos),
        None => Err(Error::corrupt(
            search_start,
            "end of central directory record not found",
        )),
    }
}

fn parse_at(tail: &[u8], search_start: u64, pos: usize) -> Result<(EndOfCentralDirectory, u64)> {
    let offset = search_start + pos as u64;
    let eocd = EndOfCentralDirectory::parse(&tail[pos..], offset)?;
    log::trace!("found end of central directory at {offset:#x}");
    Ok((eocd, offset))
}

/// Reads the central directory of an archive.
///
/// Returns the records in directory order together with the EOCD record.
///
/// # Errors
///
/// - [`Error::CorruptArchive`] if the directory lies outside the file or a
///   record is malformed
/// - [`Error::UnsupportedFeature`] for multi-disk or Zip64 archives
pub fn read_central_directory<R: Read + Seek>(
    reader: &mut R,
) -> Result<(Vec<CentralDirectoryHeader>, EndOfCentralDirectory)> {
    let (eocd, eocd_offset) = find_eocd(reader)?;

    if eocd.disk_number != 0
        || eocd.central_directory_disk != 0
        || eocd.entries_on_disk != eocd.total_entries
    {
        return Err(Error::UnsupportedFeature {
            feature: "multi-disk archives",
        });
    }
    if eocd.total_entries == u16::MAX
        || eocd.central_directory_size == u32::MAX
        || eocd.central_directory_offset == u32::MAX
        || has_zip64_locator(reader, eocd_offset)?
    {
        return Err(Error::UnsupportedFeature { feature: "Zip64" });
    }

    let cd_offset = u64::from(eocd.central_directory_offset);
    let cd_size = u64::from(eocd.central_directory_size);
    if cd_offset + cd_size > eocd_offset {
        return Err(Error::corrupt(
            eocd_offset,
            format!("central directory ({cd_offset:#x} + {cd_size}) overlaps its end record"),
        ));
    }
    let count = usize::from(eocd.total_entries);
    if count as u64 * CentralDirectoryHeader::FIXED_SIZE > cd_size {
        return Err(Error::corrupt(
            eocd_offset,
            format!("{count} entries cannot fit in a {cd_size}-byte central directory"),
        ));
    }

    reader.seek(SeekFrom::Start(cd_offset))?;
    let mut directory = vec![0u8; cd_size as usize];
    reader.read_exact(&mut directory)?;

    let mut cursor = std::io::Cursor::new(directory.as_slice());
    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = cd_offset + cursor.position();
        headers.push(CentralDirectoryHeader::read_from(&mut cursor, offset)?);
    }

    log::debug!(
        "read {} central directory records at {cd_offset:#x}",
        headers.len()
    );
    Ok((headers, eocd))
}

fn has_zip64_locator<R: Read + Seek>(reader: &mut R, eocd_offset: u64) -> Result<bool> {
    if eocd_offset < ZIP64_LOCATOR_SIZE {
        return Ok(false);
    }
    reader.seek(SeekFrom::Start(eocd_offset - ZIP64_LOCATOR_SIZE))?;
    let mut signature = [0u8; 4];
    reader.read_exact(&mut signature)?;
    Ok(u32::from_le_bytes(signature) == ZIP64_LOCATOR_SIGNATURE)
}
