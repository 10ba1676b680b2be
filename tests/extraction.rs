//! Extraction safety and integrity tests.
//!
//! These tests verify that:
//! - Damaged entry content is reported as an integrity failure
//! - Entry names cannot escape the destination directory
//! - Permission failures surface as typed errors

mod common;

use std::io::Cursor;
use std::path::Path;

use zippy::format::{CentralDirectoryHeader, LocalFileHeader};
use zippy::read::ArchiveReader;
use zippy::write::{EntryMeta, WriteOptions, Writer};
use zippy::{Error, ExtractOptions, PatternSet};

use common::{create_archive, expect_err, write_archive};

/// Writes an archive whose content bytes are stored uncompressed, so single
/// bytes can be flipped without breaking the deflate stream.
fn write_plain_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = Writer::create(std::io::BufWriter::new(file))
        .unwrap()
        .options(WriteOptions::new().level(0).unwrap());
    for (name, data) in entries {
        writer.add_bytes(EntryMeta::file(*name), data).unwrap();
    }
    writer.finish().unwrap();
}

/// Flips one byte in the middle of an entry's stored data.
fn corrupt_entry(path: &Path, name: &str) {
    let mut reader = ArchiveReader::open_path(path).unwrap();
    let entry = reader.entry(name).cloned().unwrap();
    let range = reader.data_range(&entry).unwrap();
    drop(reader);

    let mut bytes = std::fs::read(path).unwrap();
    let middle = ((range.start + range.end) / 2) as usize;
    bytes[middle] ^= 0xFF;
    std::fs::write(path, bytes).unwrap();
}

/// Builds an archive with names the writer itself refuses to produce.
fn raw_archive(names: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for name in names {
        let data = b"payload";
        let local = LocalFileHeader {
            crc32: zippy::checksum::Crc32::compute(data),
            compressed_size: data.len() as u32,
            uncompressed_size: data.len() as u32,
            name: name.as_bytes().to_vec(),
            ..Default::default()
        };
        central.push(CentralDirectoryHeader {
            crc32: local.crc32,
            compressed_size: local.compressed_size,
            uncompressed_size: local.uncompressed_size,
            name: local.name.clone(),
            local_header_offset: out.len() as u32,
            ..Default::default()
        });
        local.write_to(&mut out).unwrap();
        out.extend_from_slice(data);
    }
    let cd_offset = out.len() as u32;
    for header in &central {
        header.write_to(&mut out).unwrap();
    }
    let cd_size = out.len() as u32 - cd_offset;
    let eocd = zippy::format::EndOfCentralDirectory {
        entries_on_disk: central.len() as u16,
        total_entries: central.len() as u16,
        central_directory_size: cd_size,
        central_directory_offset: cd_offset,
        ..Default::default()
    };
    eocd.write_to(&mut out).unwrap();
    out
}

// ============================================================================
// Integrity
// ============================================================================

#[test]
fn test_checksum_mismatch_names_entry() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("c.zip");
    let body = b"The quick brown fox jumps over the lazy dog. ".repeat(20);
    write_plain_archive(&archive, &[("good.txt", b"fine"), ("bad.txt", &body)]);
    corrupt_entry(&archive, "bad.txt");

    let out = tempfile::tempdir().unwrap();
    let err = zippy::extract_all(&archive, out.path()).unwrap_err();
    assert!(err.is_integrity_failure());
    assert!(matches!(err, Error::ChecksumMismatch { ref entry_name, .. } if entry_name == "bad.txt"));
    assert_eq!(err.entry_name(), Some("bad.txt"));

    // entries before the damaged one stay on disk
    assert_eq!(std::fs::read(out.path().join("good.txt")).unwrap(), b"fine");
}

#[test]
fn test_damaged_entry_does_not_block_siblings_when_deselected() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("c.zip");
    let body = b"0123456789abcdef".repeat(64);
    write_plain_archive(&archive, &[("bad.bin", &body), ("ok.txt", b"ok")]);
    corrupt_entry(&archive, "bad.bin");

    let out = tempfile::tempdir().unwrap();
    let extracted = zippy::extract_matching(&archive, out.path(), ["*.txt"]).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(std::fs::read(out.path().join("ok.txt")).unwrap(), b"ok");
}

#[test]
fn test_read_entry_reports_damage() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("r.zip");
    write_plain_archive(&archive, &[("data.txt", &b"abcdefgh".repeat(16))]);
    corrupt_entry(&archive, "data.txt");

    let mut reader = ArchiveReader::open_path(&archive).unwrap();
    let entry = reader.entries()[0].clone();
    let err = expect_err(reader.read_entry(&entry));
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
}

#[test]
fn test_corrupt_deflate_stream_is_integrity_failure() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("d.zip");
    let payload = common::random_bytes(4096, 5);
    write_archive(&archive, &[("blob", &payload)]).unwrap();

    let mut reader = ArchiveReader::open_path(&archive).unwrap();
    let entry = reader.entries()[0].clone();
    let range = reader.data_range(&entry).unwrap();
    drop(reader);

    // wipe the block headers at the start of the stream
    let mut bytes = std::fs::read(&archive).unwrap();
    for b in &mut bytes[range.start as usize..range.start as usize + 8] {
        *b = 0xFF;
    }
    std::fs::write(&archive, bytes).unwrap();

    let out = tempfile::tempdir().unwrap();
    let err = zippy::extract_all(&archive, out.path()).unwrap_err();
    assert!(err.is_integrity_failure(), "unexpected error: {err:?}");
}

// ============================================================================
// Path safety
// ============================================================================

#[test]
fn test_parent_traversal_rejected() {
    let bytes = raw_archive(&["safe.txt", "../escape.txt"]);
    let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();

    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("out");
    let err = reader
        .extract(&out, &PatternSet::default(), &ExtractOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::UnsafePath { ref name } if name == "../escape.txt"));
    assert!(out.join("safe.txt").exists());
    assert!(!root.path().join("escape.txt").exists());
}

#[test]
fn test_nested_traversal_rejected() {
    let bytes = raw_archive(&["a/../../x.txt"]);
    let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = reader
        .extract(out.path(), &PatternSet::default(), &ExtractOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::UnsafePath { .. }));
}

#[test]
fn test_absolute_name_stays_under_destination() {
    let bytes = raw_archive(&["/etc/zippy-test.txt"]);
    let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
    let out = tempfile::tempdir().unwrap();
    let result = reader.extract(out.path(), &PatternSet::default(), &ExtractOptions::default());

    // either refused or written below the destination, never at the root
    if result.is_ok() {
        assert!(out.path().join("etc/zippy-test.txt").exists());
    } else {
        assert!(matches!(result, Err(Error::UnsafePath { .. })));
    }
    assert!(!Path::new("/etc/zippy-test.txt").exists());
}

#[test]
fn test_junk_paths_neutralizes_traversal() {
    let bytes = raw_archive(&["../../flat.txt"]);
    let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
    let out = tempfile::tempdir().unwrap();
    let extracted = reader
        .extract(
            out.path(),
            &PatternSet::default(),
            &ExtractOptions::new().junk_paths(true),
        )
        .unwrap();
    assert_eq!(extracted[0].name, "flat.txt");
    assert!(out.path().join("flat.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_overwrite_replaces_symlink_instead_of_following_it() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.zip");
    write_archive(&archive, &[("a.txt", b"from archive")]).unwrap();

    let outside = dir.path().join("outside.txt");
    std::fs::write(&outside, b"outside").unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    std::os::unix::fs::symlink(&outside, out.join("a.txt")).unwrap();

    zippy::extract_all(&archive, &out).unwrap();

    assert_eq!(std::fs::read(&outside).unwrap(), b"outside");
    let placed = out.join("a.txt");
    assert!(placed.symlink_metadata().unwrap().file_type().is_file());
    assert_eq!(std::fs::read(&placed).unwrap(), b"from archive");
}

// ============================================================================
// Destination handling
// ============================================================================

#[test]
fn test_extract_creates_destination() {
    let bytes = create_archive(&[("f.txt", b"f")]).unwrap();
    let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("a/b/c");
    reader
        .extract(&dest, &PatternSet::default(), &ExtractOptions::default())
        .unwrap();
    assert!(dest.join("f.txt").is_file());
}

#[test]
fn test_extract_missing_archive() {
    let dir = tempfile::tempdir().unwrap();
    let err = zippy::extract_all(dir.path().join("gone.zip"), dir.path()).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn test_extract_invalid_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.zip");
    write_archive(&archive, &[("a.txt", b"a")]).unwrap();
    let err = zippy::extract_matching(&archive, dir.path().join("out"), ["[z-"]).unwrap_err();
    assert!(matches!(err, Error::InvalidPattern { .. }));
    assert!(!dir.path().join("out").exists());
}

#[cfg(unix)]
#[test]
fn test_unwritable_destination() {
    if common::is_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.zip");
    write_archive(&archive, &[("f.txt", b"f")]).unwrap();
    let dest = dir.path().join("locked");
    std::fs::create_dir(&dest).unwrap();

    let err = common::with_permissions(&dest, 0o500, || zippy::extract_all(&archive, &dest))
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }), "unexpected error: {err:?}");
}

#[cfg(unix)]
#[test]
fn test_unreadable_archive() {
    if common::is_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("a.zip");
    write_archive(&archive, &[("f.txt", b"f")]).unwrap();

    let err = common::with_permissions(&archive, 0o000, || zippy::list_contents(&archive))
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
}

#[cfg(unix)]
#[test]
fn test_read_only_archive_directory_blocks_delete() {
    if common::is_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("ro");
    std::fs::create_dir(&sub).unwrap();
    let archive = sub.join("a.zip");
    write_archive(&archive, &[("f.txt", b"f"), ("g.txt", b"g")]).unwrap();

    let err = common::with_permissions(&sub, 0o500, || zippy::delete_entries(&archive, ["f.txt"]))
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }), "unexpected error: {err:?}");
    assert_eq!(common::entry_names(&archive), ["f.txt", "g.txt"]);
}
