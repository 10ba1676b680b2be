//! Shared test utilities for integration tests.
//!
//! This module provides fixture builders used across multiple test files.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zippy::read::ArchiveReader;
use zippy::write::{EntryMeta, WriteResult, Writer};
use zippy::{EngineOptions, ZipEngine};

/// Writes archive entries to any writer. Names ending in `/` become
/// directories; their data is ignored.
fn write_entries<W: std::io::Write + std::io::Seek>(
    writer: W,
    entries: &[(&str, &[u8])],
) -> zippy::Result<WriteResult> {
    let mut writer = Writer::create(writer)?;
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(EntryMeta::directory(*name))?;
        } else {
            writer.add_bytes(EntryMeta::file(*name), data)?;
        }
    }
    writer.finish()
}

/// Creates an in-memory archive.
///
/// # Example
///
/// ```ignore
/// let bytes = create_archive(&[("dir/", b""), ("dir/file.txt", b"content")]).unwrap();
/// ```
pub fn create_archive(entries: &[(&str, &[u8])]) -> zippy::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_entries(&mut cursor, entries)?;
    Ok(cursor.into_inner())
}

/// Creates an archive file at `path`.
pub fn write_archive(path: &Path, entries: &[(&str, &[u8])]) -> zippy::Result<WriteResult> {
    let file = File::create(path)?;
    write_entries(BufWriter::new(file), entries)
}

/// Returns the entry names of an archive file in stored order.
pub fn entry_names(path: &Path) -> Vec<String> {
    ArchiveReader::open_path(path)
        .expect("Failed to open archive")
        .into_entries()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

/// Reads every file entry of an archive, verifying checksums.
pub fn read_archive_contents(path: &Path) -> zippy::Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ArchiveReader::open_path(path)?;
    let files: Vec<_> = archive
        .entries()
        .iter()
        .filter(|e| !e.is_directory)
        .cloned()
        .collect();

    let mut contents = Vec::new();
    for entry in files {
        let data = archive.read_entry(&entry)?;
        contents.push((entry.name, data));
    }
    Ok(contents)
}

/// Creates files (and their parent directories) under `root`. Names ending
/// in `/` create empty directories.
pub fn build_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (name, data) in files {
        let path = root.join(name);
        if name.ends_with('/') {
            std::fs::create_dir_all(&path).unwrap();
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, data).unwrap();
        }
    }
}

/// Lists every file and directory under `root` as `/`-separated relative
/// names, directories with a trailing `/`, sorted.
pub fn tree_listing(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let relative = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                out.push(format!("{relative}/"));
                walk(root, &path, out);
            } else {
                out.push(relative);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// Returns deterministic incompressible bytes.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// An engine that resolves add inputs relative to `dir`.
pub fn engine_in(dir: &Path) -> ZipEngine {
    ZipEngine::new(EngineOptions::new().base_dir(dir))
}

/// Converts string inputs to the path list [`zippy::ArchiveOps::add`] takes.
pub fn paths(inputs: &[&str]) -> Vec<PathBuf> {
    inputs.iter().map(PathBuf::from).collect()
}

/// Extracts the error from a Result, panicking if it's Ok.
///
/// # Panics
///
/// Panics if the result is `Ok(_)`.
pub fn expect_err<T, E>(result: Result<T, E>) -> E {
    match result {
        Ok(_) => panic!("Expected error but got Ok"),
        Err(e) => e,
    }
}

/// Runs `f` with the permission bits of `path` temporarily set to `mode`.
///
/// The original permissions are restored afterwards, whether `f` succeeds
/// or not.
#[cfg(unix)]
pub fn with_permissions<T>(
    path: &Path,
    mode: u32,
    f: impl FnOnce() -> zippy::Result<T>,
) -> zippy::Result<T> {
    use std::os::unix::fs::PermissionsExt;

    let original = std::fs::metadata(path)?.permissions();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    let result = f();
    std::fs::set_permissions(path, original)?;
    result
}

/// Returns `true` when running as root, where permission bits do not deny
/// access.
#[cfg(unix)]
pub fn is_root() -> bool {
    use std::os::unix::fs::MetadataExt;

    let probe = tempfile::tempfile().unwrap();
    probe.metadata().map(|m| m.uid() == 0).unwrap_or(false)
}
