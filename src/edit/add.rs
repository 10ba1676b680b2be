//! Adding file-system content to an archive.

use std::collections::HashSet;
use std::fs::{File, Metadata};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive_path::{base_name, clean, to_archive_path};
use crate::engine::EngineOptions;
use crate::read::ArchiveReader;
use crate::validate::{Transfer, validate_copy};
use crate::write::EntryMeta;
use crate::{Error, Result};

use super::{AddResult, StagedWriter, staging_dir, write_staged};

/// Adds files and directories to `archive`, creating it if needed.
///
/// Each input is first expanded as a file-system glob; an input without
/// matches is used as a literal path. Directories are added recursively, in
/// file-name order. Entries already in the archive are carried over
/// unchanged, and a new item whose entry name is already present (in the
/// archive, or from earlier in the same call) is skipped.
///
/// Entry names are the cleaned input paths with `/` separators, relative to
/// [`EngineOptions::base_dir`] when one is set. In junk-path mode only the
/// base name is kept.
///
/// # Errors
///
/// - [`Error::InvalidPattern`] if an input is a malformed glob
/// - [`Error::NotFound`] if an input does not exist
/// - [`Error::CopyMismatch`] if a file changed size while it was added
/// - [`Error::CorruptArchive`] if the existing archive cannot be parsed
///
/// The archive is left untouched on error.
pub fn add<I, P>(archive: &Path, inputs: I, options: &EngineOptions) -> Result<AddResult>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let dir = staging_dir(archive);
    std::fs::create_dir_all(dir).map_err(|e| Error::io_at(dir, e))?;

    let mut roots = Vec::new();
    for input in inputs {
        roots.extend(resolve_input(input.as_ref(), options.base_dir.as_deref())?);
    }

    let existing = match ArchiveReader::open_path(archive) {
        Ok(reader) => Some(reader),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };
    let own = OwnFiles::new(archive, &options.temp_prefix);
    log::debug!(
        "adding {} input paths to {} ({} existing entries)",
        roots.len(),
        archive.display(),
        existing.as_ref().map_or(0, ArchiveReader::len)
    );

    write_staged(archive, &options.temp_prefix, options.write_options(), move |writer| {
        let mut seen = HashSet::new();
        let mut result = AddResult::default();

        if let Some(mut source) = existing {
            writer.set_comment(source.comment().to_vec());
            for entry in source.entries().to_vec() {
                writer.raw_copy(&mut source, &entry)?;
                seen.insert(entry.name);
                result.entries_copied += 1;
            }
        }

        for root in &roots {
            add_tree(writer, root, options, &own, &mut seen, &mut result)?;
        }
        Ok(result)
    })
}

/// Expands one input into the paths it names.
fn resolve_input(input: &Path, base_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let literal = match base_dir {
        Some(base) if input.is_relative() => base.join(input),
        _ => input.to_path_buf(),
    };
    let Some(text) = input.to_str() else {
        return Ok(vec![literal]);
    };

    let pattern = match base_dir.and_then(Path::to_str) {
        Some(base) if input.is_relative() => {
            format!("{}/{}", glob::Pattern::escape(base), text)
        }
        _ => text.to_string(),
    };
    let paths = glob::glob(&pattern).map_err(|e| Error::InvalidPattern {
        pattern: text.to_string(),
        reason: format!("{} at position {}", e.msg, e.pos),
    })?;

    let mut matches = Vec::new();
    for path in paths {
        match path {
            Ok(path) => matches.push(path),
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(Error::io_at(path, e.into()));
            }
        }
    }
    if matches.is_empty() {
        log::trace!("'{text}' matched nothing, using it as a literal path");
        matches.push(literal);
    }
    Ok(matches)
}

/// Paths an add must never pick up: the archive itself and its staging files.
struct OwnFiles {
    archive: Option<PathBuf>,
    dir: Option<PathBuf>,
    prefix: String,
}

impl OwnFiles {
    fn new(archive: &Path, prefix: &str) -> Self {
        Self {
            archive: std::fs::canonicalize(archive).ok(),
            dir: std::fs::canonicalize(staging_dir(archive)).ok(),
            prefix: prefix.to_string(),
        }
    }

    fn contains(&self, path: &Path) -> bool {
        let Ok(path) = std::fs::canonicalize(path) else {
            return false;
        };
        if self.archive.as_deref() == Some(path.as_path()) {
            return true;
        }
        let staged = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&self.prefix) && n.ends_with(".tmp"));
        staged && path.parent() == self.dir.as_deref()
    }
}

/// Adds `root` and, for a directory, everything below it.
fn add_tree(
    writer: &mut StagedWriter<'_>,
    root: &Path,
    options: &EngineOptions,
    own: &OwnFiles,
    seen: &mut HashSet<String>,
    result: &mut AddResult,
) -> Result<()> {
    let walk = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for item in walk {
        let item = item.map_err(walk_error)?;
        let path = item.path();
        // symlinks are followed for their content but never descended into
        let metadata = std::fs::metadata(path).map_err(|e| Error::io_at(path, e))?;

        if !metadata.is_dir() && !metadata.is_file() {
            log::warn!("skipping {}: not a regular file or directory", path.display());
            continue;
        }
        if metadata.is_file() && own.contains(path) {
            log::debug!("skipping {}: it is the archive being written", path.display());
            continue;
        }
        let Some(name) = entry_name(path, &metadata, options) else {
            continue;
        };
        if seen.contains(&name) {
            log::debug!("skipping '{name}': already in the archive");
            result.entries_skipped += 1;
            continue;
        }

        add_item(writer, path, &metadata, name.clone(), result)?;
        seen.insert(name);
    }
    Ok(())
}

fn add_item(
    writer: &mut StagedWriter<'_>,
    path: &Path,
    metadata: &Metadata,
    name: String,
    result: &mut AddResult,
) -> Result<()> {
    let meta = EntryMeta::from_metadata(name, metadata);
    log::trace!("adding {} as '{}'", path.display(), meta.name);

    if metadata.is_dir() {
        writer.add_directory(meta)?;
    } else {
        let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        let written = writer.add_stream(meta, &mut BufReader::new(file))?;
        validate_copy(path, written, metadata.len(), Transfer::IntoArchive)?;
        result.bytes_added += written;
    }
    result.entries_added += 1;
    Ok(())
}

/// Entry name for a file-system item, or `None` for the base directory
/// itself.
fn entry_name(path: &Path, metadata: &Metadata, options: &EngineOptions) -> Option<String> {
    let relative = match &options.base_dir {
        Some(base) => path.strip_prefix(base).unwrap_or(path),
        None => path,
    };
    let mut name = to_archive_path(&clean(relative));

    while let Some(rest) = name.strip_prefix("../") {
        log::warn!("stripping '../' from '{name}'");
        name = rest.to_string();
    }
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if options.junk_paths {
        name = base_name(&name).to_string();
    }
    if metadata.is_dir() {
        name.push('/');
    }
    Some(name)
}

fn walk_error(err: walkdir::Error) -> Error {
    let path = err.path().map(Path::to_path_buf);
    match (path, err.into_io_error()) {
        (Some(path), Some(io)) => Error::io_at(path, io),
        (None, Some(io)) => Error::Io(io),
        (_, None) => Error::Io(std::io::Error::other("directory walk failed")),
    }
}
