//! The archive engine and its configuration.
//!
//! [`ArchiveOps`] is the capability surface: list, add, delete, copy, and
//! extract. [`ZipEngine`] implements it with the options it was constructed
//! with. The free functions at the crate root run the same operations with
//! default options.

use std::path::{Path, PathBuf};

use crate::edit::{self, AddResult, EditResult};
use crate::matcher::PatternSet;
use crate::read::{ArchiveReader, Entry, ExtractOptions, OverwritePolicy, PreserveMetadata};
use crate::write::WriteOptions;
use crate::Result;

/// Default prefix of staging files created next to rewritten archives.
pub const DEFAULT_TEMP_PREFIX: &str = ".zippy-";

/// Configuration of a [`ZipEngine`].
///
/// # Example
///
/// ```rust
/// use zippy::{EngineOptions, OverwritePolicy};
///
/// let options = EngineOptions::new()
///     .junk_paths(true)
///     .overwrite(OverwritePolicy::Skip)
///     .compression_level(9)?;
/// assert!(options.junk_paths);
///
/// assert!(matches!(
///     EngineOptions::new().compression_level(12),
///     Err(zippy::Error::InvalidCompressionLevel { level: 12 })
/// ));
/// # Ok::<(), zippy::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Store and extract entries under their base names only.
    pub junk_paths: bool,
    /// What extraction does when a destination file exists.
    pub overwrite: OverwritePolicy,
    /// Metadata restored on extraction.
    pub preserve_metadata: PreserveMetadata,
    /// Directory that relative add inputs are resolved against and that
    /// entry names are made relative to. Uses the working directory when
    /// unset.
    pub base_dir: Option<PathBuf>,
    /// Prefix of staging file names.
    pub temp_prefix: String,
    write: WriteOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            junk_paths: false,
            overwrite: OverwritePolicy::default(),
            preserve_metadata: PreserveMetadata::default(),
            base_dir: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            write: WriteOptions::default(),
        }
    }
}

impl EngineOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets junk-path mode.
    pub fn junk_paths(mut self, junk: bool) -> Self {
        self.junk_paths = junk;
        self
    }

    /// Sets the extraction overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets which metadata extraction restores.
    pub fn preserve_metadata(mut self, preserve: PreserveMetadata) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    /// Sets the base directory for add inputs.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Sets the deflate level for added files (0-9).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`](crate::Error::InvalidCompressionLevel)
    /// if `level > 9`.
    pub fn compression_level(mut self, level: u32) -> Result<Self> {
        self.write = self.write.level(level)?;
        Ok(self)
    }

    /// Sets the prefix of staging file names.
    pub fn temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Returns the writer options derived from these settings.
    pub fn write_options(&self) -> WriteOptions {
        self.write
    }

    /// Returns the extraction options derived from these settings.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .junk_paths(self.junk_paths)
            .overwrite(self.overwrite)
            .preserve_metadata(self.preserve_metadata)
    }
}

/// Operations on ZIP archives stored in files.
pub trait ArchiveOps {
    /// Lists the entries of an archive in stored order.
    fn list(&self, archive: &Path) -> Result<Vec<Entry>>;

    /// Adds files and directories to an archive, creating it if needed.
    fn add(&self, archive: &Path, inputs: &[PathBuf]) -> Result<AddResult>;

    /// Removes the selected entries from an archive.
    fn delete(&self, archive: &Path, patterns: &PatternSet) -> Result<EditResult>;

    /// Writes the selected entries to a new archive at `dest`.
    fn copy(&self, archive: &Path, dest: &Path, patterns: &PatternSet) -> Result<EditResult>;

    /// Extracts the selected entries (all of them for an empty set) under
    /// `dest`.
    fn extract(&self, archive: &Path, dest: &Path, patterns: &PatternSet) -> Result<Vec<Entry>>;
}

/// The ZIP archive engine.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::{Path, PathBuf};
/// use zippy::{ArchiveOps, EngineOptions, PatternSet, ZipEngine};
///
/// let engine = ZipEngine::new(EngineOptions::new().base_dir("project"));
/// let inputs = [PathBuf::from("src"), PathBuf::from("Cargo.toml")];
/// engine.add(Path::new("backup.zip"), &inputs)?;
/// engine.delete(Path::new("backup.zip"), &PatternSet::new(["src/*.bak"])?)?;
/// for entry in engine.list(Path::new("backup.zip"))? {
///     println!("{} ({} bytes)", entry.name, entry.size);
/// }
/// # Ok::<(), zippy::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZipEngine {
    options: EngineOptions,
}

impl ZipEngine {
    /// Creates an engine with the given options.
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    /// Returns the engine's options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Extracts the selected entries into the directory holding the archive.
    pub fn extract_beside(&self, archive: &Path, patterns: &PatternSet) -> Result<Vec<Entry>> {
        self.extract(archive, edit::staging_dir(archive), patterns)
    }
}

impl ArchiveOps for ZipEngine {
    fn list(&self, archive: &Path) -> Result<Vec<Entry>> {
        ArchiveReader::open_path(archive).map(ArchiveReader::into_entries)
    }

    fn add(&self, archive: &Path, inputs: &[PathBuf]) -> Result<AddResult> {
        edit::add(archive, inputs, &self.options)
    }

    fn delete(&self, archive: &Path, patterns: &PatternSet) -> Result<EditResult> {
        edit::delete(archive, patterns, &self.options)
    }

    fn copy(&self, archive: &Path, dest: &Path, patterns: &PatternSet) -> Result<EditResult> {
        edit::copy(archive, dest, patterns, &self.options)
    }

    fn extract(&self, archive: &Path, dest: &Path, patterns: &PatternSet) -> Result<Vec<Entry>> {
        let mut reader = ArchiveReader::open_path(archive)?;
        reader.extract(dest, patterns, &self.options.extract_options())
    }
}

/// Lists the entries of an archive.
///
/// # Errors
///
/// - [`Error::NotFound`](crate::Error::NotFound) if the archive does not exist
/// - [`Error::CorruptArchive`](crate::Error::CorruptArchive) if it is not a
///   valid ZIP archive
pub fn list_contents(archive: impl AsRef<Path>) -> Result<Vec<Entry>> {
    ZipEngine::default().list(archive.as_ref())
}

/// Adds files and directories (glob patterns allowed) to an archive.
///
/// See [`edit::add`] for naming and duplicate handling.
pub fn add_entries<I, P>(archive: impl AsRef<Path>, inputs: I) -> Result<AddResult>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    edit::add(archive.as_ref(), inputs, &EngineOptions::default())
}

/// Deletes the entries matching any of `patterns` from an archive.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) for a
/// malformed pattern, otherwise see [`edit::delete`].
pub fn delete_entries<I, S>(archive: impl AsRef<Path>, patterns: I) -> Result<EditResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let patterns = PatternSet::new(patterns)?;
    ZipEngine::default().delete(archive.as_ref(), &patterns)
}

/// Copies the entries matching any of `patterns` to a new archive.
///
/// With no patterns the archive file is copied byte for byte.
pub fn copy_entries<I, S>(archive: impl AsRef<Path>, dest: impl AsRef<Path>, patterns: I) -> Result<EditResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let patterns = PatternSet::new(patterns)?;
    ZipEngine::default().copy(archive.as_ref(), dest.as_ref(), &patterns)
}

/// Extracts every entry of an archive under `dest`.
pub fn extract_all(archive: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<Vec<Entry>> {
    ZipEngine::default().extract(archive.as_ref(), dest.as_ref(), &PatternSet::default())
}

/// Extracts the entries matching any of `patterns` under `dest`.
///
/// An empty pattern list extracts everything, like [`extract_all`].
pub fn extract_matching<I, S>(archive: impl AsRef<Path>, dest: impl AsRef<Path>, patterns: I) -> Result<Vec<Entry>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let patterns = PatternSet::new(patterns)?;
    ZipEngine::default().extract(archive.as_ref(), dest.as_ref(), &patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert!(!options.junk_paths);
        assert_eq!(options.overwrite, OverwritePolicy::Overwrite);
        assert_eq!(options.temp_prefix, DEFAULT_TEMP_PREFIX);
        assert_eq!(options.write_options().level, crate::write::DEFAULT_LEVEL);
    }

    #[test]
    fn test_extract_options_follow_engine() {
        let options = EngineOptions::new()
            .junk_paths(true)
            .overwrite(OverwritePolicy::Error)
            .extract_options();
        assert!(options.junk_paths);
        assert_eq!(options.overwrite, OverwritePolicy::Error);
    }

    #[test]
    fn test_invalid_level_keeps_error() {
        let err = EngineOptions::new().compression_level(10).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidCompressionLevel { level: 10 }));
    }

    #[test]
    fn test_engine_is_object_safe() {
        let engine: Box<dyn ArchiveOps> = Box::new(ZipEngine::default());
        let dir = tempfile::tempdir().unwrap();
        let err = engine.list(&dir.path().join("missing.zip")).unwrap_err();
        assert!(err.is_not_found());
    }
}
