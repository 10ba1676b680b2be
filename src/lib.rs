//! # zippy
//!
//! A pure-Rust library for manipulating ZIP archives on disk.
//!
//! The crate lists, adds to, deletes from, copies subsets of, and extracts
//! ZIP archives. Every modification builds a complete new archive in a
//! temporary file next to the target and atomically renames it into place,
//! so a failed operation never leaves a half-written archive behind.
//! Extraction verifies the CRC-32 and length of every file it writes and
//! restores stored permissions and modification times.
//!
//! ## Quick Start
//!
//! ### Building and Extracting an Archive
//!
//! ```rust,no_run
//! use zippy::Result;
//!
//! fn main() -> Result<()> {
//!     // Add files and whole directories; glob patterns are expanded
//!     let added = zippy::add_entries("backup.zip", ["notes.txt", "src", "*.toml"])?;
//!     println!("added {} entries", added.entries_added);
//!
//!     // List entries
//!     for entry in zippy::list_contents("backup.zip")? {
//!         println!("{}: {} bytes", entry.name, entry.size);
//!     }
//!
//!     // Extract everything, or only what matches
//!     zippy::extract_all("backup.zip", "restore")?;
//!     zippy::extract_matching("backup.zip", "restore-src", ["src/*.rs"])?;
//!     Ok(())
//! }
//! ```
//!
//! ### Rewriting an Archive
//!
//! ```rust,no_run
//! fn main() -> zippy::Result<()> {
//!     // Drop matching entries; directories left empty are pruned
//!     zippy::delete_entries("backup.zip", ["src/*.bak"])?;
//!
//!     // Copy a subset to a new archive; parent directories come along
//!     zippy::copy_entries("backup.zip", "docs.zip", ["docs/*.md"])?;
//!
//!     // Without patterns the archive is copied byte for byte
//!     zippy::copy_entries("backup.zip", "backup-copy.zip", [] as [&str; 0])?;
//!     Ok(())
//! }
//! ```
//!
//! ### Configuring the Engine
//!
//! The free functions use default options. [`ZipEngine`] takes an explicit
//! [`EngineOptions`]:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zippy::{ArchiveOps, EngineOptions, OverwritePolicy, PatternSet, ZipEngine};
//!
//! fn main() -> zippy::Result<()> {
//!     let engine = ZipEngine::new(
//!         EngineOptions::new()
//!             .junk_paths(true)
//!             .overwrite(OverwritePolicy::Skip)
//!             .compression_level(9)?,
//!     );
//!     let patterns = PatternSet::new(["*.txt"])?;
//!     engine.extract(Path::new("backup.zip"), Path::new("flat"), &patterns)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Low-level Reading and Writing
//!
//! [`read::ArchiveReader`] and [`write::Writer`] work on any seekable
//! stream:
//!
//! ```rust
//! use std::io::Cursor;
//! use zippy::read::ArchiveReader;
//! use zippy::write::{EntryMeta, Writer};
//!
//! let mut buffer = Cursor::new(Vec::new());
//! let mut writer = Writer::create(&mut buffer)?;
//! writer.add_bytes(EntryMeta::file("hello.txt"), b"Hello, World!")?;
//! writer.finish()?;
//!
//! buffer.set_position(0);
//! let mut archive = ArchiveReader::open(buffer)?;
//! let entry = archive.entries()[0].clone();
//! assert_eq!(archive.read_entry(&entry)?, b"Hello, World!");
//! # Ok::<(), zippy::Error>(())
//! ```
//!
//! ## Patterns
//!
//! Entry patterns are shell globs (`*`, `?`, `[...]`, `[!...]`) matched
//! against whole entry names; wildcards never cross `/`. A trailing `/` on
//! a pattern is ignored. See [`matcher`] for how deletes and copies treat
//! directories.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`:
//!
//! ```rust,no_run
//! use zippy::Error;
//!
//! match zippy::extract_all("backup.zip", "restore") {
//!     Ok(entries) => println!("extracted {} entries", entries.len()),
//!     Err(Error::NotFound { path }) => eprintln!("{} does not exist", path.display()),
//!     Err(e) if e.is_integrity_failure() => eprintln!("damaged entry: {e}"),
//!     Err(e) => eprintln!("extraction failed: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger itself.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Buffer size for streaming entry content.
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive_path;
mod attributes;
pub mod checksum;
pub mod edit;
mod engine;
pub mod error;
pub mod format;
pub mod fs;
pub mod matcher;
pub mod read;
pub mod timestamp;
pub mod validate;
pub mod write;

pub use attributes::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
pub use edit::{AddResult, EditResult};
pub use engine::{
    ArchiveOps, DEFAULT_TEMP_PREFIX, EngineOptions, ZipEngine, add_entries, copy_entries,
    delete_entries, extract_all, extract_matching, list_contents,
};
pub use error::{Error, Result};
pub use matcher::PatternSet;
pub use read::{ArchiveReader, Entry, ExtractOptions, OverwritePolicy, PreserveMetadata};
pub use write::{EntryMeta, WriteOptions, WriteResult, Writer};
