//! Permission bits and their encoding in ZIP external attributes.
//!
//! Entries written by this crate declare a Unix host in "version made by"
//! and keep the full `st_mode` (type and permission bits) in the upper 16
//! bits of the external attributes. Directories additionally set the MS-DOS
//! directory attribute so DOS-oriented tools recognise them.

use std::fs::Metadata;

/// "Version made by" for entries written by this crate: Unix host, ZIP 2.0.
pub(crate) const VERSION_MADE_BY: u16 = (3 << 8) | 20;

/// Minimum version needed to extract deflate or stored entries.
pub(crate) const VERSION_NEEDED: u16 = 20;

const HOST_UNIX: u16 = 3;
const HOST_MACOS: u16 = 19;

const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const MSDOS_READONLY: u32 = 0x01;
const MSDOS_DIRECTORY: u32 = 0x10;

/// Default permissions for directories without usable mode bits.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default permissions for files without usable mode bits.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Encodes permission bits into external attributes.
pub fn encode_external(mode: u32, is_directory: bool) -> u32 {
    let file_type = if is_directory { S_IFDIR } else { S_IFREG };
    let mut attrs = (file_type | (mode & 0o7777)) << 16;
    if is_directory {
        attrs |= MSDOS_DIRECTORY;
    }
    if mode & 0o222 == 0 {
        attrs |= MSDOS_READONLY;
    }
    attrs
}

/// Decodes permission bits from a central directory record.
///
/// Unix-hosted entries use the stored mode; everything else is derived from
/// the MS-DOS read-only bit. A result without any permission bits falls back
/// to [`DEFAULT_DIR_MODE`] or [`DEFAULT_FILE_MODE`].
pub fn decode_mode(version_made_by: u16, external: u32, is_directory: bool) -> u32 {
    let host = version_made_by >> 8;
    let unix_mode = external >> 16;
    let mode = if (host == HOST_UNIX || host == HOST_MACOS) && unix_mode != 0 {
        unix_mode & 0o7777
    } else if external & MSDOS_READONLY != 0 {
        if is_directory { 0o555 } else { 0o444 }
    } else {
        0
    };

    if mode & 0o777 != 0 {
        mode
    } else if is_directory {
        DEFAULT_DIR_MODE
    } else {
        DEFAULT_FILE_MODE
    }
}

/// Returns the permission bits of a file-system object.
#[cfg(unix)]
pub fn mode_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

/// Returns the permission bits of a file-system object.
#[cfg(not(unix))]
pub fn mode_of(metadata: &Metadata) -> u32 {
    let base = if metadata.is_dir() {
        DEFAULT_DIR_MODE
    } else {
        DEFAULT_FILE_MODE
    };
    if metadata.permissions().readonly() {
        base & !0o222
    } else {
        base
    }
}
