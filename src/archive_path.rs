//! Conversion between host file-system paths and archive entry names.
//!
//! Archive names always use `/` as separator, never carry a drive letter or
//! a leading `/`, and mark directories with a trailing `/`. The inverse
//! mapping joins a name under a destination root and refuses names that
//! would escape it.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Converts a host path to an archive entry name.
///
/// The host separator is replaced with `/`, any volume prefix (`C:` or a UNC
/// share) is removed, and leading slashes are trimmed. Nothing else is
/// rewritten: case is kept and `.`/`..` segments are not resolved.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use zippy::archive_path::to_archive_path;
///
/// assert_eq!(to_archive_path(Path::new("/var/data/a.txt")), "var/data/a.txt");
/// assert_eq!(to_archive_path(Path::new("dir/sub")), "dir/sub");
/// ```
pub fn to_archive_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let replaced = if std::path::MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    };
    let without_volume = &replaced[volume_len(&replaced)..];
    without_volume.trim_start_matches('/').to_string()
}

/// Length of the volume prefix of an already slash-normalized path.
#[cfg(windows)]
fn volume_len(path: &str) -> usize {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return 2;
    }
    // UNC: //host/share
    if let Some(rest) = path.strip_prefix("//") {
        let mut parts = rest.splitn(3, '/');
        let host = parts.next().unwrap_or("");
        let share = parts.next().unwrap_or("");
        if !host.is_empty() && !share.is_empty() {
            return 2 + host.len() + 1 + share.len();
        }
    }
    0
}

#[cfg(not(windows))]
fn volume_len(_path: &str) -> usize {
    0
}

/// Lexically cleans a host path.
///
/// Removes `.` segments and repeated separators and folds `name/..` pairs.
/// Leading `..` segments of a relative path are kept.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Returns the entry name without its trailing directory slash.
pub fn trim_dir(name: &str) -> &str {
    name.strip_suffix('/').unwrap_or(name)
}

/// Returns the last segment of an entry name, ignoring a trailing slash.
///
/// ```rust
/// use zippy::archive_path::base_name;
///
/// assert_eq!(base_name("a/b/c.txt"), "c.txt");
/// assert_eq!(base_name("a/b/"), "b");
/// assert_eq!(base_name("top"), "top");
/// ```
pub fn base_name(name: &str) -> &str {
    let trimmed = trim_dir(name);
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Returns the parent directory of an entry name (without trailing slash),
/// or `None` for a top-level entry.
pub fn parent(name: &str) -> Option<&str> {
    let trimmed = trim_dir(name);
    trimmed.rfind('/').map(|pos| &trimmed[..pos])
}

/// Iterates over every ancestor directory of an entry name, outermost first,
/// without trailing slashes.
///
/// ```rust
/// use zippy::archive_path::ancestors;
///
/// let dirs: Vec<_> = ancestors("a/b/c.txt").collect();
/// assert_eq!(dirs, ["a", "a/b"]);
/// ```
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    let trimmed = trim_dir(name);
    trimmed
        .match_indices('/')
        .map(move |(pos, _)| &trimmed[..pos])
        .filter(|dir| !dir.is_empty())
}

/// Joins an entry name under `dest`, refusing names that would escape it.
///
/// # Errors
///
/// Returns [`Error::UnsafePath`] for names that contain NUL bytes, `..`
/// segments, or a root/drive prefix.
pub fn join_under(dest: &Path, name: &str) -> Result<PathBuf> {
    let unsafe_path = || Error::UnsafePath {
        name: name.to_string(),
    };
    if name.contains('\0') {
        return Err(unsafe_path());
    }
    let mut joined = dest.to_path_buf();
    for segment in trim_dir(name).split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(unsafe_path()),
            s => {
                let mut components = Path::new(s).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(part)), None) => joined.push(part),
                    _ => return Err(unsafe_path()),
                }
            }
        }
    }
    Ok(joined)
}
