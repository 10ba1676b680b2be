//! Entry selection with shell-style glob patterns.
//!
//! Patterns use `*`, `?` and `[...]` classes (negated with `[!...]`) and are
//! matched against whole entry names with `/` as a separator that wildcards
//! never cross. Both patterns and entry names are compared without a trailing
//! `/`, so `d` and `d/` select the same directory; whether an entry is a
//! directory comes from the entry itself.
//!
//! Two planners build on the matcher:
//!
//! - [`keep_plan`] selects entries for a filtered copy and pulls in every
//!   ancestor directory a selected entry needs.
//! - [`remove_plan`] drops matching entries together with everything below a
//!   matching directory, then prunes directories left empty by the removal.
//!
//! Both preserve the original entry order.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::archive_path::{ancestors, parent, to_archive_path, trim_dir};
use crate::{Error, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Tests a single pattern against an entry name.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if the pattern is malformed.
///
/// ```rust
/// assert!(zippy::matcher::matches("*.txt", "notes.txt").unwrap());
/// assert!(!zippy::matcher::matches("*.txt", "dir/notes.txt").unwrap());
/// assert!(zippy::matcher::matches("dir/", "dir/").unwrap());
/// ```
pub fn matches(pattern: &str, name: &str) -> Result<bool> {
    Ok(PatternSet::new([pattern])?.matches(name))
}

/// A compiled set of glob patterns; an entry is selected if any matches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compiles patterns, normalising each like an archive path and stripping
    /// a trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for the first malformed pattern.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if any pattern matches the entry name.
    pub fn matches(&self, name: &str) -> bool {
        let name = trim_dir(name);
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }

    /// Returns `true` if any pattern matches the entry or one of its
    /// ancestor directories.
    pub fn matches_or_within(&self, name: &str) -> bool {
        self.matches(name) || ancestors(name).any(|dir| self.matches(dir))
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    let normalized = to_archive_path(Path::new(pattern));
    let normalized = normalized.trim_end_matches('/');
    Pattern::new(normalized).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: format!("{} at position {}", e.msg, e.pos),
    })
}

fn is_dir_name(name: &str) -> bool {
    name.ends_with('/')
}

/// One step of a filtered copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    /// Copy the source entry at this index unchanged.
    Copy(usize),
    /// Write a new directory entry that the source lacks.
    Synthesize {
        /// Directory name, with trailing `/`.
        name: String,
        /// Index of the entry that required the directory; its modification
        /// time is reused.
        template: usize,
    },
}

/// Plans a filtered copy that keeps the entries selected by `patterns`.
///
/// Selected entries are kept in their original order. Every ancestor
/// directory of a selected entry is kept too: at its own position when the
/// source has a directory entry for it, otherwise synthesised right before
/// the first entry that needs it. Directory entries are written only as
/// ancestors of selected files; a pattern matching a directory alone keeps
/// nothing.
pub fn keep_plan(names: &[&str], patterns: &PatternSet) -> Vec<Planned> {
    let selected: Vec<bool> = names.iter().map(|n| patterns.matches(n)).collect();

    let mut required: HashSet<&str> = HashSet::new();
    for (name, _) in names.iter().zip(&selected).filter(|(_, s)| **s) {
        if !is_dir_name(name) {
            required.extend(ancestors(name));
        }
    }

    let existing: HashSet<&str> = names
        .iter()
        .filter(|n| is_dir_name(n))
        .map(|n| trim_dir(n))
        .collect();

    let mut plan = Vec::new();
    let mut emitted: HashSet<&str> = HashSet::new();
    for (index, name) in names.iter().enumerate() {
        let keep = if is_dir_name(name) {
            required.contains(trim_dir(name)) && !emitted.contains(trim_dir(name))
        } else {
            selected[index]
        };
        if !keep {
            continue;
        }

        for dir in ancestors(name) {
            if !existing.contains(dir) && emitted.insert(dir) {
                plan.push(Planned::Synthesize {
                    name: format!("{dir}/"),
                    template: index,
                });
            }
        }
        if is_dir_name(name) {
            emitted.insert(trim_dir(name));
        }
        plan.push(Planned::Copy(index));
    }
    plan
}

/// A node in the directory tree seen while pruning.
#[derive(Clone, Copy)]
enum Child<'a> {
    Entry(usize),
    Dir(&'a str),
}

/// Plans a deletion and returns the indices of the entries to retain.
///
/// An entry is removed when a pattern matches its name or the name of one
/// of its ancestor directories. Afterwards, directories whose children are
/// all removed are removed too, repeating upwards until nothing changes.
/// Directories that were empty to begin with are left alone.
pub fn remove_plan(names: &[&str], patterns: &PatternSet) -> Vec<usize> {
    let matched: Vec<bool> = names
        .iter()
        .map(|n| patterns.matches_or_within(n))
        .collect();

    let mut dir_entries: HashSet<&str> = HashSet::new();
    let mut dirs: HashSet<&str> = HashSet::new();
    for name in names {
        dirs.extend(ancestors(name));
        if is_dir_name(name) {
            dir_entries.insert(trim_dir(name));
            dirs.insert(trim_dir(name));
        }
    }

    let mut children: HashMap<&str, Vec<Child<'_>>> = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        if let Some(dir) = parent(name) {
            children.entry(dir).or_default().push(Child::Entry(index));
        }
    }
    for &dir in dirs.iter().filter(|d| !dir_entries.contains(*d)) {
        if let Some(up) = parent(dir) {
            children.entry(up).or_default().push(Child::Dir(dir));
        }
    }

    let mut emptied: HashSet<&str> = HashSet::new();
    let is_gone = |child: Child<'_>, emptied: &HashSet<&str>| match child {
        Child::Entry(i) => {
            matched[i] || (is_dir_name(names[i]) && emptied.contains(trim_dir(names[i])))
        }
        Child::Dir(dir) => emptied.contains(dir),
    };

    let mut deepest_first: Vec<&str> = dirs.into_iter().collect();
    deepest_first.sort_by_key(|d| Reverse(d.matches('/').count()));
    for dir in deepest_first {
        let Some(kids) = children.get(dir) else {
            continue;
        };
        if kids.iter().all(|&c| is_gone(c, &emptied)) {
            emptied.insert(dir);
        }
    }

    (0..names.len())
        .filter(|&i| !is_gone(Child::Entry(i), &emptied))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> PatternSet {
        PatternSet::new(patterns).unwrap()
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let s = set(&["*.txt"]);
        assert!(s.matches("a.txt"));
        assert!(!s.matches("dir/a.txt"));
        assert!(set(&["*/*.txt"]).matches("dir/a.txt"));
    }

    #[test]
    fn test_question_and_class() {
        assert!(matches("file?.txt", "file1.txt").unwrap());
        assert!(matches("file[0-3].txt", "file2.txt").unwrap());
        assert!(!matches("file[!0-3].txt", "file2.txt").unwrap());
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert!(matches("d/", "d/").unwrap());
        assert!(matches("d", "d/").unwrap());
        assert!(matches("d/", "d").unwrap());
    }

    #[test]
    fn test_leading_slash_pattern_is_normalized() {
        assert!(matches("/dir/a.txt", "dir/a.txt").unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternSet::new(["[abc"]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "[abc"));
    }

    #[test]
    fn test_keep_synthesizes_ancestors() {
        let names = ["a/b/c.txt"];
        let plan = keep_plan(&names, &set(&["a/b/c.txt"]));
        assert_eq!(
            plan,
            vec![
                Planned::Synthesize {
                    name: "a/".into(),
                    template: 0
                },
                Planned::Synthesize {
                    name: "a/b/".into(),
                    template: 0
                },
                Planned::Copy(0),
            ]
        );
    }

    #[test]
    fn test_keep_uses_existing_dirs_in_order() {
        let names = ["a/", "a/x.txt", "a/y.txt", "b/", "b/z.txt"];
        let plan = keep_plan(&names, &set(&["a/y.txt"]));
        assert_eq!(plan, vec![Planned::Copy(0), Planned::Copy(2)]);
    }

    #[test]
    fn test_keep_directory_pattern_alone_keeps_nothing() {
        let names = ["a/", "a/x.txt", "b.txt"];
        assert!(keep_plan(&names, &set(&["a"])).is_empty());
        assert!(keep_plan(&names, &set(&["a/"])).is_empty());
    }

    #[test]
    fn test_keep_directory_pattern_with_selected_child() {
        let names = ["a/", "a/x.txt", "b.txt"];
        let plan = keep_plan(&names, &set(&["a", "a/x.txt"]));
        assert_eq!(plan, vec![Planned::Copy(0), Planned::Copy(1)]);
    }

    #[test]
    fn test_keep_dir_entry_after_file() {
        let names = ["a/x.txt", "a/"];
        let plan = keep_plan(&names, &set(&["a/x.txt"]));
        assert_eq!(plan, vec![Planned::Copy(0), Planned::Copy(1)]);
    }

    #[test]
    fn test_keep_nothing_selected() {
        let names = ["a/", "a/x.txt"];
        assert!(keep_plan(&names, &set(&["nope"])).is_empty());
    }

    #[test]
    fn test_remove_prunes_emptied_dir() {
        let names = ["d/", "d/x.txt"];
        assert!(remove_plan(&names, &set(&["d/x.txt"])).is_empty());
    }

    #[test]
    fn test_remove_keeps_dir_with_survivor() {
        let names = ["d/", "d/x.txt", "d/y.txt"];
        assert_eq!(remove_plan(&names, &set(&["d/x.txt"])), vec![0, 2]);
    }

    #[test]
    fn test_remove_directory_prefix() {
        let names = ["keep.txt", "d/", "d/sub/", "d/sub/x.txt", "dx.txt"];
        assert_eq!(remove_plan(&names, &set(&["d"])), vec![0, 4]);
    }

    #[test]
    fn test_remove_prunes_transitively() {
        let names = ["a/", "a/b/", "a/b/c.txt", "z.txt"];
        assert_eq!(remove_plan(&names, &set(&["a/b/c.txt"])), vec![3]);
    }

    #[test]
    fn test_remove_prunes_through_implicit_dirs() {
        let names = ["a/", "a/b/c.txt", "a/b/d.txt"];
        assert!(remove_plan(&names, &set(&["a/b/*"])).is_empty());
    }

    #[test]
    fn test_remove_leaves_untouched_empty_dirs() {
        let names = ["empty/", "file0.txt", "subdir0/", "subdir0/file1.txt"];
        assert_eq!(remove_plan(&names, &set(&["file0.txt"])), vec![0, 2, 3]);
    }

    #[test]
    fn test_remove_no_match_keeps_all() {
        let names = ["a/", "a/b.txt", "c.txt"];
        assert_eq!(remove_plan(&names, &set(&["zzz"])), vec![0, 1, 2]);
    }
}
