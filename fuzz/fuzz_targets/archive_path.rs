//! Fuzz target for entry name handling with arbitrary string input.
//!
//! Run with: cargo +nightly fuzz run archive_path
//!
//! Properties checked:
//! - A name joined under a destination never leaves it
//! - Joined paths never contain a `..` component
//! - Pattern compilation and matching never panic

#![no_main]

use std::path::{Component, Path};

use libfuzzer_sys::fuzz_target;
use zippy::archive_path::{ancestors, base_name, join_under, to_archive_path};

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };

    let dest = Path::new("/fuzz/dest");
    if let Ok(joined) = join_under(dest, name) {
        assert!(joined.starts_with(dest), "{name:?} escaped to {joined:?}");
        assert!(
            !joined.components().any(|c| c == Component::ParentDir),
            "parent component in {joined:?}"
        );
    }

    let converted = to_archive_path(Path::new(name));
    assert!(!converted.starts_with('/'), "absolute archive name {converted:?}");

    let _ = base_name(name);
    let _ = ancestors(name).count();
    let _ = zippy::matcher::matches(name, name);
});
