//! Fuzz target for ArchiveReader::open with arbitrary byte input.
//!
//! Exercises end-of-central-directory scanning, central directory parsing,
//! local header lookup and entry decoding with malformed input. The goal is
//! to find panics, hangs, or unbounded allocations.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use zippy::read::ArchiveReader;

fuzz_target!(|data: &[u8]| {
    let Ok(mut archive) = ArchiveReader::open(Cursor::new(data)) else {
        return;
    };

    for entry in archive.entries().to_vec() {
        let _ = entry.is_encrypted();
        let _ = entry.compression_ratio();
        if archive.data_range(&entry).is_ok() {
            // decoding is capped at the recorded size plus one byte
            let _ = archive.read_entry(&entry);
        }
    }
});
