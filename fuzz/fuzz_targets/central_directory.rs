//! Fuzz target for central directory parsing, tree building and rewriting.
//!
//! Arbitrary bytes are treated as a ZIP archive. Parsing must either fail
//! with an error or produce a directory that the rewriter can stream
//! without panicking.
//!
//! Run with: cargo +nightly fuzz run central_directory

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use zipcull::format::CentralDirectory;
use zipcull::progress::NoProgress;
use zipcull::rewrite::rewrite_into;
use zipcull::{EntryPath, FlagSnapshot, TreeBuilder};

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = CentralDirectory::read(&mut Cursor::new(data)) else {
        return;
    };

    // Mark every other entry so both the copy and skip paths run
    let snapshot: FlagSnapshot = dir
        .records
        .iter()
        .step_by(2)
        .map(|r| EntryPath::from_raw(&r.name))
        .collect();
    let mut out = Vec::new();
    let _ = rewrite_into(&mut Cursor::new(data), &mut out, &snapshot, &mut NoProgress);

    let _ = TreeBuilder::new().build("fuzz.zip", Cursor::new(data));
});
