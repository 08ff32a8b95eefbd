//! Fuzz target for name recovery and entry path canonicalization.
//!
//! Run with: cargo +nightly fuzz run entry_name

#![no_main]

use libfuzzer_sys::fuzz_target;
use zipcull::EntryPath;
use zipcull::encoding;

fuzz_target!(|data: &[u8]| {
    let text = encoding::recover(data);
    assert_eq!(text, encoding::recover(data));

    let path = EntryPath::from_raw(data);
    // Canonical paths re-parse to themselves
    assert_eq!(EntryPath::from(path.as_str()), path);
    let _ = path.ancestors();
    let _ = path.split();
});
