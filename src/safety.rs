//! Path validation for extraction.
//!
//! Entry names come from untrusted archives. Before anything is written to
//! disk the entry path is checked so it cannot climb out of the extraction
//! directory.

use std::path::{Component, Path, PathBuf};

use crate::{EntryPath, Error, Result};

/// Joins `entry` onto `dest_root`, rejecting paths that would escape it.
///
/// Rejected components:
/// - `..`
/// - anything that the host platform reads as a root or a drive prefix
///   (`C:`, `\\server`)
/// - on Windows, any component containing `:` (drive letters and
///   alternate data streams)
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use zipcull::EntryPath;
/// use zipcull::safety::resolve_within;
///
/// let dest = Path::new("/tmp/out");
/// let ok = resolve_within(dest, &EntryPath::from("docs/readme.txt")).unwrap();
/// assert_eq!(ok, dest.join("docs").join("readme.txt"));
///
/// let err = resolve_within(dest, &EntryPath::from("../etc/passwd")).unwrap_err();
/// assert!(err.is_security_error());
/// ```
pub fn resolve_within(dest_root: &Path, entry: &EntryPath) -> Result<PathBuf> {
    let traversal = || Error::PathTraversal {
        path: entry.as_str().to_string(),
    };

    if entry.is_root() {
        return Err(traversal());
    }

    let mut full = dest_root.to_path_buf();
    for component in entry.components() {
        if component == ".." || (cfg!(windows) && component.contains(':')) {
            return Err(traversal());
        }
        let mut parts = Path::new(component).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(part)), None) => full.push(part),
            _ => return Err(traversal()),
        }
    }
    Ok(full)
}

/// Verifies that an existing `path` still resolves inside `dest_root`
/// after symlinks are followed.
///
/// # Errors
///
/// Returns [`Error::PathTraversal`] if the canonical path leaves the
/// canonical root, or [`Error::Io`] if either cannot be canonicalized.
pub fn ensure_contained(dest_root: &Path, path: &Path, entry: &EntryPath) -> Result<()> {
    let canonical_dest = dest_root.canonicalize()?;
    let canonical_path = path.canonicalize()?;
    if canonical_path.starts_with(&canonical_dest) {
        Ok(())
    } else {
        Err(Error::PathTraversal {
            path: entry.as_str().to_string(),
        })
    }
}
