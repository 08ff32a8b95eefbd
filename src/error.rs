//! Error types for archive browsing, rewriting and extraction.
//!
//! This module provides the [`Error`] enum which represents every failure the
//! engine reports to its caller, along with a convenient [`Result<T>`] alias.
//! No error is retried internally; the caller decides whether to retry, show
//! a message or abort.
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use zipcull::{Error, Session};
//!
//! fn open(session: &Session, path: &str) -> zipcull::Result<()> {
//!     match session.open(path) {
//!         Ok(tree) => {
//!             println!("{} files", tree.read().unwrap().file_count());
//!             Ok(())
//!         }
//!         Err(Error::ArchiveOpen { path, source }) => {
//!             eprintln!("Cannot open {}: {}", path.display(), source);
//!             Err(Error::ArchiveOpen { path, source })
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

use zip::result::ZipError;

/// The main error type for archive operations.
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Open | [`ArchiveOpen`][Self::ArchiveOpen] | Missing file, not a ZIP container |
/// | Lookup | [`EntryNotFound`][Self::EntryNotFound] | Stale or mistyped entry path |
/// | Extraction | [`Extraction`][Self::Extraction], [`PathTraversal`][Self::PathTraversal] | Scratch space I/O, hostile names |
/// | Rewrite | [`Rewrite`][Self::Rewrite], [`RewriteInProgress`][Self::RewriteInProgress] | Disk full, concurrent apply |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error outside of any more specific operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be opened or its directory could not be parsed.
    ///
    /// The archive on disk is left unchanged.
    #[error("Cannot open archive '{}': {source}", path.display())]
    ArchiveOpen {
        /// The archive that failed to open.
        path: PathBuf,
        /// The underlying container error.
        #[source]
        source: ZipError,
    },

    /// No entry in the archive recovers to the requested path.
    #[error("Entry not found: {path}")]
    EntryNotFound {
        /// The requested entry path.
        path: String,
    },

    /// Streaming an entry into scratch space failed.
    #[error("Cannot extract '{entry}' to '{}': {source}", path.display())]
    Extraction {
        /// The entry being extracted.
        entry: String,
        /// The destination that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Rewriting the archive failed.
    ///
    /// If the failure happened before the replacement was committed, the
    /// original archive is untouched.
    #[error("Cannot rewrite archive '{}': {source}", path.display())]
    Rewrite {
        /// The archive being rewritten.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A rewrite of this archive is already running.
    #[error("A rewrite of '{}' is already in progress", path.display())]
    RewriteInProgress {
        /// The archive with an in-flight rewrite.
        path: PathBuf,
    },

    /// An entry path would escape the extraction directory.
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },
}

impl Error {
    /// Returns `true` if the archive itself could not be opened or parsed.
    pub fn is_archive_open(&self) -> bool {
        matches!(self, Error::ArchiveOpen { .. })
    }

    /// Returns `true` if a requested entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound { .. })
    }

    /// Returns `true` if this error indicates a hostile entry name.
    pub fn is_security_error(&self) -> bool {
        matches!(self, Error::PathTraversal { .. })
    }

    /// Returns the archive path associated with this error, if any.
    pub fn archive_path(&self) -> Option<&std::path::Path> {
        match self {
            Error::ArchiveOpen { path, .. }
            | Error::Rewrite { path, .. }
            | Error::RewriteInProgress { path } => Some(path.as_path()),
            _ => None,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: impl Into<ZipError>) -> Self {
        Error::ArchiveOpen {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn rewrite(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        Error::Rewrite {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_archive_open_display() {
        let err = Error::open("/tmp/broken.zip", ZipError::InvalidArchive("bad"));
        assert!(err.is_archive_open());
        assert!(err.to_string().contains("/tmp/broken.zip"));
        assert_eq!(
            err.archive_path(),
            Some(std::path::Path::new("/tmp/broken.zip"))
        );
    }

    #[test]
    fn test_entry_not_found() {
        let err = Error::EntryNotFound {
            path: "docs/missing.txt".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entry not found: docs/missing.txt");
        assert!(err.archive_path().is_none());
    }

    #[test]
    fn test_rewrite_keeps_source() {
        use std::error::Error as _;

        let err = Error::rewrite(
            "a.zip",
            io::Error::new(io::ErrorKind::StorageFull, "disk full"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_path_traversal_is_security_error() {
        let err = Error::PathTraversal {
            path: "../etc/passwd".into(),
        };
        assert!(err.is_security_error());
        assert!(!err.is_not_found());
    }
}
