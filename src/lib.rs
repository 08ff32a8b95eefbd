//! # zipcull
//!
//! Browse ZIP archives as a directory tree, mark entries for deletion and
//! rewrite the archive without them.
//!
//! Entry names in real-world ZIP files are frequently not UTF-8: archives
//! made on Japanese, Chinese or Korean systems carry Shift-JIS, GBK or Big5
//! names with no flag saying so. This crate recovers a Unicode path for
//! every entry, builds a hierarchical tree out of the flat entry list
//! (synthesizing directories the archive never stored), tracks
//! "marked for deletion" flags per entry, and produces a new archive that
//! omits the marked entries. Kept entries are copied byte for byte: no
//! recompression, and the original name bytes are preserved.
//!
//! ## Quick Start
//!
//! ### Browsing an Archive
//!
//! ```rust,no_run
//! use zipcull::{NodeId, Session};
//!
//! fn main() -> zipcull::Result<()> {
//!     let session = Session::new();
//!     let tree = session.open("legacy.zip")?;
//!     let tree = tree.read().unwrap();
//!
//!     for (_, node) in tree.walk(NodeId::ROOT) {
//!         println!("{} {:?}", node.path(), node.size());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Deleting Entries
//!
//! ```rust,no_run
//! use zipcull::{EntryPath, Session};
//!
//! fn main() -> zipcull::Result<()> {
//!     let session = Session::new();
//!     session.set_marked_recursively("legacy.zip", &EntryPath::from("thumbs/"), true)?;
//!     session.set_marked("legacy.zip", &EntryPath::from("Thumbs.db"), true)?;
//!
//!     let result = session.apply_deletions("legacy.zip")?;
//!     println!(
//!         "kept {} entries, removed {} ({} bytes)",
//!         result.entries_kept, result.entries_deleted, result.bytes_deleted
//!     );
//!     Ok(())
//! }
//! ```
//!
//! The archive is only replaced once the new file has been completely
//! written and synced. Any error before that point leaves the original
//! untouched.
//!
//! ### Extracting a Single Entry
//!
//! ```rust,no_run
//! use zipcull::{EntryPath, Session};
//!
//! fn main() -> zipcull::Result<()> {
//!     let session = Session::new();
//!     let path = session.extract("legacy.zip", &EntryPath::from("docs/manual.pdf"))?;
//!     println!("extracted to {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level API
//!
//! [`Session`] is a thin layer over independent parts that can be used on
//! their own:
//!
//! - [`encoding::recover`] turns raw name bytes into Unicode
//! - [`TreeBuilder`] builds an [`ArchiveTree`]
//! - [`DeletionFlags`] stores flags and hands out [`FlagSnapshot`]s
//! - [`ArchiveRewriter`] and [`rewrite::rewrite_into`] rewrite archives
//! - [`TreeCache`] caches trees by archive path and modification time
//! - [`extract_entry`] extracts one entry into scratch space
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cli` | Builds the `zipcull` command-line tool |
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires Rust 1.85 or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod encoding;
pub mod entry_path;
pub mod error;
pub mod extract;
pub mod flags;
pub mod format;
pub mod progress;
pub mod rewrite;
pub mod safety;
pub mod session;
pub mod timestamp;
pub mod tree;

pub use entry_path::EntryPath;
pub use error::{Error, Result};
pub use timestamp::Timestamp;

// Re-export tree API
pub use tree::{ArchiveTree, NodeId, NodeKind, TreeBuilder, TreeNode, Walk};

// Re-export flag store
pub use flags::{DeletionFlags, FlagSnapshot};

// Re-export cache API
pub use cache::{SharedTree, TreeCache, TreeLoader, ZipTreeLoader};

// Re-export rewrite and extraction API
pub use extract::{ExtractOptions, extract_entry};
pub use rewrite::{ArchiveRewriter, RewriteOptions, RewriteResult, apply_deletions};

// Re-export progress API
pub use progress::{AtomicProgress, NoProgress, ProgressReporter, progress_fn};

pub use session::{Session, SessionOptions};
