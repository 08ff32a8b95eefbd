//! The caller-facing entry point.
//!
//! A [`Session`] ties the tree cache, the deletion flag store and the
//! rewriter together behind a small set of path-based operations. Front ends
//! hold one session for as long as they browse archives; dropping it drops
//! every cached tree and every recorded flag.
//!
//! # Example
//!
//! ```rust,no_run
//! use zipcull::{EntryPath, Session};
//!
//! let session = Session::new();
//! let tree = session.open("backup.zip")?;
//! println!("{} files", tree.read().unwrap().file_count());
//!
//! session.set_marked_recursively("backup.zip", &EntryPath::from("node_modules/"), true)?;
//! let result = session.apply_deletions("backup.zip")?;
//! println!("removed {} entries", result.entries_deleted);
//! # Ok::<(), zipcull::Error>(())
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};

use crate::cache::{DEFAULT_CAPACITY, SharedTree, TreeCache};
use crate::progress::{NoProgress, ProgressReporter};
use crate::{
    ArchiveRewriter, ArchiveTree, DeletionFlags, EntryPath, Error, ExtractOptions, Result,
    RewriteOptions, RewriteResult, TreeBuilder, extract_entry,
};

/// Options for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum number of trees kept in memory.
    pub cache_capacity: usize,
    /// Options used by [`Session::apply_deletions`].
    pub rewrite: RewriteOptions,
    /// Options used by [`Session::extract`].
    pub extract: ExtractOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            rewrite: RewriteOptions::default(),
            extract: ExtractOptions::default(),
        }
    }
}

impl SessionOptions {
    /// Creates new session options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tree cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the rewrite options.
    pub fn rewrite(mut self, options: RewriteOptions) -> Self {
        self.rewrite = options;
        self
    }

    /// Sets the extraction options.
    pub fn extract(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }
}

/// Browsing state for any number of archives.
///
/// All methods take `&self`; the session synchronizes internally and can be
/// shared across threads behind an [`Arc`]. Archives are identified by their
/// canonical path, so `./a.zip` and `a.zip` refer to the same archive.
#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    cache: Mutex<TreeCache>,
    flags: DeletionFlags,
    rewriting: Mutex<HashSet<PathBuf>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_options(SessionOptions::default())
    }
}

impl Session {
    /// Creates a session with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with the given options.
    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            cache: Mutex::new(TreeCache::new(options.cache_capacity)),
            options,
            flags: DeletionFlags::new(),
            rewriting: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the flag store.
    pub fn flags(&self) -> &DeletionFlags {
        &self.flags
    }

    /// Returns the identity under which `path` is tracked.
    ///
    /// This is the canonical path when the file exists, and `path` itself
    /// otherwise.
    pub fn identity(path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Returns the tree of an archive, building it if absent or stale.
    ///
    /// A rebuilt tree has its flags restored from the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the archive cannot be read.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<SharedTree> {
        let archive = Self::identity(path);
        let flags = &self.flags;
        self.lock_cache().get_or_build_with(&archive, |tree| {
            TreeBuilder::apply_flags(tree, flags, &archive);
        })
    }

    /// Sets the flag of a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the archive cannot be read, or
    /// [`Error::EntryNotFound`] if the tree has no node at `entry`.
    pub fn set_marked(&self, path: impl AsRef<Path>, entry: &EntryPath, flag: bool) -> Result<()> {
        let archive = Self::identity(path);
        self.with_node(&archive, entry, |tree, id| {
            tree.set_marked(id, flag, &self.flags, &archive);
        })
    }

    /// Sets the flag of an entry and of everything below it.
    ///
    /// # Errors
    ///
    /// Same as [`set_marked`](Self::set_marked).
    pub fn set_marked_recursively(
        &self,
        path: impl AsRef<Path>,
        entry: &EntryPath,
        flag: bool,
    ) -> Result<()> {
        let archive = Self::identity(path);
        self.with_node(&archive, entry, |tree, id| {
            tree.set_marked_recursively(id, flag, &self.flags, &archive);
        })
    }

    /// Returns the recorded flag of an entry.
    pub fn is_marked(&self, path: impl AsRef<Path>, entry: &EntryPath) -> bool {
        self.flags.get(&Self::identity(path), entry)
    }

    /// Returns how many entries of the archive are marked.
    pub fn marked_count(&self, path: impl AsRef<Path>) -> usize {
        self.flags.marked_count(&Self::identity(path))
    }

    /// Returns `true` while a rewrite of the archive is running.
    pub fn is_rewriting(&self, path: impl AsRef<Path>) -> bool {
        self.lock_rewriting().contains(&Self::identity(path))
    }

    /// Rewrites the archive without its marked entries.
    ///
    /// The rewrite works from a snapshot of the flags taken when it starts;
    /// flags may keep changing meanwhile. On success the flags in that
    /// snapshot and the cached tree are dropped; marks set while the rewrite
    /// ran are kept and re-applied when the archive is reopened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RewriteInProgress`] if a rewrite of the same archive
    /// is already running, and otherwise whatever
    /// [`ArchiveRewriter::apply`] returns.
    pub fn apply_deletions(&self, path: impl AsRef<Path>) -> Result<RewriteResult> {
        self.apply_deletions_with_progress(path, NoProgress)
    }

    /// Like [`apply_deletions`](Self::apply_deletions), reporting progress.
    pub fn apply_deletions_with_progress(
        &self,
        path: impl AsRef<Path>,
        progress: impl ProgressReporter,
    ) -> Result<RewriteResult> {
        let archive = Self::identity(path);
        let _guard = RewriteGuard::acquire(&self.rewriting, &archive)?;

        let snapshot = self.flags.snapshot(&archive);
        let result = ArchiveRewriter::new(&archive)
            .with_options(self.options.rewrite.clone())
            .with_progress(progress)
            .apply(&snapshot)?;

        if !result.is_noop() {
            self.flags.evict_paths(&archive, snapshot.iter());
            self.lock_cache().invalidate(&archive);
        }
        Ok(result)
    }

    /// Runs [`apply_deletions`](Self::apply_deletions) on a background
    /// thread.
    ///
    /// The rewrite cannot be cancelled; join the handle to learn its
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the thread cannot be spawned.
    pub fn spawn_apply_deletions(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
    ) -> Result<JoinHandle<Result<RewriteResult>>> {
        self.spawn_apply_deletions_with_progress(path, NoProgress)
    }

    /// Like [`spawn_apply_deletions`](Self::spawn_apply_deletions), reporting
    /// progress from the background thread.
    pub fn spawn_apply_deletions_with_progress<P>(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
        progress: P,
    ) -> Result<JoinHandle<Result<RewriteResult>>>
    where
        P: ProgressReporter + 'static,
    {
        let session = Arc::clone(self);
        let path = path.into();
        let handle = thread::Builder::new()
            .name("zipcull-rewrite".into())
            .spawn(move || session.apply_deletions_with_progress(&path, progress))?;
        Ok(handle)
    }

    /// Extracts one file entry into a fresh scratch directory.
    ///
    /// See [`extract_entry`] for the details; the scratch directory belongs
    /// to the caller.
    pub fn extract(&self, path: impl AsRef<Path>, entry: &EntryPath) -> Result<PathBuf> {
        extract_entry(&Self::identity(path), entry, &self.options.extract)
    }

    /// Forgets an archive: drops its flags and its cached tree.
    pub fn close(&self, path: impl AsRef<Path>) {
        let archive = Self::identity(path);
        self.flags.evict(&archive);
        if self.lock_cache().invalidate(&archive) {
            log::debug!("closed {}", archive.display());
        }
    }

    fn with_node<F>(&self, archive: &Path, entry: &EntryPath, f: F) -> Result<()>
    where
        F: FnOnce(&mut ArchiveTree, crate::NodeId),
    {
        let shared = self.open(archive)?;
        let mut tree = write_tree(&shared);
        let id = tree.find(entry).ok_or_else(|| Error::EntryNotFound {
            path: entry.as_str().to_string(),
        })?;
        f(&mut *tree, id);
        Ok(())
    }

    fn lock_cache(&self) -> MutexGuard<'_, TreeCache> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            log::warn!("tree cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_rewriting(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.rewriting.lock().unwrap_or_else(|poisoned| {
            log::warn!("rewrite registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn write_tree(tree: &SharedTree) -> RwLockWriteGuard<'_, ArchiveTree> {
    tree.write().unwrap_or_else(|poisoned| {
        log::warn!("tree lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Registers an in-flight rewrite and unregisters it on drop.
struct RewriteGuard<'a> {
    registry: &'a Mutex<HashSet<PathBuf>>,
    archive: PathBuf,
}

impl<'a> RewriteGuard<'a> {
    fn acquire(registry: &'a Mutex<HashSet<PathBuf>>, archive: &Path) -> Result<Self> {
        let mut running = registry.lock().unwrap_or_else(|p| p.into_inner());
        if !running.insert(archive.to_path_buf()) {
            return Err(Error::RewriteInProgress {
                path: archive.to_path_buf(),
            });
        }
        Ok(Self {
            registry,
            archive: archive.to_path_buf(),
        })
    }
}

impl Drop for RewriteGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.archive);
    }
}
