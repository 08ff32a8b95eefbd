//! A bounded cache of built trees, keyed by archive path.
//!
//! A cached tree stays valid while the archive's modification time on disk
//! equals the one observed when the tree was built. Any other value (older
//! or newer) makes the entry stale and triggers a rebuild.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use filetime::FileTime;
use lru::LruCache;

use crate::{ArchiveTree, Error, Result, TreeBuilder};

/// Default number of trees kept by a [`TreeCache`].
pub const DEFAULT_CAPACITY: usize = 16;

/// A tree shared between the cache and its readers.
pub type SharedTree = Arc<RwLock<ArchiveTree>>;

/// Produces a tree for an archive path on a cache miss.
pub trait TreeLoader: Send + Sync {
    /// Builds the tree of `archive`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the archive cannot be read.
    fn load(&self, archive: &Path) -> Result<ArchiveTree>;
}

/// The default loader: opens the archive and runs a [`TreeBuilder`].
#[derive(Debug, Clone, Default)]
pub struct ZipTreeLoader {
    builder: TreeBuilder,
}

impl TreeLoader for ZipTreeLoader {
    fn load(&self, archive: &Path) -> Result<ArchiveTree> {
        self.builder.build_path(archive)
    }
}

impl<F> TreeLoader for F
where
    F: Fn(&Path) -> Result<ArchiveTree> + Send + Sync,
{
    fn load(&self, archive: &Path) -> Result<ArchiveTree> {
        self(archive)
    }
}

/// A cache entry: the tree and the modification time it was built from.
#[derive(Debug, Clone)]
pub struct CachedTree {
    /// The shared tree.
    pub tree: SharedTree,
    /// The archive's modification time when the tree was built.
    pub modified: FileTime,
}

/// LRU cache of archive trees.
pub struct TreeCache<L = ZipTreeLoader> {
    loader: L,
    entries: LruCache<PathBuf, CachedTree>,
}

impl TreeCache<ZipTreeLoader> {
    /// Creates a cache holding at most `capacity` trees (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self::with_loader(ZipTreeLoader::default(), capacity)
    }
}

impl Default for TreeCache<ZipTreeLoader> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<L: TreeLoader> TreeCache<L> {
    /// Creates a cache that builds trees with `loader`.
    pub fn with_loader(loader: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            loader,
            entries: LruCache::new(capacity),
        }
    }

    /// Returns the loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the tree of `archive`, building it if absent or stale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the archive's metadata cannot be
    /// read or the loader fails. A failed build leaves any previous entry
    /// untouched.
    pub fn get_or_build(&mut self, archive: &Path) -> Result<SharedTree> {
        self.get_or_build_with(archive, |_| {})
    }

    /// Like [`get_or_build`](Self::get_or_build), running `prepare` on a
    /// freshly built tree before it is cached.
    pub fn get_or_build_with<F>(&mut self, archive: &Path, prepare: F) -> Result<SharedTree>
    where
        F: FnOnce(&mut ArchiveTree),
    {
        let modified = modification_time(archive)?;
        let key = archive.to_path_buf();

        if let Some(cached) = self.entries.get(&key) {
            if cached.modified == modified {
                log::debug!("tree cache hit for {}", archive.display());
                return Ok(Arc::clone(&cached.tree));
            }
            log::debug!("tree cache entry for {} is stale", archive.display());
        }

        let mut tree = self.loader.load(archive)?;
        prepare(&mut tree);
        let tree = Arc::new(RwLock::new(tree));
        self.entries.put(
            key,
            CachedTree {
                tree: Arc::clone(&tree),
                modified,
            },
        );
        Ok(tree)
    }

    /// Drops the entry for `archive`, returning whether there was one.
    pub fn invalidate(&mut self, archive: &Path) -> bool {
        self.entries.pop(&archive.to_path_buf()).is_some()
    }

    /// Returns `true` if `archive` has an entry, stale or not.
    pub fn contains(&self, archive: &Path) -> bool {
        self.entries.contains(&archive.to_path_buf())
    }

    /// Returns the number of cached trees.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of cached trees.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<L> fmt::Debug for TreeCache<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .finish_non_exhaustive()
    }
}

fn modification_time(archive: &Path) -> Result<FileTime> {
    let metadata = std::fs::metadata(archive).map_err(|e| Error::open(archive, e))?;
    Ok(FileTime::from_last_modification_time(&metadata))
}
