//! The deletion flag store.
//!
//! Flags are keyed by archive identity (its path) and entry path. An absent
//! key means "not marked". The store is an explicit object owned by a
//! [`Session`](crate::Session) and synchronized internally, so a foreground
//! thread can keep editing flags while a background rewrite works from a
//! [`FlagSnapshot`] taken when it started.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::EntryPath;

type FlagMap = HashMap<PathBuf, HashMap<EntryPath, bool>>;

/// Per-archive, per-entry "marked for deletion" flags.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use zipcull::{DeletionFlags, EntryPath};
///
/// let flags = DeletionFlags::new();
/// let archive = Path::new("/data/photos.zip");
/// flags.set(archive, EntryPath::from("raw/img_001.cr2"), true);
///
/// assert!(flags.get(archive, &EntryPath::from("raw/img_001.cr2")));
/// assert!(!flags.get(archive, &EntryPath::from("raw/img_002.cr2")));
/// assert_eq!(flags.marked_count(archive), 1);
/// ```
#[derive(Debug, Default)]
pub struct DeletionFlags {
    inner: Mutex<FlagMap>,
}

impl DeletionFlags {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FlagMap> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("deletion flag store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Returns the flag for `path` in `archive` (`false` when never set).
    pub fn get(&self, archive: &Path, path: &EntryPath) -> bool {
        self.lock()
            .get(archive)
            .and_then(|entries| entries.get(path))
            .copied()
            .unwrap_or(false)
    }

    /// Records the flag for one entry.
    pub fn set(&self, archive: &Path, path: EntryPath, flag: bool) {
        self.lock()
            .entry(archive.to_path_buf())
            .or_default()
            .insert(path, flag);
    }

    /// Records the same flag for many entries under a single lock.
    pub fn set_all<I>(&self, archive: &Path, paths: I, flag: bool)
    where
        I: IntoIterator<Item = EntryPath>,
    {
        let mut map = self.lock();
        let entries = map.entry(archive.to_path_buf()).or_default();
        for path in paths {
            entries.insert(path, flag);
        }
    }

    /// Takes an immutable copy of the marked paths of one archive.
    pub fn snapshot(&self, archive: &Path) -> FlagSnapshot {
        let marked = self
            .lock()
            .get(archive)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, flag)| **flag)
                    .map(|(path, _)| path.clone())
                    .collect()
            })
            .unwrap_or_default();
        FlagSnapshot { marked }
    }

    /// Returns how many entries of `archive` are currently marked.
    pub fn marked_count(&self, archive: &Path) -> usize {
        self.lock()
            .get(archive)
            .map(|entries| entries.values().filter(|flag| **flag).count())
            .unwrap_or(0)
    }

    /// Drops every flag recorded for `archive`, returning how many there were.
    pub fn evict(&self, archive: &Path) -> usize {
        let removed = self
            .lock()
            .remove(archive)
            .map(|entries| entries.len())
            .unwrap_or(0);
        if removed > 0 {
            log::debug!("evicted {} flags for {}", removed, archive.display());
        }
        removed
    }

    /// Drops the flags of the given paths only, returning how many were
    /// recorded.
    ///
    /// Flags set on other paths of the archive survive.
    pub fn evict_paths<'a, I>(&self, archive: &Path, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a EntryPath>,
    {
        let mut map = self.lock();
        let Some(entries) = map.get_mut(archive) else {
            return 0;
        };
        let removed = paths
            .into_iter()
            .filter(|path| entries.remove(*path).is_some())
            .count();
        if entries.is_empty() {
            map.remove(archive);
        }
        if removed > 0 {
            log::debug!("evicted {} flags for {}", removed, archive.display());
        }
        removed
    }

    /// Drops all flags of all archives.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns the archives that currently have recorded flags.
    pub fn archives(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }
}

/// An immutable set of marked entry paths taken from [`DeletionFlags`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSnapshot {
    marked: HashSet<EntryPath>,
}

impl FlagSnapshot {
    /// Returns `true` if `path` was marked when the snapshot was taken.
    pub fn contains(&self, path: &EntryPath) -> bool {
        self.marked.contains(path)
    }

    /// Returns the number of marked paths.
    pub fn len(&self) -> usize {
        self.marked.len()
    }

    /// Returns `true` if nothing was marked.
    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    /// Iterates over the marked paths in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryPath> {
        self.marked.iter()
    }
}

impl FromIterator<EntryPath> for FlagSnapshot {
    fn from_iter<I: IntoIterator<Item = EntryPath>>(iter: I) -> Self {
        Self {
            marked: iter.into_iter().collect(),
        }
    }
}
