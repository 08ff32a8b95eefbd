//! Building an [`ArchiveTree`] from an archive's entry list.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::{ArchiveTree, NodeId, NodeKind};
use crate::{DeletionFlags, EntryPath, Error, Result, Timestamp};

/// Builds directory trees from ZIP archives.
///
/// Entries are visited in stored order. Directory entries (raw name ending
/// in `/`) create their directory and every missing ancestor; file entries
/// create their parent chain and attach a file node to it.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    _private: (),
}

impl TreeBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the archive at `path` and builds its tree.
    ///
    /// The archive handle is closed before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the file cannot be opened or is not
    /// a readable ZIP archive.
    pub fn build_path(&self, path: impl AsRef<Path>) -> Result<ArchiveTree> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        self.build(path, BufReader::new(file))
    }

    /// Builds the tree of the archive readable through `reader`.
    ///
    /// `archive` is recorded in the tree as its identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the central directory or an entry
    /// header cannot be parsed.
    pub fn build<R: Read + Seek>(
        &self,
        archive: impl Into<PathBuf>,
        reader: R,
    ) -> Result<ArchiveTree> {
        let archive = archive.into();
        let mut zip = ZipArchive::new(reader).map_err(|e| Error::open(&archive, e))?;
        let mut tree = ArchiveTree::new(archive.clone());

        for index in 0..zip.len() {
            let entry = zip.by_index_raw(index).map_err(|e| Error::open(&archive, e))?;
            let path = EntryPath::from_raw(entry.name_raw());

            if path.is_root() {
                log::debug!(
                    "entry {} of {} maps to the archive root, ignoring",
                    index,
                    archive.display()
                );
                continue;
            }
            if path.is_dir() {
                tree.ensure_dir(&path);
                continue;
            }

            let (parent_path, name) = path.split();
            let parent = tree.ensure_dir(&parent_path);
            let kind = NodeKind::File {
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                modified: Timestamp::from(entry.last_modified()),
                compression: entry.compression(),
            };
            tree.add_file(parent, name, kind);
        }

        log::debug!(
            "built tree for {}: {} files, {} directories",
            archive.display(),
            tree.file_count(),
            tree.dir_count()
        );
        Ok(tree)
    }

    /// Seeds node flags from the store.
    ///
    /// Called after a rebuild so marks made on an older tree of the same
    /// archive carry over to the new one.
    pub fn apply_flags(tree: &mut ArchiveTree, flags: &DeletionFlags, archive: &Path) {
        tree.load_flags(flags, archive);
        let marked = tree.walk(NodeId::ROOT).filter(|(_, n)| n.is_marked()).count();
        if marked > 0 {
            log::debug!("restored {} marks on {}", marked, archive.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::CompressionMethod;
    use zip::write::{FileOptions, ZipWriter};

    fn zip_of(names: &[&str]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for name in names {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(name.as_bytes()).unwrap();
            }
        }
        Cursor::new(writer.finish().unwrap().into_inner())
    }

    #[test]
    fn test_build_synthesizes_directories() {
        let tree = TreeBuilder::new()
            .build("t.zip", zip_of(&["a/b/c.txt", "a/d.txt", "e.txt"]))
            .unwrap();

        let a = tree.find(&EntryPath::from("a/")).unwrap();
        let ab = tree.find(&EntryPath::from("a/b/")).unwrap();
        assert_eq!(tree.node(ab).parent(), Some(a));
        assert!(tree.find(&EntryPath::from("a/b/c.txt")).is_some());
        assert_eq!(tree.node(NodeId::ROOT).files().len(), 1);
        assert_eq!(tree.dir_count(), 2);
        assert_eq!(tree.file_count(), 3);
    }

    #[test]
    fn test_build_explicit_empty_directory() {
        let tree = TreeBuilder::new()
            .build("t.zip", zip_of(&["empty/", "x/y/"]))
            .unwrap();
        assert_eq!(tree.dir_count(), 3);
        assert_eq!(tree.file_count(), 0);
        assert!(tree.find(&EntryPath::from("x/")).is_some());
    }

    #[test]
    fn test_build_keeps_stored_order() {
        let tree = TreeBuilder::new()
            .build("t.zip", zip_of(&["z.txt", "b/", "a.txt", "a/"]))
            .unwrap();
        let root = tree.root();
        let files: Vec<_> = root.files().iter().map(|id| tree.node(*id).name()).collect();
        let dirs: Vec<_> = root.children().iter().map(|id| tree.node(*id).name()).collect();
        assert_eq!(files, vec!["z.txt", "a.txt"]);
        assert_eq!(dirs, vec!["b", "a"]);
    }

    #[test]
    fn test_build_current_dir_prefix_maps_to_root() {
        let tree = TreeBuilder::new()
            .build("t.zip", zip_of(&["./top.txt"]))
            .unwrap();
        assert_eq!(tree.root().files().len(), 1);
        assert_eq!(tree.dir_count(), 0);
    }

    #[test]
    fn test_build_file_metadata() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let when = zip::DateTime::from_date_and_time(2022, 5, 6, 7, 8, 10).unwrap();
        writer
            .start_file(
                "data.bin",
                FileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .last_modified_time(when),
            )
            .unwrap();
        writer.write_all(&[0u8; 1000]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let tree = TreeBuilder::new().build("t.zip", Cursor::new(bytes)).unwrap();
        let id = tree.find(&EntryPath::from("data.bin")).unwrap();
        match tree.node(id).kind() {
            NodeKind::File {
                size,
                compressed_size,
                modified,
                compression,
            } => {
                assert_eq!(*size, 1000);
                assert!(*compressed_size < 1000);
                assert_eq!(*modified, Timestamp::new(2022, 5, 6, 7, 8, 10));
                assert_eq!(*compression, CompressionMethod::Deflated);
            }
            other => panic!("expected a file, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_garbage() {
        let err = TreeBuilder::new()
            .build("junk.zip", Cursor::new(b"definitely not a zip".to_vec()))
            .unwrap_err();
        assert!(err.is_archive_open());
        assert_eq!(err.archive_path(), Some(Path::new("junk.zip")));
    }

    #[test]
    fn test_build_path_missing_file() {
        let err = TreeBuilder::new()
            .build_path("/nonexistent/dir/archive.zip")
            .unwrap_err();
        assert!(err.is_archive_open());
    }

    #[test]
    fn test_apply_flags_restores_marks() {
        let flags = DeletionFlags::new();
        let archive = Path::new("t.zip");
        flags.set(archive, EntryPath::from("a/d.txt"), true);

        let mut tree = TreeBuilder::new()
            .build(archive, zip_of(&["a/b/c.txt", "a/d.txt"]))
            .unwrap();
        TreeBuilder::apply_flags(&mut tree, &flags, archive);

        let d = tree.find(&EntryPath::from("a/d.txt")).unwrap();
        let c = tree.find(&EntryPath::from("a/b/c.txt")).unwrap();
        assert!(tree.node(d).is_marked());
        assert!(!tree.node(c).is_marked());
    }
}
