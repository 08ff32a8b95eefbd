//! The directory tree of an archive.
//!
//! An archive stores a flat list of entries; [`ArchiveTree`] arranges them
//! into directories and files. Nodes live in an arena and refer to each other
//! by [`NodeId`], so parent links never own anything and the whole tree is
//! dropped at once.
//!
//! Each directory keeps two ordered lists: `children` (subdirectories) and
//! `files`. Both keep the order in which the builder first encountered the
//! entries; sorting for display is left to the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use zipcull::{EntryPath, TreeBuilder};
//!
//! let tree = TreeBuilder::new().build_path("photos.zip")?;
//! for id in tree.root().children() {
//!     let dir = tree.node(*id);
//!     println!("{}/ ({} files)", dir.name(), dir.files().len());
//! }
//! if let Some(id) = tree.find(&EntryPath::from("raw/img_001.cr2")) {
//!     println!("{:?}", tree.node(id).size());
//! }
//! # Ok::<(), zipcull::Error>(())
//! ```

mod builder;

pub use builder::TreeBuilder;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{DeletionFlags, EntryPath, Timestamp};

/// Index of a node inside an [`ArchiveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node represents.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A directory, explicit in the archive or synthesized from a path prefix.
    Directory,
    /// A file entry with its archive metadata.
    File {
        /// Uncompressed size in bytes.
        size: u64,
        /// Stored (compressed) size in bytes.
        compressed_size: u64,
        /// Modification time as stored in the archive.
        modified: Timestamp,
        /// Compression method of the stored data.
        compression: zip::CompressionMethod,
    },
}

/// One directory or file in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    name: String,
    path: EntryPath,
    kind: NodeKind,
    marked: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    files: Vec<NodeId>,
}

impl TreeNode {
    fn new(name: &str, path: EntryPath, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind,
            marked: false,
            parent,
            children: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Returns the last path component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full path from the archive root.
    pub fn path(&self) -> &EntryPath {
        &self.path
    }

    /// Returns the node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` for directories (the root included).
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Returns the uncompressed size for files.
    pub fn size(&self) -> Option<u64> {
        match self.kind {
            NodeKind::File { size, .. } => Some(size),
            NodeKind::Directory => None,
        }
    }

    /// Returns the stored modification time for files.
    pub fn modified(&self) -> Option<Timestamp> {
        match self.kind {
            NodeKind::File { modified, .. } => Some(modified),
            NodeKind::Directory => None,
        }
    }

    /// Returns the marked-for-deletion flag.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Returns the owning directory; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the subdirectories in first-encounter order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the files in first-encounter order.
    pub fn files(&self) -> &[NodeId] {
        &self.files
    }
}

/// The directory tree of one archive.
#[derive(Debug, Clone)]
pub struct ArchiveTree {
    archive: PathBuf,
    nodes: Vec<TreeNode>,
    dirs: HashMap<EntryPath, NodeId>,
}

impl ArchiveTree {
    /// Creates a tree holding only the root.
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        let root = TreeNode::new("", EntryPath::root(), NodeKind::Directory, None);
        let mut dirs = HashMap::new();
        dirs.insert(EntryPath::root(), NodeId::ROOT);
        Self {
            archive: archive.into(),
            nodes: vec![root],
            dirs,
        }
    }

    /// Returns the archive this tree was built from.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Returns the root node.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Returns a node, or `None` for a foreign id.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Returns the number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Looks up a node by path.
    ///
    /// Directories are found through the directory map, files by scanning
    /// their parent's file list. A path without a trailing separator that
    /// names a directory is found as well.
    pub fn find(&self, path: &EntryPath) -> Option<NodeId> {
        if let Some(id) = self.dirs.get(path) {
            return Some(*id);
        }
        if path.is_dir() {
            return None;
        }
        let parent = self.dirs.get(&path.parent())?;
        self.nodes[parent.0]
            .files
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].path == *path)
            .or_else(|| self.dirs.get(&path.as_dir()).copied())
    }

    /// Iterates over `id` and all of its descendants in pre-order.
    ///
    /// A directory is followed by its files, then by each subdirectory's
    /// walk.
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![id],
        }
    }

    /// Returns the number of file nodes.
    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_dir()).count()
    }

    /// Returns the number of directory nodes, the root excluded.
    pub fn dir_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_dir()).count() - 1
    }

    /// Returns the sum of uncompressed file sizes.
    pub fn total_size(&self) -> u64 {
        self.nodes.iter().filter_map(TreeNode::size).sum()
    }

    /// Returns the paths of all marked nodes in pre-order.
    pub fn marked_paths(&self) -> Vec<EntryPath> {
        self.walk(NodeId::ROOT)
            .filter(|(_, node)| node.marked)
            .map(|(_, node)| node.path.clone())
            .collect()
    }

    /// Sets the flag of one node only.
    ///
    /// Ancestors keep whatever flag they had.
    pub fn set_marked(&mut self, id: NodeId, flag: bool, flags: &DeletionFlags, archive: &Path) {
        let node = &mut self.nodes[id.0];
        node.marked = flag;
        flags.set(archive, node.path.clone(), flag);
    }

    /// Sets the flag of a node and of every descendant, pre-order.
    ///
    /// A directory's flag records the last bulk action on it and is not
    /// recomputed when a descendant is later toggled on its own; use
    /// [`is_fully_marked`](Self::is_fully_marked) for a live answer.
    pub fn set_marked_recursively(
        &mut self,
        id: NodeId,
        flag: bool,
        flags: &DeletionFlags,
        archive: &Path,
    ) {
        let ids: Vec<NodeId> = self.walk(id).map(|(id, _)| id).collect();
        let mut paths = Vec::with_capacity(ids.len());
        for id in ids {
            let node = &mut self.nodes[id.0];
            node.marked = flag;
            paths.push(node.path.clone());
        }
        flags.set_all(archive, paths, flag);
    }

    /// Returns `true` if every descendant of `id` is marked.
    ///
    /// A node without descendants reports its own flag.
    pub fn is_fully_marked(&self, id: NodeId) -> bool {
        let mut descendants = self.walk(id).skip(1).peekable();
        if descendants.peek().is_none() {
            return self.nodes[id.0].marked;
        }
        descendants.all(|(_, node)| node.marked)
    }

    /// Re-seeds every node's flag from the store.
    pub(crate) fn load_flags(&mut self, flags: &DeletionFlags, archive: &Path) {
        let snapshot = flags.snapshot(archive);
        for node in &mut self.nodes {
            node.marked = snapshot.contains(&node.path);
        }
    }

    /// Returns the directory node for `path`, creating it and any missing
    /// ancestors.
    pub(crate) fn ensure_dir(&mut self, path: &EntryPath) -> NodeId {
        if let Some(id) = self.dirs.get(path) {
            return *id;
        }
        let (parent_path, name) = path.split();
        let parent = self.ensure_dir(&parent_path);
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::new(name, path.clone(), NodeKind::Directory, Some(parent)));
        self.nodes[parent.0].children.push(id);
        self.dirs.insert(path.clone(), id);
        id
    }

    /// Attaches a file node to `parent`.
    pub(crate) fn add_file(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        let path = self.nodes[parent.0].path.child_file(name);
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::new(name, path, kind, Some(parent)));
        self.nodes[parent.0].files.push(id);
        id
    }
}

/// Pre-order iterator returned by [`ArchiveTree::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    tree: &'a ArchiveTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id)?;
        self.stack.extend(node.children.iter().rev());
        self.stack.extend(node.files.iter().rev());
        Some((id, node))
    }
}
