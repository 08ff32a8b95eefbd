//! Canonical entry paths inside an archive.
//!
//! An [`EntryPath`] identifies one location in the archive's virtual
//! hierarchy. The rules are shared by tree building, flag lookups, the
//! rewriter and the extractor, so every component agrees on which string
//! names which entry:
//!
//! - the separator is `/`;
//! - the empty string is the archive root;
//! - directory paths end with `/`, file paths do not.

use std::fmt;

/// Path separator used inside entry paths.
pub const SEPARATOR: char = '/';

/// A canonical Unicode path identifying an entry inside one archive.
///
/// # Examples
///
/// ```
/// use zipcull::EntryPath;
///
/// let file = EntryPath::from_recovered("docs\\guide/./intro.txt");
/// assert_eq!(file.as_str(), "docs/guide/intro.txt");
/// assert_eq!(file.parent().as_str(), "docs/guide/");
/// assert_eq!(file.name(), "intro.txt");
///
/// let dir = EntryPath::from_recovered("docs/");
/// assert!(dir.is_dir());
/// assert!(file.starts_with(&dir));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryPath(String);

impl EntryPath {
    /// Returns the archive root (`""`).
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Canonicalizes a recovered entry name.
    ///
    /// Backslashes become `/`, empty and `.` segments are dropped and a
    /// trailing separator is kept. A name made only of current-directory
    /// markers (`.`, `./`) maps to the root.
    pub fn from_recovered(name: &str) -> Self {
        let normalized = name.replace('\\', "/");
        let is_dir = normalized.ends_with(SEPARATOR);

        let mut out = String::with_capacity(normalized.len());
        for segment in normalized
            .split(SEPARATOR)
            .filter(|s| !s.is_empty() && *s != ".")
        {
            if !out.is_empty() {
                out.push(SEPARATOR);
            }
            out.push_str(segment);
        }

        if is_dir && !out.is_empty() {
            out.push(SEPARATOR);
        }
        Self(out)
    }

    /// Recovers and canonicalizes a raw entry name from an archive.
    ///
    /// Whether the entry is a directory is decided on the raw bytes (a
    /// trailing `/`) as well as on the recovered text, so a Shift-JIS trail
    /// byte that happens to be `0x5C` never turns a file into a directory.
    ///
    /// ```
    /// use zipcull::EntryPath;
    ///
    /// // "表" in Shift-JIS ends with the byte 0x5C
    /// assert_eq!(EntryPath::from_raw(b"\x95\x5c").as_str(), "表");
    /// assert_eq!(EntryPath::from_raw(b"docs/").as_str(), "docs/");
    /// ```
    pub fn from_raw(raw: &[u8]) -> Self {
        let path = Self::from_recovered(&crate::encoding::recover(raw));
        if raw.last() == Some(&b'/') {
            path.as_dir()
        } else {
            path
        }
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the archive root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if this path names a directory (root included).
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.is_root() || self.0.ends_with(SEPARATOR)
    }

    /// Returns the directory form of this path (adds the trailing separator).
    pub fn as_dir(&self) -> Self {
        if self.is_dir() {
            self.clone()
        } else {
            Self(format!("{}{}", self.0, SEPARATOR))
        }
    }

    /// Returns the last component without any trailing separator.
    ///
    /// The root has an empty name.
    pub fn name(&self) -> &str {
        let trimmed = self.0.strip_suffix(SEPARATOR).unwrap_or(&self.0);
        trimmed.rsplit(SEPARATOR).next().unwrap_or(trimmed)
    }

    /// Returns the directory that contains this path.
    ///
    /// Top-level entries and the root itself have the root as parent.
    pub fn parent(&self) -> Self {
        self.split().0
    }

    /// Splits into the parent directory path and the base name.
    pub fn split(&self) -> (Self, &str) {
        let trimmed = self.0.strip_suffix(SEPARATOR).unwrap_or(&self.0);
        match trimmed.rfind(SEPARATOR) {
            Some(idx) => (Self(trimmed[..=idx].to_string()), &trimmed[idx + 1..]),
            None => (Self::root(), trimmed),
        }
    }

    /// Returns the child directory `name/` of this directory.
    pub fn child_dir(&self, name: &str) -> Self {
        debug_assert!(self.is_dir(), "child_dir on a file path");
        Self(format!("{}{}{}", self.0, name, SEPARATOR))
    }

    /// Returns the child file `name` of this directory.
    pub fn child_file(&self, name: &str) -> Self {
        debug_assert!(self.is_dir(), "child_file on a file path");
        Self(format!("{}{}", self.0, name))
    }

    /// Returns an iterator over the path components.
    ///
    /// ```
    /// use zipcull::EntryPath;
    ///
    /// let path = EntryPath::from_recovered("a/b/c.txt");
    /// let components: Vec<_> = path.components().collect();
    /// assert_eq!(components, vec!["a", "b", "c.txt"]);
    /// ```
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Returns every proper ancestor directory, shallowest first.
    ///
    /// The root is not included. For `a/b/c.txt` this yields `a/` and `a/b/`;
    /// for the directory `a/b/` it yields `a/` only.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut prefix = Self::root();
        let components: Vec<_> = self.components().collect();
        for component in components.iter().take(components.len().saturating_sub(1)) {
            prefix = prefix.child_dir(component);
            out.push(prefix.clone());
        }
        out
    }

    /// Returns `true` if `prefix` is this path or one of its ancestors.
    ///
    /// This is a component-wise comparison: `dir/` contains `dir/a.txt`
    /// but not `directory/a.txt`. Every path starts with the root.
    pub fn starts_with(&self, prefix: &EntryPath) -> bool {
        if prefix.is_root() || self == prefix {
            return true;
        }
        prefix.is_dir() && self.0.starts_with(prefix.as_str())
    }
}

impl AsRef<str> for EntryPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryPath {
    fn from(s: &str) -> Self {
        Self::from_recovered(s)
    }
}

impl From<String> for EntryPath {
    fn from(s: String) -> Self {
        Self::from_recovered(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_root() {
        let root = EntryPath::root();
        assert!(root.is_root());
        assert!(root.is_dir());
        assert_eq!(root.as_str(), "");
        assert_eq!(root.name(), "");
        assert_eq!(root.parent(), root);
    }

    #[test]
    fn test_simple_file() {
        let path = EntryPath::from_recovered("file.txt");
        assert_eq!(path.as_str(), "file.txt");
        assert!(!path.is_dir());
        assert!(path.parent().is_root());
    }

    #[test]
    fn test_directory_keeps_trailing_separator() {
        let path = EntryPath::from_recovered("a/b/");
        assert_eq!(path.as_str(), "a/b/");
        assert!(path.is_dir());
        assert_eq!(path.name(), "b");
        assert_eq!(path.parent().as_str(), "a/");
    }

    #[test]
    fn test_backslashes_normalized() {
        let path = EntryPath::from_recovered("a\\b\\c.txt");
        assert_eq!(path.as_str(), "a/b/c.txt");
    }

    #[test]
    fn test_current_dir_marker_maps_to_root() {
        assert!(EntryPath::from_recovered(".").is_root());
        assert!(EntryPath::from_recovered("./").is_root());
        assert_eq!(EntryPath::from_recovered("./x.txt").as_str(), "x.txt");
        assert!(EntryPath::from_recovered("./x.txt").parent().is_root());
    }

    #[test]
    fn test_empty_segments_dropped() {
        assert_eq!(EntryPath::from_recovered("a//b.txt").as_str(), "a/b.txt");
        assert_eq!(EntryPath::from_recovered("/a/b.txt").as_str(), "a/b.txt");
    }

    #[test]
    fn test_dotdot_is_kept_as_a_name() {
        let path = EntryPath::from_recovered("../evil.txt");
        assert_eq!(path.as_str(), "../evil.txt");
        assert_eq!(path.parent().as_str(), "../");
    }

    #[test]
    fn test_split() {
        let path = EntryPath::from_recovered("a/b/c.txt");
        let (parent, name) = path.split();
        assert_eq!(parent.as_str(), "a/b/");
        assert_eq!(name, "c.txt");
    }

    #[test]
    fn test_child_paths() {
        let dir = EntryPath::from_recovered("a/");
        assert_eq!(dir.child_dir("b").as_str(), "a/b/");
        assert_eq!(dir.child_file("c.txt").as_str(), "a/c.txt");
        assert_eq!(EntryPath::root().child_dir("x").as_str(), "x/");
    }

    #[test]
    fn test_ancestors() {
        let file = EntryPath::from_recovered("a/b/c.txt");
        let ancestors: Vec<_> = file.ancestors().into_iter().map(|p| p.0).collect();
        assert_eq!(ancestors, vec!["a/", "a/b/"]);

        let dir = EntryPath::from_recovered("a/b/");
        let ancestors: Vec<_> = dir.ancestors().into_iter().map(|p| p.0).collect();
        assert_eq!(ancestors, vec!["a/"]);

        assert!(EntryPath::from_recovered("top.txt").ancestors().is_empty());
    }

    #[test]
    fn test_starts_with_component_boundary() {
        let path = EntryPath::from_recovered("directory/file.txt");
        assert!(!path.starts_with(&EntryPath::from_recovered("dir/")));
        assert!(path.starts_with(&EntryPath::from_recovered("directory/")));
        assert!(path.starts_with(&EntryPath::root()));
        assert!(path.starts_with(&path));
    }

    #[test]
    fn test_starts_with_file_prefix_is_not_membership() {
        let path = EntryPath::from_recovered("file.txt.bak");
        assert!(!path.starts_with(&EntryPath::from_recovered("file.txt")));
    }

    #[test]
    fn test_as_dir() {
        assert_eq!(EntryPath::from_recovered("a/b").as_dir().as_str(), "a/b/");
        assert_eq!(EntryPath::from_recovered("a/b/").as_dir().as_str(), "a/b/");
        assert!(EntryPath::root().as_dir().is_root());
    }

    #[test]
    fn test_unicode() {
        let path = EntryPath::from_recovered("日本語/файл.txt");
        assert_eq!(path.name(), "файл.txt");
        assert_eq!(path.parent().as_str(), "日本語/");
    }

    #[test]
    fn test_hash_consistency() {
        let mut set = HashSet::new();
        set.insert(EntryPath::from_recovered("dir/file.txt"));
        assert!(set.contains(&EntryPath::from_recovered("dir\\file.txt")));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(EntryPath::from_raw(b"a/b.txt").as_str(), "a/b.txt");
        assert!(EntryPath::from_raw(b"a/b/").is_dir());
        // "ソ" is 0x83 0x5C in Shift-JIS
        let path = EntryPath::from_raw(b"\x83\x5c/\x83\x5c.txt");
        assert_eq!(path.as_str(), "ソ/ソ.txt");
        assert_eq!(path.parent().as_str(), "ソ/");
    }

    #[test]
    fn test_display_and_from() {
        let path: EntryPath = "dir/file.txt".into();
        assert_eq!(format!("{}", path), "dir/file.txt");
        let s: &str = path.as_ref();
        assert_eq!(s, "dir/file.txt");
    }
}
