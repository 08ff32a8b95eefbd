//! Single-entry extraction into scratch space.
//!
//! Used to hand one entry to an external viewer. Each call creates a fresh
//! scratch directory, mirrors the entry's directory structure inside it and
//! streams the decompressed bytes there. The directory is *not* removed:
//! ownership passes to the caller together with the returned path.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::{EntryPath, Error, Result, Timestamp, safety};

/// Options for [`extract_entry`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory in which scratch directories are created.
    ///
    /// `None` uses the system temporary directory.
    pub scratch_dir: Option<PathBuf>,
    /// Whether to copy the entry's modification time to the extracted file.
    pub preserve_mtime: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            preserve_mtime: true,
        }
    }
}

impl ExtractOptions {
    /// Creates new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parent directory for scratch directories.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Sets whether to preserve the entry's modification time.
    pub fn preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }
}

/// Extracts one file entry of `archive` and returns the extracted path.
///
/// Entries are matched by scanning the archive and recovering each name;
/// only file entries match, so a directory path yields
/// [`Error::EntryNotFound`].
///
/// # Errors
///
/// - [`Error::ArchiveOpen`] if the archive cannot be read
/// - [`Error::EntryNotFound`] if no file entry recovers to `entry`
/// - [`Error::PathTraversal`] if `entry` would escape the scratch directory
/// - [`Error::Extraction`] if the scratch directory or file cannot be
///   written, or the entry cannot be decompressed
///
/// # Example
///
/// ```rust,no_run
/// use zipcull::{EntryPath, ExtractOptions, extract_entry};
///
/// let path = extract_entry(
///     "photos.zip".as_ref(),
///     &EntryPath::from("raw/img_001.jpg"),
///     &ExtractOptions::default(),
/// )?;
/// println!("extracted to {}", path.display());
/// # Ok::<(), zipcull::Error>(())
/// ```
pub fn extract_entry(
    archive: &Path,
    entry: &EntryPath,
    options: &ExtractOptions,
) -> Result<PathBuf> {
    let file = File::open(archive).map_err(|e| Error::open(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::open(archive, e))?;

    let index = find_entry(&mut zip, archive, entry)?.ok_or_else(|| Error::EntryNotFound {
        path: entry.as_str().to_string(),
    })?;

    let scratch = scratch_dir(options).map_err(|source| Error::Extraction {
        entry: entry.as_str().to_string(),
        path: options.scratch_dir.clone().unwrap_or_else(std::env::temp_dir),
        source,
    })?;
    let dest = safety::resolve_within(scratch.path(), entry)?;
    let extraction_error = |source: io::Error| Error::Extraction {
        entry: entry.as_str().to_string(),
        path: dest.clone(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(extraction_error)?;
        safety::ensure_contained(scratch.path(), parent, entry)?;
    }

    let mut source = zip
        .by_index(index)
        .map_err(|e| extraction_error(io::Error::from(e)))?;
    let modified = Timestamp::from(source.last_modified());
    let mut out = File::create(&dest).map_err(extraction_error)?;
    let written = io::copy(&mut source, &mut out).map_err(extraction_error)?;
    drop(out);

    if options.preserve_mtime {
        filetime::set_file_mtime(&dest, modified.as_file_time()).map_err(extraction_error)?;
    }

    let kept = scratch.keep();
    log::info!(
        "extracted '{}' ({} bytes) from {} into {}",
        entry,
        written,
        archive.display(),
        kept.display()
    );
    Ok(dest)
}

/// Returns the index of the first file entry whose recovered path is `entry`.
fn find_entry<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    archive: &Path,
    entry: &EntryPath,
) -> Result<Option<usize>> {
    if entry.is_dir() {
        return Ok(None);
    }
    for index in 0..zip.len() {
        let raw = zip
            .by_index_raw(index)
            .map_err(|e| Error::open(archive, e))?;
        if EntryPath::from_raw(raw.name_raw()) == *entry {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn scratch_dir(options: &ExtractOptions) -> io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("zipcull-");
    match &options.scratch_dir {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
}
