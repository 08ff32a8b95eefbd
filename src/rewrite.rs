//! Rewriting an archive without its marked entries.
//!
//! The rewrite never edits the archive in place. Kept entries are copied
//! record by record into a scratch file (compressed bytes, method, timestamp
//! and raw name bytes untouched); the scratch file is flushed and synced,
//! and only then renamed over the original. Until that rename the original
//! archive is not modified, so any failure before it leaves the archive
//! exactly as it was.

use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::format::{self, CentralDirectory, CountingWriter};
use crate::progress::{NoProgress, ProgressReporter};
use crate::{EntryPath, Error, FlagSnapshot, Result};

const SCRATCH_PREFIX: &str = ".zipcull-";
const SCRATCH_SUFFIX: &str = ".tmp";

/// Options for rewriting an archive.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Directory for the scratch file.
    ///
    /// `None` (the default) uses the archive's own directory, which keeps
    /// the final rename on one filesystem.
    pub scratch_dir: Option<PathBuf>,
    /// Whether to `fsync` the scratch file before it replaces the archive.
    pub sync: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            sync: true,
        }
    }
}

impl RewriteOptions {
    /// Creates new rewrite options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory for the scratch file.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Sets whether to sync the scratch file to disk before committing.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Result of a rewrite.
#[must_use = "rewrite result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteResult {
    /// Entries copied into the new archive.
    pub entries_kept: usize,
    /// Entries left out.
    pub entries_deleted: usize,
    /// Compressed payload bytes of the kept entries.
    pub bytes_kept: u64,
    /// Compressed payload bytes of the deleted entries.
    pub bytes_deleted: u64,
}

impl RewriteResult {
    /// Returns the number of entries in the source archive.
    pub fn total_entries(&self) -> usize {
        self.entries_kept + self.entries_deleted
    }

    /// Returns `true` if the archive was left unchanged.
    pub fn is_noop(&self) -> bool {
        self.entries_deleted == 0
    }
}

/// Rewrites one archive on disk, leaving out marked entries.
///
/// # Example
///
/// ```rust,no_run
/// use zipcull::{ArchiveRewriter, EntryPath, FlagSnapshot, RewriteOptions};
///
/// let marked: FlagSnapshot = [EntryPath::from("cache/"), EntryPath::from("cache/blob.bin")]
///     .into_iter()
///     .collect();
/// let result = ArchiveRewriter::new("project.zip")
///     .with_options(RewriteOptions::new().sync(true))
///     .apply(&marked)?;
/// println!("removed {} entries", result.entries_deleted);
/// # Ok::<(), zipcull::Error>(())
/// ```
pub struct ArchiveRewriter<'p> {
    archive: PathBuf,
    options: RewriteOptions,
    progress: Box<dyn ProgressReporter + 'p>,
}

impl<'p> ArchiveRewriter<'p> {
    /// Creates a rewriter for the archive at `archive`.
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            options: RewriteOptions::default(),
            progress: Box::new(NoProgress),
        }
    }

    /// Sets the rewrite options.
    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the progress reporter.
    pub fn with_progress(mut self, progress: impl ProgressReporter + 'p) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Rewrites the archive without the entries in `snapshot`.
    ///
    /// Entries are matched by their recovered [`EntryPath`]; directory
    /// entries match their path with the trailing separator. When nothing
    /// in the archive is marked, no file is written and the archive keeps
    /// its modification time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveOpen`] if the archive cannot be opened or its
    /// central directory cannot be parsed, and [`Error::Rewrite`] for any
    /// failure while writing or committing the replacement.
    pub fn apply(self, snapshot: &FlagSnapshot) -> Result<RewriteResult> {
        self.apply_through(snapshot, |file| Box::new(BufWriter::new(file)))
    }

    /// Runs the rewrite with `sink` wrapping the scratch file.
    fn apply_through<F>(mut self, snapshot: &FlagSnapshot, sink: F) -> Result<RewriteResult>
    where
        F: FnOnce(&mut File) -> Box<dyn Write + '_>,
    {
        let archive = self.archive.clone();
        let rewrite_err = |e: io::Error| Error::rewrite(&archive, e);

        let source = File::open(&archive).map_err(|e| Error::open(&archive, e))?;
        let permissions = source.metadata().map_err(rewrite_err)?.permissions();
        let mut reader = BufReader::new(source);
        let dir = CentralDirectory::read(&mut reader).map_err(|e| Error::open(&archive, e))?;

        let scratch_parent = match &self.options.scratch_dir {
            Some(dir) => dir.clone(),
            None => parent_dir(&archive),
        };
        let mut scratch = scratch_file(&scratch_parent).map_err(rewrite_err)?;
        log::debug!(
            "rewriting {} through {}",
            archive.display(),
            scratch.path().display()
        );

        let result = {
            let mut writer = sink(scratch.as_file_mut());
            let result = rewrite_entries(
                &mut reader,
                &dir,
                &mut writer,
                snapshot,
                &mut *self.progress,
            )
            .map_err(rewrite_err)?;
            writer.flush().map_err(rewrite_err)?;
            result
        };
        drop(reader);

        if result.is_noop() {
            log::info!(
                "no marked entries in {}, archive left unchanged",
                archive.display()
            );
            return Ok(result);
        }

        if self.options.sync {
            scratch.as_file().sync_all().map_err(rewrite_err)?;
        }
        fs::set_permissions(scratch.path(), permissions.clone()).map_err(rewrite_err)?;
        commit(scratch, &archive, permissions, self.options.sync).map_err(rewrite_err)?;

        log::info!(
            "rewrote {}: kept {} entries, removed {}",
            archive.display(),
            result.entries_kept,
            result.entries_deleted
        );
        Ok(result)
    }
}

/// Rewrites the archive at `archive` without the entries in `snapshot`.
///
/// Shorthand for [`ArchiveRewriter`] without progress reporting.
pub fn apply_deletions(
    archive: &Path,
    snapshot: &FlagSnapshot,
    options: &RewriteOptions,
) -> Result<RewriteResult> {
    ArchiveRewriter::new(archive)
        .with_options(options.clone())
        .apply(snapshot)
}

/// Streams the archive behind `reader` into `writer`, leaving out the
/// entries in `snapshot`.
///
/// This is the in-memory core of [`ArchiveRewriter::apply`]; it performs no
/// file replacement. Kept entries are copied verbatim and only their local
/// header offsets change.
///
/// # Errors
///
/// Returns `InvalidData` for a malformed source and passes through I/O
/// errors of either side.
pub fn rewrite_into<R, W>(
    reader: &mut R,
    writer: &mut W,
    snapshot: &FlagSnapshot,
    progress: &mut dyn ProgressReporter,
) -> io::Result<RewriteResult>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    let dir = CentralDirectory::read(reader)?;
    rewrite_entries(reader, &dir, writer, snapshot, progress)
}

fn rewrite_entries<R, W>(
    reader: &mut R,
    dir: &CentralDirectory,
    writer: &mut W,
    snapshot: &FlagSnapshot,
    progress: &mut dyn ProgressReporter,
) -> io::Result<RewriteResult>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    let total_bytes: u64 = dir.records.iter().map(|r| r.compressed_size).sum();
    progress.on_total(dir.records.len(), total_bytes);

    let mut out = CountingWriter::new(writer);
    if dir.prefix_len > 0 {
        reader.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut (&mut *reader).take(dir.prefix_len), &mut out)?;
        if copied != dir.prefix_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive prefix is truncated",
            ));
        }
    }

    let mut result = RewriteResult::default();
    let mut kept = Vec::with_capacity(dir.records.len());
    let mut processed = 0u64;

    for record in &dir.records {
        let path = EntryPath::from_raw(&record.name);
        progress.on_entry_start(path.as_str(), record.uncompressed_size);

        let keep = !snapshot.contains(&path);
        if keep {
            let offset = out.position() - dir.archive_offset;
            format::copy_local_entry(reader, &mut out, dir, record)?;
            kept.push((record, offset));
            result.entries_kept += 1;
            result.bytes_kept += record.compressed_size;
        } else {
            log::debug!("leaving out '{}'", path);
            result.entries_deleted += 1;
            result.bytes_deleted += record.compressed_size;
        }

        processed += record.compressed_size;
        progress.on_entry_complete(path.as_str(), keep);
        progress.on_progress(processed, total_bytes);
    }

    let cd_start = out.position();
    for (record, offset) in &kept {
        record.write_with_offset(&mut out, *offset)?;
    }
    let cd_size = out.position() - cd_start;
    format::write_end_records(
        &mut out,
        kept.len() as u64,
        cd_start - dir.archive_offset,
        cd_size,
        &dir.comment,
    )?;
    out.flush()?;

    Ok(result)
}

fn parent_dir(archive: &Path) -> PathBuf {
    match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn scratch_file(dir: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(SCRATCH_SUFFIX)
        .tempfile_in(dir)
}

/// Moves the finished scratch file over `archive`.
///
/// A plain rename is tried first. If it fails (typically because the
/// scratch file lives on another filesystem) the content is copied into a
/// second scratch file next to the archive, synced, and that one is renamed.
/// In both cases the original is replaced only by a complete file.
fn commit(
    scratch: NamedTempFile,
    archive: &Path,
    permissions: Permissions,
    sync: bool,
) -> io::Result<()> {
    let err = match scratch.persist(archive) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };
    log::warn!(
        "cannot rename scratch file over {} ({}), copying instead",
        archive.display(),
        err.error
    );

    let scratch = err.file;
    let mut staged = scratch_file(&parent_dir(archive))?;
    let mut content = scratch.reopen()?;
    io::copy(&mut content, staged.as_file_mut())?;
    staged.as_file_mut().flush()?;
    if sync {
        staged.as_file().sync_all()?;
    }
    fs::set_permissions(staged.path(), permissions)?;
    staged.persist(archive).map_err(|e| e.error)?;
    Ok(())
}
