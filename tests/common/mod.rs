//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

/// Fixed DOS timestamp used by the raw builder: 2020-02-03 04:05:06.
pub const RAW_DOS_TIME: u16 = (4 << 11) | (5 << 5) | (6 / 2);
/// Date half of [`RAW_DOS_TIME`].
pub const RAW_DOS_DATE: u16 = ((2020 - 1980) << 9) | (2 << 5) | 3;

/// Creates an in-memory ZIP archive with `zip::ZipWriter`.
///
/// Names ending in `/` become directory entries; everything else is a
/// deflated file.
pub fn create_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let when = zip::DateTime::from_date_and_time(2021, 6, 7, 8, 9, 10).unwrap();
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(when);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Creates an archive on disk inside a fresh temporary directory.
pub fn create_zip_file(entries: &[(&str, &[u8])]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.zip");
    std::fs::write(&path, create_zip(entries)).unwrap();
    (dir, path)
}

/// Builds a stored (uncompressed) archive with arbitrary name bytes.
///
/// The UTF-8 flag is never set, which is how legacy tools wrote Shift-JIS
/// and GBK names.
pub fn raw_stored_zip(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(data);
        let is_dir = name.ends_with(b"/");

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&RAW_DOS_TIME.to_le_bytes());
        out.extend_from_slice(&RAW_DOS_DATE.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(data);

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&RAW_DOS_TIME.to_le_bytes());
        central.extend_from_slice(&RAW_DOS_DATE.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&(if is_dir { 0x10u32 } else { 0 }).to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name);
    }

    let cd_offset = out.len() as u32;
    let cd_size = central.len() as u32;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Encodes `text` as Shift-JIS.
pub fn shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    assert!(!had_errors, "{text} is not representable in Shift-JIS");
    bytes.into_owned()
}

/// One entry as seen through `zip::ZipArchive`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub name_raw: Vec<u8>,
    pub compression: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u64,
    pub size: u64,
    pub modified: (u16, u8, u8, u8, u8, u8),
    pub data: Vec<u8>,
}

/// Reads every entry of an archive, decompressing file contents.
pub fn read_entries(bytes: &[u8]) -> Vec<EntrySnapshot> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            let t = file.last_modified();
            EntrySnapshot {
                name_raw: file.name_raw().to_vec(),
                compression: file.compression(),
                crc32: file.crc32(),
                compressed_size: file.compressed_size(),
                size: file.size(),
                modified: (t.year(), t.month(), t.day(), t.hour(), t.minute(), t.second()),
                data,
            }
        })
        .collect()
}

/// Reads every entry of an archive file.
pub fn read_entries_at(path: &Path) -> Vec<EntrySnapshot> {
    read_entries(&std::fs::read(path).unwrap())
}

/// Returns the raw names of an archive's entries.
pub fn raw_names(bytes: &[u8]) -> Vec<Vec<u8>> {
    read_entries(bytes).into_iter().map(|e| e.name_raw).collect()
}

/// Lists leftover rewrite scratch files in `dir`.
pub fn scratch_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(".zipcull-"))
        })
        .collect()
}
