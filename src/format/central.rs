//! Central directory and end-of-archive records.

use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom, Write};

use super::{
    CENTRAL_HEADER_SIGNATURE, CENTRAL_HEADER_SIZE, END_SIGNATURE, END_SIZE, MAX_COMMENT_SIZE,
    ZIP64_END_SIGNATURE, ZIP64_END_SIZE, ZIP64_EXTRA_ID, ZIP64_LOCATOR_SIGNATURE,
    ZIP64_LOCATOR_SIZE, extra_fields, invalid, le_u16, le_u32, le_u64,
};

const U16_MAX: u64 = u16::MAX as u64;
const U32_MAX: u64 = u32::MAX as u64;

/// One central directory record, kept with its original bytes.
///
/// Only the local header offset is ever changed when the record is written
/// back; every other byte (name, extra field, comment, attributes, version
/// fields) is reproduced as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralRecord {
    header: [u8; CENTRAL_HEADER_SIZE],
    /// Raw entry name bytes, in whatever encoding the writer used.
    pub name: Vec<u8>,
    /// Raw extra field block.
    pub extra: Vec<u8>,
    /// Raw per-entry comment.
    pub comment: Vec<u8>,
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method ID.
    pub method: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed payload size (ZIP64 value when present).
    pub compressed_size: u64,
    /// Uncompressed size (ZIP64 value when present).
    pub uncompressed_size: u64,
    /// Offset of the local header, relative to the archive start.
    pub local_header_offset: u64,
}

impl CentralRecord {
    /// Parses one record starting at `pos` in the central directory bytes.
    ///
    /// Returns the record and the position just past it.
    fn parse(cd: &[u8], pos: usize) -> io::Result<(Self, usize)> {
        if pos + CENTRAL_HEADER_SIZE > cd.len() {
            return Err(invalid("central directory truncated"));
        }
        let fixed = &cd[pos..pos + CENTRAL_HEADER_SIZE];
        if le_u32(fixed, 0) != CENTRAL_HEADER_SIGNATURE {
            return Err(invalid(format!(
                "bad central directory signature at offset {pos}"
            )));
        }

        let name_len = le_u16(fixed, 28) as usize;
        let extra_len = le_u16(fixed, 30) as usize;
        let comment_len = le_u16(fixed, 32) as usize;
        let name_start = pos + CENTRAL_HEADER_SIZE;
        let extra_start = name_start + name_len;
        let comment_start = extra_start + extra_len;
        let end = comment_start + comment_len;
        if end > cd.len() {
            return Err(invalid("central directory record truncated"));
        }

        let mut header = [0u8; CENTRAL_HEADER_SIZE];
        header.copy_from_slice(fixed);

        let mut record = Self {
            header,
            name: cd[name_start..extra_start].to_vec(),
            extra: cd[extra_start..comment_start].to_vec(),
            comment: cd[comment_start..end].to_vec(),
            flags: le_u16(fixed, 8),
            method: le_u16(fixed, 10),
            crc32: le_u32(fixed, 16),
            compressed_size: u64::from(le_u32(fixed, 20)),
            uncompressed_size: u64::from(le_u32(fixed, 24)),
            local_header_offset: u64::from(le_u32(fixed, 42)),
        };
        record.apply_zip64_extra();
        Ok((record, end))
    }

    /// Replaces saturated 32-bit fields with their ZIP64 extra values.
    fn apply_zip64_extra(&mut self) {
        let Some((_, start, len)) = extra_fields(&self.extra).find(|(id, ..)| *id == ZIP64_EXTRA_ID)
        else {
            return;
        };
        let data = &self.extra[start..start + len];
        let mut pos = 0;
        let mut next = |saturated: bool| -> Option<u64> {
            if !saturated || pos + 8 > data.len() {
                return None;
            }
            let value = le_u64(data, pos);
            pos += 8;
            Some(value)
        };
        if let Some(v) = next(self.uncompressed_size == U32_MAX) {
            self.uncompressed_size = v;
        }
        if let Some(v) = next(self.compressed_size == U32_MAX) {
            self.compressed_size = v;
        }
        if let Some(v) = next(self.local_header_offset == U32_MAX) {
            self.local_header_offset = v;
        }
    }

    /// Position of the ZIP64 local header offset inside `extra`, if the
    /// record stores its offset there.
    fn zip64_offset_slot(&self) -> Option<usize> {
        if le_u32(&self.header, 42) != u32::MAX {
            return None;
        }
        let (_, start, len) = extra_fields(&self.extra).find(|(id, ..)| *id == ZIP64_EXTRA_ID)?;
        let mut slot = start;
        if le_u32(&self.header, 24) == u32::MAX {
            slot += 8;
        }
        if le_u32(&self.header, 20) == u32::MAX {
            slot += 8;
        }
        (slot + 8 <= start + len).then_some(slot)
    }

    /// Returns `true` if the raw name ends with `/`.
    ///
    /// The check runs on raw bytes: a backslash can be the trail byte of a
    /// Shift-JIS character and must not be mistaken for a separator.
    pub fn is_dir(&self) -> bool {
        self.name.last() == Some(&b'/')
    }

    /// Size of the record as stored in the central directory.
    pub fn encoded_len(&self) -> u64 {
        (CENTRAL_HEADER_SIZE + self.name.len() + self.extra.len() + self.comment.len()) as u64
    }

    /// Writes the record with a new local header offset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the offset does not fit the field the
    /// record uses for it.
    pub fn write_with_offset<W: Write + ?Sized>(&self, w: &mut W, offset: u64) -> io::Result<()> {
        let mut header = self.header;
        let mut extra = Cow::Borrowed(self.extra.as_slice());

        if let Some(slot) = self.zip64_offset_slot() {
            extra.to_mut()[slot..slot + 8].copy_from_slice(&offset.to_le_bytes());
        } else {
            let offset = u32::try_from(offset)
                .ok()
                .filter(|o| *o != u32::MAX)
                .ok_or_else(|| invalid("local header offset does not fit in 32 bits"))?;
            header[42..46].copy_from_slice(&offset.to_le_bytes());
        }

        w.write_all(&header)?;
        w.write_all(&self.name)?;
        w.write_all(&extra)?;
        w.write_all(&self.comment)
    }
}

/// The parsed central directory of an archive.
#[derive(Debug, Clone)]
pub struct CentralDirectory {
    /// Records in central directory order.
    pub records: Vec<CentralRecord>,
    /// Raw archive comment.
    pub comment: Vec<u8>,
    /// Distance between stored offsets and file positions.
    ///
    /// Non-zero when data was prepended to the archive without adjusting
    /// its offsets.
    pub archive_offset: u64,
    /// Bytes before the first local header, copied verbatim on rewrite.
    pub prefix_len: u64,
}

impl CentralDirectory {
    /// Reads the central directory of the archive behind `reader`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the end records or any central record are
    /// missing or malformed, and passes through I/O errors.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        if len < END_SIZE as u64 {
            return Err(invalid("file too small to be a ZIP archive"));
        }

        let tail_len = len.min((MAX_COMMENT_SIZE + END_SIZE) as u64) as usize;
        let tail_start = len - tail_len as u64;
        let mut tail = vec![0u8; tail_len];
        reader.seek(SeekFrom::Start(tail_start))?;
        reader.read_exact(&mut tail)?;

        let end_pos =
            find_end(&tail).ok_or_else(|| invalid("end of central directory not found"))?;
        let end = &tail[end_pos..];
        let end_offset = tail_start + end_pos as u64;
        let comment_len = le_u16(end, 20) as usize;
        let comment = end[END_SIZE..END_SIZE + comment_len].to_vec();

        let mut entries = u64::from(le_u16(end, 10));
        let mut cd_size = u64::from(le_u32(end, 12));
        let mut cd_offset = u64::from(le_u32(end, 16));
        let mut cd_end = end_offset;

        if let Some((z64_pos, z64)) = read_zip64_end(reader, end_offset)? {
            entries = le_u64(&z64, 32);
            cd_size = le_u64(&z64, 40);
            cd_offset = le_u64(&z64, 48);
            cd_end = z64_pos;
        } else if entries == U16_MAX || cd_size == U32_MAX || cd_offset == U32_MAX {
            return Err(invalid("ZIP64 end of central directory missing"));
        } else if le_u16(end, 4) != 0 || le_u16(end, 6) != 0 {
            return Err(invalid("multi-disk archives are not supported"));
        }

        let cd_start = cd_end
            .checked_sub(cd_size)
            .ok_or_else(|| invalid("central directory size out of range"))?;
        let archive_offset = cd_start
            .checked_sub(cd_offset)
            .ok_or_else(|| invalid("central directory offset out of range"))?;

        let mut cd = vec![0u8; cd_size as usize];
        reader.seek(SeekFrom::Start(cd_start))?;
        reader.read_exact(&mut cd)?;

        let capacity = entries.min(cd_size / CENTRAL_HEADER_SIZE as u64) as usize;
        let mut records = Vec::with_capacity(capacity);
        let mut pos = 0;
        for _ in 0..entries {
            let (record, next) = CentralRecord::parse(&cd, pos)?;
            records.push(record);
            pos = next;
        }

        let prefix_len = records
            .iter()
            .map(|r| archive_offset.saturating_add(r.local_header_offset))
            .min()
            .unwrap_or(cd_start)
            .min(cd_start);

        log::debug!(
            "central directory: {} entries, {} bytes at {}, archive offset {}",
            records.len(),
            cd_size,
            cd_start,
            archive_offset
        );

        Ok(Self {
            records,
            comment,
            archive_offset,
            prefix_len,
        })
    }

    /// Returns the file position of a record's local header.
    pub fn local_position(&self, record: &CentralRecord) -> u64 {
        self.archive_offset + record.local_header_offset
    }
}

/// Finds the end of central directory record, searching backwards so an
/// archive comment is skipped.
fn find_end(tail: &[u8]) -> Option<usize> {
    (0..=tail.len().checked_sub(END_SIZE)?).rev().find(|&i| {
        le_u32(tail, i) == END_SIGNATURE
            && i + END_SIZE + le_u16(tail, i + 20) as usize <= tail.len()
    })
}

/// Reads the ZIP64 end record if a locator precedes the end record.
///
/// Returns the record's file position and its fixed bytes.
fn read_zip64_end<R: Read + Seek + ?Sized>(
    reader: &mut R,
    end_offset: u64,
) -> io::Result<Option<(u64, [u8; ZIP64_END_SIZE])>> {
    let Some(locator_pos) = end_offset.checked_sub(ZIP64_LOCATOR_SIZE as u64) else {
        return Ok(None);
    };
    let mut locator = [0u8; ZIP64_LOCATOR_SIZE];
    reader.seek(SeekFrom::Start(locator_pos))?;
    reader.read_exact(&mut locator)?;
    if le_u32(&locator, 0) != ZIP64_LOCATOR_SIGNATURE {
        return Ok(None);
    }

    // The record normally sits right before the locator; otherwise trust
    // the stored offset.
    let stored = le_u64(&locator, 8);
    let candidates = [
        locator_pos.checked_sub(ZIP64_END_SIZE as u64),
        Some(stored),
    ];
    for pos in candidates.into_iter().flatten() {
        let mut record = [0u8; ZIP64_END_SIZE];
        reader.seek(SeekFrom::Start(pos))?;
        if reader.read_exact(&mut record).is_ok() && le_u32(&record, 0) == ZIP64_END_SIGNATURE {
            return Ok(Some((pos, record)));
        }
    }
    Err(invalid("ZIP64 end of central directory not found"))
}

/// Writes the end-of-archive records for a central directory of `entries`
/// records, `cd_size` bytes long, stored at offset `cd_offset`.
///
/// A ZIP64 end record and locator are written first when any value
/// overflows the classic 16/32-bit fields.
///
/// # Errors
///
/// Returns `InvalidData` if the comment is longer than the format allows.
pub fn write_end_records<W: Write + ?Sized>(
    w: &mut W,
    entries: u64,
    cd_offset: u64,
    cd_size: u64,
    comment: &[u8],
) -> io::Result<()> {
    let comment_len =
        u16::try_from(comment.len()).map_err(|_| invalid("archive comment too long"))?;
    let zip64 = entries >= U16_MAX || cd_offset >= U32_MAX || cd_size >= U32_MAX;

    if zip64 {
        let z64_offset = cd_offset + cd_size;
        let mut record = Vec::with_capacity(ZIP64_END_SIZE + ZIP64_LOCATOR_SIZE);
        record.extend_from_slice(&ZIP64_END_SIGNATURE.to_le_bytes());
        record.extend_from_slice(&((ZIP64_END_SIZE - 12) as u64).to_le_bytes());
        record.extend_from_slice(&45u16.to_le_bytes());
        record.extend_from_slice(&45u16.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&entries.to_le_bytes());
        record.extend_from_slice(&entries.to_le_bytes());
        record.extend_from_slice(&cd_size.to_le_bytes());
        record.extend_from_slice(&cd_offset.to_le_bytes());

        record.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&z64_offset.to_le_bytes());
        record.extend_from_slice(&1u32.to_le_bytes());
        w.write_all(&record)?;
    }

    let entries16 = entries.min(U16_MAX) as u16;
    let mut end = Vec::with_capacity(END_SIZE + comment.len());
    end.extend_from_slice(&END_SIGNATURE.to_le_bytes());
    end.extend_from_slice(&0u16.to_le_bytes());
    end.extend_from_slice(&0u16.to_le_bytes());
    end.extend_from_slice(&entries16.to_le_bytes());
    end.extend_from_slice(&entries16.to_le_bytes());
    end.extend_from_slice(&(cd_size.min(U32_MAX) as u32).to_le_bytes());
    end.extend_from_slice(&(cd_offset.min(U32_MAX) as u32).to_le_bytes());
    end.extend_from_slice(&comment_len.to_le_bytes());
    end.extend_from_slice(comment);
    w.write_all(&end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::CompressionMethod;
    use zip::write::{FileOptions, ZipWriter};

    fn sample_zip(comment: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        writer.add_directory("docs/", stored).unwrap();
        writer.start_file("docs/a.txt", stored).unwrap();
        writer.write_all(b"alpha").unwrap();
        writer
            .start_file(
                "b.txt",
                FileOptions::default().compression_method(CompressionMethod::Deflated),
            )
            .unwrap();
        writer.write_all(&[b'b'; 4096]).unwrap();
        writer.set_comment(comment);
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_records() {
        let bytes = sample_zip("");
        let dir = CentralDirectory::read(&mut Cursor::new(&bytes)).unwrap();

        let names: Vec<_> = dir.records.iter().map(|r| r.name.as_slice()).collect();
        assert_eq!(names, vec![&b"docs/"[..], b"docs/a.txt", b"b.txt"]);
        assert!(dir.records[0].is_dir());
        assert!(!dir.records[1].is_dir());
        assert_eq!(dir.records[1].uncompressed_size, 5);
        assert_eq!(dir.records[2].method, 8);
        assert!(dir.records[2].compressed_size < 4096);
        assert_eq!(dir.archive_offset, 0);
        assert_eq!(dir.prefix_len, 0);
    }

    #[test]
    fn test_read_comment() {
        let bytes = sample_zip("kept as is");
        let dir = CentralDirectory::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(dir.comment, b"kept as is");
        assert_eq!(dir.records.len(), 3);
    }

    #[test]
    fn test_prepended_data_shifts_offsets() {
        let mut bytes = b"#!stub\n".to_vec();
        bytes.extend(sample_zip(""));
        let dir = CentralDirectory::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(dir.archive_offset, 7);
        assert_eq!(dir.prefix_len, 7);
        assert_eq!(dir.local_position(&dir.records[0]), 7);
    }

    #[test]
    fn test_not_a_zip() {
        let err = CentralDirectory::read(&mut Cursor::new(vec![0u8; 100])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = CentralDirectory::read(&mut Cursor::new(b"PK".to_vec())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_write_with_offset_patches_only_offset() {
        let bytes = sample_zip("");
        let dir = CentralDirectory::read(&mut Cursor::new(&bytes)).unwrap();
        let record = &dir.records[1];

        let mut out = Vec::new();
        record.write_with_offset(&mut out, 1234).unwrap();
        assert_eq!(out.len() as u64, record.encoded_len());
        assert_eq!(le_u32(&out, 42), 1234);
        assert_eq!(&out[..42], &record.header[..42]);

        let (reparsed, _) = CentralRecord::parse(&out, 0).unwrap();
        assert_eq!(reparsed.name, record.name);
        assert_eq!(reparsed.local_header_offset, 1234);
    }

    #[test]
    fn test_end_records_round_trip() {
        let mut out = Vec::new();
        write_end_records(&mut out, 3, 100, 50, b"hi").unwrap();
        assert_eq!(out.len(), END_SIZE + 2);
        assert_eq!(find_end(&out), Some(0));
        assert_eq!(le_u16(&out, 10), 3);
        assert_eq!(le_u32(&out, 12), 50);
        assert_eq!(le_u32(&out, 16), 100);
    }

    #[test]
    fn test_end_records_zip64_when_many_entries() {
        let mut out = Vec::new();
        write_end_records(&mut out, 70_000, 100, 50, b"").unwrap();
        assert_eq!(out.len(), ZIP64_END_SIZE + ZIP64_LOCATOR_SIZE + END_SIZE);
        assert_eq!(le_u32(&out, 0), ZIP64_END_SIGNATURE);
        assert_eq!(le_u64(&out, 32), 70_000);
        assert_eq!(le_u32(&out, ZIP64_END_SIZE), ZIP64_LOCATOR_SIGNATURE);
        assert_eq!(le_u64(&out, ZIP64_END_SIZE + 8), 150);
        assert_eq!(le_u16(&out, ZIP64_END_SIZE + ZIP64_LOCATOR_SIZE + 10), 0xFFFF);
    }

    #[test]
    fn test_comment_too_long() {
        let comment = vec![b'x'; MAX_COMMENT_SIZE + 1];
        let err = write_end_records(&mut Vec::new(), 0, 0, 0, &comment).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
