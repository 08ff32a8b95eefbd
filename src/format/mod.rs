//! ZIP container records needed to copy entries verbatim.
//!
//! Reading and decompressing entries goes through the `zip` crate. Rewriting
//! an archive without some of its entries needs more control than that: the
//! kept entries must land in the new archive with the exact bytes they had,
//! including names stored in a legacy code page. This module parses the
//! central directory itself and copies local records byte for byte.
//!
//! Layout of a ZIP archive, as far as this module is concerned:
//!
//! ```text
//! [prefix]                        optional data before the first entry (SFX stub)
//! [local header][name][extra][payload][data descriptor?]   per entry
//! [central record][name][extra][comment]                   per entry
//! [zip64 end record][zip64 locator]                        when needed
//! [end of central directory][archive comment]
//! ```

mod central;
mod local;

pub use central::{CentralDirectory, CentralRecord, write_end_records};
pub use local::copy_local_entry;

use std::io::{self, Write};

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory record signature (`PK\x01\x02`).
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory signature (`PK\x05\x06`).
pub const END_SIGNATURE: u32 = 0x0605_4b50;

/// ZIP64 end of central directory signature (`PK\x06\x06`).
pub const ZIP64_END_SIGNATURE: u32 = 0x0606_4b50;

/// ZIP64 end of central directory locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Optional data descriptor signature (`PK\x07\x08`).
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Fixed size of a local file header.
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Fixed size of a central directory record.
pub const CENTRAL_HEADER_SIZE: usize = 46;

/// Fixed size of the end of central directory record.
pub const END_SIZE: usize = 22;

/// Fixed size of the ZIP64 end of central directory record.
pub const ZIP64_END_SIZE: usize = 56;

/// Size of the ZIP64 end of central directory locator.
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// Largest archive comment the format can hold.
pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// Extra field header ID of the ZIP64 extended information field.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// General purpose flag bit: sizes and CRC follow the payload.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

pub(crate) fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

pub(crate) fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

pub(crate) fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Walks the fields of an extra block, yielding `(header_id, start, len)`
/// where `start..start + len` is the field's data inside `extra`.
pub(crate) fn extra_fields(extra: &[u8]) -> impl Iterator<Item = (u16, usize, usize)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos + 4 > extra.len() {
            return None;
        }
        let id = le_u16(extra, pos);
        let len = le_u16(extra, pos + 2) as usize;
        let start = pos + 4;
        if start + len > extra.len() {
            return None;
        }
        pos = start + len;
        Some((id, start, len))
    })
}

/// A writer that tracks how many bytes went through it.
///
/// The rewriter uses the count as the position of the next record in the
/// output archive.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps `inner`, starting the count at zero.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Returns the number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.written
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Returns a mutable reference to the wrapped writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
