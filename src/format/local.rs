//! Verbatim copying of local entry records.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::{
    CentralDirectory, CentralRecord, DATA_DESCRIPTOR_SIGNATURE, FLAG_DATA_DESCRIPTOR,
    LOCAL_HEADER_SIGNATURE, LOCAL_HEADER_SIZE, ZIP64_EXTRA_ID, extra_fields, invalid, le_u16,
    le_u32,
};

/// Copies one entry's local record from `reader` to `writer` unchanged.
///
/// The copy covers the local header, name, extra field, the compressed
/// payload (length taken from the central record) and the data descriptor
/// when the entry has one. Returns the number of bytes written.
///
/// # Errors
///
/// Returns `InvalidData` if no local header is found where the central
/// record points, `UnexpectedEof` if the payload is truncated, and passes
/// through write errors.
pub fn copy_local_entry<R, W>(
    reader: &mut R,
    writer: &mut W,
    dir: &CentralDirectory,
    record: &CentralRecord,
) -> io::Result<u64>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    let position = dir.local_position(record);
    reader.seek(SeekFrom::Start(position))?;

    let mut header = [0u8; LOCAL_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    if le_u32(&header, 0) != LOCAL_HEADER_SIGNATURE {
        return Err(invalid(format!(
            "bad local header signature at offset {position}"
        )));
    }

    let name_len = le_u16(&header, 26) as usize;
    let extra_len = le_u16(&header, 28) as usize;
    let mut name_extra = vec![0u8; name_len + extra_len];
    reader.read_exact(&mut name_extra)?;

    writer.write_all(&header)?;
    writer.write_all(&name_extra)?;

    let copied = io::copy(&mut (&mut *reader).take(record.compressed_size), writer)?;
    if copied != record.compressed_size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("entry payload at offset {position} is truncated"),
        ));
    }

    let mut total = (LOCAL_HEADER_SIZE + name_extra.len()) as u64 + copied;

    if record.flags & FLAG_DATA_DESCRIPTOR != 0 {
        let local_zip64 =
            extra_fields(&name_extra[name_len..]).any(|(id, ..)| id == ZIP64_EXTRA_ID);
        let sizes_len = if local_zip64 { 16 } else { 8 };

        let mut first = [0u8; 4];
        reader.read_exact(&mut first)?;
        let rest_len = if le_u32(&first, 0) == DATA_DESCRIPTOR_SIGNATURE {
            4 + sizes_len
        } else {
            sizes_len
        };
        let mut rest = vec![0u8; rest_len];
        reader.read_exact(&mut rest)?;

        writer.write_all(&first)?;
        writer.write_all(&rest)?;
        total += (first.len() + rest.len()) as u64;
    }

    Ok(total)
}
