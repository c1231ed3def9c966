//! Bounds checked reads and writes at absolute offsets in a file buffer.
use std::io::{Cursor, Seek, SeekFrom};

use binrw::{BinRead, BinReaderExt};
use byteorder::{ByteOrder, LittleEndian};

use crate::FormatError;

pub(crate) fn round_up(value: u64, n: u64) -> u64 {
    // Find the next largest multiple of n.
    ((value + n - 1) / n) * n
}

/// Checks that `size` bytes starting at `offset` lie within a buffer of length `len`.
/// Empty ranges are always valid, so arrays with a count of 0 never fail regardless of their offset.
pub(crate) fn check_range(
    name: &'static str,
    offset: u64,
    size: u64,
    len: usize,
) -> Result<(), FormatError> {
    if size == 0 {
        return Ok(());
    }

    match offset.checked_add(size) {
        Some(end) if end <= len as u64 => Ok(()),
        _ => Err(FormatError::OutOfBounds {
            name,
            offset,
            size,
            file_length: len,
        }),
    }
}

/// Reads the 4 byte tag at `offset`.
pub(crate) fn read_magic(data: &[u8], offset: usize) -> Result<[u8; 4], FormatError> {
    check_range("magic", offset as u64, 4, data.len())?;
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&data[offset..offset + 4]);
    Ok(magic)
}

/// Reads a little endian `T` occupying `size` bytes at `offset`.
pub(crate) fn read_at<T>(
    data: &[u8],
    name: &'static str,
    offset: u64,
    size: u64,
    args: T::Args,
) -> Result<T, FormatError>
where
    T: BinRead,
{
    check_range(name, offset, size, data.len())?;
    let mut reader = Cursor::new(data);
    reader.seek(SeekFrom::Start(offset)).map_err(binrw::error::Error::Io)?;
    let value = reader.read_le_args::<T>(args)?;
    Ok(value)
}

/// Reads `count` little endian `T` values with a stride of `stride` bytes starting at `offset`.
/// The entire range is checked before anything is read.
pub(crate) fn read_elements<T, F>(
    data: &[u8],
    name: &'static str,
    offset: u64,
    count: u32,
    stride: u64,
    args: F,
) -> Result<Vec<T>, FormatError>
where
    T: BinRead,
    F: Fn(usize) -> T::Args,
{
    check_range(name, offset, count as u64 * stride, data.len())?;

    let mut elements = Vec::with_capacity(count as usize);
    for i in 0..count as u64 {
        let element = read_at(data, name, offset + i * stride, stride, args(i as usize))?;
        elements.push(element);
    }
    Ok(elements)
}

/// Overwrites the little endian `u32` at `offset`.
pub(crate) fn write_u32_at(
    data: &mut [u8],
    name: &'static str,
    offset: u64,
    value: u32,
) -> Result<(), FormatError> {
    check_range(name, offset, 4, data.len())?;
    let start = offset as usize;
    LittleEndian::write_u32(&mut data[start..start + 4], value);
    Ok(())
}
