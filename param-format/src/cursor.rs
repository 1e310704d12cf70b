//! Bounded little-endian reads and writes over byte buffers
//!
//! Every read is *clamped*: a request that runs past the end of the buffer is
//! shortened to whatever remains (possibly nothing) instead of failing. Only
//! unpacking a fixed-width value from a clamped range is an error.

use crate::error::{ParamError, Result};

/// Return `buf[offset..offset + len]`, shortened to the end of `buf`
pub fn read_clamped(buf: &[u8], offset: usize, len: usize) -> &[u8] {
    let start = offset.min(buf.len());
    let end = offset.saturating_add(len).min(buf.len());
    &buf[start..end]
}

/// Read exactly `N` bytes, failing if the clamped range is shorter
fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let bytes = read_clamped(buf, offset, N);
    <[u8; N]>::try_from(bytes).map_err(|_| ParamError::ShortRead {
        offset,
        wanted: N,
        available: bytes.len(),
    })
}

/// Read a single unsigned byte
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    read_array::<1>(buf, offset).map(|b| b[0])
}

/// Read a 16-bit little-endian unsigned integer
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

/// Read a 32-bit little-endian unsigned integer
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

/// Read a single signed byte
pub fn read_i8(buf: &[u8], offset: usize) -> Result<i8> {
    read_array(buf, offset).map(i8::from_le_bytes)
}

/// Read a 16-bit little-endian signed integer
pub fn read_i16(buf: &[u8], offset: usize) -> Result<i16> {
    read_array(buf, offset).map(i16::from_le_bytes)
}

/// Read a 32-bit little-endian signed integer
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    read_array(buf, offset).map(i32::from_le_bytes)
}

/// Read a boolean stored in the low bit of one byte
pub fn read_bool(buf: &[u8], offset: usize) -> Result<bool> {
    read_u8(buf, offset).map(|b| b & 1 != 0)
}

/// Read a fixed-size opaque byte array
pub fn read_bytes<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    read_array(buf, offset)
}

/// Read a NUL-terminated UTF-8 string
///
/// Stops at the first zero byte (exclusive) or at the end of the buffer.
pub fn read_cstring(buf: &[u8], offset: usize) -> Result<String> {
    let tail = read_clamped(buf, offset, usize::MAX);
    let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8(tail[..len].to_vec()).map_err(|e| ParamError::Decode {
        offset: offset + e.utf8_error().valid_up_to(),
        reason: e.to_string(),
    })
}

/// Overwrite `value.len()` bytes at `offset` in place
///
/// Bytes that would land past the end of `buf` are dropped. Returns the
/// number of bytes actually written.
pub fn patch(buf: &mut [u8], offset: usize, value: &[u8]) -> usize {
    let start = offset.min(buf.len());
    let end = offset.saturating_add(value.len()).min(buf.len());
    let written = end - start;
    buf[start..end].copy_from_slice(&value[..written]);
    written
}

/// Return a copy of `buf` with `value` written at `offset`
///
/// The input buffer is never modified.
pub fn write_fixed(buf: &[u8], offset: usize, value: &[u8]) -> Vec<u8> {
    let mut out = buf.to_vec();
    patch(&mut out, offset, value);
    out
}
