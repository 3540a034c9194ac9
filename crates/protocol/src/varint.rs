//! Variable-length integer encoding.
//!
//! The status query protocol frames everything with VarInts: 32-bit signed
//! integers encoded seven bits at a time, least-significant group first,
//! with the high bit of each byte marking continuation. An encoded value
//! occupies between one and five bytes; negative values always take five.

use crate::error::{ProtocolError, Result};

/// Maximum number of bytes an encoded VarInt may occupy.
pub const MAX_VARINT_BYTES: usize = 5;

/// Appends `value` to `buf` in VarInt encoding.
pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut remaining = value as u32;
    loop {
        let byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Decodes a VarInt from the front of `buf`.
///
/// Returns `Ok(None)` if `buf` ends before the final byte of the value,
/// so callers reading from a stream can accumulate more input and retry.
/// On success returns the value and the number of bytes consumed.
pub fn read_varint(buf: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value: u32 = 0;
    for (index, &byte) in buf.iter().enumerate() {
        value |= u32::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(Some((value as i32, index + 1)));
        }
        if index + 1 == MAX_VARINT_BYTES {
            return Err(ProtocolError::VarIntTooLong);
        }
    }
    Ok(None)
}
