//! Marshalling codec for module linear memory
//!
//! Every function takes the raw byte view of one module's memory plus an
//! address inside it. Nothing here caches a view: callers re-fetch the slice
//! from the module before each call because memory may grow in between.
//!
//! All accesses are bounds-checked and fail with [`BridgeError::OutOfBounds`].

use crate::error::BridgeError;

/// Width of one argument slot in the variadic calling convention
pub const ARG_SLOT: u32 = 4;

fn span(buf_len: usize, addr: u32, len: usize) -> Result<std::ops::Range<usize>, BridgeError> {
    let start = addr as usize;
    start
        .checked_add(len)
        .filter(|end| *end <= buf_len)
        .map(|end| start..end)
        .ok_or(BridgeError::OutOfBounds {
            addr,
            len,
            size: buf_len,
        })
}

/// Borrow `len` bytes starting at `addr`
pub fn read_bytes(buf: &[u8], addr: u32, len: usize) -> Result<&[u8], BridgeError> {
    let range = span(buf.len(), addr, len)?;
    Ok(&buf[range])
}

/// Copy `bytes` into the buffer starting at `addr`
pub fn write_bytes(buf: &mut [u8], addr: u32, bytes: &[u8]) -> Result<(), BridgeError> {
    let range = span(buf.len(), addr, bytes.len())?;
    buf[range].copy_from_slice(bytes);
    Ok(())
}

/// Set `len` bytes starting at `addr` to `value`
pub fn fill(buf: &mut [u8], addr: u32, value: u8, len: usize) -> Result<(), BridgeError> {
    let range = span(buf.len(), addr, len)?;
    buf[range].fill(value);
    Ok(())
}

/// Read a little-endian 32-bit integer
pub fn read_i32(buf: &[u8], addr: u32) -> Result<i32, BridgeError> {
    let bytes = read_bytes(buf, addr, 4)?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian 32-bit unsigned integer (pointers, packed colors)
pub fn read_u32(buf: &[u8], addr: u32) -> Result<u32, BridgeError> {
    read_i32(buf, addr).map(|v| v as u32)
}

/// Write a little-endian 32-bit integer
pub fn write_i32(buf: &mut [u8], addr: u32, value: i32) -> Result<(), BridgeError> {
    write_bytes(buf, addr, &value.to_le_bytes())
}

/// Read an IEEE-754 single from 4 little-endian bytes
pub fn read_f32(buf: &[u8], addr: u32) -> Result<f32, BridgeError> {
    read_u32(buf, addr).map(f32::from_bits)
}

/// Read a zero-terminated UTF-8 string
///
/// Invalid UTF-8 sequences are replaced rather than rejected. Fails when no
/// terminator exists between `addr` and the end of the buffer.
pub fn read_cstring(buf: &[u8], addr: u32) -> Result<String, BridgeError> {
    let start = addr as usize;
    let tail = buf.get(start..).ok_or(BridgeError::OutOfBounds {
        addr,
        len: 1,
        size: buf.len(),
    })?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(BridgeError::OutOfBounds {
            addr,
            len: tail.len() + 1,
            size: buf.len(),
        })?;
    Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
}

/// Write `value` followed by a zero byte
///
/// The caller owns the destination region; this does not allocate.
pub fn write_cstring(buf: &mut [u8], addr: u32, value: &str) -> Result<(), BridgeError> {
    let bytes = value.as_bytes();
    let range = span(buf.len(), addr, bytes.len() + 1)?;
    let (text, nul) = buf[range].split_at_mut(bytes.len());
    text.copy_from_slice(bytes);
    nul[0] = 0;
    Ok(())
}

/// Expand a printf-style template against arguments stored at `args_addr`
///
/// Supported conversions are `%s` (pointer to a C string), `%d` (signed
/// 32-bit integer) and `%f` (32-bit float). Each one consumes one 4-byte
/// slot regardless of its kind. Any other `%x` pair is copied through as-is
/// without consuming a slot, and a trailing `%` is kept literally. Older
/// hosts advanced the argument cursor on every `%` pair, so templates that
/// mix `%%` with arguments read different slots here.
pub fn format_template(buf: &[u8], template: &str, args_addr: u32) -> Result<String, BridgeError> {
    let mut out = String::with_capacity(template.len());
    let mut cursor = args_addr;
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => {
                let ptr = read_u32(buf, cursor)?;
                out.push_str(&read_cstring(buf, ptr)?);
                cursor = cursor.wrapping_add(ARG_SLOT);
            }
            Some('d') => {
                out.push_str(&read_i32(buf, cursor)?.to_string());
                cursor = cursor.wrapping_add(ARG_SLOT);
            }
            Some('f') => {
                out.push_str(&read_f32(buf, cursor)?.to_string());
                cursor = cursor.wrapping_add(ARG_SLOT);
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    Ok(out)
}
