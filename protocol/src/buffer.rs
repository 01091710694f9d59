//! Byte-buffer helpers used by every encoder and decoder.

use crate::error::{ProtocolError, Result};

/// Returns a new buffer holding `a` followed by `b`.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Concatenates any number of parts in order.
pub fn concat_all(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

pub fn zero_fill(buf: &mut [u8]) {
    buf.fill(0);
}

pub fn is_zeroed(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == 0)
}

pub fn read_u16_le(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_i32_le(buf: &[u8], offset: usize) -> Option<i32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Fails with [`ProtocolError::TooShort`] unless `buf` holds at least `needed` bytes.
pub fn require_len(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(ProtocolError::TooShort {
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Lowercase space-separated hex, the way packet captures are usually written.
pub fn hex(buf: &[u8]) -> String {
    buf.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
