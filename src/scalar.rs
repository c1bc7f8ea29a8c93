//! Scalar escape scanning.
//!
//! These routines are the reference semantics for every other scan path: one
//! unit at a time, each classified through the allow-list table. The vector
//! scanner uses them for inputs shorter than a block and for the sub-block
//! tail.

use crate::allow_list::{allowed, allowed_u16};

#[inline]
pub(crate) fn max_units(num_units: usize, byte_len: usize) -> usize {
    core::cmp::min(num_units, byte_len / 2)
}

#[inline(always)]
fn read_u16_le(bytes: &[u8], idx: usize) -> u16 {
    u16::from_le_bytes([bytes[idx * 2], bytes[idx * 2 + 1]])
}

/// First index `>= start` of a byte that is not on the allow-list.
#[inline]
pub(crate) fn find_utf8_from(bytes: &[u8], start: usize) -> Option<usize> {
    debug_assert!(start <= bytes.len());
    bytes[start..]
        .iter()
        .position(|&b| !allowed(b))
        .map(|pos| start + pos)
}

/// First index `>= start` of a code unit that is above `~` or not on the allow-list.
#[inline]
pub(crate) fn find_utf16_from(units: &[u16], start: usize) -> Option<usize> {
    debug_assert!(start <= units.len());
    units[start..]
        .iter()
        .position(|&u| !allowed_u16(u))
        .map(|pos| start + pos)
}

/// Same as [`find_utf16_from`], reading `max_units` little-endian code units from `bytes`.
#[inline]
pub(crate) fn find_utf16le_from(bytes: &[u8], max_units: usize, start: usize) -> Option<usize> {
    debug_assert!(max_units * 2 <= bytes.len());
    (start..max_units).find(|&idx| !allowed_u16(read_u16_le(bytes, idx)))
}

/// Scalar reference: index of the first UTF-8 byte that needs escaping.
#[inline]
pub fn first_escape_utf8_scalar(bytes: &[u8]) -> Option<usize> {
    find_utf8_from(bytes, 0)
}

/// Scalar reference: index of the first UTF-16 code unit that needs escaping.
#[inline]
pub fn first_escape_utf16_scalar(units: &[u16]) -> Option<usize> {
    find_utf16_from(units, 0)
}

/// Scalar reference for UTF-16LE bytes. `num_units` is clamped to `utf16le.len() / 2`.
#[inline]
pub fn first_escape_utf16le_scalar(utf16le: &[u8], num_units: usize) -> Option<usize> {
    let max_units = max_units(num_units, utf16le.len());
    find_utf16le_from(utf16le, max_units, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_offset_skips_earlier_matches() {
        let bytes = b"<ab<cd";
        assert_eq!(find_utf8_from(bytes, 0), Some(0));
        assert_eq!(find_utf8_from(bytes, 1), Some(3));
        assert_eq!(find_utf8_from(bytes, 4), None);
        assert_eq!(find_utf8_from(bytes, bytes.len()), None);
    }

    #[test]
    fn test_utf16_non_ascii() {
        let units: Vec<u16> = "caf\u{e9}".encode_utf16().collect();
        assert_eq!(first_escape_utf16_scalar(&units), Some(3));
    }

    #[test]
    fn test_utf16le_ignores_dangling_byte() {
        // "AB" followed by a dangling 0x3C that would be '<' if it were a unit.
        let bytes = [b'A', 0x00, b'B', 0x00, 0x3C];
        assert_eq!(first_escape_utf16le_scalar(&bytes, 3), None);
        assert_eq!(first_escape_utf16le_scalar(&bytes, 1), None);
    }

    #[test]
    fn test_utf16le_reads_high_byte() {
        // U+0161: low byte 'a', high byte 0x01.
        let bytes = [b'a', 0x00, 0x61, 0x01];
        assert_eq!(first_escape_utf16le_scalar(&bytes, 2), Some(1));
    }
}
