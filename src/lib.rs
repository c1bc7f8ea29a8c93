#![doc = include_str!("../README.md")]

mod allow_list;
mod err;
mod policy;
mod scalar;
mod scanner;
mod settings;
mod simd;

#[cfg(feature = "perf-counters")]
pub mod perf;

pub use allow_list::{ALLOW_LIST, ASCII_LIMIT, CONTROL_LIMIT, ESCAPED_PUNCTUATION, allowed};
pub use err::{Error, Result};
pub use policy::{DefaultPolicy, EscapePolicy, MinimalPolicy, utf16le_units};
pub use scalar::{first_escape_utf8_scalar, first_escape_utf16_scalar, first_escape_utf16le_scalar};
pub use scanner::EscapeScanner;
pub use settings::{Backend, ScanSettings, TailStrategy};
pub use simd::{backend_name, vector_available};

/// Returned by the `find_first_to_escape_*` functions when no unit needs escaping.
pub const NO_ESCAPE: isize = -1;

/// UTF-8 bytes per vector block.
pub const UTF8_BLOCK: usize = 16;

/// UTF-16 code units per vector block.
pub const UTF16_BLOCK: usize = 8;

/// Converts a scan result to its `-1`-sentinel form.
///
/// Built-in scan results always fit. A policy answer above `isize::MAX` has no
/// sentinel form; it saturates to `isize::MAX` so it still reads as "escape
/// needed" and never collides with [`NO_ESCAPE`].
#[inline]
pub fn to_sentinel(index: Option<usize>) -> isize {
    match index {
        None => NO_ESCAPE,
        Some(idx) => isize::try_from(idx).unwrap_or(isize::MAX),
    }
}

/// Inverse of [`to_sentinel`]; any negative value means "nothing to escape".
#[inline]
pub fn from_sentinel(index: isize) -> Option<usize> {
    usize::try_from(index).ok()
}

/// Index of the first UTF-16 code unit that needs escaping, or [`NO_ESCAPE`].
///
/// When `policy` is given, it decides alone and its answer is returned as is.
/// Empty input returns [`NO_ESCAPE`] without consulting the policy.
#[inline]
pub fn find_first_to_escape_utf16(units: &[u16], policy: Option<&dyn EscapePolicy>) -> isize {
    match policy {
        Some(policy) => EscapeScanner::default()
            .with_policy(policy)
            .find_first_to_escape_utf16(units),
        None => EscapeScanner::default().find_first_to_escape_utf16(units),
    }
}

/// Index of the first UTF-8 byte that needs escaping, or [`NO_ESCAPE`].
///
/// Same policy semantics as [`find_first_to_escape_utf16`].
#[inline]
pub fn find_first_to_escape_utf8(bytes: &[u8], policy: Option<&dyn EscapePolicy>) -> isize {
    match policy {
        Some(policy) => EscapeScanner::default()
            .with_policy(policy)
            .find_first_to_escape_utf8(bytes),
        None => EscapeScanner::default().find_first_to_escape_utf8(bytes),
    }
}

/// Index of the first UTF-16 code unit that needs escaping under the built-in set.
#[inline]
pub fn first_escape_utf16(units: &[u16]) -> Option<usize> {
    EscapeScanner::default().first_escape_utf16(units)
}

/// Index of the first UTF-8 byte that needs escaping under the built-in set.
#[inline]
pub fn first_escape_utf8(bytes: &[u8]) -> Option<usize> {
    EscapeScanner::default().first_escape_utf8(bytes)
}

/// Index (in code units) of the first UTF-16LE code unit that needs escaping.
///
/// - `utf16le` is a byte slice containing little-endian UTF-16 code units.
/// - `num_units` is the number of code units to read (not bytes); it is
///   clamped to `utf16le.len() / 2`.
#[inline]
pub fn first_escape_utf16le(utf16le: &[u8], num_units: usize) -> Option<usize> {
    EscapeScanner::default().first_escape_utf16le(utf16le, num_units)
}

#[inline]
pub fn needs_escaping_utf16(units: &[u16]) -> bool {
    first_escape_utf16(units).is_some()
}

#[inline]
pub fn needs_escaping_utf8(bytes: &[u8]) -> bool {
    first_escape_utf8(bytes).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_conversions() {
        assert_eq!(to_sentinel(None), NO_ESCAPE);
        assert_eq!(to_sentinel(Some(7)), 7);
        assert_eq!(from_sentinel(-1), None);
        assert_eq!(from_sentinel(-42), None);
        assert_eq!(from_sentinel(3), Some(3));
    }

    #[test]
    fn test_out_of_range_policy_index_is_not_no_escape() {
        assert_eq!(to_sentinel(Some(isize::MAX as usize)), isize::MAX);
        assert_eq!(to_sentinel(Some(usize::MAX)), isize::MAX);
        assert_ne!(to_sentinel(Some(usize::MAX)), NO_ESCAPE);
    }
}
