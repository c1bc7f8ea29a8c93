//! Escaping policies.
//!
//! An installed policy fully replaces the built-in scan for a call: its result
//! is returned as is, and neither the allow-list nor the vector path is
//! consulted.

use std::sync::Arc;

use crate::allow_list::CONTROL_LIMIT;

/// Decides which unit is the first one that has to be escaped.
///
/// Implementations are never called with empty input.
pub trait EscapePolicy {
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize>;

    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize>;

    /// Little-endian UTF-16 input; `utf16le.len()` is always even and the
    /// result is a code unit index. [`utf16le_units`] decodes in place.
    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize>;
}

/// Decodes little-endian byte pairs into code units; a dangling odd byte is skipped.
#[inline]
pub fn utf16le_units(utf16le: &[u8]) -> impl Iterator<Item = u16> + '_ {
    utf16le.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]))
}

impl<P: EscapePolicy + ?Sized> EscapePolicy for &P {
    #[inline]
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        (**self).first_escape_utf16(units)
    }

    #[inline]
    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        (**self).first_escape_utf8(bytes)
    }

    #[inline]
    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize> {
        (**self).first_escape_utf16le(utf16le)
    }
}

impl<P: EscapePolicy + ?Sized> EscapePolicy for Box<P> {
    #[inline]
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        (**self).first_escape_utf16(units)
    }

    #[inline]
    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        (**self).first_escape_utf8(bytes)
    }

    #[inline]
    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize> {
        (**self).first_escape_utf16le(utf16le)
    }
}

impl<P: EscapePolicy + ?Sized> EscapePolicy for Arc<P> {
    #[inline]
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        (**self).first_escape_utf16(units)
    }

    #[inline]
    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        (**self).first_escape_utf8(bytes)
    }

    #[inline]
    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize> {
        (**self).first_escape_utf16le(utf16le)
    }
}

/// The built-in escape set, with vector acceleration where available.
///
/// Mostly useful as a building block for policies that want to extend the
/// default set rather than replace it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl EscapePolicy for DefaultPolicy {
    #[inline]
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        crate::first_escape_utf16(units)
    }

    #[inline]
    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        crate::first_escape_utf8(bytes)
    }

    #[inline]
    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize> {
        crate::first_escape_utf16le(utf16le, utf16le.len() / 2)
    }
}

/// Escapes only what a JSON string literal strictly requires: control
/// characters, `"` and `\`.
///
/// HTML-sensitive characters and non-ASCII text pass through unescaped, so the
/// output must not be embedded in HTML or `<script>` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimalPolicy;

#[inline(always)]
fn minimal_needs_escape(unit: u16) -> bool {
    unit < CONTROL_LIMIT as u16 || unit == b'"' as u16 || unit == b'\\' as u16
}

impl EscapePolicy for MinimalPolicy {
    fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        units.iter().position(|&u| minimal_needs_escape(u))
    }

    fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().position(|&b| minimal_needs_escape(b as u16))
    }

    fn first_escape_utf16le(&self, utf16le: &[u8]) -> Option<usize> {
        utf16le_units(utf16le).position(minimal_needs_escape)
    }
}
