//! The default escape set and its 256-entry allow-list.
//!
//! A unit needs escaping when it is a control character, one of the
//! HTML/JS-sensitive punctuation characters below, or anything above `~`.

/// Units strictly below this value are control characters.
pub const CONTROL_LIMIT: u8 = 0x20;

/// Highest unit value that can be emitted without escaping.
pub const ASCII_LIMIT: u8 = 0x7E;

/// Printable ASCII characters that are always escaped.
pub const ESCAPED_PUNCTUATION: [u8; 8] = [b'"', b'&', b'\'', b'+', b'<', b'>', b'\\', b'`'];

/// `ALLOW_LIST[b]` is true when byte `b` may appear unescaped in a JSON string.
pub static ALLOW_LIST: [bool; 256] = build_allow_list();

const fn build_allow_list() -> [bool; 256] {
    let mut table = [false; 256];
    let mut byte = CONTROL_LIMIT as usize;
    while byte <= ASCII_LIMIT as usize {
        table[byte] = true;
        byte += 1;
    }

    let mut i = 0;
    while i < ESCAPED_PUNCTUATION.len() {
        table[ESCAPED_PUNCTUATION[i] as usize] = false;
        i += 1;
    }
    table
}

/// Returns true when `byte` may be copied verbatim into a JSON string literal.
#[inline(always)]
pub fn allowed(byte: u8) -> bool {
    ALLOW_LIST[byte as usize]
}

/// Returns true when the UTF-16 code unit may be copied verbatim.
#[inline(always)]
pub fn allowed_u16(unit: u16) -> bool {
    unit <= ASCII_LIMIT as u16 && allowed(unit as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_escape_set() {
        for byte in 0u8..=255 {
            let expected = (0x20..=0x7E).contains(&byte) && !ESCAPED_PUNCTUATION.contains(&byte);
            assert_eq!(allowed(byte), expected, "byte {:#04x}", byte);
        }
    }

    #[test]
    fn test_allowed_count() {
        // 95 printable ASCII characters minus the 8 escaped ones.
        assert_eq!(ALLOW_LIST.iter().filter(|&&a| a).count(), 87);
    }

    #[test]
    fn test_u16_above_byte_range_is_never_allowed() {
        assert!(allowed_u16(b'a' as u16));
        assert!(!allowed_u16(0x7F));
        // Low byte is 'a' but the unit is U+0161.
        assert!(!allowed_u16(0x0161));
        assert!(!allowed_u16(0xD83D));
    }
}
