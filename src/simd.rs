// This module intentionally uses raw pointers and SIMD intrinsics.
//
// We keep the `unsafe` surface area small (the architecture glue and the block
// loads) and accompany every raw pointer read with an explicit `SAFETY:` comment.
#![allow(unsafe_op_in_unsafe_fn)]
//! SIMD front-end for escape scanning.
//!
//! Strategy:
//! - Load one block (16 UTF-8 bytes or 8 UTF-16 code units), OR together the
//!   compares for every escape condition, and collapse the lanes into an
//!   integer bitmask.
//! - A zero mask skips the whole block; otherwise the lowest set bit gives the
//!   first offending lane.
//! - Whatever is left below one block goes to the scalar scanner, or, with
//!   [`TailStrategy::Backfill`], to one more block that ends exactly at the end
//!   of the input with the revisited lanes masked off.
//!
//! Implementations:
//! - x86_64: SSE2 (runtime detected)
//! - aarch64: NEON (baseline)

use std::sync::OnceLock;

use log::debug;

use crate::settings::TailStrategy;

// ---------------------------------------------------------------------------
// Macro structure
//
// The block loop is identical across input representations (`&[u8]`, `&[u16]`,
// UTF-16LE bytes) and across architectures. Each architecture module provides
// a shim with stable names:
// - `load_u8 / load_utf16 / load_utf16le(ptr, idx) -> Vec`
// - `u8_consts() / u16_consts()`
// - `u8_scan / u16_scan(Vec, &U8Consts / &U16Consts) -> u64` (the collapsed bitmask)
// - `U8_BITS_PER_UNIT / U16_BITS_PER_UNIT` and the matching tail mask tables
//
// `impl_arch_find!` expands the scan functions on top of that shim.
// ---------------------------------------------------------------------------

macro_rules! find_in_blocks {
    (
        len: $len:expr,
        start: $start:expr,
        backfill: $backfill:expr,
        block: $block:expr,
        bits_per_unit: $bits:expr,
        tail_masks: $tail_masks:expr,
        scan: |$at:ident| $scan:expr,
        scalar_tail: |$from:ident| $scalar:expr $(,)?
    ) => {{
        let len: usize = $len;
        let mut idx: usize = $start;

        while idx + $block <= len {
            let $at = idx;
            let mask: u64 = $scan;
            if mask != 0 {
                return Some(idx + (mask.trailing_zeros() / $bits) as usize);
            }
            idx += $block;
        }

        let remainder = len - idx;
        if remainder == 0 {
            return None;
        }

        // The backfilled block starts at `len - block`, which is only in bounds
        // when the view itself holds at least one block.
        if $backfill && len >= $block {
            let $at = len - $block;
            let mask: u64 = $scan & $tail_masks[remainder];
            if mask == 0 {
                return None;
            }
            return Some(len - $block + (mask.trailing_zeros() / $bits) as usize);
        }

        let $from = idx;
        $scalar
    }};
}

macro_rules! impl_arch_find {
    ($(#[$m:meta])*) => {
        $(#[$m])*
        pub unsafe fn find_utf8_simd(bytes: &[u8], start: usize, backfill: bool) -> Option<usize> {
            let src_ptr = bytes.as_ptr();
            let consts = u8_consts();
            find_in_blocks!(
                len: bytes.len(),
                start: start,
                backfill: backfill,
                block: crate::UTF8_BLOCK,
                bits_per_unit: U8_BITS_PER_UNIT,
                tail_masks: U8_TAIL_MASKS,
                scan: |at| u8_scan(load_u8(src_ptr, at), &consts),
                scalar_tail: |from| crate::scalar::find_utf8_from(bytes, from),
            )
        }

        $(#[$m])*
        pub unsafe fn find_utf16_simd(units: &[u16], start: usize, backfill: bool) -> Option<usize> {
            let src_ptr = units.as_ptr();
            let consts = u16_consts();
            find_in_blocks!(
                len: units.len(),
                start: start,
                backfill: backfill,
                block: crate::UTF16_BLOCK,
                bits_per_unit: U16_BITS_PER_UNIT,
                tail_masks: U16_TAIL_MASKS,
                scan: |at| u16_scan(load_utf16(src_ptr, at), &consts),
                scalar_tail: |from| crate::scalar::find_utf16_from(units, from),
            )
        }

        $(#[$m])*
        pub unsafe fn find_utf16le_simd(
            utf16le: &[u8],
            max_units: usize,
            start: usize,
            backfill: bool,
        ) -> Option<usize> {
            assert!(max_units * 2 <= utf16le.len());
            let src_ptr = utf16le.as_ptr();
            let consts = u16_consts();
            find_in_blocks!(
                len: max_units,
                start: start,
                backfill: backfill,
                block: crate::UTF16_BLOCK,
                bits_per_unit: U16_BITS_PER_UNIT,
                tail_masks: U16_TAIL_MASKS,
                scan: |at| u16_scan(load_utf16le(src_ptr, at), &consts),
                scalar_tail: |from| crate::scalar::find_utf16le_from(utf16le, max_units, from),
            )
        }
    };
}

/// Backfill masks indexed by remainder length.
///
/// `masks[r]` clears the bits of the `BLOCK - r` leading lanes of a block that
/// were already cleared by the main loop. `masks[0]` is never consulted.
const fn tail_masks<const BLOCK: usize>(bits_per_unit: u32) -> [u64; BLOCK] {
    let mut masks = [u64::MAX; BLOCK];
    let mut remainder = 1;
    while remainder < BLOCK {
        let skip = (BLOCK - remainder) as u32 * bits_per_unit;
        masks[remainder] = !((1u64 << skip) - 1);
        remainder += 1;
    }
    masks
}

static VECTOR_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether this target has a vector scan path.
///
/// Detection runs once per process; the result is cached.
pub fn vector_available() -> bool {
    *VECTOR_AVAILABLE.get_or_init(|| {
        let available = detect_vector();
        debug!(
            "escape scan vector path: {}",
            if available { backend_name() } else { "unavailable" }
        );
        available
    })
}

/// Name of the vector instruction set used on this target.
pub fn backend_name() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "sse2"
    } else if cfg!(target_arch = "aarch64") {
        "neon"
    } else {
        "scalar"
    }
}

fn detect_vector() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("sse2")
    }

    #[cfg(target_arch = "aarch64")]
    {
        // NEON is mandatory on aarch64.
        true
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

/// Vectorized scan over UTF-8 bytes starting at `start`.
///
/// Falls back to the scalar scanner when no vector path exists.
#[inline]
pub fn find_utf8_vector(bytes: &[u8], start: usize, tail: TailStrategy) -> Option<usize> {
    assert!(start <= bytes.len());
    let backfill = tail == TailStrategy::Backfill;

    #[cfg(target_arch = "x86_64")]
    {
        if vector_available() {
            // SAFETY:
            // - We only call the SSE2 implementation when the CPU reports SSE2
            //   support.
            // - The implementation is `#[target_feature(enable = "sse2")]` so
            //   it may freely use SSE2 intrinsics.
            // - Every block load is bounds-checked by the loop condition.
            unsafe {
                return x86::find_utf8_simd(bytes, start, backfill);
            }
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON baseline on aarch64 + `#[target_feature(enable = "neon")]`.
        unsafe {
            return neon::find_utf8_simd(bytes, start, backfill);
        }
    }

    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = backfill;
        crate::scalar::find_utf8_from(bytes, start)
    }
}

/// Vectorized scan over UTF-16 code units starting at `start`.
#[inline]
pub fn find_utf16_vector(units: &[u16], start: usize, tail: TailStrategy) -> Option<usize> {
    assert!(start <= units.len());
    let backfill = tail == TailStrategy::Backfill;

    #[cfg(target_arch = "x86_64")]
    {
        if vector_available() {
            // SAFETY: runtime-detected SSE2 + `#[target_feature(enable = "sse2")]`.
            unsafe {
                return x86::find_utf16_simd(units, start, backfill);
            }
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON baseline on aarch64 + `#[target_feature(enable = "neon")]`.
        unsafe {
            return neon::find_utf16_simd(units, start, backfill);
        }
    }

    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = backfill;
        crate::scalar::find_utf16_from(units, start)
    }
}

/// Vectorized scan over `max_units` little-endian code units stored in `utf16le`.
#[inline]
pub fn find_utf16le_vector(
    utf16le: &[u8],
    max_units: usize,
    start: usize,
    tail: TailStrategy,
) -> Option<usize> {
    assert!(start <= max_units);
    let backfill = tail == TailStrategy::Backfill;

    #[cfg(target_arch = "x86_64")]
    {
        if vector_available() {
            // SAFETY: runtime-detected SSE2 + `#[target_feature(enable = "sse2")]`.
            unsafe {
                return x86::find_utf16le_simd(utf16le, max_units, start, backfill);
            }
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON baseline on aarch64 + `#[target_feature(enable = "neon")]`.
        unsafe {
            return neon::find_utf16le_simd(utf16le, max_units, start, backfill);
        }
    }

    #[cfg(not(target_arch = "aarch64"))]
    {
        let _ = backfill;
        crate::scalar::find_utf16le_from(utf16le, max_units, start)
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use core::arch::x86_64::*;

    use crate::allow_list::{ASCII_LIMIT, ESCAPED_PUNCTUATION};
    use crate::{UTF8_BLOCK, UTF16_BLOCK};

    // Architecture glue layer for SSE2.
    //
    // All functions are `unsafe` because:
    // - they are `#[target_feature(enable = "sse2")]`
    // - they operate on raw pointers
    type Vec = __m128i;

    // `_mm_movemask_epi8` yields one bit per byte.
    const U8_BITS_PER_UNIT: u32 = 1;
    const U16_BITS_PER_UNIT: u32 = 2;

    static U8_TAIL_MASKS: [u64; UTF8_BLOCK] = super::tail_masks::<UTF8_BLOCK>(U8_BITS_PER_UNIT);
    static U16_TAIL_MASKS: [u64; UTF16_BLOCK] =
        super::tail_masks::<UTF16_BLOCK>(U16_BITS_PER_UNIT);

    struct U8Consts {
        zero: Vec,
        ctrl_mask: Vec,
        del: Vec,
        punct: [Vec; 8],
    }

    struct U16Consts {
        zero: Vec,
        ctrl_mask: Vec,
        hi_mask: Vec,
        del: Vec,
        punct: [Vec; 8],
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn load_u8(src_ptr: *const u8, idx: usize) -> Vec {
        // SAFETY: Caller guarantees `src_ptr` is valid for 16 bytes at `idx`.
        // The block loop only calls this when `idx + 16 <= bytes.len()`.
        _mm_loadu_si128(src_ptr.add(idx) as *const __m128i)
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn load_utf16(src_ptr: *const u16, idx: usize) -> Vec {
        // SAFETY: Caller guarantees `src_ptr` is valid for 8 `u16`s at `idx`.
        _mm_loadu_si128(src_ptr.add(idx) as *const __m128i)
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn load_utf16le(src_ptr: *const u8, idx: usize) -> Vec {
        // SAFETY: Caller guarantees `src_ptr` is valid for 16 bytes at `idx*2`.
        // `max_units` is clamped to `utf16le.len()/2`, so the load stays in-bounds.
        _mm_loadu_si128(src_ptr.add(idx * 2) as *const __m128i)
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn u8_consts() -> U8Consts {
        let mut punct = [_mm_setzero_si128(); 8];
        for (lane, &p) in punct.iter_mut().zip(ESCAPED_PUNCTUATION.iter()) {
            *lane = _mm_set1_epi8(p as i8);
        }
        U8Consts {
            zero: _mm_setzero_si128(),
            ctrl_mask: _mm_set1_epi8(0xE0u8 as i8),
            del: _mm_set1_epi8((ASCII_LIMIT + 1) as i8),
            punct,
        }
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn u16_consts() -> U16Consts {
        let mut punct = [_mm_setzero_si128(); 8];
        for (lane, &p) in punct.iter_mut().zip(ESCAPED_PUNCTUATION.iter()) {
            *lane = _mm_set1_epi16(p as i16);
        }
        U16Consts {
            zero: _mm_setzero_si128(),
            ctrl_mask: _mm_set1_epi16(0xFFE0u16 as i16),
            hi_mask: _mm_set1_epi16(0xFF80u16 as i16),
            del: _mm_set1_epi16((ASCII_LIMIT + 1) as i16),
            punct,
        }
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn u8_scan(v: Vec, c: &U8Consts) -> u64 {
        // (v & 0xE0) == 0 <=> v < 0x20
        let is_ctrl = _mm_cmpeq_epi8(_mm_and_si128(v, c.ctrl_mask), c.zero);
        let is_del = _mm_cmpeq_epi8(v, c.del);
        let mut needs = _mm_or_si128(is_ctrl, is_del);
        for p in &c.punct {
            needs = _mm_or_si128(needs, _mm_cmpeq_epi8(v, *p));
        }
        // OR in `v` itself so bytes >= 0x80 contribute their sign bit.
        let bad_mask = _mm_movemask_epi8(_mm_or_si128(needs, v));
        (bad_mask as u32 & 0xFFFF) as u64
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn u16_scan(v: Vec, c: &U16Consts) -> u64 {
        let high = _mm_and_si128(v, c.hi_mask);
        let ascii = _mm_cmpeq_epi16(high, c.zero);
        let ascii_mask = _mm_movemask_epi8(ascii); // 0xFFFF if every lane < 0x80

        let is_ctrl = _mm_cmpeq_epi16(_mm_and_si128(v, c.ctrl_mask), c.zero);
        let is_del = _mm_cmpeq_epi16(v, c.del);
        let mut needs = _mm_or_si128(is_ctrl, is_del);
        for p in &c.punct {
            needs = _mm_or_si128(needs, _mm_cmpeq_epi16(v, *p));
        }
        let needs_mask = _mm_movemask_epi8(needs);

        let bad_mask = (!ascii_mask) | needs_mask;
        (bad_mask as u32 & 0xFFFF) as u64
    }

    impl_arch_find!(
        #[inline]
        #[target_feature(enable = "sse2")]
    );
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use core::arch::aarch64::*;

    use crate::allow_list::{ASCII_LIMIT, CONTROL_LIMIT, ESCAPED_PUNCTUATION};
    use crate::{UTF8_BLOCK, UTF16_BLOCK};

    // Architecture glue layer for NEON.
    //
    // NEON is baseline on aarch64, but Rust still marks calls to
    // `#[target_feature(enable = "neon")]` fns as `unsafe`.
    //
    // NEON has no movemask; the u8 path narrows each lane to a nibble
    // (`vshrn_n_u16`) and the u16 path narrows each lane to a byte (`vqmovn_u16`).
    const U8_BITS_PER_UNIT: u32 = 4;
    const U16_BITS_PER_UNIT: u32 = 8;

    static U8_TAIL_MASKS: [u64; UTF8_BLOCK] = super::tail_masks::<UTF8_BLOCK>(U8_BITS_PER_UNIT);
    static U16_TAIL_MASKS: [u64; UTF16_BLOCK] =
        super::tail_masks::<UTF16_BLOCK>(U16_BITS_PER_UNIT);

    struct U8Consts {
        ctrl: uint8x16_t,
        ascii_limit: uint8x16_t,
        punct: [uint8x16_t; 8],
    }

    struct U16Consts {
        ctrl: uint16x8_t,
        ascii_limit: uint16x8_t,
        punct: [uint16x8_t; 8],
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load_u8(src_ptr: *const u8, idx: usize) -> uint8x16_t {
        // SAFETY: Caller guarantees `src_ptr` is valid for 16 bytes at `idx`.
        vld1q_u8(src_ptr.add(idx))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load_utf16(src_ptr: *const u16, idx: usize) -> uint16x8_t {
        // SAFETY: Caller guarantees `src_ptr` is valid for 8 `u16`s at `idx`.
        vld1q_u16(src_ptr.add(idx))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load_utf16le(src_ptr: *const u8, idx: usize) -> uint16x8_t {
        // SAFETY: Caller guarantees `src_ptr` is valid for 16 bytes at `idx*2`
        // (same logic as the SSE2 version).
        vreinterpretq_u16_u8(vld1q_u8(src_ptr.add(idx * 2)))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn u8_consts() -> U8Consts {
        let mut punct = [vdupq_n_u8(0); 8];
        for (lane, &p) in punct.iter_mut().zip(ESCAPED_PUNCTUATION.iter()) {
            *lane = vdupq_n_u8(p);
        }
        U8Consts {
            ctrl: vdupq_n_u8(CONTROL_LIMIT),
            ascii_limit: vdupq_n_u8(ASCII_LIMIT),
            punct,
        }
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn u16_consts() -> U16Consts {
        let mut punct = [vdupq_n_u16(0); 8];
        for (lane, &p) in punct.iter_mut().zip(ESCAPED_PUNCTUATION.iter()) {
            *lane = vdupq_n_u16(p as u16);
        }
        U16Consts {
            ctrl: vdupq_n_u16(CONTROL_LIMIT as u16),
            ascii_limit: vdupq_n_u16(ASCII_LIMIT as u16),
            punct,
        }
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn u8_scan(v: uint8x16_t, c: &U8Consts) -> u64 {
        let is_ctrl = vcltq_u8(v, c.ctrl);
        let is_high = vcgtq_u8(v, c.ascii_limit);
        let mut needs = vorrq_u8(is_ctrl, is_high);
        for p in &c.punct {
            needs = vorrq_u8(needs, vceqq_u8(v, *p));
        }
        let nibbles = vshrn_n_u16(vreinterpretq_u16_u8(needs), 4);
        vget_lane_u64(vreinterpret_u64_u8(nibbles), 0)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn u16_scan(v: uint16x8_t, c: &U16Consts) -> u64 {
        let is_ctrl = vcltq_u16(v, c.ctrl);
        let is_high = vcgtq_u16(v, c.ascii_limit);
        let mut needs = vorrq_u16(is_ctrl, is_high);
        for p in &c.punct {
            needs = vorrq_u16(needs, vceqq_u16(v, *p));
        }
        let bad_u8 = vqmovn_u16(needs);
        vget_lane_u64(vreinterpret_u64_u8(bad_u8), 0)
    }

    impl_arch_find!(
        #[inline]
        #[target_feature(enable = "neon")]
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UTF8_BLOCK, UTF16_BLOCK};

    #[test]
    fn test_tail_masks_keep_only_unvisited_lanes() {
        let masks = tail_masks::<16>(1);
        // One unit left: only the last lane counts.
        assert_eq!(masks[1] & 0xFFFF, 0x8000);
        assert_eq!(masks[15] & 0xFFFF, 0xFFFE);

        let masks = tail_masks::<8>(2);
        assert_eq!(masks[1] & 0xFFFF, 0xC000);
        assert_eq!(masks[7] & 0xFFFF, 0xFFFC);

        // NEON u16: 8 bits per lane, 3 lanes left, 5 lanes (40 bits) revisited.
        let masks = tail_masks::<8>(8);
        assert_eq!(masks[3], 0xFFFF_FF00_0000_0000);
        assert_eq!(masks[1], 0xFF00_0000_0000_0000);
        assert_eq!(masks[7], 0xFFFF_FFFF_FFFF_FF00);

        // NEON u8: 4 bits per lane, 16 lanes fill the whole word.
        let masks = tail_masks::<16>(4);
        assert_eq!(masks[1], 0xF000_0000_0000_0000);
        assert_eq!(masks[15], 0xFFFF_FFFF_FFFF_FFF0);
    }

    #[test]
    fn test_block_constants() {
        assert_eq!(UTF8_BLOCK, 16);
        assert_eq!(UTF16_BLOCK, 8);
    }

    #[test]
    fn test_vector_matches_scalar_per_lane() {
        // Each candidate value at every lane of a two-block input.
        let candidates: [u16; 14] = [
            0x00, 0x1F, 0x20, b'"' as u16, b'&' as u16, b'\'' as u16, b'+' as u16, b'<' as u16,
            b'>' as u16, b'\\' as u16, b'`' as u16, 0x7E, 0x7F, 0x100,
        ];
        for &c in &candidates {
            for pos in 0..UTF8_BLOCK * 2 {
                let mut units = vec![b'a' as u16; UTF8_BLOCK * 2];
                units[pos] = c;
                let expected = crate::scalar::find_utf16_from(&units, 0);
                for tail in [TailStrategy::Scalar, TailStrategy::Backfill] {
                    assert_eq!(find_utf16_vector(&units, 0, tail), expected, "{c:#x} @ {pos}");
                }

                if c <= 0xFF {
                    let bytes: Vec<u8> = units.iter().map(|&u| u as u8).collect();
                    let expected = crate::scalar::find_utf8_from(&bytes, 0);
                    for tail in [TailStrategy::Scalar, TailStrategy::Backfill] {
                        assert_eq!(find_utf8_vector(&bytes, 0, tail), expected, "{c:#x} @ {pos}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_backfill_ignores_matches_before_start() {
        // Match at 2, scan starts at 3; the backfilled block covers index 2.
        let mut bytes = vec![b'a'; 20];
        bytes[2] = b'<';
        assert_eq!(find_utf8_vector(&bytes, 3, TailStrategy::Backfill), None);
        bytes[19] = b'>';
        assert_eq!(find_utf8_vector(&bytes, 3, TailStrategy::Backfill), Some(19));
    }
}
