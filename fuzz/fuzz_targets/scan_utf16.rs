#![no_main]

use libfuzzer_sys::fuzz_target;

use json_escape_scan::{EscapeScanner, ScanSettings, TailStrategy, first_escape_utf16_scalar};

const MAX_UNITS: usize = 4096;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let tail = if (data[0] & 1) != 0 {
        TailStrategy::Backfill
    } else {
        TailStrategy::Scalar
    };
    let bytes = &data[1..];
    let max_units = ((bytes.len() + 1) / 2).min(MAX_UNITS);

    let mut utf16 = Vec::with_capacity(max_units);
    for i in 0..max_units {
        let lo = bytes.get(i * 2).copied().unwrap_or(0);
        let hi = bytes.get(i * 2 + 1).copied().unwrap_or(0);
        utf16.push(u16::from_le_bytes([lo, hi]));
    }

    let scanner = EscapeScanner::new(
        ScanSettings::new()
            .tail_strategy(tail)
            .min_vector_units(0),
    )
    .unwrap();

    assert_eq!(
        scanner.first_escape_utf16(&utf16),
        first_escape_utf16_scalar(&utf16)
    );
});
