#![no_main]

use libfuzzer_sys::fuzz_target;

use json_escape_scan::{
    EscapeScanner, ScanSettings, TailStrategy, first_escape_utf16_scalar,
    first_escape_utf16le_scalar,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let tail = if (data[0] & 1) != 0 {
        TailStrategy::Backfill
    } else {
        TailStrategy::Scalar
    };
    let num_units = data[1] as usize;
    let bytes = &data[2..];

    let scanner = EscapeScanner::new(
        ScanSettings::new()
            .tail_strategy(tail)
            .min_vector_units(0),
    )
    .unwrap();

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .take(num_units)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    let expected = first_escape_utf16_scalar(&units);
    assert_eq!(first_escape_utf16le_scalar(bytes, num_units), expected);
    assert_eq!(scanner.first_escape_utf16le(bytes, num_units), expected);
});
