#![no_main]

use libfuzzer_sys::fuzz_target;

use json_escape_scan::{
    EscapeScanner, ScanSettings, TailStrategy, first_escape_utf8, first_escape_utf8_scalar,
};

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

    let scanner = EscapeScanner::new(
        ScanSettings::new()
            .tail_strategy(tail)
            .min_vector_units(0),
    )
    .unwrap();

    let expected = first_escape_utf8_scalar(bytes);
    assert_eq!(scanner.first_escape_utf8(bytes), expected);
    assert_eq!(first_escape_utf8(bytes), expected);
});
