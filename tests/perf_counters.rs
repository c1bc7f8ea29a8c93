#![cfg(feature = "perf-counters")]

use json_escape_scan::perf;
use json_escape_scan::{EscapeScanner, MinimalPolicy, ScanSettings};
use pretty_assertions::assert_eq;

// Counters are process-global; keep every assertion in one test.
#[test]
fn test_counters_track_dispatch_path() {
    perf::reset();

    let scanner = EscapeScanner::new(ScanSettings::new()).unwrap();
    scanner.first_escape_utf8(b"short");
    scanner.first_escape_utf8(&[b'a'; 100]);
    scanner.first_escape_utf16(&[]);
    EscapeScanner::default()
        .with_policy(MinimalPolicy)
        .first_escape_utf8(b"abc");

    let stats = perf::snapshot();
    assert_eq!(stats.calls, 3);
    assert_eq!(stats.units, 108);
    assert_eq!(stats.policy_calls, 1);
    assert_eq!(stats.scalar_calls + stats.vector_calls, 2);
    if json_escape_scan::vector_available() {
        assert_eq!(stats.vector_calls, 1);
    }
    assert_eq!(stats.buckets[0], 2);
    assert_eq!(stats.buckets[4], 1);

    perf::reset();
    assert_eq!(perf::snapshot().calls, 0);
}
