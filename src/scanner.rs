use log::{debug, trace};

use crate::err::{Error, Result};
use crate::policy::{DefaultPolicy, EscapePolicy};
use crate::settings::{Backend, ScanSettings};
#[cfg(feature = "perf-counters")]
use crate::perf::{self, ScanPath};
use crate::{UTF8_BLOCK, UTF16_BLOCK, scalar, simd, to_sentinel};

/// Finds the first unit that needs escaping, according to a [`ScanSettings`]
/// and an optional [`EscapePolicy`].
///
/// A scanner holds no buffers and can be shared freely between threads (as
/// long as its policy can).
#[derive(Debug, Clone)]
pub struct EscapeScanner<P = DefaultPolicy> {
    settings: ScanSettings,
    vector: bool,
    policy: Option<P>,
}

impl Default for EscapeScanner {
    fn default() -> Self {
        EscapeScanner {
            settings: ScanSettings::default(),
            vector: simd::vector_available(),
            policy: None,
        }
    }
}

impl EscapeScanner {
    /// Builds a scanner using the built-in escape set.
    ///
    /// Fails if `Backend::Vector` is requested on a target without a vector path.
    pub fn new(settings: ScanSettings) -> Result<Self> {
        let vector = simd::vector_available();
        if settings.get_backend() == Backend::Vector && !vector {
            return Err(Error::VectorBackendUnavailable {
                arch: std::env::consts::ARCH,
            });
        }

        debug!(
            "escape scanner: backend={}, tail={}, min_vector_units={}, vector path={}",
            settings.get_backend(),
            settings.get_tail_strategy(),
            settings.get_min_vector_units(),
            if vector { simd::backend_name() } else { "none" }
        );

        Ok(EscapeScanner {
            settings,
            vector,
            policy: None,
        })
    }
}

impl<P: EscapePolicy> EscapeScanner<P> {
    /// Installs `policy`; it replaces the built-in scan for every non-empty input.
    pub fn with_policy<Q: EscapePolicy>(self, policy: Q) -> EscapeScanner<Q> {
        EscapeScanner {
            settings: self.settings,
            vector: self.vector,
            policy: Some(policy),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn policy(&self) -> Option<&P> {
        self.policy.as_ref()
    }

    fn use_vector(&self, len: usize, block: usize) -> bool {
        match self.settings.get_backend() {
            Backend::Scalar => false,
            Backend::Vector => self.vector,
            Backend::Auto => self.vector && len >= self.settings.get_min_vector_units().max(block),
        }
    }

    /// Index of the first UTF-16 code unit that needs escaping.
    pub fn first_escape_utf16(&self, units: &[u16]) -> Option<usize> {
        if units.is_empty() {
            return None;
        }

        if let Some(policy) = &self.policy {
            trace!("delegating {} UTF-16 units to escape policy", units.len());
            #[cfg(feature = "perf-counters")]
            perf::record_scan(units.len(), ScanPath::Policy);
            return policy.first_escape_utf16(units);
        }

        if self.use_vector(units.len(), UTF16_BLOCK) {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(units.len(), ScanPath::Vector);
            simd::find_utf16_vector(units, 0, self.settings.get_tail_strategy())
        } else {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(units.len(), ScanPath::Scalar);
            scalar::find_utf16_from(units, 0)
        }
    }

    /// Index of the first UTF-8 byte that needs escaping.
    pub fn first_escape_utf8(&self, bytes: &[u8]) -> Option<usize> {
        if bytes.is_empty() {
            return None;
        }

        if let Some(policy) = &self.policy {
            trace!("delegating {} UTF-8 bytes to escape policy", bytes.len());
            #[cfg(feature = "perf-counters")]
            perf::record_scan(bytes.len(), ScanPath::Policy);
            return policy.first_escape_utf8(bytes);
        }

        if self.use_vector(bytes.len(), UTF8_BLOCK) {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(bytes.len(), ScanPath::Vector);
            simd::find_utf8_vector(bytes, 0, self.settings.get_tail_strategy())
        } else {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(bytes.len(), ScanPath::Scalar);
            scalar::find_utf8_from(bytes, 0)
        }
    }

    /// Index (in code units) of the first UTF-16LE code unit that needs escaping.
    ///
    /// `num_units` is clamped to `utf16le.len() / 2`; a dangling odd byte is ignored.
    pub fn first_escape_utf16le(&self, utf16le: &[u8], num_units: usize) -> Option<usize> {
        let max_units = scalar::max_units(num_units, utf16le.len());
        if max_units == 0 {
            return None;
        }

        if let Some(policy) = &self.policy {
            trace!("delegating {} UTF-16LE units to escape policy", max_units);
            #[cfg(feature = "perf-counters")]
            perf::record_scan(max_units, ScanPath::Policy);
            return policy.first_escape_utf16le(&utf16le[..max_units * 2]);
        }

        if self.use_vector(max_units, UTF16_BLOCK) {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(max_units, ScanPath::Vector);
            simd::find_utf16le_vector(utf16le, max_units, 0, self.settings.get_tail_strategy())
        } else {
            #[cfg(feature = "perf-counters")]
            perf::record_scan(max_units, ScanPath::Scalar);
            scalar::find_utf16le_from(utf16le, max_units, 0)
        }
    }

    /// Like [`first_escape_utf16`](Self::first_escape_utf16), with `-1` meaning "nothing to escape".
    pub fn find_first_to_escape_utf16(&self, units: &[u16]) -> isize {
        to_sentinel(self.first_escape_utf16(units))
    }

    /// Like [`first_escape_utf8`](Self::first_escape_utf8), with `-1` meaning "nothing to escape".
    pub fn find_first_to_escape_utf8(&self, bytes: &[u8]) -> isize {
        to_sentinel(self.first_escape_utf8(bytes))
    }

    pub fn needs_escaping_utf16(&self, units: &[u16]) -> bool {
        self.first_escape_utf16(units).is_some()
    }

    pub fn needs_escaping_utf8(&self, bytes: &[u8]) -> bool {
        self.first_escape_utf8(bytes).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TailStrategy;
    use std::cell::Cell;

    struct CountingPolicy {
        calls: Cell<usize>,
        answer: Option<usize>,
    }

    impl EscapePolicy for CountingPolicy {
        fn first_escape_utf16(&self, _units: &[u16]) -> Option<usize> {
            self.calls.set(self.calls.get() + 1);
            self.answer
        }

        fn first_escape_utf8(&self, _bytes: &[u8]) -> Option<usize> {
            self.calls.set(self.calls.get() + 1);
            self.answer
        }

        fn first_escape_utf16le(&self, _utf16le: &[u8]) -> Option<usize> {
            self.calls.set(self.calls.get() + 1);
            self.answer
        }
    }

    fn all_settings() -> Vec<ScanSettings> {
        let mut out = Vec::new();
        for backend in [Backend::Auto, Backend::Scalar] {
            for tail in [TailStrategy::Scalar, TailStrategy::Backfill] {
                out.push(ScanSettings::new().backend(backend).tail_strategy(tail));
                out.push(
                    ScanSettings::new()
                        .backend(backend)
                        .tail_strategy(tail)
                        .min_vector_units(0),
                );
            }
        }
        out
    }

    #[test]
    fn test_empty_input_skips_policy() {
        let scanner = EscapeScanner::default().with_policy(CountingPolicy {
            calls: Cell::new(0),
            answer: Some(0),
        });
        assert_eq!(scanner.first_escape_utf8(&[]), None);
        assert_eq!(scanner.first_escape_utf16(&[]), None);
        assert_eq!(scanner.first_escape_utf16le(&[b'a'], 1), None);
        assert_eq!(scanner.policy().map(|p| p.calls.get()), Some(0));
    }

    #[test]
    fn test_policy_called_once_and_passed_through() {
        let scanner = EscapeScanner::default().with_policy(CountingPolicy {
            calls: Cell::new(0),
            answer: None,
        });
        // "<" would be escaped by the built-in set.
        assert_eq!(scanner.find_first_to_escape_utf8(b"<<<<"), -1);
        assert_eq!(scanner.policy().map(|p| p.calls.get()), Some(1));
    }

    #[test]
    fn test_all_settings_agree_with_scalar_reference() {
        let mut units: Vec<u16> = "the quick brown fox jumps over the lazy dog".encode_utf16().collect();
        units[37] = 0x00E9;
        let bytes: Vec<u8> = units.iter().map(|&u| u as u8).collect();

        for settings in all_settings() {
            let scanner = EscapeScanner::new(settings).unwrap();
            for len in 0..=units.len() {
                assert_eq!(
                    scanner.first_escape_utf16(&units[..len]),
                    scalar::find_utf16_from(&units[..len], 0),
                    "{settings:?} len={len}"
                );
                assert_eq!(
                    scanner.first_escape_utf8(&bytes[..len]),
                    scalar::find_utf8_from(&bytes[..len], 0),
                    "{settings:?} len={len}"
                );
            }
        }
    }

    #[test]
    fn test_vector_backend_is_rejected_without_vector_path() {
        let result = EscapeScanner::new(ScanSettings::new().backend(Backend::Vector));
        if simd::vector_available() {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(Error::VectorBackendUnavailable { .. })
            ));
        }
    }
}
