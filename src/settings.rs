use std::fmt;
use std::str::FromStr;

use crate::UTF16_BLOCK;
use crate::err::Error;

/// Which scan implementation an [`EscapeScanner`](crate::EscapeScanner) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Vector path when the target has one, scalar otherwise.
    #[default]
    Auto,
    /// Always the scalar reference scanner.
    Scalar,
    /// Always the vector path; building a scanner fails if there is none.
    Vector,
}

/// How the vector scanner handles the units left over after the last full block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailStrategy {
    /// Scan the exact remainder with the scalar scanner.
    #[default]
    Scalar,
    /// Re-load one full block ending at the end of the input and mask off the
    /// lanes that were already scanned.
    ///
    /// Only taken when the input holds at least one block, so the extra load
    /// never leaves the borrowed slice. Shorter inputs use the scalar tail.
    Backfill,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "scalar" => Ok(Backend::Scalar),
            "vector" | "simd" => Ok(Backend::Vector),
            _ => Err(Error::UnknownBackend {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Auto => "auto",
            Backend::Scalar => "scalar",
            Backend::Vector => "vector",
        };
        f.write_str(name)
    }
}

impl FromStr for TailStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Ok(TailStrategy::Scalar),
            "backfill" => Ok(TailStrategy::Backfill),
            _ => Err(Error::UnknownTailStrategy {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TailStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TailStrategy::Scalar => "scalar",
            TailStrategy::Backfill => "backfill",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    backend: Backend,
    tail: TailStrategy,
    min_vector_units: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            backend: Backend::Auto,
            tail: TailStrategy::Scalar,
            min_vector_units: UTF16_BLOCK,
        }
    }
}

impl ScanSettings {
    pub fn new() -> Self {
        ScanSettings::default()
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn tail_strategy(mut self, tail: TailStrategy) -> Self {
        self.tail = tail;
        self
    }

    /// Inputs shorter than this many units are scanned by the scalar scanner.
    ///
    /// Values below one block width are raised to the block width of the
    /// input's unit type.
    pub fn min_vector_units(mut self, units: usize) -> Self {
        self.min_vector_units = units;
        self
    }

    pub fn get_backend(&self) -> Backend {
        self.backend
    }

    pub fn get_tail_strategy(&self) -> TailStrategy {
        self.tail
    }

    pub fn get_min_vector_units(&self) -> usize {
        self.min_vector_units
    }
}
