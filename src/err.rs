use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors.
///
/// Scanning itself is total and never fails; only building a scanner from
/// settings can.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown scan backend `{value}`, expected one of `auto`, `scalar`, `vector`")]
    UnknownBackend { value: String },

    #[error("unknown tail strategy `{value}`, expected one of `scalar`, `backfill`")]
    UnknownTailStrategy { value: String },

    #[error("vector scan backend requested, but no vector path is available on {arch}")]
    VectorBackendUnavailable { arch: &'static str },
}
