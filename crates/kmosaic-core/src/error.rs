use thiserror::Error;

/// Failure modes for the wire-format encoders/decoders in [`crate::serialize`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{field}: truncated input, need at least {expected_at_least} bytes, got {got}")]
    Truncated {
        field: &'static str,
        expected_at_least: usize,
        got: usize,
    },
    #[error("{extra} trailing byte(s) after a fully parsed value")]
    TrailingBytes { extra: usize },
    #[error("{field}: length {len} exceeds cap {cap}")]
    LengthOverflow {
        field: &'static str,
        len: u32,
        cap: u32,
    },
    #[error("{field}: expected exactly {expected} bytes, got {got}")]
    BadFixedSize {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("expected {expected} parts, got {got}")]
    BadPartCount { expected: usize, got: usize },
}

/// Top-level error type returned by every public entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("invalid seed: {reason}")]
    InvalidSeed { reason: String },

    #[error("invalid randomness: {reason}")]
    InvalidRandomness { reason: String },

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("signing failed after {attempts} rejection-sampling attempts")]
    SigningFailure { attempts: u32 },

    #[error("invalid key state: {reason}")]
    InvalidKeyState { reason: String },

    #[error("no secure RNG backend available on this platform")]
    RngUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
