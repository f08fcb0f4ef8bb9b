use thiserror::Error;

/// Errors raised while decoding pre-pow headers or checking proofs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("invalid pre-pow length: expected {expected} bytes, got {actual}")]
    InvalidHeaderLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("proof verification failed: {0}")]
    Verification(&'static str),
}

pub type Result<T> = std::result::Result<T, PowError>;
