use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidId(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("value {value} is not representable as {expected}")]
    TypeMismatch { expected: String, value: String },

    #[error("value count mismatch: shape holds {expected} elements, got {actual}")]
    CountMismatch { expected: u64, actual: u64 },

    #[error("shape {shape:?} exceeds the limit of {limit} elements")]
    ShapeTooLarge { shape: Vec<u64>, limit: u64 },
}
