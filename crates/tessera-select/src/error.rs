use tessera_types::ErrorKind;

/// Errors from selection parsing, binding, and resize planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    /// Step is zero or negative.
    #[error("invalid step {step} for dimension {dim}")]
    InvalidStep { dim: usize, step: i64 },

    /// An index or bound lies outside the dimension's current extent.
    #[error("selection out of bounds in dimension {dim}: {reason}")]
    OutOfBounds { dim: usize, reason: String },

    /// The selection text is malformed or does not fit the dataset's rank.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// Supplied values do not have the selection's shape.
    #[error("shape mismatch: selection is {expected:?}, values are {actual:?}")]
    ShapeMismatch { expected: Vec<u64>, actual: Vec<u64> },

    /// A requested shape change is not permitted.
    #[error("invalid resize: {0}")]
    InvalidResize(String),
}

impl SelectError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStep { .. } => ErrorKind::InvalidStep,
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::InvalidResize(_) => ErrorKind::InvalidResize,
        }
    }
}

/// Result alias for selection operations.
pub type SelectResult<T> = Result<T, SelectError>;
