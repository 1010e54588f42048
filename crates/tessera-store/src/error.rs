use std::path::PathBuf;

use tessera_types::{Address, ErrorKind, ObjectKind};

/// Errors from container storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists at the address.
    #[error("no object record at address {0}")]
    NotFound(Address),

    /// The record exists but is not of the expected kind.
    #[error("object at address {address} is a {actual}, expected a {expected}")]
    WrongKind {
        address: Address,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted snapshot failed its integrity checks.
    #[error("corrupt container {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The persisted snapshot was written by an unknown format version.
    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u32),

    /// A container already exists where a new one was to be created.
    #[error("container already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The store was opened read-only.
    #[error("store is read-only")]
    ReadOnly,
}

impl StoreError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::WrongKind { .. } => ErrorKind::Internal,
            Self::AlreadyExists(_) => ErrorKind::NameConflict,
            Self::ReadOnly => ErrorKind::Forbidden,
            Self::Serialization(_)
            | Self::Io(_)
            | Self::Corrupt { .. }
            | Self::UnsupportedVersion(_) => ErrorKind::StorageIO,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
