use tessera_store::StoreError;
use tessera_types::{Address, ErrorKind, ObjectId};

/// Errors from identity registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No entry exists for the identifier.
    #[error("no object with identifier {0}")]
    NotFound(ObjectId),

    /// The object at this address already carries an identifier.
    #[error("object at address {address} already has identifier {existing}")]
    DuplicateAssignment { address: Address, existing: ObjectId },

    /// The reserved namespace holds a layout version this build cannot read.
    #[error("unsupported registry layout version {0}")]
    UnsupportedVersion(u32),

    /// The persisted registry contradicts itself.
    #[error("registry is inconsistent: {0}")]
    Inconsistent(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateAssignment { .. } => ErrorKind::DuplicateAssignment,
            Self::Inconsistent(_) => ErrorKind::Internal,
            Self::UnsupportedVersion(_) | Self::Serialization(_) => ErrorKind::StorageIO,
            Self::Store(e) => e.kind(),
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
