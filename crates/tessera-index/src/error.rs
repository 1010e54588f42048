use tessera_links::LinkError;
use tessera_registry::RegistryError;
use tessera_store::StoreError;
use tessera_types::{Address, ErrorKind};

/// Errors that abort a rebuild.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The container has no root group.
    #[error("container has no root group")]
    NoRoot,

    /// A hard link points at an address holding no record.
    #[error("hard link to missing record at address {0}")]
    BrokenHardLink(Address),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Links(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRoot => ErrorKind::NotFound,
            Self::BrokenHardLink(_) => ErrorKind::Internal,
            Self::Registry(e) => e.kind(),
            Self::Links(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

/// Result alias for index builder operations.
pub type IndexResult<T> = Result<T, IndexError>;
