use tessera_registry::RegistryError;
use tessera_store::StoreError;
use tessera_types::{Address, ErrorKind};

/// Errors from link resolution and link maintenance.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A path component names no link.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// A path component other than the last resolved to a non-group.
    #[error("not a group: {path}")]
    NotAGroup { path: String },

    /// A soft link's target path does not resolve.
    #[error("dangling soft link {path} -> {target}")]
    DanglingLink { path: String, target: String },

    /// Too many soft links were followed while resolving one path.
    #[error("too many soft links ({hops}) while resolving {path}")]
    LinkLoop { path: String, hops: u32 },

    /// The group already has a link with this name.
    #[error("link already exists: {name}")]
    NameConflict { name: String },

    /// The link name is not acceptable.
    #[error("invalid link name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The hard link would make a group its own ancestor.
    #[error("hard link {name} would create a cycle")]
    CyclicLink { name: String },

    /// An external link was met before the final path component.
    #[error("cannot traverse external link to {file}:{path}")]
    ExternalTraversal { file: String, path: String },

    /// A reachable object has no identifier.
    #[error("object at address {0} is reachable but not indexed")]
    Unindexed(Address),

    /// A hard link points at an address holding no record.
    #[error("hard link to missing record at address {0}")]
    BrokenHardLink(Address),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LinkError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NotAGroup { .. } => ErrorKind::NotFound,
            Self::DanglingLink { .. } => ErrorKind::DanglingLink,
            Self::LinkLoop { .. } => ErrorKind::LinkLoop,
            Self::NameConflict { .. } => ErrorKind::NameConflict,
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::CyclicLink { .. } => ErrorKind::CyclicLink,
            Self::ExternalTraversal { .. } => ErrorKind::NotImplemented,
            Self::Unindexed(_) | Self::BrokenHardLink(_) => ErrorKind::Internal,
            Self::Registry(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

/// Result alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
