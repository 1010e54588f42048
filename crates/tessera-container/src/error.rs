use tessera_index::IndexError;
use tessera_links::LinkError;
use tessera_registry::RegistryError;
use tessera_select::SelectError;
use tessera_store::StoreError;
use tessera_types::{ErrorKind, ObjectId, TypeError};

/// Errors surfaced by the container facade.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// A named item other than a path component does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is never permitted on this target.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The container carries no identity registry; rebuild it first.
    #[error("container has no identity registry")]
    Unindexed,

    #[error("object {0} is not a group")]
    NotAGroup(ObjectId),

    #[error("object {0} is not a dataset")]
    NotADataset(ObjectId),

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Stored state contradicts itself.
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Links(#[from] LinkError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Select(#[from] SelectError),
}

impl ContainerError {
    /// Taxonomy classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Unindexed => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotAGroup(_) | Self::NotADataset(_) => ErrorKind::TypeMismatch,
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::ConfigIo(_) => ErrorKind::StorageIO,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Type(err) => match err {
                TypeError::InvalidId(_) => ErrorKind::NotFound,
                TypeError::InvalidAddress(_) => ErrorKind::Internal,
                TypeError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
                TypeError::CountMismatch { .. } => ErrorKind::ShapeMismatch,
                TypeError::ShapeTooLarge { .. } => ErrorKind::InvalidResize,
            },
            Self::Store(err) => err.kind(),
            Self::Registry(err) => err.kind(),
            Self::Links(err) => err.kind(),
            Self::Index(err) => err.kind(),
            Self::Select(err) => err.kind(),
        }
    }
}

/// Result alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{Address, StatusClass};

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err: ContainerError = LinkError::LinkLoop {
            path: "/a".into(),
            hops: 33,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::LinkLoop);

        let err: ContainerError = SelectError::InvalidStep { dim: 0, step: 0 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidStep);

        let err: ContainerError = StoreError::NotFound(Address::new(4)).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn read_only_is_forbidden() {
        let err: ContainerError = StoreError::ReadOnly.into();
        assert_eq!(err.kind().status(), StatusClass::Forbidden);
        let err = ContainerError::Forbidden("read-only".into());
        assert_eq!(err.kind().status().code(), 403);
    }

    #[test]
    fn type_errors_classify() {
        let err: ContainerError = TypeError::TypeMismatch {
            expected: "int8".into(),
            value: "300".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let err: ContainerError = TypeError::CountMismatch {
            expected: 4,
            actual: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        let err: ContainerError = TypeError::ShapeTooLarge {
            shape: vec![1 << 40],
            limit: 16,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidResize);
    }
}
