use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identifier of a structural object (group, dataset, or datatype).
///
/// An `ObjectId` is independent of any path leading to the object: it survives
/// renames and hard-link aliasing, and it is never handed out twice within a
/// container. Identifiers are UUID v7 values, so fresh identifiers are
/// time-ordered and carry 74 random bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(uuid::Uuid);

impl ObjectId {
    /// Draw a fresh, time-ordered identifier (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }

    /// Parse the canonical hyphenated form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_id())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The variant of a structural object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Container of named links.
    Group,
    /// Typed, shaped, multi-dimensional array.
    Dataset,
    /// Committed (named) element type.
    Datatype,
}

impl ObjectKind {
    /// Collection name used in listings and the registry layout.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Group => "groups",
            Self::Dataset => "datasets",
            Self::Datatype => "datatypes",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Dataset => write!(f, "dataset"),
            Self::Datatype => write!(f, "datatype"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = ObjectId::generate();
        let b = ObjectId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_display_roundtrip() {
        let id = ObjectId::generate();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            ObjectId::parse("not-a-uuid"),
            Err(TypeError::InvalidId(_))
        ));
    }

    #[test]
    fn short_id_is_8_chars() {
        assert_eq!(ObjectId::generate().short_id().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn kind_collections() {
        assert_eq!(ObjectKind::Group.collection(), "groups");
        assert_eq!(ObjectKind::Dataset.collection(), "datasets");
        assert_eq!(ObjectKind::Datatype.collection(), "datatypes");
        assert_eq!(ObjectKind::Dataset.to_string(), "dataset");
    }
}
