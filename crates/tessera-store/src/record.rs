use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tessera_types::{
    dense_len, Address, AttributeValue, ElementType, MaxExtent, ObjectKind, Scalar, Timestamp,
    TypeError,
};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// A named edge stored in a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkRecord {
    /// Points at an object record in the same container.
    Hard(Address),
    /// Holds a path that is resolved each time the link is traversed.
    Soft(String),
    /// Names a path inside another container.
    External { file: String, path: String },
}

impl LinkRecord {
    /// Target address of a hard link.
    pub fn hard_target(&self) -> Option<Address> {
        match self {
            Self::Hard(addr) => Some(*addr),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Link table of a group. Insertion order is preserved for listing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub links: IndexMap<String, LinkRecord>,
}

impl GroupRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses targeted by hard links, in link order (duplicates kept).
    pub fn hard_targets(&self) -> impl Iterator<Item = Address> + '_ {
        self.links.values().filter_map(LinkRecord::hard_target)
    }
}

/// Dense, row-major array storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dtype: ElementType,
    pub shape: Vec<u64>,
    /// Per-dimension growth caps; same rank as `shape`.
    pub max_shape: Vec<MaxExtent>,
    /// `dense_len(shape)` values in row-major order.
    pub data: Vec<Scalar>,
}

impl DatasetRecord {
    /// A dataset filled with the element type's zero value.
    ///
    /// `max_shape` defaults to the initial shape (not extensible). Fails with
    /// `ShapeTooLarge` when the shape holds more than `MAX_ELEMENTS` elements.
    pub fn new(
        dtype: ElementType,
        shape: Vec<u64>,
        max_shape: Option<Vec<MaxExtent>>,
    ) -> Result<Self, TypeError> {
        let max_shape =
            max_shape.unwrap_or_else(|| shape.iter().map(|&e| MaxExtent::Fixed(e)).collect());
        let data = vec![dtype.zero(); dense_len(&shape)?];
        Ok(Self {
            dtype,
            shape,
            max_shape,
            data,
        })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// A committed element type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeRecord {
    pub dtype: ElementType,
}

/// Variant-specific part of an object record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectBody {
    Group(GroupRecord),
    Dataset(DatasetRecord),
    Datatype(DatatypeRecord),
}

// ---------------------------------------------------------------------------
// ObjectRecord
// ---------------------------------------------------------------------------

/// A structural object as persisted in the container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub body: ObjectBody,
    /// Attributes in insertion order.
    pub attributes: IndexMap<String, AttributeValue>,
    /// Number of hard links in the container that target this record.
    pub hard_links: u32,
    pub created: Timestamp,
    pub modified: Timestamp,
}

impl ObjectRecord {
    fn with_body(body: ObjectBody) -> Self {
        let now = Timestamp::now();
        Self {
            body,
            attributes: IndexMap::new(),
            hard_links: 0,
            created: now,
            modified: now,
        }
    }

    pub fn group() -> Self {
        Self::with_body(ObjectBody::Group(GroupRecord::new()))
    }

    pub fn dataset(dataset: DatasetRecord) -> Self {
        Self::with_body(ObjectBody::Dataset(dataset))
    }

    pub fn datatype(dtype: ElementType) -> Self {
        Self::with_body(ObjectBody::Datatype(DatatypeRecord { dtype }))
    }

    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Group(_) => ObjectKind::Group,
            ObjectBody::Dataset(_) => ObjectKind::Dataset,
            ObjectBody::Datatype(_) => ObjectKind::Datatype,
        }
    }

    /// Update the last-modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Timestamp::now();
    }

    pub fn as_group(&self) -> Option<&GroupRecord> {
        match &self.body {
            ObjectBody::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupRecord> {
        match &mut self.body {
            ObjectBody::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&DatasetRecord> {
        match &self.body {
            ObjectBody::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dataset_mut(&mut self) -> Option<&mut DatasetRecord> {
        match &mut self.body {
            ObjectBody::Dataset(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow the group body, or fail with [`StoreError::WrongKind`].
    pub fn expect_group(&self, address: Address) -> StoreResult<&GroupRecord> {
        let actual = self.kind();
        self.as_group().ok_or(StoreError::WrongKind {
            address,
            expected: ObjectKind::Group,
            actual,
        })
    }

    /// Mutably borrow the group body, or fail with [`StoreError::WrongKind`].
    pub fn expect_group_mut(&mut self, address: Address) -> StoreResult<&mut GroupRecord> {
        let actual = self.kind();
        self.as_group_mut().ok_or(StoreError::WrongKind {
            address,
            expected: ObjectKind::Group,
            actual,
        })
    }
}
