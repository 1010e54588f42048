use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_types::{Address, ElementType, MaxExtent, ObjectId, ObjectKind, Scalar};

/// Class of a link as reported by listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkClass {
    Hard,
    Soft,
    External,
}

impl fmt::Display for LinkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
            Self::External => write!(f, "external"),
        }
    }
}

/// One link of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub name: String,
    pub class: LinkClass,
    /// Identifier of a hard link's target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_kind: Option<ObjectKind>,
    /// Target path of a soft or external link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Container named by an external link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Filter and pagination for [`Container::list_links`].
///
/// `marker` names the link after which the listing starts; `limit` caps the
/// number of links returned after filtering.
///
/// [`Container::list_links`]: crate::Container::list_links
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkQuery {
    pub class: Option<LinkClass>,
    /// Keep only hard links whose target has this kind.
    pub target_kind: Option<ObjectKind>,
    pub marker: Option<String>,
    pub limit: Option<usize>,
}

impl LinkQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub(crate) fn admits(&self, link: &LinkInfo) -> bool {
        if self.class.is_some_and(|class| class != link.class) {
            return false;
        }
        match self.target_kind {
            Some(kind) => link.target_kind == Some(kind),
            None => true,
        }
    }
}

/// Metadata of one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub attribute_count: usize,
    /// Hard links in the container that target this object.
    pub hard_links: u32,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub created: String,
    pub last_modified: String,
    /// Number of links held (groups only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_count: Option<usize>,
    /// Element type (datasets and committed datatypes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<ElementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_shape: Option<Vec<MaxExtent>>,
}

/// Number of indexed objects per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Includes the root group.
    pub groups: usize,
    pub datasets: usize,
    pub datatypes: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.groups + self.datasets + self.datatypes
    }
}

/// One row of the identity registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub address: Address,
}

/// Parameters of a new dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub dtype: ElementType,
    pub shape: Vec<u64>,
    /// Per-dimension growth caps; `None` makes the initial shape final.
    pub max_shape: Option<Vec<MaxExtent>>,
}

impl DatasetSpec {
    pub fn new(dtype: ElementType, shape: Vec<u64>) -> Self {
        Self {
            dtype,
            shape,
            max_shape: None,
        }
    }

    pub fn with_max_shape(mut self, max_shape: Vec<MaxExtent>) -> Self {
        self.max_shape = Some(max_shape);
        self
    }
}

/// A dense block of values read from or written to a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayData {
    /// Extents of the block; reduced dimensions are absent.
    pub shape: Vec<u64>,
    /// Row-major values.
    pub values: Vec<Scalar>,
}

impl ArrayData {
    pub fn new(shape: Vec<u64>, values: Vec<Scalar>) -> Self {
        Self { shape, values }
    }

    /// A one-dimensional block.
    pub fn vector(values: Vec<Scalar>) -> Self {
        Self {
            shape: vec![values.len() as u64],
            values,
        }
    }

    /// A rank-0 block holding one value.
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Self {
            shape: Vec::new(),
            values: vec![value.into()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
