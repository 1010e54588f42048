//! Foundation types for Tessera.
//!
//! This crate provides the identity, addressing, value and error-classification
//! types shared by every other Tessera crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Stable, path-independent identifier of a structural object (UUID v7)
//! - [`Address`] -- Storage address of an object record inside a container
//! - [`ObjectKind`] -- Group, Dataset, or committed Datatype
//! - [`ElementType`] / [`Scalar`] / [`AttributeValue`] -- Typed element values
//! - [`MaxExtent`] -- Per-dimension growth cap of a dataset
//! - [`Timestamp`] -- UTC timestamp rendered as ISO-8601 with a trailing `Z`
//! - [`ErrorKind`] / [`StatusClass`] -- Error taxonomy and its HTTP status mapping

pub mod address;
pub mod error;
pub mod object;
pub mod shape;
pub mod status;
pub mod timestamp;
pub mod value;

pub use address::Address;
pub use error::TypeError;
pub use object::{ObjectId, ObjectKind};
pub use shape::{dense_len, element_count, MaxExtent, MAX_ELEMENTS};
pub use status::{ErrorKind, StatusClass};
pub use timestamp::Timestamp;
pub use value::{AttributeValue, ElementType, Scalar};
