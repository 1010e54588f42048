//! Index builder for Tessera containers.
//!
//! [`IndexBuilder::rebuild`] discards the identity registry and repopulates
//! it by a depth-first walk from the root group. Every object reachable by
//! hard links receives exactly one fresh identifier, however many links lead
//! to it. Attributes are owned data of their object and are not indexed.
//!
//! Dangling soft links are counted and skipped; storage failures abort.

pub mod builder;
pub mod error;

pub use builder::{IndexBuilder, RebuildReport};
pub use error::{IndexError, IndexResult};
