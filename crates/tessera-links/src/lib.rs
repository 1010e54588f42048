//! Link resolution for Tessera containers.
//!
//! Groups hold named links of three classes: hard links point at an object
//! record, soft links hold a path that is re-resolved on every traversal, and
//! external links name a path in another container. This crate walks paths
//! over that graph and maintains it.
//!
//! # Key Types
//!
//! - [`ObjectPath`] -- normalized absolute or relative path
//! - [`LinkResolver`] -- `resolve`, `create_link`, `remove_link`, `move_link`
//! - [`Resolved`] -- a local object or a distinguishable foreign reference
//!
//! # Rules
//!
//! 1. Soft links may form cycles; resolution fails with `LinkLoop` after
//!    [`MAX_SOFT_LINK_HOPS`] soft-link traversals.
//! 2. Hard links never make a group its own ancestor.
//! 3. Removing the last hard link to an object only reports it as orphaned;
//!    reclaiming it is the caller's decision.

pub mod error;
pub mod names;
pub mod path;
pub mod resolver;

pub use error::{LinkError, LinkResult};
pub use names::validate_link_name;
pub use path::ObjectPath;
pub use resolver::{LinkResolver, RemovedLink, Resolved, ResolvedObject, MAX_SOFT_LINK_HOPS};
