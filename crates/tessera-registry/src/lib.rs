//! Identity registry for Tessera containers.
//!
//! Every structural object in a container has exactly one [`ObjectId`]. The
//! [`IdentityRegistry`] owns the mapping between those identifiers and the
//! storage addresses of the objects, and persists it inside the container's
//! reserved namespace so it survives restarts and becomes durable in the same
//! flush as the structural change that caused it.
//!
//! # Layout
//!
//! ```text
//! __db__/version          u32, currently 1
//! __db__/root             identifier of the root group
//! __db__/ids/<uuid>       (address, kind)
//! __db__/addr/<address>   uuid
//! ```
//!
//! [`ObjectId`]: tessera_types::ObjectId

pub mod error;
pub mod layout;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use layout::{RESERVED_NAME, REGISTRY_VERSION};
pub use registry::{IdentityRegistry, RegistryEntry};
