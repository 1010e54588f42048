//! Container storage for Tessera.
//!
//! A container is a set of object records keyed by [`Address`], one of which
//! is the root group, plus a reserved key/value namespace that never appears
//! in the user-visible link graph. The identity registry lives in that
//! reserved namespace.
//!
//! # Record Types
//!
//! - [`ObjectRecord`] -- common header: body, attributes, hard-link count, timestamps
//! - [`GroupRecord`] -- ordered mapping of link name to [`LinkRecord`]
//! - [`DatasetRecord`] -- element type, shape, max shape, row-major values
//! - [`DatatypeRecord`] -- a committed element type
//!
//! # Storage Backends
//!
//! All backends implement the [`ContainerStore`] trait:
//!
//! - [`InMemoryContainerStore`] -- image held behind a `RwLock`, for tests and embedding
//! - [`FileContainerStore`] -- the same image persisted as a single CRC-framed
//!   snapshot that is atomically replaced on every flush
//!
//! # Design Rules
//!
//! 1. Addresses are allocated monotonically and never reused.
//! 2. Mutations become durable only on `flush()`, all together.
//! 3. The store never interprets the reserved namespace; it is opaque bytes.
//! 4. All I/O errors are propagated, never silently ignored.
//!
//! [`Address`]: tessera_types::Address

pub mod error;
pub mod file;
pub mod image;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileContainerStore, SyncMode};
pub use image::ContainerImage;
pub use memory::InMemoryContainerStore;
pub use record::{DatasetRecord, DatatypeRecord, GroupRecord, LinkRecord, ObjectBody, ObjectRecord};
pub use traits::ContainerStore;
