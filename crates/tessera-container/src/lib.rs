//! Container facade for Tessera.
//!
//! [`Container`] is the handle every operation goes through. It owns the
//! storage backend, the identity registry, the link resolver and the index
//! builder of one container, and keeps them consistent: a structural change
//! and the registry update it implies are persisted together or not at all.
//!
//! # Operations
//!
//! - Lifecycle -- `create`, `open`, `in_memory`, `from_store`
//! - Structure -- groups, datasets, committed datatypes, hard/soft/external links
//! - Attributes -- typed values attached to any object
//! - Data -- region, hyperslab and point reads and writes, `extend`
//! - Maintenance -- `rebuild`, `collect_garbage`, `counts`, `index_entries`
//!
//! # Example
//!
//! ```
//! use tessera_container::{Container, DatasetSpec};
//! use tessera_types::ElementType;
//!
//! let c = Container::in_memory().unwrap();
//! let root = c.root_id().unwrap();
//! let g1 = c.create_group(root, "g1").unwrap();
//! let g2 = c.create_group(root, "g2").unwrap();
//! c.link_hard(g2, "hlink", g1).unwrap();
//! assert_eq!(c.resolve_id("/g2/hlink").unwrap(), g1);
//!
//! let spec = DatasetSpec::new(ElementType::Int32, vec![4]);
//! let d = c.create_dataset(g1, "d", &spec).unwrap();
//! assert_eq!(c.read(d, "1:3").unwrap().shape, vec![2]);
//! ```

mod attributes;
pub mod config;
pub mod container;
mod data;
pub mod error;
pub mod info;

pub use config::ContainerConfig;
pub use container::Container;
pub use error::{ContainerError, ContainerResult};
pub use info::{
    ArrayData, Counts, DatasetSpec, IndexEntry, LinkClass, LinkInfo, LinkQuery, ObjectInfo,
};

pub use tessera_index::RebuildReport;
pub use tessera_links::{Resolved, ResolvedObject};
pub use tessera_select::ResizeMode;
pub use tessera_store::SyncMode;
