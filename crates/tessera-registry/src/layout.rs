//! Key layout of the registry inside the reserved namespace.

use tessera_types::{Address, ObjectId};

/// Top-level name of the reserved namespace. Never valid as a link name in
/// the root group.
pub const RESERVED_NAME: &str = "__db__";

/// Current layout version written to `__db__/version`.
pub const REGISTRY_VERSION: u32 = 1;

pub(crate) const PREFIX: &str = "__db__/";
pub(crate) const VERSION_KEY: &str = "__db__/version";
pub(crate) const ROOT_KEY: &str = "__db__/root";
pub(crate) const IDS_PREFIX: &str = "__db__/ids/";
pub(crate) const ADDR_PREFIX: &str = "__db__/addr/";

pub(crate) fn id_key(id: &ObjectId) -> String {
    format!("{IDS_PREFIX}{id}")
}

pub(crate) fn addr_key(address: Address) -> String {
    format!("{ADDR_PREFIX}{address}")
}
