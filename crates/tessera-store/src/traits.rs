use tessera_types::Address;

use crate::error::StoreResult;
use crate::record::ObjectRecord;

/// Storage backend for one container.
///
/// All implementations must satisfy these invariants:
/// - `allocate()` never returns an address twice, even after `delete()`.
/// - Mutations are visible to subsequent reads immediately and become durable
///   together on `flush()`; a crash before `flush()` loses all of them.
/// - The reserved namespace is invisible to the object graph: it holds opaque
///   bytes keyed by strings and is never reachable through a link.
pub trait ContainerStore: Send + Sync {
    /// Address of the root group, if the container has been initialised.
    fn root(&self) -> StoreResult<Option<Address>>;

    /// Record the root group's address.
    fn set_root(&self, address: Address) -> StoreResult<()>;

    /// Reserve a fresh address for a new record.
    fn allocate(&self) -> StoreResult<Address>;

    /// Read a record. Returns `Ok(None)` if no record exists at `address`.
    fn read(&self, address: Address) -> StoreResult<Option<ObjectRecord>>;

    /// Create or replace the record at `address`.
    fn write(&self, address: Address, record: &ObjectRecord) -> StoreResult<()>;

    /// Delete a record. Returns `true` if it existed.
    fn delete(&self, address: Address) -> StoreResult<bool>;

    /// Every address that currently holds a record, ascending.
    fn addresses(&self) -> StoreResult<Vec<Address>>;

    /// Read a value from the reserved namespace.
    fn read_reserved(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a value into the reserved namespace.
    fn write_reserved(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Delete a reserved key. Returns `true` if it existed.
    fn delete_reserved(&self, key: &str) -> StoreResult<bool>;

    /// Reserved keys starting with `prefix`, ascending.
    fn reserved_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Make every mutation since the last flush durable, atomically.
    fn flush(&self) -> StoreResult<()>;

    /// Discard unflushed mutations, restoring the last durable state.
    ///
    /// Backends without durable state have nothing to restore and keep the
    /// default no-op.
    fn revert(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Returns `true` if every mutation fails with `StoreError::ReadOnly`.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Read a record that must exist.
    fn read_existing(&self, address: Address) -> StoreResult<ObjectRecord> {
        self.read(address)?
            .ok_or(crate::error::StoreError::NotFound(address))
    }

    /// Delete every reserved key under `prefix`. Returns how many were removed.
    fn clear_reserved(&self, prefix: &str) -> StoreResult<usize> {
        let keys = self.reserved_keys(prefix)?;
        let mut removed = 0;
        for key in &keys {
            if self.delete_reserved(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
