use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tessera_store::ContainerStore;
use tessera_types::{Address, ObjectId, ObjectKind};
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::layout::{
    addr_key, id_key, ADDR_PREFIX, IDS_PREFIX, PREFIX, REGISTRY_VERSION, ROOT_KEY, VERSION_KEY,
};

/// What an identifier points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub address: Address,
    pub kind: ObjectKind,
}

/// The identifier-to-object table of one container.
///
/// Lookups are answered from an in-memory cache. Every mutation writes the
/// reserved namespace through to the store immediately; it becomes durable
/// with the store's next `flush()`, together with the structural change that
/// caused it.
pub struct IdentityRegistry {
    store: Arc<dyn ContainerStore>,
    entries: BTreeMap<ObjectId, RegistryEntry>,
    by_address: HashMap<Address, ObjectId>,
    root: Option<ObjectId>,
    version: Option<u32>,
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("version", &self.version)
            .field("entries", &self.entries.len())
            .field("root", &self.root)
            .finish()
    }
}

impl IdentityRegistry {
    /// Load the registry persisted in `store`.
    ///
    /// A store without a `__db__/version` key yields an empty, uninitialised
    /// registry; see [`is_initialized`](Self::is_initialized).
    pub fn open(store: Arc<dyn ContainerStore>) -> RegistryResult<Self> {
        let mut registry = Self {
            store,
            entries: BTreeMap::new(),
            by_address: HashMap::new(),
            root: None,
            version: None,
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Discard the cache and re-read the reserved namespace.
    pub fn reload(&mut self) -> RegistryResult<()> {
        self.entries.clear();
        self.by_address.clear();
        self.root = None;
        self.version = None;

        let Some(raw) = self.store.read_reserved(VERSION_KEY)? else {
            debug!("no registry in container");
            return Ok(());
        };
        let version: u32 = decode(&raw)?;
        if version != REGISTRY_VERSION {
            return Err(RegistryError::UnsupportedVersion(version));
        }

        for key in self.store.reserved_keys(IDS_PREFIX)? {
            let id = ObjectId::parse(&key[IDS_PREFIX.len()..])
                .map_err(|e| RegistryError::Inconsistent(e.to_string()))?;
            let raw = self
                .store
                .read_reserved(&key)?
                .ok_or_else(|| RegistryError::Inconsistent(format!("{key} vanished")))?;
            let entry: RegistryEntry = decode(&raw)?;
            if let Some(other) = self.by_address.insert(entry.address, id) {
                return Err(RegistryError::Inconsistent(format!(
                    "address {} claimed by {other} and {id}",
                    entry.address
                )));
            }
            self.entries.insert(id, entry);
        }

        let addr_keys = self.store.reserved_keys(ADDR_PREFIX)?;
        if addr_keys.len() != self.entries.len() {
            return Err(RegistryError::Inconsistent(format!(
                "{} identifiers but {} address entries",
                self.entries.len(),
                addr_keys.len()
            )));
        }
        for key in addr_keys {
            let address: Address = key[ADDR_PREFIX.len()..]
                .parse()
                .map_err(|e: tessera_types::TypeError| RegistryError::Inconsistent(e.to_string()))?;
            let raw = self
                .store
                .read_reserved(&key)?
                .ok_or_else(|| RegistryError::Inconsistent(format!("{key} vanished")))?;
            let id: ObjectId = decode(&raw)?;
            if self.by_address.get(&address) != Some(&id) {
                return Err(RegistryError::Inconsistent(format!(
                    "address {address} maps to {id} but the identifier table disagrees"
                )));
            }
        }

        if let Some(raw) = self.store.read_reserved(ROOT_KEY)? {
            let root: ObjectId = decode(&raw)?;
            if !self.entries.contains_key(&root) {
                return Err(RegistryError::Inconsistent(format!(
                    "root {root} has no entry"
                )));
            }
            self.root = Some(root);
        }

        self.version = Some(version);
        debug!(entries = self.entries.len(), "loaded registry");
        Ok(())
    }

    /// Returns `true` once the reserved namespace carries a layout version.
    pub fn is_initialized(&self) -> bool {
        self.version.is_some()
    }

    /// Write the layout version if the registry is not yet initialised.
    pub fn initialize(&mut self) -> RegistryResult<()> {
        if self.version.is_none() {
            self.store
                .write_reserved(VERSION_KEY, &encode(&REGISTRY_VERSION)?)?;
            self.version = Some(REGISTRY_VERSION);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Give the object at `address` a fresh identifier.
    ///
    /// Fails with [`RegistryError::DuplicateAssignment`] if the object already
    /// has one.
    pub fn assign(&mut self, address: Address, kind: ObjectKind) -> RegistryResult<ObjectId> {
        if let Some(existing) = self.by_address.get(&address) {
            return Err(RegistryError::DuplicateAssignment {
                address,
                existing: *existing,
            });
        }
        self.initialize()?;

        let mut id = ObjectId::generate();
        while self.entries.contains_key(&id) {
            id = ObjectId::generate();
        }

        let entry = RegistryEntry { address, kind };
        self.store.write_reserved(&id_key(&id), &encode(&entry)?)?;
        self.store.write_reserved(&addr_key(address), &encode(&id)?)?;
        self.entries.insert(id, entry);
        self.by_address.insert(address, id);

        debug!(id = %id, address = %address, kind = %kind, "assigned identifier");
        Ok(id)
    }

    /// Remove the association for `id`. The identifier is never handed out again.
    pub fn release(&mut self, id: ObjectId) -> RegistryResult<RegistryEntry> {
        let entry = self.entries.remove(&id).ok_or(RegistryError::NotFound(id))?;
        self.by_address.remove(&entry.address);
        self.store.delete_reserved(&id_key(&id))?;
        self.store.delete_reserved(&addr_key(entry.address))?;
        if self.root == Some(id) {
            self.root = None;
            self.store.delete_reserved(ROOT_KEY)?;
        }
        debug!(id = %id, address = %entry.address, "released identifier");
        Ok(entry)
    }

    /// Record `id` as the root group's identifier.
    pub fn set_root(&mut self, id: ObjectId) -> RegistryResult<()> {
        self.lookup(id)?;
        self.store.write_reserved(ROOT_KEY, &encode(&id)?)?;
        self.root = Some(id);
        Ok(())
    }

    /// Drop every entry and the reserved namespace itself. Returns how many
    /// identifiers were discarded.
    pub fn clear(&mut self) -> RegistryResult<usize> {
        let discarded = self.entries.len();
        let keys = self.store.clear_reserved(PREFIX)?;
        self.entries.clear();
        self.by_address.clear();
        self.root = None;
        self.version = None;
        info!(identifiers = discarded, keys, "cleared registry");
        Ok(discarded)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Look up the object behind `id`.
    pub fn lookup(&self, id: ObjectId) -> RegistryResult<RegistryEntry> {
        self.entries.get(&id).copied().ok_or(RegistryError::NotFound(id))
    }

    pub fn get(&self, id: ObjectId) -> Option<RegistryEntry> {
        self.entries.get(&id).copied()
    }

    /// The identifier of the object stored at `address`, if it has one.
    pub fn lookup_address(&self, address: Address) -> Option<ObjectId> {
        self.by_address.get(&address).copied()
    }

    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    /// Every entry, ordered by identifier.
    ///
    /// The sequence is lazy and finite; calling `all()` again restarts it.
    pub fn all(&self) -> impl Iterator<Item = (ObjectId, RegistryEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, *entry))
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.entries.values().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn encode<T: Serialize>(value: &T) -> RegistryResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| RegistryError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> RegistryResult<T> {
    bincode::deserialize(bytes).map_err(|e| RegistryError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::InMemoryContainerStore;
    use tessera_types::ErrorKind;

    fn make_store() -> Arc<dyn ContainerStore> {
        Arc::new(InMemoryContainerStore::new())
    }

    fn make_registry() -> (Arc<dyn ContainerStore>, IdentityRegistry) {
        let store = make_store();
        let registry = IdentityRegistry::open(Arc::clone(&store)).unwrap();
        (store, registry)
    }

    #[test]
    fn empty_store_yields_uninitialized_registry() {
        let (_, registry) = make_registry();
        assert!(!registry.is_initialized());
        assert!(registry.is_empty());
        assert_eq!(registry.root(), None);
    }

    #[test]
    fn assign_and_lookup() {
        let (_, mut registry) = make_registry();
        let id = registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        let entry = registry.lookup(id).unwrap();
        assert_eq!(entry.address, Address::new(1));
        assert_eq!(entry.kind, ObjectKind::Group);
        assert_eq!(registry.lookup_address(Address::new(1)), Some(id));
        assert!(registry.is_initialized());
    }

    #[test]
    fn assign_twice_is_duplicate() {
        let (_, mut registry) = make_registry();
        let id = registry.assign(Address::new(1), ObjectKind::Dataset).unwrap();
        let err = registry
            .assign(Address::new(1), ObjectKind::Dataset)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateAssignment { existing, .. } if existing == id
        ));
        assert_eq!(err.kind(), ErrorKind::DuplicateAssignment);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_unknown_is_not_found() {
        let (_, registry) = make_registry();
        let err = registry.lookup(ObjectId::generate()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn release_removes_both_directions() {
        let (store, mut registry) = make_registry();
        let id = registry.assign(Address::new(5), ObjectKind::Dataset).unwrap();
        let entry = registry.release(id).unwrap();
        assert_eq!(entry.address, Address::new(5));
        assert!(registry.get(id).is_none());
        assert!(registry.lookup_address(Address::new(5)).is_none());
        assert!(store.read_reserved(&id_key(&id)).unwrap().is_none());
        assert!(store.read_reserved(&addr_key(Address::new(5))).unwrap().is_none());
        assert!(matches!(registry.release(id), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn released_address_can_be_reassigned_with_new_id() {
        let (_, mut registry) = make_registry();
        let first = registry.assign(Address::new(2), ObjectKind::Group).unwrap();
        registry.release(first).unwrap();
        let second = registry.assign(Address::new(2), ObjectKind::Group).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn set_root_requires_entry() {
        let (_, mut registry) = make_registry();
        assert!(matches!(
            registry.set_root(ObjectId::generate()),
            Err(RegistryError::NotFound(_))
        ));
        let id = registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        registry.set_root(id).unwrap();
        assert_eq!(registry.root(), Some(id));
    }

    #[test]
    fn registry_survives_reopen() {
        let (store, mut registry) = make_registry();
        let root = registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        let ds = registry.assign(Address::new(2), ObjectKind::Dataset).unwrap();
        let dt = registry.assign(Address::new(3), ObjectKind::Datatype).unwrap();
        registry.set_root(root).unwrap();
        registry.release(dt).unwrap();

        let reopened = IdentityRegistry::open(store).unwrap();
        assert!(reopened.is_initialized());
        assert_eq!(reopened.root(), Some(root));
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup(ds).unwrap().kind, ObjectKind::Dataset);
        assert!(reopened.get(dt).is_none());
    }

    #[test]
    fn all_is_restartable_and_ordered() {
        let (_, mut registry) = make_registry();
        for i in 1..=5 {
            registry.assign(Address::new(i), ObjectKind::Group).unwrap();
        }
        let first: Vec<ObjectId> = registry.all().map(|(id, _)| id).collect();
        let second: Vec<ObjectId> = registry.all().map(|(id, _)| id).collect();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        for w in first.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn count_by_kind() {
        let (_, mut registry) = make_registry();
        registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        registry.assign(Address::new(2), ObjectKind::Group).unwrap();
        registry.assign(Address::new(3), ObjectKind::Dataset).unwrap();
        assert_eq!(registry.count(ObjectKind::Group), 2);
        assert_eq!(registry.count(ObjectKind::Dataset), 1);
        assert_eq!(registry.count(ObjectKind::Datatype), 0);
    }

    #[test]
    fn clear_wipes_reserved_namespace() {
        let (store, mut registry) = make_registry();
        let root = registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        registry.set_root(root).unwrap();
        store.write_reserved("unrelated", b"x").unwrap();

        assert_eq!(registry.clear().unwrap(), 1);
        assert!(registry.is_empty());
        assert!(!registry.is_initialized());
        assert!(store.reserved_keys(PREFIX).unwrap().is_empty());
        assert!(store.read_reserved("unrelated").unwrap().is_some());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let store = make_store();
        store
            .write_reserved(VERSION_KEY, &bincode::serialize(&7u32).unwrap())
            .unwrap();
        let err = IdentityRegistry::open(store).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedVersion(7)));
        assert_eq!(err.kind(), ErrorKind::StorageIO);
    }

    #[test]
    fn dangling_address_entry_is_inconsistent() {
        let (store, mut registry) = make_registry();
        registry.assign(Address::new(1), ObjectKind::Group).unwrap();
        store
            .write_reserved(
                &addr_key(Address::new(9)),
                &bincode::serialize(&ObjectId::generate()).unwrap(),
            )
            .unwrap();
        let err = IdentityRegistry::open(store).unwrap_err();
        assert!(matches!(err, RegistryError::Inconsistent(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn read_only_store_surfaces_forbidden() {
        let store: Arc<dyn ContainerStore> = Arc::new(InMemoryContainerStore::read_only(
            tessera_store::ContainerImage::new(),
        ));
        let mut registry = IdentityRegistry::open(store).unwrap();
        let err = registry
            .assign(Address::new(1), ObjectKind::Group)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn identifiers_are_unique(addrs in proptest::collection::hash_set(1u64..10_000, 1..64)) {
                let (_, mut registry) = make_registry();
                let mut seen = HashSet::new();
                for a in &addrs {
                    let id = registry.assign(Address::new(*a), ObjectKind::Dataset).unwrap();
                    prop_assert!(seen.insert(id));
                }
                prop_assert_eq!(registry.len(), addrs.len());
                for (id, entry) in registry.all() {
                    prop_assert_eq!(registry.lookup_address(entry.address), Some(id));
                }
            }

            #[test]
            fn release_never_disturbs_other_entries(
                addrs in proptest::collection::hash_set(1u64..1_000, 2..32),
                pick in any::<prop::sample::Index>(),
            ) {
                let (_, mut registry) = make_registry();
                let ids: Vec<ObjectId> = addrs
                    .iter()
                    .map(|a| registry.assign(Address::new(*a), ObjectKind::Group).unwrap())
                    .collect();
                let victim = ids[pick.index(ids.len())];
                registry.release(victim).unwrap();
                for id in ids.iter().filter(|id| **id != victim) {
                    prop_assert!(registry.get(*id).is_some());
                }
                prop_assert_eq!(registry.len(), ids.len() - 1);
            }
        }
    }
}
