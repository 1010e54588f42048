use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tessera_index::{IndexBuilder, RebuildReport};
use tessera_links::{validate_link_name, LinkError, LinkResolver, Resolved};
use tessera_registry::{IdentityRegistry, RegistryEntry};
use tessera_store::{
    ContainerStore, FileContainerStore, InMemoryContainerStore, LinkRecord, ObjectBody,
    ObjectRecord,
};
use tessera_types::{Address, ElementType, ObjectId, ObjectKind};
use tracing::{debug, error, info, warn};

use crate::config::ContainerConfig;
use crate::data::dataset_record;
use crate::error::{ContainerError, ContainerResult};
use crate::info::{Counts, DatasetSpec, IndexEntry, LinkClass, LinkInfo, LinkQuery, ObjectInfo};

/// Handle to one open container.
///
/// All state lives behind a single `RwLock`: queries share the read guard,
/// while every mutation and [`Container::rebuild`] hold the write guard for
/// their whole duration. A mutation updates structure first, then the
/// identity registry, then flushes both in one atomic persist. If any step
/// fails, unflushed changes are discarded and the registry is reloaded.
pub struct Container {
    path: Option<PathBuf>,
    config: ContainerConfig,
    read_only: bool,
    state: RwLock<State>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// Everything guarded by the container lock.
pub(crate) struct State {
    pub(crate) store: Arc<dyn ContainerStore>,
    pub(crate) registry: IdentityRegistry,
    pub(crate) resolver: LinkResolver,
    builder: IndexBuilder,
}

impl Container {
    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a new container file holding an empty root group.
    pub fn create(path: impl AsRef<Path>, config: ContainerConfig) -> ContainerResult<Self> {
        let path = path.as_ref();
        if config.read_only {
            return Err(ContainerError::Forbidden(
                "cannot create a read-only container".into(),
            ));
        }
        let store = FileContainerStore::create(path, config.sync_mode)?;
        info!(path = %path.display(), "created container");
        Self::with_store(Arc::new(store), Some(path.to_path_buf()), config)
    }

    /// Open an existing container file.
    ///
    /// A container without an identity registry is indexed on open when
    /// `auto_rebuild` is set and the container is writable.
    pub fn open(path: impl AsRef<Path>, config: ContainerConfig) -> ContainerResult<Self> {
        let path = path.as_ref();
        let store: Arc<dyn ContainerStore> = if config.read_only {
            Arc::new(FileContainerStore::open_read_only(path)?)
        } else {
            Arc::new(FileContainerStore::open(path, config.sync_mode)?)
        };
        Self::with_store(store, Some(path.to_path_buf()), config)
    }

    /// A fresh container that lives only in memory.
    pub fn in_memory() -> ContainerResult<Self> {
        Self::from_store(
            Arc::new(InMemoryContainerStore::new()),
            ContainerConfig::default(),
        )
    }

    /// Wrap an arbitrary store, initialising it if it has no root group.
    pub fn from_store(
        store: Arc<dyn ContainerStore>,
        config: ContainerConfig,
    ) -> ContainerResult<Self> {
        Self::with_store(store, None, config)
    }

    fn with_store(
        store: Arc<dyn ContainerStore>,
        path: Option<PathBuf>,
        config: ContainerConfig,
    ) -> ContainerResult<Self> {
        let read_only = config.read_only || store.is_read_only();
        let mut state = State::new(store)?;

        if state.store.root()?.is_none() {
            if read_only {
                return Err(ContainerError::Forbidden(
                    "cannot initialise a read-only container".into(),
                ));
            }
            state.initialize()?;
        } else if !state.registry.is_initialized() {
            if read_only || !config.auto_rebuild {
                warn!(read_only, "container has no identity registry");
            } else {
                let report = state.builder.rebuild(&mut state.registry)?;
                state.store.flush()?;
                info!(
                    root = %report.root,
                    objects = report.objects_indexed,
                    "indexed container on open"
                );
            }
        }

        info!(
            objects = state.registry.len(),
            read_only,
            "opened container"
        );
        Ok(Self {
            path,
            config,
            read_only,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Run `f` under the read guard.
    pub(crate) fn query<T>(
        &self,
        f: impl FnOnce(&State) -> ContainerResult<T>,
    ) -> ContainerResult<T> {
        let state = self.state.read().expect("lock poisoned");
        f(&*state)
    }

    /// Run `f` under the write guard and flush, or roll back on failure.
    pub(crate) fn mutate<T>(
        &self,
        f: impl FnOnce(&mut State) -> ContainerResult<T>,
    ) -> ContainerResult<T> {
        if self.read_only {
            return Err(ContainerError::Forbidden("container is read-only".into()));
        }
        let mut state = self.state.write().expect("lock poisoned");
        let result = f(&mut *state).and_then(|value| {
            state.store.flush()?;
            Ok(value)
        });
        if let Err(err) = &result {
            state.rollback(err);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    pub fn root_id(&self) -> ContainerResult<ObjectId> {
        self.query(|s| s.root_id())
    }

    /// Resolve an absolute path, or a relative one from the root group.
    pub fn resolve(&self, path: &str) -> ContainerResult<Resolved> {
        self.query(|s| Ok(s.resolver.resolve(&s.registry, s.root_id()?, path)?))
    }

    /// Resolve `path` relative to the group `start`.
    pub fn resolve_from(&self, start: ObjectId, path: &str) -> ContainerResult<Resolved> {
        self.query(|s| {
            s.group_address(start)?;
            Ok(s.resolver.resolve(&s.registry, start, path)?)
        })
    }

    /// Resolve `path` to a local identifier.
    ///
    /// A path ending in an external link fails with `NotImplemented`.
    pub fn resolve_id(&self, path: &str) -> ContainerResult<ObjectId> {
        match self.resolve(path)? {
            Resolved::Local(obj) => Ok(obj.id),
            Resolved::Foreign { file, path } => {
                Err(LinkError::ExternalTraversal { file, path }.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Object creation
    // -----------------------------------------------------------------------

    /// Create a group linked into `parent` as `name`.
    pub fn create_group(&self, parent: ObjectId, name: &str) -> ContainerResult<ObjectId> {
        self.mutate(|s| s.insert_object(ObjectRecord::group(), Some((parent, name))))
    }

    /// Create a group reachable only through its identifier.
    pub fn create_anonymous_group(&self) -> ContainerResult<ObjectId> {
        self.mutate(|s| s.insert_object(ObjectRecord::group(), None))
    }

    /// Create a zero-filled dataset linked into `parent` as `name`.
    pub fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        spec: &DatasetSpec,
    ) -> ContainerResult<ObjectId> {
        let record = ObjectRecord::dataset(dataset_record(spec)?);
        self.mutate(|s| s.insert_object(record, Some((parent, name))))
    }

    pub fn create_anonymous_dataset(&self, spec: &DatasetSpec) -> ContainerResult<ObjectId> {
        let record = ObjectRecord::dataset(dataset_record(spec)?);
        self.mutate(|s| s.insert_object(record, None))
    }

    /// Commit an element type as an anonymous datatype object.
    pub fn create_datatype(&self, dtype: ElementType) -> ContainerResult<ObjectId> {
        self.mutate(|s| s.insert_object(ObjectRecord::datatype(dtype), None))
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Add a hard link to an existing object. The target keeps its identifier.
    pub fn link_hard(&self, parent: ObjectId, name: &str, target: ObjectId) -> ContainerResult<()> {
        self.mutate(|s| {
            let parent = s.group_address(parent)?;
            let target = s.entry(target)?.address;
            s.resolver
                .create_link(parent, name, LinkRecord::Hard(target))?;
            Ok(())
        })
    }

    /// Add a soft link. The target path is not checked.
    pub fn link_soft(&self, parent: ObjectId, name: &str, path: &str) -> ContainerResult<()> {
        self.mutate(|s| {
            let parent = s.group_address(parent)?;
            s.resolver
                .create_link(parent, name, LinkRecord::Soft(path.to_string()))?;
            Ok(())
        })
    }

    /// Add a link to `path` inside the container `file`.
    pub fn link_external(
        &self,
        parent: ObjectId,
        name: &str,
        file: &str,
        path: &str,
    ) -> ContainerResult<()> {
        self.mutate(|s| {
            let parent = s.group_address(parent)?;
            let link = LinkRecord::External {
                file: file.to_string(),
                path: path.to_string(),
            };
            s.resolver.create_link(parent, name, link)?;
            Ok(())
        })
    }

    /// Remove the link `name` from `parent`.
    ///
    /// If it was the last hard link to its target, the target's identifier is
    /// returned. The object stays indexed until it is deleted or collected.
    pub fn unlink(&self, parent: ObjectId, name: &str) -> ContainerResult<Option<ObjectId>> {
        self.mutate(|s| {
            let parent = s.group_address(parent)?;
            let removed = s.resolver.remove_link(parent, name)?;
            Ok(removed
                .orphaned
                .and_then(|address| s.registry.lookup_address(address)))
        })
    }

    /// Rename a link or move it to another group.
    pub fn move_link(
        &self,
        src_parent: ObjectId,
        src_name: &str,
        dst_parent: ObjectId,
        dst_name: &str,
    ) -> ContainerResult<()> {
        self.mutate(|s| {
            let src = s.group_address(src_parent)?;
            let dst = s.group_address(dst_parent)?;
            s.resolver.move_link(src, src_name, dst, dst_name)?;
            Ok(())
        })
    }

    pub fn get_link(&self, group: ObjectId, name: &str) -> ContainerResult<LinkInfo> {
        self.query(|s| {
            let address = s.group_address(group)?;
            let record = s.store.read_existing(address)?;
            let link = record
                .expect_group(address)?
                .links
                .get(name)
                .ok_or_else(|| LinkError::NotFound {
                    path: name.to_string(),
                })?;
            Ok(s.link_info(name, link))
        })
    }

    /// Links of `group` in insertion order, filtered and paginated by `query`.
    pub fn list_links(&self, group: ObjectId, query: &LinkQuery) -> ContainerResult<Vec<LinkInfo>> {
        self.query(|s| {
            let address = s.group_address(group)?;
            let record = s.store.read_existing(address)?;
            let links = &record.expect_group(address)?.links;

            let start = match &query.marker {
                Some(marker) => links
                    .get_index_of(marker.as_str())
                    .map(|i| i + 1)
                    .ok_or_else(|| ContainerError::NotFound(format!("link marker {marker:?}")))?,
                None => 0,
            };

            Ok(links
                .iter()
                .skip(start)
                .map(|(name, link)| s.link_info(name, link))
                .filter(|info| query.admits(info))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect())
        })
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete an object: every hard link to it is removed, its identifier is
    /// released and its record reclaimed.
    ///
    /// Objects held only by a deleted group lose that link and stay indexed
    /// until [`Container::collect_garbage`]. The root group cannot be deleted.
    pub fn delete_object(&self, id: ObjectId) -> ContainerResult<()> {
        self.mutate(|s| {
            let entry = s.entry(id)?;
            if s.registry.root() == Some(id) || s.store.root()? == Some(entry.address) {
                return Err(ContainerError::Forbidden(
                    "the root group cannot be deleted".into(),
                ));
            }

            let links = s.resolver.links_to(entry.address)?;
            for (group, name) in &links {
                s.resolver.remove_link(*group, name)?;
            }

            let record = s.store.read_existing(entry.address)?;
            if let Some(group) = record.as_group() {
                for target in group.hard_targets() {
                    s.drop_hard_link(target)?;
                }
            }
            s.store.delete(entry.address)?;
            s.registry.release(id)?;
            debug!(id = %id, links = links.len(), "deleted object");
            Ok(())
        })
    }

    /// Reclaim every stored object not reachable from the root group by hard
    /// links. Returns how many records were removed.
    pub fn collect_garbage(&self) -> ContainerResult<usize> {
        self.mutate(|s| {
            let root = s.root_address()?;
            let reachable: HashSet<Address> = s.resolver.reachable(root)?.into_iter().collect();
            let garbage: Vec<Address> = s
                .store
                .addresses()?
                .into_iter()
                .filter(|address| !reachable.contains(address))
                .collect();

            for address in &garbage {
                let record = s.store.read_existing(*address)?;
                if let Some(group) = record.as_group() {
                    for target in group.hard_targets().filter(|t| reachable.contains(t)) {
                        s.drop_hard_link(target)?;
                    }
                }
            }
            for address in &garbage {
                if let Some(id) = s.registry.lookup_address(*address) {
                    s.registry.release(id)?;
                }
                s.store.delete(*address)?;
            }

            info!(reclaimed = garbage.len(), "collected garbage");
            Ok(garbage.len())
        })
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub fn object_info(&self, id: ObjectId) -> ContainerResult<ObjectInfo> {
        self.query(|s| {
            let (_, record) = s.record(id)?;
            let (dtype, shape, max_shape) = match &record.body {
                ObjectBody::Group(_) => (None, None, None),
                ObjectBody::Dataset(ds) => (
                    Some(ds.dtype),
                    Some(ds.shape.clone()),
                    Some(ds.max_shape.clone()),
                ),
                ObjectBody::Datatype(dt) => (Some(dt.dtype), None, None),
            };
            Ok(ObjectInfo {
                id,
                kind: record.kind(),
                attribute_count: record.attributes.len(),
                hard_links: record.hard_links,
                created: record.created.to_iso8601(),
                last_modified: record.modified.to_iso8601(),
                link_count: record.as_group().map(|g| g.links.len()),
                dtype,
                shape,
                max_shape,
            })
        })
    }

    /// Number of indexed objects per kind.
    pub fn counts(&self) -> ContainerResult<Counts> {
        self.query(|s| {
            Ok(Counts {
                groups: s.registry.count(ObjectKind::Group),
                datasets: s.registry.count(ObjectKind::Dataset),
                datatypes: s.registry.count(ObjectKind::Datatype),
            })
        })
    }

    /// Every registry entry, ordered by identifier.
    pub fn index_entries(&self) -> ContainerResult<Vec<IndexEntry>> {
        self.query(|s| {
            Ok(s.registry
                .all()
                .map(|(id, entry)| IndexEntry {
                    id,
                    kind: entry.kind,
                    address: entry.address,
                })
                .collect())
        })
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Discard every identifier and re-index the container from its root.
    ///
    /// Holds the write guard throughout, so every other request on this
    /// container waits for the rebuild to finish.
    pub fn rebuild(&self) -> ContainerResult<RebuildReport> {
        self.mutate(|s| Ok(s.builder.rebuild(&mut s.registry)?))
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

impl State {
    fn new(store: Arc<dyn ContainerStore>) -> ContainerResult<Self> {
        let registry = IdentityRegistry::open(Arc::clone(&store))?;
        let resolver = LinkResolver::new(Arc::clone(&store));
        let builder = IndexBuilder::new(Arc::clone(&store));
        Ok(Self {
            store,
            registry,
            resolver,
            builder,
        })
    }

    /// Write the root group and its registry entry, then flush.
    fn initialize(&mut self) -> ContainerResult<()> {
        let address = self.store.allocate()?;
        self.store.write(address, &ObjectRecord::group())?;
        self.store.set_root(address)?;
        self.registry.initialize()?;
        let id = self.registry.assign(address, ObjectKind::Group)?;
        self.registry.set_root(id)?;
        self.store.flush()?;
        info!(root = %id, "initialised container");
        Ok(())
    }

    fn rollback(&mut self, cause: &ContainerError) {
        warn!(error = %cause, "operation failed; discarding unflushed changes");
        if let Err(err) = self.store.revert() {
            error!(error = %err, "failed to revert store");
        }
        if let Err(err) = self.registry.reload() {
            error!(error = %err, "failed to reload identity registry");
        }
    }

    pub(crate) fn root_id(&self) -> ContainerResult<ObjectId> {
        self.registry.root().ok_or(ContainerError::Unindexed)
    }

    fn root_address(&self) -> ContainerResult<Address> {
        self.store
            .root()?
            .ok_or_else(|| ContainerError::Internal("container has no root group".into()))
    }

    pub(crate) fn entry(&self, id: ObjectId) -> ContainerResult<RegistryEntry> {
        Ok(self.registry.lookup(id)?)
    }

    /// The record behind `id` and its address.
    pub(crate) fn record(&self, id: ObjectId) -> ContainerResult<(Address, ObjectRecord)> {
        let address = self.entry(id)?.address;
        let record = self.store.read(address)?.ok_or_else(|| {
            ContainerError::Internal(format!("object {id} has no record at address {address}"))
        })?;
        Ok((address, record))
    }

    fn group_address(&self, id: ObjectId) -> ContainerResult<Address> {
        let entry = self.entry(id)?;
        if entry.kind != ObjectKind::Group {
            return Err(ContainerError::NotAGroup(id));
        }
        Ok(entry.address)
    }

    /// Store a new object, link it into `parent` if given, then index it.
    fn insert_object(
        &mut self,
        record: ObjectRecord,
        parent: Option<(ObjectId, &str)>,
    ) -> ContainerResult<ObjectId> {
        let kind = record.kind();
        let parent = match parent {
            Some((group, name)) => {
                let address = self.group_address(group)?;
                validate_link_name(name, self.store.root()? == Some(address))?;
                Some((address, name))
            }
            None => None,
        };

        let address = self.store.allocate()?;
        self.store.write(address, &record)?;
        if let Some((group, name)) = parent {
            self.resolver
                .create_link(group, name, LinkRecord::Hard(address))?;
        }
        let id = self.registry.assign(address, kind)?;
        debug!(id = %id, kind = %kind, anonymous = parent.is_none(), "created object");
        Ok(id)
    }

    /// Decrement the hard-link count of the record at `target`.
    fn drop_hard_link(&self, target: Address) -> ContainerResult<()> {
        if let Some(mut record) = self.store.read(target)? {
            record.hard_links = record.hard_links.saturating_sub(1);
            self.store.write(target, &record)?;
        }
        Ok(())
    }

    fn link_info(&self, name: &str, link: &LinkRecord) -> LinkInfo {
        let mut info = LinkInfo {
            name: name.to_string(),
            class: LinkClass::Hard,
            target: None,
            target_kind: None,
            path: None,
            file: None,
        };
        match link {
            LinkRecord::Hard(address) => {
                info.target = self.registry.lookup_address(*address);
                info.target_kind = info
                    .target
                    .and_then(|id| self.registry.get(id))
                    .map(|entry| entry.kind);
            }
            LinkRecord::Soft(path) => {
                info.class = LinkClass::Soft;
                info.path = Some(path.clone());
            }
            LinkRecord::External { file, path } => {
                info.class = LinkClass::External;
                info.file = Some(file.clone());
                info.path = Some(path.clone());
            }
        }
        info
    }
}
