use std::collections::HashSet;
use std::sync::Arc;

use tessera_registry::IdentityRegistry;
use tessera_store::{ContainerStore, LinkRecord};
use tessera_types::{Address, ObjectId, ObjectKind};
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::names::validate_link_name;
use crate::path::ObjectPath;

/// Soft-link traversals allowed while resolving one path.
pub const MAX_SOFT_LINK_HOPS: u32 = 32;

/// A local object reached by resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedObject {
    pub id: ObjectId,
    pub address: Address,
    pub kind: ObjectKind,
}

/// Outcome of resolving a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Local(ResolvedObject),
    /// The path ends in an external link; identity lives in another container.
    Foreign { file: String, path: String },
}

impl Resolved {
    pub fn local(&self) -> Option<&ResolvedObject> {
        match self {
            Self::Local(obj) => Some(obj),
            Self::Foreign { .. } => None,
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.local().map(|obj| obj.id)
    }
}

/// Where a path leads before identity is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    Local(Address),
    Foreign { file: String, path: String },
}

/// Result of removing a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedLink {
    pub link: LinkRecord,
    /// Set when a hard link was removed and no hard link to its target remains.
    pub orphaned: Option<Address>,
}

/// Walks and maintains the link graph of one container.
pub struct LinkResolver {
    store: Arc<dyn ContainerStore>,
}

impl std::fmt::Debug for LinkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkResolver").finish_non_exhaustive()
    }
}

impl LinkResolver {
    pub fn new(store: Arc<dyn ContainerStore>) -> Self {
        Self { store }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve `path` starting at the group `start` and attach identity.
    ///
    /// Absolute paths ignore `start`. Soft links are resolved afresh on every
    /// traversal, relative to the group that holds them.
    pub fn resolve(
        &self,
        registry: &IdentityRegistry,
        start: ObjectId,
        path: &str,
    ) -> LinkResult<Resolved> {
        let start = registry.lookup(start)?.address;
        match self.resolve_address(start, path)? {
            LinkTarget::Local(address) => {
                let id = registry
                    .lookup_address(address)
                    .ok_or(LinkError::Unindexed(address))?;
                let kind = registry.lookup(id)?.kind;
                Ok(Resolved::Local(ResolvedObject { id, address, kind }))
            }
            LinkTarget::Foreign { file, path } => Ok(Resolved::Foreign { file, path }),
        }
    }

    /// Resolve `path` starting at the group stored at `start`.
    pub fn resolve_address(&self, start: Address, path: &str) -> LinkResult<LinkTarget> {
        let mut hops = 0;
        self.walk(start, &ObjectPath::parse(path), &mut hops)
    }

    fn walk(&self, start: Address, path: &ObjectPath, hops: &mut u32) -> LinkResult<LinkTarget> {
        let mut current = if path.is_absolute() {
            self.root()?
        } else {
            start
        };

        let components = path.components();
        for (i, name) in components.iter().enumerate() {
            let here = path.prefix(i + 1);
            let last = i + 1 == components.len();

            let record = self
                .store
                .read(current)?
                .ok_or(LinkError::BrokenHardLink(current))?;
            let group = record.as_group().ok_or_else(|| LinkError::NotAGroup {
                path: path.prefix(i),
            })?;
            let link = group
                .links
                .get(name)
                .ok_or_else(|| LinkError::NotFound { path: here.clone() })?;

            match link {
                LinkRecord::Hard(target) => current = *target,
                LinkRecord::Soft(target) => {
                    *hops += 1;
                    if *hops > MAX_SOFT_LINK_HOPS {
                        return Err(LinkError::LinkLoop {
                            path: here,
                            hops: *hops,
                        });
                    }
                    match self.walk(current, &ObjectPath::parse(target), hops) {
                        Ok(LinkTarget::Local(address)) => current = address,
                        Ok(LinkTarget::Foreign { file, path }) => {
                            return foreign(file, path, last);
                        }
                        Err(LinkError::NotFound { .. }) | Err(LinkError::NotAGroup { .. }) => {
                            return Err(LinkError::DanglingLink {
                                path: here,
                                target: target.clone(),
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
                LinkRecord::External { file, path } => {
                    return foreign(file.clone(), path.clone(), last);
                }
            }
        }

        Ok(LinkTarget::Local(current))
    }

    fn root(&self) -> LinkResult<Address> {
        self.store.root()?.ok_or_else(|| LinkError::NotFound {
            path: "/".to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Add `link` to the group at `parent` under `name`.
    ///
    /// A hard link increments its target's hard-link count. Fails with
    /// `NameConflict` if the name is taken and with `CyclicLink` if a hard
    /// link would make a group its own ancestor.
    pub fn create_link(&self, parent: Address, name: &str, link: LinkRecord) -> LinkResult<()> {
        validate_link_name(name, self.store.root()? == Some(parent))?;

        let mut parent_rec = self.store.read_existing(parent)?;
        if parent_rec.expect_group(parent)?.links.contains_key(name) {
            return Err(LinkError::NameConflict {
                name: name.to_string(),
            });
        }

        if let LinkRecord::Hard(target) = &link {
            self.check_acyclic(*target, parent, name)?;
            let mut target_rec = self
                .store
                .read(*target)?
                .ok_or(LinkError::BrokenHardLink(*target))?;
            target_rec.hard_links += 1;
            self.store.write(*target, &target_rec)?;
        }

        debug!(parent = %parent, link_name = name, link = ?link, "created link");
        parent_rec
            .expect_group_mut(parent)?
            .links
            .insert(name.to_string(), link);
        parent_rec.touch();
        self.store.write(parent, &parent_rec)?;
        Ok(())
    }

    /// Remove the link `name` from the group at `parent`.
    ///
    /// Only the edge is removed. If it was the last hard link to its target
    /// the target is reported in [`RemovedLink::orphaned`].
    pub fn remove_link(&self, parent: Address, name: &str) -> LinkResult<RemovedLink> {
        let mut parent_rec = self.store.read_existing(parent)?;
        let link = parent_rec
            .expect_group_mut(parent)?
            .links
            .shift_remove(name)
            .ok_or_else(|| LinkError::NotFound {
                path: name.to_string(),
            })?;
        parent_rec.touch();
        self.store.write(parent, &parent_rec)?;

        let mut orphaned = None;
        if let LinkRecord::Hard(target) = &link {
            if let Some(mut target_rec) = self.store.read(*target)? {
                target_rec.hard_links = target_rec.hard_links.saturating_sub(1);
                if target_rec.hard_links == 0 {
                    orphaned = Some(*target);
                }
                self.store.write(*target, &target_rec)?;
            }
        }

        debug!(parent = %parent, link_name = name, orphaned = ?orphaned, "removed link");
        Ok(RemovedLink { link, orphaned })
    }

    /// Move a link to another name and/or group. Hard-link counts are unchanged.
    pub fn move_link(
        &self,
        src_parent: Address,
        src_name: &str,
        dst_parent: Address,
        dst_name: &str,
    ) -> LinkResult<()> {
        validate_link_name(dst_name, self.store.root()? == Some(dst_parent))?;

        let mut src_rec = self.store.read_existing(src_parent)?;
        let link = src_rec
            .expect_group(src_parent)?
            .links
            .get(src_name)
            .cloned()
            .ok_or_else(|| LinkError::NotFound {
                path: src_name.to_string(),
            })?;

        if src_parent == dst_parent {
            if src_name == dst_name {
                return Ok(());
            }
            let group = src_rec.expect_group_mut(src_parent)?;
            if group.links.contains_key(dst_name) {
                return Err(LinkError::NameConflict {
                    name: dst_name.to_string(),
                });
            }
            group.links.shift_remove(src_name);
            group.links.insert(dst_name.to_string(), link);
            src_rec.touch();
            self.store.write(src_parent, &src_rec)?;
            debug!(group = %src_parent, from = src_name, to = dst_name, "renamed link");
            return Ok(());
        }

        let mut dst_rec = self.store.read_existing(dst_parent)?;
        if dst_rec.expect_group(dst_parent)?.links.contains_key(dst_name) {
            return Err(LinkError::NameConflict {
                name: dst_name.to_string(),
            });
        }
        if let LinkRecord::Hard(target) = &link {
            self.check_acyclic(*target, dst_parent, dst_name)?;
        }

        src_rec.expect_group_mut(src_parent)?.links.shift_remove(src_name);
        src_rec.touch();
        self.store.write(src_parent, &src_rec)?;

        dst_rec
            .expect_group_mut(dst_parent)?
            .links
            .insert(dst_name.to_string(), link);
        dst_rec.touch();
        self.store.write(dst_parent, &dst_rec)?;

        debug!(from = %src_parent, to = %dst_parent, src_name, dst_name, "moved link");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Graph queries
    // -----------------------------------------------------------------------

    /// Fail with `CyclicLink` if a hard link from `parent` to `target` would
    /// make a group its own ancestor.
    fn check_acyclic(&self, target: Address, parent: Address, name: &str) -> LinkResult<()> {
        if self.reaches(target, parent)? {
            return Err(LinkError::CyclicLink {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Returns `true` if `needle` is `from` or lies below it via hard links.
    pub fn reaches(&self, from: Address, needle: Address) -> LinkResult<bool> {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(address) = stack.pop() {
            if address == needle {
                return Ok(true);
            }
            if !visited.insert(address) {
                continue;
            }
            if let Some(record) = self.store.read(address)? {
                if let Some(group) = record.as_group() {
                    stack.extend(group.hard_targets());
                }
            }
        }
        Ok(false)
    }

    /// Every address reachable from `root` by hard links, in depth-first
    /// preorder following link insertion order. Each address appears once.
    pub fn reachable(&self, root: Address) -> LinkResult<Vec<Address>> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(address) = stack.pop() {
            if !visited.insert(address) {
                continue;
            }
            let record = self
                .store
                .read(address)?
                .ok_or(LinkError::BrokenHardLink(address))?;
            order.push(address);
            if let Some(group) = record.as_group() {
                let children: Vec<Address> = group.hard_targets().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        Ok(order)
    }

    /// Every `(group, name)` pair holding a hard link to `target`.
    pub fn links_to(&self, target: Address) -> LinkResult<Vec<(Address, String)>> {
        let mut found = Vec::new();
        for address in self.store.addresses()? {
            let Some(record) = self.store.read(address)? else {
                continue;
            };
            if let Some(group) = record.as_group() {
                for (name, link) in &group.links {
                    if link.hard_target() == Some(target) {
                        found.push((address, name.clone()));
                    }
                }
            }
        }
        Ok(found)
    }
}

fn foreign(file: String, path: String, last: bool) -> LinkResult<LinkTarget> {
    if last {
        Ok(LinkTarget::Foreign { file, path })
    } else {
        Err(LinkError::ExternalTraversal { file, path })
    }
}
