use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_links::LinkResolver;
use tessera_registry::IdentityRegistry;
use tessera_store::{ContainerStore, LinkRecord};
use tessera_types::{Address, ErrorKind, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{IndexError, IndexResult};

/// Outcome of a rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Fresh identifier of the root group.
    pub root: ObjectId,
    /// Distinct objects reachable from the root, each assigned once.
    pub objects_indexed: usize,
    pub hard_links: usize,
    pub soft_links: usize,
    /// Soft links whose target did not resolve.
    pub dangling_links: usize,
    pub external_links: usize,
    /// Objects whose stored hard-link count disagreed with the links held
    /// by all stored groups.
    pub link_counts_repaired: usize,
    /// Stored objects not reachable from the root; they keep no identifier.
    pub unreachable: usize,
}

#[derive(Default)]
struct Tally {
    hard_links: usize,
    soft_links: usize,
    dangling_links: usize,
    external_links: usize,
    link_counts_repaired: usize,
}

/// Rebuilds the identity registry of one container from its link graph.
pub struct IndexBuilder {
    store: Arc<dyn ContainerStore>,
    resolver: LinkResolver,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder").finish_non_exhaustive()
    }
}

impl IndexBuilder {
    pub fn new(store: Arc<dyn ContainerStore>) -> Self {
        let resolver = LinkResolver::new(Arc::clone(&store));
        Self { store, resolver }
    }

    /// Clear `registry` and repopulate it from the root group.
    ///
    /// The walk is depth-first in link insertion order, so an unchanged graph
    /// is always indexed in the same order. Changes are written to the store
    /// but not flushed.
    pub fn rebuild(&self, registry: &mut IdentityRegistry) -> IndexResult<RebuildReport> {
        let root = self.store.root()?.ok_or(IndexError::NoRoot)?;
        info!(root = %root, "rebuilding identity registry");

        let discarded = registry.clear()?;
        registry.initialize()?;

        let mut tally = Tally::default();
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
                .ok_or(IndexError::BrokenHardLink(address))?;
            let id = registry.assign(address, record.kind())?;
            order.push(address);
            debug!(id = %id, address = %address, kind = %record.kind(), "indexed object");

            let Some(group) = record.as_group() else {
                continue;
            };
            let mut children = Vec::new();
            for (name, link) in &group.links {
                match link {
                    LinkRecord::Hard(target) => {
                        tally.hard_links += 1;
                        children.push(*target);
                    }
                    LinkRecord::Soft(path) => {
                        tally.soft_links += 1;
                        if let Err(e) = self.resolver.resolve_address(address, path) {
                            match e.kind() {
                                ErrorKind::NotFound
                                | ErrorKind::DanglingLink
                                | ErrorKind::LinkLoop => {
                                    tally.dangling_links += 1;
                                    warn!(group = %address, link = %name, target = %path, error = %e, "dangling soft link");
                                }
                                ErrorKind::NotImplemented => {}
                                _ => return Err(e.into()),
                            }
                        }
                    }
                    LinkRecord::External { .. } => tally.external_links += 1,
                }
            }
            stack.extend(children.into_iter().rev());
        }

        // Counts cover links held by every stored group, reachable or not,
        // matching what deletion and garbage collection later subtract.
        let stored = self.store.addresses()?;
        let mut inbound: HashMap<Address, u32> = HashMap::new();
        for &address in &stored {
            let Some(record) = self.store.read(address)? else {
                continue;
            };
            if let Some(group) = record.as_group() {
                for target in group.hard_targets() {
                    *inbound.entry(target).or_default() += 1;
                }
            }
        }

        for &address in &stored {
            let mut record = self.store.read_existing(address)?;
            let expected = inbound.get(&address).copied().unwrap_or(0);
            if record.hard_links != expected {
                warn!(
                    address = %address,
                    stored = record.hard_links,
                    actual = expected,
                    "repaired hard-link count"
                );
                record.hard_links = expected;
                self.store.write(address, &record)?;
                tally.link_counts_repaired += 1;
            }
        }

        let unreachable = stored.iter().filter(|a| !visited.contains(*a)).count();

        let root_id = registry
            .lookup_address(root)
            .ok_or(IndexError::BrokenHardLink(root))?;
        registry.set_root(root_id)?;

        let report = RebuildReport {
            root: root_id,
            objects_indexed: order.len(),
            hard_links: tally.hard_links,
            soft_links: tally.soft_links,
            dangling_links: tally.dangling_links,
            external_links: tally.external_links,
            link_counts_repaired: tally.link_counts_repaired,
            unreachable,
        };

        info!(
            root = %root_id,
            discarded,
            indexed = report.objects_indexed,
            dangling = report.dangling_links,
            repaired = report.link_counts_repaired,
            unreachable = report.unreachable,
            "rebuilt identity registry"
        );
        Ok(report)
    }

    /// Reachable objects that have no registry entry. Empty for a healthy
    /// container.
    pub fn missing_entries(&self, registry: &IdentityRegistry) -> IndexResult<Vec<Address>> {
        let root = self.store.root()?.ok_or(IndexError::NoRoot)?;
        Ok(self
            .resolver
            .reachable(root)?
            .into_iter()
            .filter(|a| registry.lookup_address(*a).is_none())
            .collect())
    }
}
