//! Storage abstraction for the portfolio engine.
//!
//! The [`PortfolioStore`] trait is the repository seam every component talks
//! through: the workstream hierarchy, permission grants, work items, and the
//! typed dependency graph all live behind it. Entities are plain data; every
//! mutation goes through an explicit store method, and each mutation either
//! fully applies or leaves the store unchanged.
//!
//! Two backends exist:
//!
//! - **In-memory**: `HashMap`s plus a petgraph `DiGraph`, everything behind
//!   one async mutex so cycle checks and the writes they guard are atomic.
//! - **Snapshot**: the in-memory store wrapped with JSONL persistence;
//!   `save()` writes the whole portfolio atomically, `reload()` restores the
//!   on-disk state after a failed save.
//!
//! # Test Utilities
//!
//! A stateless [`MockStore`] is available behind the `test-util` feature for
//! code that only needs to exercise the trait object seam.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    DependencyEdge, EdgeKind, GrantScope, ItemId, ItemStatus, NewItem, NewStream, PermissionGrant,
    PermissionKind, PrincipalId, StreamId, WorkItem, Workstream,
};
use crate::error::Result;

pub mod in_memory;

/// Core storage trait for the portfolio engine.
///
/// Object-safe; consumed as `Box<dyn PortfolioStore>`. Implementations must
/// be `Send + Sync` and must make every cycle-check-then-write sequence
/// (`set_parent`, `add_edge`) atomic, so two concurrent callers cannot both
/// pass validation against stale state.
///
/// # Lookup Conventions
///
/// Point lookups ([`stream`](Self::stream), [`item`](Self::item)) return
/// `Ok(None)` for probing. Traversals and analyses on a missing id return
/// `StreamNotFound`/`ItemNotFound` instead, so "node has no ancestors" stays
/// distinguishable from "node does not exist".
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    // ========== Workstream hierarchy ==========

    /// Create a new workstream.
    ///
    /// Computes `depth` from the parent (1 for roots).
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the parent does not exist
    /// - `DepthExceeded` if the new node would sit below the configured
    ///   maximum depth
    async fn create_stream(&mut self, new_stream: NewStream) -> Result<Workstream>;

    /// Get a workstream by id. Returns `None` if it does not exist.
    async fn stream(&self, id: StreamId) -> Result<Option<Workstream>>;

    /// All workstreams, ordered by `(depth, id)`.
    async fn all_streams(&self) -> Result<Vec<Workstream>>;

    /// Ancestors of a workstream, nearest-first. Empty for a root.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    /// - `HierarchyLoop` if the parent chain revisits a node (only possible
    ///   with a corrupted snapshot)
    async fn ancestors(&self, id: StreamId) -> Result<Vec<Workstream>>;

    /// The full subtree below a workstream, ordered by `(depth, id)`.
    ///
    /// Implemented as one traversal over a preloaded child index, never one
    /// query per level.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    async fn descendants(&self, id: StreamId) -> Result<Vec<Workstream>>;

    /// Whether re-parenting `stream` under `proposed_parent` would make the
    /// stream its own ancestor.
    ///
    /// True iff `proposed_parent == stream` or the proposed parent is one of
    /// the stream's descendants.
    async fn would_create_cycle(
        &self,
        stream: StreamId,
        proposed_parent: StreamId,
    ) -> Result<bool>;

    /// Move a workstream under a new parent (or to the root with `None`).
    ///
    /// On success the depth of the stream and its entire subtree is
    /// recomputed in one pass. The cycle check and the write happen under a
    /// single lock hold.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the stream or the new parent does not exist
    /// - `CircularHierarchy` if the move would create a parent cycle
    /// - `DepthExceeded` if any descendant of the moved subtree would end up
    ///   below the configured maximum depth
    async fn set_parent(
        &mut self,
        stream: StreamId,
        new_parent: Option<StreamId>,
    ) -> Result<Workstream>;

    /// Whether the workstream can be deleted (true iff it has no children).
    async fn can_delete_stream(&self, id: StreamId) -> Result<bool>;

    /// Delete a workstream along with its grants.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    /// - `CannotDeleteNonLeaf` while child workstreams exist
    /// - `StreamNotEmpty` while work items are still attached
    async fn delete_stream(&mut self, id: StreamId) -> Result<()>;

    // ========== Permission grants ==========

    /// Record a permission grant. An exact duplicate is a no-op returning
    /// the existing grant.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    async fn grant(&mut self, grant: PermissionGrant) -> Result<PermissionGrant>;

    /// Revoke a grant matching all four fields exactly.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    /// - `GrantNotFound` if no matching grant exists
    async fn revoke(
        &mut self,
        stream: StreamId,
        principal: PrincipalId,
        kind: PermissionKind,
        scope: GrantScope,
    ) -> Result<()>;

    /// Direct grants on one workstream (inheritance not applied).
    async fn grants_for(&self, stream: StreamId) -> Result<Vec<PermissionGrant>>;

    // ========== Work items ==========

    /// Create a new work item inside a workstream.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    async fn create_item(&mut self, new_item: NewItem) -> Result<WorkItem>;

    /// Get a work item by id. Returns `None` if it does not exist.
    async fn item(&self, id: ItemId) -> Result<Option<WorkItem>>;

    /// Change a work item's status. Returns the updated item.
    async fn set_status(&mut self, id: ItemId, status: ItemStatus) -> Result<WorkItem>;

    /// Change a work item's target date. Returns the updated item.
    async fn reschedule(&mut self, id: ItemId, target_date: NaiveDate) -> Result<WorkItem>;

    /// Delete a work item and its remaining edges.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the item does not exist
    /// - `ItemHasDependents` while other items depend on it
    async fn delete_item(&mut self, id: ItemId) -> Result<()>;

    /// Direct work items of one workstream, ordered by id.
    async fn items_in(&self, stream: StreamId) -> Result<Vec<WorkItem>>;

    /// Item counts grouped by status for a whole set of workstreams in one
    /// call. Streams with no items map to an empty count table.
    async fn status_counts(
        &self,
        streams: &[StreamId],
    ) -> Result<HashMap<StreamId, BTreeMap<ItemStatus, u64>>>;

    // ========== Dependency graph ==========

    /// Add a typed dependency edge, prerequisite -> dependent.
    ///
    /// The cycle check runs against the whole graph regardless of edge kind,
    /// under the same lock hold as the insert.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - `SelfDependency` if the two ids are equal
    /// - `ItemNotFound` if either end does not exist
    /// - `DuplicateEdge` if an edge between this ordered pair already exists
    ///   (any kind)
    /// - `CircularDependency` if a path already runs dependent -> prerequisite
    async fn add_edge(
        &mut self,
        prerequisite: ItemId,
        dependent: ItemId,
        kind: EdgeKind,
    ) -> Result<DependencyEdge>;

    /// Remove the edge between an ordered pair.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if either end does not exist
    /// - `EdgeNotFound` if no edge connects the pair
    async fn remove_edge(&mut self, prerequisite: ItemId, dependent: ItemId) -> Result<()>;

    /// Prerequisites attached to an item via `Blocks` edges, ordered by id.
    async fn blockers(&self, item: ItemId) -> Result<Vec<ItemId>>;

    /// Whether every blocker of the item has status `Completed`.
    async fn can_start(&self, item: ItemId) -> Result<bool>;

    /// All `Pending` items whose blockers are complete, ordered by target
    /// date (undated last) then id.
    async fn ready_items(&self) -> Result<Vec<WorkItem>>;

    /// Direct dependents of an item, optionally filtered by edge kind,
    /// ordered by id.
    async fn downstream(&self, item: ItemId, kind: Option<EdgeKind>) -> Result<Vec<ItemId>>;

    /// All transitive prerequisites of an item (upstream closure), ordered
    /// by discovery depth then id.
    async fn full_chain(&self, item: ItemId) -> Result<Vec<ItemId>>;

    /// Snapshot of the whole edge set, ordered by `(prerequisite, dependent)`.
    ///
    /// Analyzers preload this into an adjacency map so a traversal is one
    /// store call, not one call per node.
    async fn all_edges(&self) -> Result<Vec<DependencyEdge>>;

    // ========== Persistence ==========

    /// Export the full record set in deterministic order.
    async fn export(&self) -> Result<PortfolioExport>;

    /// Replace the store contents with an exported record set.
    ///
    /// Records that violate invariants (orphans, cycle-closing edges) are
    /// skipped, mirroring the resilient snapshot load.
    async fn import(&mut self, export: PortfolioExport) -> Result<()>;

    /// Save to persistent storage. No-op for the plain in-memory backend.
    ///
    /// Takes `&self` so callers can save after read-only operations;
    /// implementations rely on interior mutability.
    async fn save(&self) -> Result<()>;

    /// Restore state from persistent storage, discarding unsaved changes.
    /// No-op for the plain in-memory backend.
    async fn reload(&mut self) -> Result<()>;
}

/// The full portfolio record set, as produced by [`PortfolioStore::export`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioExport {
    /// All workstreams, ordered by id.
    pub streams: Vec<Workstream>,
    /// All grants, ordered by (stream, principal).
    pub grants: Vec<PermissionGrant>,
    /// All work items, ordered by id.
    pub items: Vec<WorkItem>,
    /// All dependency edges, ordered by (prerequisite, dependent).
    pub edges: Vec<DependencyEdge>,
}

/// Storage backend configuration.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// In-memory storage (ephemeral).
    InMemory,

    /// In-memory storage persisted to a JSONL snapshot file.
    Snapshot(PathBuf),
}

impl StoreBackend {
    /// The data file path for file-based backends, `None` otherwise.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StoreBackend::Snapshot(path) => Some(path),
            StoreBackend::InMemory => None,
        }
    }
}

/// Wrapper that adds JSONL snapshot persistence to the in-memory store.
///
/// Every operation delegates to the inner store; `save()` writes the full
/// record set atomically and `reload()` rebuilds the inner store from disk.
struct SnapshotBackedStore {
    inner: Box<dyn PortfolioStore>,
    path: PathBuf,
    max_depth: u32,
}

#[async_trait]
impl PortfolioStore for SnapshotBackedStore {
    async fn create_stream(&mut self, new_stream: NewStream) -> Result<Workstream> {
        self.inner.create_stream(new_stream).await
    }

    async fn stream(&self, id: StreamId) -> Result<Option<Workstream>> {
        self.inner.stream(id).await
    }

    async fn all_streams(&self) -> Result<Vec<Workstream>> {
        self.inner.all_streams().await
    }

    async fn ancestors(&self, id: StreamId) -> Result<Vec<Workstream>> {
        self.inner.ancestors(id).await
    }

    async fn descendants(&self, id: StreamId) -> Result<Vec<Workstream>> {
        self.inner.descendants(id).await
    }

    async fn would_create_cycle(
        &self,
        stream: StreamId,
        proposed_parent: StreamId,
    ) -> Result<bool> {
        self.inner.would_create_cycle(stream, proposed_parent).await
    }

    async fn set_parent(
        &mut self,
        stream: StreamId,
        new_parent: Option<StreamId>,
    ) -> Result<Workstream> {
        self.inner.set_parent(stream, new_parent).await
    }

    async fn can_delete_stream(&self, id: StreamId) -> Result<bool> {
        self.inner.can_delete_stream(id).await
    }

    async fn delete_stream(&mut self, id: StreamId) -> Result<()> {
        self.inner.delete_stream(id).await
    }

    async fn grant(&mut self, grant: PermissionGrant) -> Result<PermissionGrant> {
        self.inner.grant(grant).await
    }

    async fn revoke(
        &mut self,
        stream: StreamId,
        principal: PrincipalId,
        kind: PermissionKind,
        scope: GrantScope,
    ) -> Result<()> {
        self.inner.revoke(stream, principal, kind, scope).await
    }

    async fn grants_for(&self, stream: StreamId) -> Result<Vec<PermissionGrant>> {
        self.inner.grants_for(stream).await
    }

    async fn create_item(&mut self, new_item: NewItem) -> Result<WorkItem> {
        self.inner.create_item(new_item).await
    }

    async fn item(&self, id: ItemId) -> Result<Option<WorkItem>> {
        self.inner.item(id).await
    }

    async fn set_status(&mut self, id: ItemId, status: ItemStatus) -> Result<WorkItem> {
        self.inner.set_status(id, status).await
    }

    async fn reschedule(&mut self, id: ItemId, target_date: NaiveDate) -> Result<WorkItem> {
        self.inner.reschedule(id, target_date).await
    }

    async fn delete_item(&mut self, id: ItemId) -> Result<()> {
        self.inner.delete_item(id).await
    }

    async fn items_in(&self, stream: StreamId) -> Result<Vec<WorkItem>> {
        self.inner.items_in(stream).await
    }

    async fn status_counts(
        &self,
        streams: &[StreamId],
    ) -> Result<HashMap<StreamId, BTreeMap<ItemStatus, u64>>> {
        self.inner.status_counts(streams).await
    }

    async fn add_edge(
        &mut self,
        prerequisite: ItemId,
        dependent: ItemId,
        kind: EdgeKind,
    ) -> Result<DependencyEdge> {
        self.inner.add_edge(prerequisite, dependent, kind).await
    }

    async fn remove_edge(&mut self, prerequisite: ItemId, dependent: ItemId) -> Result<()> {
        self.inner.remove_edge(prerequisite, dependent).await
    }

    async fn blockers(&self, item: ItemId) -> Result<Vec<ItemId>> {
        self.inner.blockers(item).await
    }

    async fn can_start(&self, item: ItemId) -> Result<bool> {
        self.inner.can_start(item).await
    }

    async fn ready_items(&self) -> Result<Vec<WorkItem>> {
        self.inner.ready_items().await
    }

    async fn downstream(&self, item: ItemId, kind: Option<EdgeKind>) -> Result<Vec<ItemId>> {
        self.inner.downstream(item, kind).await
    }

    async fn full_chain(&self, item: ItemId) -> Result<Vec<ItemId>> {
        self.inner.full_chain(item).await
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>> {
        self.inner.all_edges().await
    }

    async fn export(&self) -> Result<PortfolioExport> {
        self.inner.export().await
    }

    async fn import(&mut self, export: PortfolioExport) -> Result<()> {
        self.inner.import(export).await
    }

    async fn save(&self) -> Result<()> {
        in_memory::save_snapshot(self.inner.as_ref(), &self.path).await
    }

    async fn reload(&mut self) -> Result<()> {
        if self.path.exists() {
            let (new_store, warnings) =
                in_memory::load_snapshot(&self.path, self.max_depth).await?;
            for warning in &warnings {
                tracing::warn!(warning = ?warning, "snapshot reload warning");
            }
            self.inner = new_store;
        } else {
            self.inner = in_memory::new_in_memory_store(self.max_depth);
        }
        Ok(())
    }
}

/// Create a store instance for the given backend.
///
/// # Arguments
///
/// * `backend` - The storage backend to use
/// * `max_depth` - The configured maximum hierarchy depth
///
/// # Errors
///
/// Returns an error if a snapshot file exists but cannot be read.
pub async fn create_store(backend: StoreBackend, max_depth: u32) -> Result<Box<dyn PortfolioStore>> {
    match backend {
        StoreBackend::InMemory => Ok(in_memory::new_in_memory_store(max_depth)),
        StoreBackend::Snapshot(path) => {
            let inner = if path.exists() {
                let (store, warnings) = in_memory::load_snapshot(&path, max_depth).await?;
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "snapshot load warning");
                }
                store
            } else {
                // First run; the file appears on the first save.
                in_memory::new_in_memory_store(max_depth)
            };
            Ok(Box::new(SnapshotBackedStore {
                inner,
                path,
                max_depth,
            }))
        }
    }
}

// ========== Test Utilities ==========

/// The hardcoded workstream id returned by [`MockStore`].
#[cfg(any(test, feature = "test-util"))]
pub const MOCK_STREAM_ID: StreamId = StreamId(1);

/// Stateless mock implementation of [`PortfolioStore`] for testing trait
/// object seams.
///
/// `create_stream` always returns a root workstream with id 1; point lookups
/// answer only for that id; queries return empty results; every other
/// mutation panics. Use [`in_memory::new_in_memory_store`] when a test needs
/// real behavior.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Copy, Default)]
#[non_exhaustive]
pub struct MockStore;

#[cfg(any(test, feature = "test-util"))]
impl MockStore {
    /// Create a new `MockStore` instance.
    pub fn new() -> Self {
        Self
    }

    /// The workstream every lookup of [`MOCK_STREAM_ID`] returns.
    pub fn mock_stream() -> Workstream {
        Workstream {
            id: MOCK_STREAM_ID,
            name: "Mock Stream".to_string(),
            parent: None,
            depth: 1,
            owner: PrincipalId::new(1),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl PortfolioStore for MockStore {
    async fn create_stream(&mut self, _new_stream: NewStream) -> Result<Workstream> {
        Ok(Self::mock_stream())
    }

    async fn stream(&self, id: StreamId) -> Result<Option<Workstream>> {
        if id == MOCK_STREAM_ID {
            Ok(Some(Self::mock_stream()))
        } else {
            Ok(None)
        }
    }

    async fn all_streams(&self) -> Result<Vec<Workstream>> {
        Ok(vec![Self::mock_stream()])
    }

    async fn ancestors(&self, _id: StreamId) -> Result<Vec<Workstream>> {
        Ok(vec![])
    }

    async fn descendants(&self, _id: StreamId) -> Result<Vec<Workstream>> {
        Ok(vec![])
    }

    async fn would_create_cycle(
        &self,
        _stream: StreamId,
        _proposed_parent: StreamId,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn set_parent(
        &mut self,
        _stream: StreamId,
        _new_parent: Option<StreamId>,
    ) -> Result<Workstream> {
        unimplemented!("MockStore::set_parent is not implemented; use the in-memory store")
    }

    async fn can_delete_stream(&self, _id: StreamId) -> Result<bool> {
        Ok(true)
    }

    async fn delete_stream(&mut self, _id: StreamId) -> Result<()> {
        unimplemented!("MockStore::delete_stream is not implemented; use the in-memory store")
    }

    async fn grant(&mut self, grant: PermissionGrant) -> Result<PermissionGrant> {
        Ok(grant)
    }

    async fn revoke(
        &mut self,
        _stream: StreamId,
        _principal: PrincipalId,
        _kind: PermissionKind,
        _scope: GrantScope,
    ) -> Result<()> {
        unimplemented!("MockStore::revoke is not implemented; use the in-memory store")
    }

    async fn grants_for(&self, _stream: StreamId) -> Result<Vec<PermissionGrant>> {
        Ok(vec![])
    }

    async fn create_item(&mut self, _new_item: NewItem) -> Result<WorkItem> {
        unimplemented!("MockStore::create_item is not implemented; use the in-memory store")
    }

    async fn item(&self, _id: ItemId) -> Result<Option<WorkItem>> {
        Ok(None)
    }

    async fn set_status(&mut self, _id: ItemId, _status: ItemStatus) -> Result<WorkItem> {
        unimplemented!("MockStore::set_status is not implemented; use the in-memory store")
    }

    async fn reschedule(&mut self, _id: ItemId, _target_date: NaiveDate) -> Result<WorkItem> {
        unimplemented!("MockStore::reschedule is not implemented; use the in-memory store")
    }

    async fn delete_item(&mut self, _id: ItemId) -> Result<()> {
        unimplemented!("MockStore::delete_item is not implemented; use the in-memory store")
    }

    async fn items_in(&self, _stream: StreamId) -> Result<Vec<WorkItem>> {
        Ok(vec![])
    }

    async fn status_counts(
        &self,
        streams: &[StreamId],
    ) -> Result<HashMap<StreamId, BTreeMap<ItemStatus, u64>>> {
        Ok(streams.iter().map(|&s| (s, BTreeMap::new())).collect())
    }

    async fn add_edge(
        &mut self,
        _prerequisite: ItemId,
        _dependent: ItemId,
        _kind: EdgeKind,
    ) -> Result<DependencyEdge> {
        unimplemented!("MockStore::add_edge is not implemented; use the in-memory store")
    }

    async fn remove_edge(&mut self, _prerequisite: ItemId, _dependent: ItemId) -> Result<()> {
        unimplemented!("MockStore::remove_edge is not implemented; use the in-memory store")
    }

    async fn blockers(&self, _item: ItemId) -> Result<Vec<ItemId>> {
        Ok(vec![])
    }

    async fn can_start(&self, _item: ItemId) -> Result<bool> {
        Ok(true)
    }

    async fn ready_items(&self) -> Result<Vec<WorkItem>> {
        Ok(vec![])
    }

    async fn downstream(&self, _item: ItemId, _kind: Option<EdgeKind>) -> Result<Vec<ItemId>> {
        Ok(vec![])
    }

    async fn full_chain(&self, _item: ItemId) -> Result<Vec<ItemId>> {
        Ok(vec![])
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>> {
        Ok(vec![])
    }

    async fn export(&self) -> Result<PortfolioExport> {
        Ok(PortfolioExport::default())
    }

    async fn import(&mut self, _export: PortfolioExport) -> Result<()> {
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}
