//! [`PortfolioStore`] implementation for the in-memory backend.
//!
//! Every method takes the mutex exactly once and holds it for the whole
//! operation, so validate-then-mutate sequences are atomic. The algorithms
//! themselves live in [`super::tree`] and [`super::graph`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    DependencyEdge, EdgeKind, GrantScope, ItemId, ItemStatus, NewItem, NewStream, PermissionGrant,
    PermissionKind, PrincipalId, StreamId, WorkItem, Workstream,
};
use crate::error::{Error, Result};
use crate::store::{PortfolioExport, PortfolioStore};

use super::{graph, snapshot, tree, InMemoryStore};

#[async_trait]
impl PortfolioStore for InMemoryStore {
    // ========== Workstream hierarchy ==========

    async fn create_stream(&mut self, new_stream: NewStream) -> Result<Workstream> {
        let mut inner = self.inner.lock().await;

        let depth = match new_stream.parent {
            Some(parent_id) => {
                let parent = inner
                    .streams
                    .get(&parent_id)
                    .ok_or(Error::StreamNotFound(parent_id))?;
                parent.depth + 1
            }
            None => 1,
        };

        let id = StreamId::new(inner.next_stream_id);
        if depth > inner.max_depth {
            return Err(Error::DepthExceeded {
                stream: id,
                would_be: depth,
                max: inner.max_depth,
            });
        }

        inner.next_stream_id += 1;
        let stream = Workstream {
            id,
            name: new_stream.name,
            parent: new_stream.parent,
            depth,
            owner: new_stream.owner,
        };
        inner.insert_stream(stream.clone());

        tracing::debug!(stream = %id, depth, "created workstream");
        Ok(stream)
    }

    async fn stream(&self, id: StreamId) -> Result<Option<Workstream>> {
        let inner = self.inner.lock().await;
        Ok(inner.streams.get(&id).cloned())
    }

    async fn all_streams(&self) -> Result<Vec<Workstream>> {
        let inner = self.inner.lock().await;
        let mut streams: Vec<Workstream> = inner.streams.values().cloned().collect();
        streams.sort_unstable_by_key(|s| (s.depth, s.id));
        Ok(streams)
    }

    async fn ancestors(&self, id: StreamId) -> Result<Vec<Workstream>> {
        let inner = self.inner.lock().await;
        tree::ancestors_of(&inner, id)
    }

    async fn descendants(&self, id: StreamId) -> Result<Vec<Workstream>> {
        let inner = self.inner.lock().await;
        tree::descendants_of(&inner, id)
    }

    async fn would_create_cycle(
        &self,
        stream: StreamId,
        proposed_parent: StreamId,
    ) -> Result<bool> {
        let inner = self.inner.lock().await;
        tree::would_create_cycle(&inner, stream, proposed_parent)
    }

    async fn set_parent(
        &mut self,
        stream: StreamId,
        new_parent: Option<StreamId>,
    ) -> Result<Workstream> {
        let mut inner = self.inner.lock().await;

        let old_parent = inner
            .streams
            .get(&stream)
            .ok_or(Error::StreamNotFound(stream))?
            .parent;

        let new_depth = match new_parent {
            Some(parent_id) => {
                if tree::would_create_cycle(&inner, stream, parent_id)? {
                    return Err(Error::CircularHierarchy {
                        stream,
                        proposed_parent: parent_id,
                    });
                }
                inner.streams[&parent_id].depth + 1
            }
            None => 1,
        };

        // The whole subtree shifts; check the limit against its deepest node.
        let height = tree::subtree_height(&inner, stream);
        let would_be = new_depth + height - 1;
        if would_be > inner.max_depth {
            return Err(Error::DepthExceeded {
                stream,
                would_be,
                max: inner.max_depth,
            });
        }

        if let Some(old) = old_parent {
            inner.unlink_child(old, stream);
        }
        if let Some(new) = new_parent {
            inner.children.entry(new).or_default().push(stream);
        }
        if let Some(s) = inner.streams.get_mut(&stream) {
            s.parent = new_parent;
        }
        tree::recompute_depths(&mut inner, stream, new_depth);

        tracing::debug!(stream = %stream, ?new_parent, new_depth, "moved workstream");
        Ok(inner.streams[&stream].clone())
    }

    async fn can_delete_stream(&self, id: StreamId) -> Result<bool> {
        let inner = self.inner.lock().await;
        if !inner.streams.contains_key(&id) {
            return Err(Error::StreamNotFound(id));
        }
        Ok(inner.children.get(&id).is_none_or(Vec::is_empty))
    }

    async fn delete_stream(&mut self, id: StreamId) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let parent = inner
            .streams
            .get(&id)
            .ok_or(Error::StreamNotFound(id))?
            .parent;

        let child_count = inner.children.get(&id).map_or(0, Vec::len);
        if child_count > 0 {
            return Err(Error::CannotDeleteNonLeaf {
                stream: id,
                child_count,
            });
        }

        let item_count = inner.stream_items.get(&id).map_or(0, Vec::len);
        if item_count > 0 {
            return Err(Error::StreamNotEmpty {
                stream: id,
                item_count,
            });
        }

        if let Some(parent) = parent {
            inner.unlink_child(parent, id);
        }
        inner.streams.remove(&id);
        inner.children.remove(&id);
        inner.grants.remove(&id);
        inner.stream_items.remove(&id);

        tracing::debug!(stream = %id, "deleted workstream");
        Ok(())
    }

    // ========== Permission grants ==========

    async fn grant(&mut self, grant: PermissionGrant) -> Result<PermissionGrant> {
        let mut inner = self.inner.lock().await;

        if !inner.streams.contains_key(&grant.stream) {
            return Err(Error::StreamNotFound(grant.stream));
        }

        let grants = inner.grants.entry(grant.stream).or_default();
        if let Some(existing) = grants.iter().find(|g| **g == grant) {
            return Ok(existing.clone());
        }
        grants.push(grant.clone());

        tracing::debug!(
            stream = %grant.stream,
            principal = %grant.principal,
            kind = %grant.kind,
            "recorded grant"
        );
        Ok(grant)
    }

    async fn revoke(
        &mut self,
        stream: StreamId,
        principal: PrincipalId,
        kind: PermissionKind,
        scope: GrantScope,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if !inner.streams.contains_key(&stream) {
            return Err(Error::StreamNotFound(stream));
        }

        let grants = inner.grants.entry(stream).or_default();
        let position = grants
            .iter()
            .position(|g| g.principal == principal && g.kind == kind && g.scope == scope)
            .ok_or(Error::GrantNotFound {
                stream,
                principal,
                kind,
                scope,
            })?;
        grants.remove(position);
        if grants.is_empty() {
            inner.grants.remove(&stream);
        }
        Ok(())
    }

    async fn grants_for(&self, stream: StreamId) -> Result<Vec<PermissionGrant>> {
        let inner = self.inner.lock().await;
        if !inner.streams.contains_key(&stream) {
            return Err(Error::StreamNotFound(stream));
        }
        Ok(inner.grants.get(&stream).cloned().unwrap_or_default())
    }

    // ========== Work items ==========

    async fn create_item(&mut self, new_item: NewItem) -> Result<WorkItem> {
        let mut inner = self.inner.lock().await;

        if !inner.streams.contains_key(&new_item.stream) {
            return Err(Error::StreamNotFound(new_item.stream));
        }

        let id = ItemId::new(inner.next_item_id);
        inner.next_item_id += 1;
        let item = WorkItem {
            id,
            stream: new_item.stream,
            name: new_item.name,
            status: new_item.status,
            target_date: new_item.target_date,
            owner: new_item.owner,
        };
        inner.insert_item(item.clone());

        tracing::debug!(item = %id, stream = %item.stream, "created work item");
        Ok(item)
    }

    async fn item(&self, id: ItemId) -> Result<Option<WorkItem>> {
        let inner = self.inner.lock().await;
        Ok(inner.items.get(&id).cloned())
    }

    async fn set_status(&mut self, id: ItemId, status: ItemStatus) -> Result<WorkItem> {
        let mut inner = self.inner.lock().await;
        let item = inner.items.get_mut(&id).ok_or(Error::ItemNotFound(id))?;
        item.status = status;
        Ok(item.clone())
    }

    async fn reschedule(&mut self, id: ItemId, target_date: NaiveDate) -> Result<WorkItem> {
        let mut inner = self.inner.lock().await;
        let item = inner.items.get_mut(&id).ok_or(Error::ItemNotFound(id))?;
        item.target_date = Some(target_date);
        Ok(item.clone())
    }

    async fn delete_item(&mut self, id: ItemId) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let stream = inner.items.get(&id).ok_or(Error::ItemNotFound(id))?.stream;

        let dependents = graph::downstream_of(&inner, id, None)?;
        if !dependents.is_empty() {
            return Err(Error::ItemHasDependents {
                item: id,
                dependents,
            });
        }

        inner.remove_graph_node(id);
        inner.items.remove(&id);
        if let Some(items) = inner.stream_items.get_mut(&stream) {
            items.retain(|&i| i != id);
            if items.is_empty() {
                inner.stream_items.remove(&stream);
            }
        }

        tracing::debug!(item = %id, "deleted work item");
        Ok(())
    }

    async fn items_in(&self, stream: StreamId) -> Result<Vec<WorkItem>> {
        let inner = self.inner.lock().await;
        if !inner.streams.contains_key(&stream) {
            return Err(Error::StreamNotFound(stream));
        }
        let mut items: Vec<WorkItem> = inner
            .stream_items
            .get(&stream)
            .map(|ids| ids.iter().map(|i| inner.items[i].clone()).collect())
            .unwrap_or_default();
        items.sort_unstable_by_key(|i| i.id);
        Ok(items)
    }

    async fn status_counts(
        &self,
        streams: &[StreamId],
    ) -> Result<HashMap<StreamId, BTreeMap<ItemStatus, u64>>> {
        let inner = self.inner.lock().await;

        // One pass over the requested set; streams without items still get
        // an entry so callers never need a missing-key special case.
        let mut counts: HashMap<StreamId, BTreeMap<ItemStatus, u64>> =
            streams.iter().map(|&s| (s, BTreeMap::new())).collect();

        for (stream, item_ids) in &inner.stream_items {
            let Some(table) = counts.get_mut(stream) else {
                continue;
            };
            for item_id in item_ids {
                *table.entry(inner.items[item_id].status).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }

    // ========== Dependency graph ==========

    async fn add_edge(
        &mut self,
        prerequisite: ItemId,
        dependent: ItemId,
        kind: EdgeKind,
    ) -> Result<DependencyEdge> {
        let mut inner = self.inner.lock().await;

        if prerequisite == dependent {
            return Err(Error::SelfDependency(prerequisite));
        }

        let from = graph::node_of(&inner, prerequisite)?;
        let to = graph::node_of(&inner, dependent)?;

        // One edge per ordered pair, whatever its kind.
        if inner.graph.find_edge(from, to).is_some() {
            return Err(Error::DuplicateEdge {
                prerequisite,
                dependent,
            });
        }

        if graph::would_close_cycle(&inner, prerequisite, dependent)? {
            return Err(Error::CircularDependency {
                prerequisite,
                dependent,
            });
        }

        inner.graph.add_edge(from, to, kind);

        tracing::debug!(%prerequisite, %dependent, kind = %kind, "added dependency edge");
        Ok(DependencyEdge {
            prerequisite,
            dependent,
            kind,
        })
    }

    async fn remove_edge(&mut self, prerequisite: ItemId, dependent: ItemId) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let from = graph::node_of(&inner, prerequisite)?;
        let to = graph::node_of(&inner, dependent)?;

        let edge = inner
            .graph
            .find_edge(from, to)
            .ok_or(Error::EdgeNotFound {
                prerequisite,
                dependent,
            })?;
        inner.graph.remove_edge(edge);
        Ok(())
    }

    async fn blockers(&self, item: ItemId) -> Result<Vec<ItemId>> {
        let inner = self.inner.lock().await;
        graph::blockers_of(&inner, item)
    }

    async fn can_start(&self, item: ItemId) -> Result<bool> {
        let inner = self.inner.lock().await;
        let blockers = graph::blockers_of(&inner, item)?;
        Ok(blockers
            .iter()
            .all(|b| inner.items[b].status == ItemStatus::Completed))
    }

    async fn ready_items(&self) -> Result<Vec<WorkItem>> {
        let inner = self.inner.lock().await;

        let mut ready: Vec<WorkItem> = inner
            .items
            .values()
            .filter(|item| item.status == ItemStatus::Pending)
            .filter(|item| {
                graph::blockers_of(&inner, item.id)
                    .map(|blockers| {
                        blockers
                            .iter()
                            .all(|b| inner.items[b].status == ItemStatus::Completed)
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        // Dated items first, soonest first; undated last, then by id.
        ready.sort_unstable_by_key(|i| (i.target_date.is_none(), i.target_date, i.id));
        Ok(ready)
    }

    async fn downstream(&self, item: ItemId, kind: Option<EdgeKind>) -> Result<Vec<ItemId>> {
        let inner = self.inner.lock().await;
        graph::downstream_of(&inner, item, kind)
    }

    async fn full_chain(&self, item: ItemId) -> Result<Vec<ItemId>> {
        let inner = self.inner.lock().await;
        graph::upstream_chain(&inner, item)
    }

    async fn all_edges(&self) -> Result<Vec<DependencyEdge>> {
        let inner = self.inner.lock().await;
        Ok(graph::all_edges(&inner))
    }

    // ========== Persistence ==========

    async fn export(&self) -> Result<PortfolioExport> {
        let inner = self.inner.lock().await;

        let mut streams: Vec<Workstream> = inner.streams.values().cloned().collect();
        streams.sort_unstable_by_key(|s| s.id);

        let mut grants: Vec<PermissionGrant> = inner
            .grants
            .values()
            .flat_map(|g| g.iter().cloned())
            .collect();
        grants.sort_by_key(|g| (g.stream, g.principal));

        let mut items: Vec<WorkItem> = inner.items.values().cloned().collect();
        items.sort_unstable_by_key(|i| i.id);

        Ok(PortfolioExport {
            streams,
            grants,
            items,
            edges: graph::all_edges(&inner),
        })
    }

    async fn import(&mut self, export: PortfolioExport) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let max_depth = inner.max_depth;

        let (rebuilt, warnings) = snapshot::build_inner(export.into_records(), max_depth);
        for warning in &warnings {
            tracing::warn!(warning = ?warning, "import warning");
        }
        *inner = rebuilt;
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}
