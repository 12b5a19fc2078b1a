//! Internal state for the in-memory portfolio store.
//!
//! One struct holds everything behind the store mutex: the workstream maps,
//! the grant table, the item maps, and the petgraph dependency graph with its
//! id-to-node index. Secondary indexes (children per stream, items per
//! stream) are maintained on every mutation so traversals never scan the
//! whole entity map.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::domain::{
    EdgeKind, ItemId, PermissionGrant, StreamId, WorkItem, Workstream,
};

/// All portfolio state, guarded by a single mutex in the store wrapper.
pub(crate) struct PortfolioInner {
    /// Configured maximum hierarchy depth.
    pub(crate) max_depth: u32,

    /// Workstreams by id.
    pub(crate) streams: HashMap<StreamId, Workstream>,

    /// Direct children per workstream. Roots are the streams missing from
    /// every value; a leaf may have no entry at all.
    pub(crate) children: HashMap<StreamId, Vec<StreamId>>,

    /// Direct grants per workstream.
    pub(crate) grants: HashMap<StreamId, Vec<PermissionGrant>>,

    /// Work items by id.
    pub(crate) items: HashMap<ItemId, WorkItem>,

    /// Item ids per workstream.
    pub(crate) stream_items: HashMap<StreamId, Vec<ItemId>>,

    /// Dependency graph, edges stored prerequisite -> dependent.
    pub(crate) graph: DiGraph<ItemId, EdgeKind>,

    /// Item id to graph node index.
    pub(crate) node_map: HashMap<ItemId, NodeIndex>,

    /// Next workstream id to allocate.
    pub(crate) next_stream_id: i64,

    /// Next item id to allocate.
    pub(crate) next_item_id: i64,
}

impl PortfolioInner {
    /// Create empty state with the given depth limit.
    pub(crate) fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            streams: HashMap::new(),
            children: HashMap::new(),
            grants: HashMap::new(),
            items: HashMap::new(),
            stream_items: HashMap::new(),
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            next_stream_id: 1,
            next_item_id: 1,
        }
    }

    /// Insert a workstream and index it under its parent.
    ///
    /// Does not validate; callers check existence, depth, and cycles first.
    pub(crate) fn insert_stream(&mut self, stream: Workstream) {
        if let Some(parent) = stream.parent {
            self.children.entry(parent).or_default().push(stream.id);
        }
        self.streams.insert(stream.id, stream);
    }

    /// Insert a work item, index it under its stream, and add its graph node.
    pub(crate) fn insert_item(&mut self, item: WorkItem) {
        let node = self.graph.add_node(item.id);
        self.node_map.insert(item.id, node);
        self.stream_items.entry(item.stream).or_default().push(item.id);
        self.items.insert(item.id, item);
    }

    /// Remove a graph node, patching the node map for the node petgraph
    /// swaps into the freed index.
    pub(crate) fn remove_graph_node(&mut self, id: ItemId) {
        if let Some(node) = self.node_map.remove(&id) {
            self.graph.remove_node(node);
            // remove_node moves the last node into the removed slot.
            if let Some(moved) = self.graph.node_weight(node).copied() {
                self.node_map.insert(moved, node);
            }
        }
    }

    /// Detach a child from its parent's child index.
    pub(crate) fn unlink_child(&mut self, parent: StreamId, child: StreamId) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&c| c != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Bump the stream id counter past an externally supplied id.
    pub(crate) fn observe_stream_id(&mut self, id: StreamId) {
        if id.0 >= self.next_stream_id {
            self.next_stream_id = id.0 + 1;
        }
    }

    /// Bump the item id counter past an externally supplied id.
    pub(crate) fn observe_item_id(&mut self, id: ItemId) {
        if id.0 >= self.next_item_id {
            self.next_item_id = id.0 + 1;
        }
    }
}
