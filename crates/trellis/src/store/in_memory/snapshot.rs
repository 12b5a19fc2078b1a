//! JSONL snapshot persistence for the in-memory store.
//!
//! The snapshot is one JSON object per line, each tagged with a `record`
//! field: workstreams first, then grants, items, and edges. Saving writes
//! the whole portfolio through a temp-file rename; loading is resilient and
//! reports every repaired or skipped record as a [`LoadWarning`] instead of
//! refusing the file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    DependencyEdge, ItemId, PermissionGrant, StreamId, WorkItem, Workstream,
};
use crate::error::{Error as TrellisError, Result};
use crate::store::{PortfolioExport, PortfolioStore};

use super::inner::PortfolioInner;
use super::{graph, InMemoryStore};

/// One line of the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum SnapshotRecord {
    /// A workstream record.
    Stream(Workstream),
    /// A permission grant record.
    Grant(PermissionGrant),
    /// A work item record.
    Item(WorkItem),
    /// A dependency edge record.
    Edge(DependencyEdge),
}

impl PortfolioExport {
    /// Flatten an export into snapshot records, streams first so a
    /// sequential replay never references a missing parent entity.
    pub(crate) fn into_records(self) -> Vec<SnapshotRecord> {
        let mut records =
            Vec::with_capacity(self.streams.len() + self.grants.len() + self.items.len() + self.edges.len());
        records.extend(self.streams.into_iter().map(SnapshotRecord::Stream));
        records.extend(self.grants.into_iter().map(SnapshotRecord::Grant));
        records.extend(self.items.into_iter().map(SnapshotRecord::Item));
        records.extend(self.edges.into_iter().map(SnapshotRecord::Edge));
        records
    }
}

/// A non-fatal problem found while loading a snapshot.
///
/// The load keeps every record it can make sense of; whatever had to be
/// repaired or dropped is reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    /// A line was not valid JSON (or not a known record shape) and was
    /// skipped.
    #[error("line {line_number}: malformed record: {error}")]
    MalformedLine {
        /// 1-based line number in the snapshot file.
        line_number: usize,
        /// Parser error text.
        error: String,
    },

    /// A second workstream record reused an id; the first one wins.
    #[error("duplicate workstream record: {stream}")]
    DuplicateStream {
        /// The duplicated id.
        stream: StreamId,
    },

    /// A second item record reused an id; the first one wins.
    #[error("duplicate work item record: {item}")]
    DuplicateItem {
        /// The duplicated id.
        item: ItemId,
    },

    /// A workstream referenced a parent that is not in the file; it was
    /// loaded as a root.
    #[error("workstream {stream} references missing parent {missing_parent}; loaded as root")]
    OrphanedStream {
        /// The re-rooted workstream.
        stream: StreamId,
        /// The parent id that was not found.
        missing_parent: StreamId,
    },

    /// A group of workstreams formed a parent loop; one of them was
    /// re-rooted to break it.
    #[error("workstream {stream} sat on a looping parent chain; loaded as root")]
    ParentLoopBroken {
        /// The workstream that was re-rooted.
        stream: StreamId,
    },

    /// A stored depth disagreed with the parent chain and was recomputed.
    #[error("workstream {stream}: stored depth {stored} corrected to {computed}")]
    DepthRepaired {
        /// The affected workstream.
        stream: StreamId,
        /// The depth stored in the file.
        stored: u32,
        /// The depth implied by the parent chain.
        computed: u32,
    },

    /// A loaded subtree is deeper than the configured limit. The data is
    /// kept; only new nodes below the limit are refused.
    #[error("workstream {stream} sits at depth {depth}, over the configured maximum {max}")]
    DepthOverLimit {
        /// The too-deep workstream.
        stream: StreamId,
        /// Its actual depth.
        depth: u32,
        /// The configured maximum.
        max: u32,
    },

    /// A grant referenced a workstream that is not in the file; skipped.
    #[error("grant on missing workstream {stream} skipped")]
    OrphanedGrant {
        /// The missing workstream id.
        stream: StreamId,
    },

    /// An item referenced a workstream that is not in the file; skipped.
    #[error("work item {item} references missing workstream {stream}; skipped")]
    OrphanedItem {
        /// The skipped item.
        item: ItemId,
        /// The missing workstream id.
        stream: StreamId,
    },

    /// An edge referenced an item that is not in the file; skipped.
    #[error("edge {prerequisite} -> {dependent} references a missing item; skipped")]
    OrphanedEdge {
        /// The prerequisite end of the skipped edge.
        prerequisite: ItemId,
        /// The dependent end of the skipped edge.
        dependent: ItemId,
    },

    /// A second edge between the same ordered pair; the first one wins.
    #[error("duplicate edge {prerequisite} -> {dependent} skipped")]
    DuplicateEdgeSkipped {
        /// The prerequisite end.
        prerequisite: ItemId,
        /// The dependent end.
        dependent: ItemId,
    },

    /// An edge would have closed a dependency cycle; skipped.
    #[error("edge {prerequisite} -> {dependent} would close a cycle; skipped")]
    CycleEdgeSkipped {
        /// The prerequisite end.
        prerequisite: ItemId,
        /// The dependent end.
        dependent: ItemId,
    },
}

/// Load a snapshot file into a fresh in-memory store.
pub async fn load_snapshot(
    path: &Path,
    max_depth: u32,
) -> Result<(Box<dyn PortfolioStore>, Vec<LoadWarning>)> {
    let (records, read_warnings): (Vec<SnapshotRecord>, _) =
        trellis_jsonl::read_jsonl_resilient(path)
            .await
            .map_err(|e| TrellisError::Snapshot(e.to_string()))?;

    let mut warnings: Vec<LoadWarning> = read_warnings
        .into_iter()
        .map(|w| match w {
            trellis_jsonl::Warning::MalformedJson { line_number, error } => {
                LoadWarning::MalformedLine { line_number, error }
            }
        })
        .collect();

    let (inner, build_warnings) = build_inner(records, max_depth);
    warnings.extend(build_warnings);

    Ok((Box::new(InMemoryStore::from_inner(inner)), warnings))
}

/// Save a store's full record set to a snapshot file, atomically.
pub async fn save_snapshot(store: &dyn PortfolioStore, path: &Path) -> Result<()> {
    let records = store.export().await?.into_records();
    trellis_jsonl::write_jsonl_atomic(path, &records)
        .await
        .map_err(|e| TrellisError::Snapshot(e.to_string()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "snapshot saved");
    Ok(())
}

/// Rebuild store state from raw records, repairing what can be repaired and
/// skipping what cannot.
pub(crate) fn build_inner(
    records: Vec<SnapshotRecord>,
    max_depth: u32,
) -> (PortfolioInner, Vec<LoadWarning>) {
    let mut warnings = Vec::new();

    let mut streams: Vec<Workstream> = Vec::new();
    let mut grants: Vec<PermissionGrant> = Vec::new();
    let mut items: Vec<WorkItem> = Vec::new();
    let mut edges: Vec<DependencyEdge> = Vec::new();

    for record in records {
        match record {
            SnapshotRecord::Stream(s) => streams.push(s),
            SnapshotRecord::Grant(g) => grants.push(g),
            SnapshotRecord::Item(i) => items.push(i),
            SnapshotRecord::Edge(e) => edges.push(e),
        }
    }

    let mut inner = PortfolioInner::new(max_depth);

    // Streams: dedupe, re-root orphans and loops, then recompute depths
    // from the parent chains and compare with what was stored.
    let mut by_id: HashMap<StreamId, Workstream> = HashMap::new();
    let mut order: Vec<StreamId> = Vec::new();
    for stream in streams {
        if by_id.contains_key(&stream.id) {
            warnings.push(LoadWarning::DuplicateStream { stream: stream.id });
            continue;
        }
        order.push(stream.id);
        by_id.insert(stream.id, stream);
    }

    for &id in &order {
        let parent = by_id[&id].parent;
        if let Some(parent_id) = parent {
            if !by_id.contains_key(&parent_id) {
                warnings.push(LoadWarning::OrphanedStream {
                    stream: id,
                    missing_parent: parent_id,
                });
                by_id.get_mut(&id).unwrap().parent = None;
            }
        }
    }

    // Break parent loops: repeatedly re-root the smallest-id stream that
    // cannot reach a root, until every chain terminates.
    loop {
        let victim = order
            .iter()
            .copied()
            .filter(|&id| !reaches_root(&by_id, id))
            .min();
        let Some(victim) = victim else {
            break;
        };
        warnings.push(LoadWarning::ParentLoopBroken { stream: victim });
        by_id.get_mut(&victim).unwrap().parent = None;
    }

    for &id in &order {
        let computed = chain_depth(&by_id, id);
        let stream = by_id.get_mut(&id).unwrap();
        if stream.depth != computed {
            warnings.push(LoadWarning::DepthRepaired {
                stream: id,
                stored: stream.depth,
                computed,
            });
            stream.depth = computed;
        }
        if computed > max_depth {
            warnings.push(LoadWarning::DepthOverLimit {
                stream: id,
                depth: computed,
                max: max_depth,
            });
        }
    }

    for id in order {
        let stream = by_id.remove(&id).unwrap();
        inner.observe_stream_id(stream.id);
        inner.insert_stream(stream);
    }

    // Grants: exact duplicates collapse silently, orphans are skipped.
    for grant in grants {
        if !inner.streams.contains_key(&grant.stream) {
            warnings.push(LoadWarning::OrphanedGrant { stream: grant.stream });
            continue;
        }
        let existing = inner.grants.entry(grant.stream).or_default();
        if !existing.contains(&grant) {
            existing.push(grant);
        }
    }

    // Items.
    for item in items {
        if inner.items.contains_key(&item.id) {
            warnings.push(LoadWarning::DuplicateItem { item: item.id });
            continue;
        }
        if !inner.streams.contains_key(&item.stream) {
            warnings.push(LoadWarning::OrphanedItem {
                item: item.id,
                stream: item.stream,
            });
            continue;
        }
        inner.observe_item_id(item.id);
        inner.insert_item(item);
    }

    // Edges, in file order so the first of a conflicting pair wins.
    for edge in edges {
        let (Some(&from), Some(&to)) = (
            inner.node_map.get(&edge.prerequisite),
            inner.node_map.get(&edge.dependent),
        ) else {
            warnings.push(LoadWarning::OrphanedEdge {
                prerequisite: edge.prerequisite,
                dependent: edge.dependent,
            });
            continue;
        };
        if edge.prerequisite == edge.dependent || inner.graph.find_edge(from, to).is_some() {
            warnings.push(LoadWarning::DuplicateEdgeSkipped {
                prerequisite: edge.prerequisite,
                dependent: edge.dependent,
            });
            continue;
        }
        match graph::would_close_cycle(&inner, edge.prerequisite, edge.dependent) {
            Ok(true) => {
                warnings.push(LoadWarning::CycleEdgeSkipped {
                    prerequisite: edge.prerequisite,
                    dependent: edge.dependent,
                });
            }
            Ok(false) => {
                inner.graph.add_edge(from, to, edge.kind);
            }
            // Both endpoints were just resolved; unreachable in practice.
            Err(_) => {
                warnings.push(LoadWarning::OrphanedEdge {
                    prerequisite: edge.prerequisite,
                    dependent: edge.dependent,
                });
            }
        }
    }

    (inner, warnings)
}

/// Whether the parent chain of `id` terminates at a root.
fn reaches_root(streams: &HashMap<StreamId, Workstream>, id: StreamId) -> bool {
    let mut current = id;
    // A loop-free chain can take at most len steps.
    for _ in 0..=streams.len() {
        match streams[&current].parent {
            None => return true,
            Some(next) => current = next,
        }
    }
    false
}

/// Depth implied by the parent chain (1 for a root). Chains are loop-free
/// by the time this runs.
fn chain_depth(streams: &HashMap<StreamId, Workstream>, id: StreamId) -> u32 {
    let mut depth = 1;
    let mut current = streams[&id].parent;
    while let Some(parent) = current {
        depth += 1;
        current = streams[&parent].parent;
    }
    depth
}
