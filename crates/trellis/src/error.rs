//! Error types for trellis operations.
//!
//! Every variant names the invariant that was violated and carries the ids
//! involved, so callers can match on the failure instead of parsing messages.

use std::io;
use thiserror::Error;

use crate::domain::{GrantScope, ItemId, PermissionKind, PrincipalId, StreamId};

/// The error type for trellis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot persistence error.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // ========== Workstream hierarchy ==========
    /// Workstream not found.
    #[error("Workstream not found: {0}")]
    StreamNotFound(StreamId),

    /// Re-parenting would make a workstream its own ancestor.
    #[error("Cannot move workstream {stream} under {proposed_parent}: it would become its own ancestor")]
    CircularHierarchy {
        /// The workstream being moved.
        stream: StreamId,
        /// The requested new parent.
        proposed_parent: StreamId,
    },

    /// A parent chain loops back on itself. Only reachable with a corrupted
    /// snapshot; normal mutation paths never admit one.
    #[error("Workstream {stream} sits on a looping parent chain")]
    HierarchyLoop {
        /// The workstream whose ancestor walk revisited a node.
        stream: StreamId,
    },

    /// The hierarchy depth limit would be exceeded.
    #[error("Workstream {stream} would reach depth {would_be}, maximum is {max}")]
    DepthExceeded {
        /// The workstream that would end up too deep.
        stream: StreamId,
        /// The depth it would end up at.
        would_be: u32,
        /// The configured maximum depth.
        max: u32,
    },

    /// A workstream with children cannot be deleted.
    #[error("Cannot delete workstream {stream}: it has {child_count} child workstream(s)")]
    CannotDeleteNonLeaf {
        /// The workstream that still has children.
        stream: StreamId,
        /// How many direct children it has.
        child_count: usize,
    },

    /// A workstream with work items attached cannot be deleted.
    #[error("Cannot delete workstream {stream}: {item_count} work item(s) are still attached")]
    StreamNotEmpty {
        /// The workstream that still holds items.
        stream: StreamId,
        /// How many items are attached.
        item_count: usize,
    },

    // ========== Dependency graph ==========
    /// Work item not found.
    #[error("Work item not found: {0}")]
    ItemNotFound(ItemId),

    /// An item cannot depend on itself.
    #[error("Work item {0} cannot depend on itself")]
    SelfDependency(ItemId),

    /// The edge would close a cycle in the dependency graph.
    #[error("Edge {prerequisite} -> {dependent} would create a circular dependency")]
    CircularDependency {
        /// The prerequisite end of the rejected edge.
        prerequisite: ItemId,
        /// The dependent end of the rejected edge.
        dependent: ItemId,
    },

    /// An edge between this ordered pair already exists.
    #[error("Edge {prerequisite} -> {dependent} already exists")]
    DuplicateEdge {
        /// The prerequisite end of the existing edge.
        prerequisite: ItemId,
        /// The dependent end of the existing edge.
        dependent: ItemId,
    },

    /// No edge between this ordered pair.
    #[error("No edge {prerequisite} -> {dependent}")]
    EdgeNotFound {
        /// The prerequisite end of the missing edge.
        prerequisite: ItemId,
        /// The dependent end of the missing edge.
        dependent: ItemId,
    },

    /// An item with downstream dependents cannot be deleted.
    #[error("Cannot delete work item {item}: {} item(s) depend on it", dependents.len())]
    ItemHasDependents {
        /// The item that still has dependents.
        item: ItemId,
        /// The items depending on it.
        dependents: Vec<ItemId>,
    },

    // ========== Permissions ==========
    /// No matching grant to revoke.
    #[error("No {kind} grant ({scope}) for principal {principal} on workstream {stream}")]
    GrantNotFound {
        /// The workstream the revocation targeted.
        stream: StreamId,
        /// The principal the revocation targeted.
        principal: PrincipalId,
        /// The permission kind that was not granted.
        kind: PermissionKind,
        /// The scope that was not granted.
        scope: GrantScope,
    },
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
