//! Hierarchy traversal algorithms.
//!
//! Free functions over [`PortfolioInner`] so every trait method can compose
//! them under a single lock hold. All of them read the child index instead
//! of scanning the stream map.

use std::collections::HashSet;

use crate::domain::{StreamId, Workstream};
use crate::error::{Error, Result};

use super::inner::PortfolioInner;

/// Ancestors of a workstream, nearest-first.
///
/// The visited set guards against a looping parent chain, which a corrupted
/// snapshot could introduce; normal mutations never admit one.
pub(crate) fn ancestors_of(inner: &PortfolioInner, id: StreamId) -> Result<Vec<Workstream>> {
    let start = inner
        .streams
        .get(&id)
        .ok_or(Error::StreamNotFound(id))?;

    let mut visited: HashSet<StreamId> = HashSet::from([id]);
    let mut chain = Vec::new();
    let mut current = start.parent;

    while let Some(parent_id) = current {
        if !visited.insert(parent_id) {
            return Err(Error::HierarchyLoop { stream: id });
        }
        let parent = inner
            .streams
            .get(&parent_id)
            .ok_or(Error::StreamNotFound(parent_id))?;
        chain.push(parent.clone());
        current = parent.parent;
    }

    Ok(chain)
}

/// The subtree below a workstream, ordered by `(depth, id)`.
///
/// Single breadth-first pass over the child index; the root itself is not
/// included.
pub(crate) fn descendants_of(inner: &PortfolioInner, id: StreamId) -> Result<Vec<Workstream>> {
    if !inner.streams.contains_key(&id) {
        return Err(Error::StreamNotFound(id));
    }

    let mut result = Vec::new();
    let mut frontier = vec![id];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for parent in frontier {
            if let Some(children) = inner.children.get(&parent) {
                next.extend(children.iter().copied());
            }
        }
        next.sort_unstable();
        for child_id in &next {
            result.push(inner.streams[child_id].clone());
        }
        frontier = next;
    }

    Ok(result)
}

/// Whether re-parenting `stream` under `proposed_parent` would make the
/// stream its own ancestor.
pub(crate) fn would_create_cycle(
    inner: &PortfolioInner,
    stream: StreamId,
    proposed_parent: StreamId,
) -> Result<bool> {
    if !inner.streams.contains_key(&stream) {
        return Err(Error::StreamNotFound(stream));
    }
    if !inner.streams.contains_key(&proposed_parent) {
        return Err(Error::StreamNotFound(proposed_parent));
    }

    if stream == proposed_parent {
        return Ok(true);
    }

    // A cycle forms iff the proposed parent already sits inside the subtree.
    Ok(descendants_of(inner, stream)?
        .iter()
        .any(|d| d.id == proposed_parent))
}

/// Height of the subtree rooted at `id`, counting `id` itself (1 for a leaf).
pub(crate) fn subtree_height(inner: &PortfolioInner, id: StreamId) -> u32 {
    let base = inner.streams.get(&id).map_or(1, |s| s.depth);
    let deepest = descendants_of(inner, id)
        .map(|d| d.iter().map(|s| s.depth).max().unwrap_or(base))
        .unwrap_or(base);
    deepest - base + 1
}

/// Rewrite depths across a subtree after a move, breadth-first from the root
/// of the moved subtree.
pub(crate) fn recompute_depths(inner: &mut PortfolioInner, root: StreamId, new_depth: u32) {
    let mut frontier = vec![(root, new_depth)];

    while let Some((id, depth)) = frontier.pop() {
        if let Some(stream) = inner.streams.get_mut(&id) {
            stream.depth = depth;
        }
        if let Some(children) = inner.children.get(&id) {
            frontier.extend(children.iter().map(|&c| (c, depth + 1)));
        }
    }
}
