//! Delay impact assessment and critical path analysis.
//!
//! Both analyses preload the edge set with one `all_edges()` call and work
//! over an adjacency map, so the cost is one store round trip regardless of
//! graph size.

use std::collections::{HashMap, HashSet};

use crate::domain::{
    CriticalPath, DelayEvent, EdgeKind, ImpactReport, ImpactedItem, ItemId, RiskLevel, Severity,
};
use crate::error::{Error, Result};
use crate::store::PortfolioStore;

/// Severity class an edge kind contributes to a path.
fn edge_class(kind: EdgeKind) -> Severity {
    match kind {
        EdgeKind::Blocks => Severity::High,
        EdgeKind::Enables => Severity::Medium,
        EdgeKind::Informs => Severity::Low,
    }
}

/// Analyzes how a schedule change ripples through the dependency graph.
pub struct ImpactAnalyzer<'a> {
    store: &'a dyn PortfolioStore,
}

impl<'a> ImpactAnalyzer<'a> {
    /// Create an analyzer over the given store.
    pub fn new(store: &'a dyn PortfolioStore) -> Self {
        Self { store }
    }

    /// Assess the downstream impact of one delay event.
    ///
    /// A path's class is its weakest edge (a blocks-only path is high; any
    /// enables edge caps it at medium, any informs edge at low), and a
    /// node's severity is the maximum class over all paths reaching it. The
    /// delay size is carried to every impacted item verbatim; this models
    /// the worst case, not an accumulating slip. The source itself is not
    /// listed.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the delayed item does not exist
    pub async fn assess(&self, event: &DelayEvent) -> Result<ImpactReport> {
        if self.store.item(event.item).await?.is_none() {
            return Err(Error::ItemNotFound(event.item));
        }

        let mut forward: HashMap<ItemId, Vec<(ItemId, Severity)>> = HashMap::new();
        for edge in self.store.all_edges().await? {
            forward
                .entry(edge.prerequisite)
                .or_default()
                .push((edge.dependent, edge_class(edge.kind)));
        }

        // Monotone relaxation: severities only ever increase, so each node
        // re-enters the worklist at most twice.
        let mut severity: HashMap<ItemId, Severity> = HashMap::new();
        let mut worklist = vec![(event.item, Severity::High)];
        while let Some((current, class)) = worklist.pop() {
            for &(next, edge) in forward.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
                let candidate = class.min(edge);
                if severity.get(&next).is_none_or(|&s| candidate > s) {
                    severity.insert(next, candidate);
                    worklist.push((next, candidate));
                }
            }
        }

        let delay_days = event.delay_days();
        let mut impacted: Vec<ImpactedItem> = severity
            .into_iter()
            .filter(|&(item, _)| item != event.item)
            .map(|(item, severity)| ImpactedItem {
                item,
                severity,
                delay_days,
                recommended_date: event.new_date,
            })
            .collect();
        impacted.sort_unstable_by(|a, b| b.severity.cmp(&a.severity).then(a.item.cmp(&b.item)));

        Ok(ImpactReport {
            source: event.item,
            delay_days,
            impacted,
        })
    }

    /// The longest chain of `Blocks` edges starting at an item.
    ///
    /// Risk is high iff any item on the chain appears in `delayed`. Ties
    /// between equally long continuations resolve to the smaller item id,
    /// which keeps the result deterministic.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the starting item does not exist
    /// - `CircularDependency` if the blocks subgraph somehow loops (store
    ///   mutations never admit one)
    pub async fn critical_path(
        &self,
        from: ItemId,
        delayed: &HashSet<ItemId>,
    ) -> Result<CriticalPath> {
        if self.store.item(from).await?.is_none() {
            return Err(Error::ItemNotFound(from));
        }

        let mut forward: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        for edge in self.store.all_edges().await? {
            if edge.kind == EdgeKind::Blocks {
                forward.entry(edge.prerequisite).or_default().push(edge.dependent);
            }
        }
        for next in forward.values_mut() {
            next.sort_unstable();
        }

        let mut memo: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        let mut on_stack: HashSet<ItemId> = HashSet::new();
        let items = longest_chain(from, &forward, &mut memo, &mut on_stack)?;

        let risk = if items.iter().any(|i| delayed.contains(i)) {
            RiskLevel::High
        } else {
            RiskLevel::Low
        };

        Ok(CriticalPath {
            length: items.len(),
            items,
            risk,
        })
    }
}

/// Longest blocks-chain starting at `node`, inclusive, memoized per node.
fn longest_chain(
    node: ItemId,
    forward: &HashMap<ItemId, Vec<ItemId>>,
    memo: &mut HashMap<ItemId, Vec<ItemId>>,
    on_stack: &mut HashSet<ItemId>,
) -> Result<Vec<ItemId>> {
    if let Some(chain) = memo.get(&node) {
        return Ok(chain.clone());
    }

    on_stack.insert(node);
    let mut best: Vec<ItemId> = Vec::new();
    for &next in forward.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
        if on_stack.contains(&next) {
            return Err(Error::CircularDependency {
                prerequisite: node,
                dependent: next,
            });
        }
        let candidate = longest_chain(next, forward, memo, on_stack)?;
        // Successors are visited in id order, so ties keep the smaller id.
        if candidate.len() > best.len() {
            best = candidate;
        }
    }
    on_stack.remove(&node);

    let mut chain = Vec::with_capacity(best.len() + 1);
    chain.push(node);
    chain.extend(best);
    memo.insert(node, chain.clone());
    Ok(chain)
}
