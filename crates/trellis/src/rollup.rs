//! Subtree completion rollups with cached results.
//!
//! A rollup answers "how done is this workstream, subtree included" with one
//! descendant walk and one grouped status query. Reports are cached per
//! workstream; mutations invalidate the affected stream and its ancestor
//! chain through [`crate::app::App`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::domain::{AggregateReport, ChildRollup, ItemStatus, StreamId};
use crate::error::Result;
use crate::store::PortfolioStore;

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Completion percentage for a count pair, 0.0 when nothing exists.
fn completion_pct(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(completed as f64 / total as f64 * 100.0)
    }
}

/// Cache of computed aggregate reports, keyed by workstream.
///
/// A plain sync mutex: entries are cloned in and out, nothing is held across
/// an await point.
#[derive(Default)]
pub struct AggregateCache {
    entries: Mutex<HashMap<StreamId, AggregateReport>>,
}

impl AggregateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached report.
    pub fn get(&self, stream: StreamId) -> Option<AggregateReport> {
        let entries = self.entries.lock().expect("aggregate cache poisoned");
        let hit = entries.get(&stream).cloned();
        if hit.is_some() {
            tracing::debug!(stream = %stream, "rollup cache hit");
        } else {
            tracing::debug!(stream = %stream, "rollup cache miss");
        }
        hit
    }

    /// Store a computed report.
    pub fn put(&self, report: AggregateReport) {
        let mut entries = self.entries.lock().expect("aggregate cache poisoned");
        entries.insert(report.stream, report);
    }

    /// Drop the entries for a set of workstreams.
    pub fn remove_many(&self, streams: &[StreamId]) {
        let mut entries = self.entries.lock().expect("aggregate cache poisoned");
        for stream in streams {
            if entries.remove(stream).is_some() {
                tracing::debug!(stream = %stream, "rollup cache invalidated");
            }
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().expect("aggregate cache poisoned").clear();
    }
}

/// Computes subtree completion rollups.
pub struct RollupAggregator<'a> {
    store: &'a dyn PortfolioStore,
    cache: &'a AggregateCache,
}

impl<'a> RollupAggregator<'a> {
    /// Create an aggregator over the given store and cache.
    pub fn new(store: &'a dyn PortfolioStore, cache: &'a AggregateCache) -> Self {
        Self { store, cache }
    }

    /// Roll up completion state for a workstream's whole subtree.
    ///
    /// The totals cover the workstream itself plus every descendant; the
    /// per-child breakdown partitions descendants under the immediate child
    /// each belongs to. Exactly one grouped status query runs however deep
    /// the subtree is. Results are cached until an item or hierarchy
    /// mutation invalidates them.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    pub async fn aggregate(&self, stream: StreamId) -> Result<AggregateReport> {
        if let Some(report) = self.cache.get(stream) {
            return Ok(report);
        }

        let descendants = self.store.descendants(stream).await?;

        let mut ids: Vec<StreamId> = Vec::with_capacity(descendants.len() + 1);
        ids.push(stream);
        ids.extend(descendants.iter().map(|d| d.id));
        let counts = self.store.status_counts(&ids).await?;

        let mut status_counts: BTreeMap<ItemStatus, u64> = BTreeMap::new();
        for table in counts.values() {
            for (&status, &count) in table {
                *status_counts.entry(status).or_insert(0) += count;
            }
        }
        let total: u64 = status_counts.values().sum();
        let completed = status_counts
            .get(&ItemStatus::Completed)
            .copied()
            .unwrap_or(0);

        // Partition descendants under the immediate child each sits below,
        // by climbing parent pointers inside the already-loaded subtree.
        let parent_of: HashMap<StreamId, Option<StreamId>> =
            descendants.iter().map(|d| (d.id, d.parent)).collect();
        let mut children: Vec<ChildRollup> = descendants
            .iter()
            .filter(|d| d.parent == Some(stream))
            .map(|child| ChildRollup {
                stream: child.id,
                name: child.name.clone(),
                total: 0,
                completed: 0,
                completion_pct: 0.0,
            })
            .collect();
        children.sort_unstable_by_key(|c| c.stream);

        let mut bucket_of: HashMap<StreamId, StreamId> = HashMap::new();
        for descendant in &descendants {
            let mut current = descendant.id;
            // Stop one step short of the rollup root.
            while let Some(&Some(parent)) = parent_of.get(&current) {
                if parent == stream {
                    break;
                }
                current = parent;
            }
            bucket_of.insert(descendant.id, current);
        }

        for (&id, table) in &counts {
            if id == stream {
                continue;
            }
            let Some(&bucket) = bucket_of.get(&id) else {
                continue;
            };
            if let Some(child) = children.iter_mut().find(|c| c.stream == bucket) {
                for (&status, &count) in table {
                    child.total += count;
                    if status == ItemStatus::Completed {
                        child.completed += count;
                    }
                }
            }
        }
        for child in &mut children {
            child.completion_pct = completion_pct(child.completed, child.total);
        }

        let report = AggregateReport {
            stream,
            total,
            completed,
            status_counts,
            completion_pct: completion_pct(completed, total),
            children,
        };
        self.cache.put(report.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemStatus, NewItem, NewStream, PrincipalId};
    use crate::error::Error;
    use crate::store::in_memory::new_in_memory_store;

    async fn add_stream(
        store: &mut Box<dyn PortfolioStore>,
        name: &str,
        parent: Option<StreamId>,
    ) -> StreamId {
        store
            .create_stream(NewStream {
                name: name.to_string(),
                parent,
                owner: PrincipalId::new(1),
            })
            .await
            .unwrap()
            .id
    }

    async fn add_item(store: &mut Box<dyn PortfolioStore>, stream: StreamId, status: ItemStatus) {
        store
            .create_item(NewItem {
                name: "task".to_string(),
                stream,
                status,
                target_date: None,
                owner: None,
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(completion_pct(0, 0), 0.0);
        assert_eq!(completion_pct(2, 3), 66.7);
    }

    #[tokio::test]
    async fn test_rollup_spans_whole_subtree() {
        let mut store = new_in_memory_store(3);
        let root = add_stream(&mut store, "root", None).await;
        let child = add_stream(&mut store, "child", Some(root)).await;
        let grandchild = add_stream(&mut store, "grandchild", Some(child)).await;

        add_item(&mut store, root, ItemStatus::Completed).await;
        add_item(&mut store, child, ItemStatus::Pending).await;
        add_item(&mut store, grandchild, ItemStatus::Completed).await;

        let cache = AggregateCache::new();
        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        let report = aggregator.aggregate(root).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.completed, 2);
        assert_eq!(report.completion_pct, 66.7);
        assert_eq!(report.status_counts[&ItemStatus::Pending], 1);
    }

    #[tokio::test]
    async fn test_children_partition_deep_descendants() {
        let mut store = new_in_memory_store(3);
        let root = add_stream(&mut store, "root", None).await;
        let left = add_stream(&mut store, "left", Some(root)).await;
        let right = add_stream(&mut store, "right", Some(root)).await;
        let left_leaf = add_stream(&mut store, "left-leaf", Some(left)).await;

        add_item(&mut store, left, ItemStatus::Completed).await;
        add_item(&mut store, left_leaf, ItemStatus::Pending).await;
        add_item(&mut store, right, ItemStatus::Completed).await;

        let cache = AggregateCache::new();
        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        let report = aggregator.aggregate(root).await.unwrap();

        assert_eq!(report.children.len(), 2);
        let left_rollup = &report.children[0];
        assert_eq!(left_rollup.stream, left);
        assert_eq!(left_rollup.total, 2);
        assert_eq!(left_rollup.completed, 1);
        assert_eq!(left_rollup.completion_pct, 50.0);

        let right_rollup = &report.children[1];
        assert_eq!(right_rollup.total, 1);
        assert_eq!(right_rollup.completion_pct, 100.0);
    }

    #[tokio::test]
    async fn test_empty_subtree_is_zero_not_nan() {
        let mut store = new_in_memory_store(3);
        let root = add_stream(&mut store, "root", None).await;

        let cache = AggregateCache::new();
        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        let report = aggregator.aggregate(root).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.completion_pct, 0.0);
        assert!(report.children.is_empty());
    }

    #[tokio::test]
    async fn test_items_on_parent_not_in_child_buckets() {
        let mut store = new_in_memory_store(3);
        let root = add_stream(&mut store, "root", None).await;
        let child = add_stream(&mut store, "child", Some(root)).await;

        add_item(&mut store, root, ItemStatus::Pending).await;
        add_item(&mut store, child, ItemStatus::Pending).await;

        let cache = AggregateCache::new();
        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        let report = aggregator.aggregate(root).await.unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.children[0].total, 1);
    }

    #[tokio::test]
    async fn test_cache_round_trip_and_invalidation() {
        let mut store = new_in_memory_store(3);
        let root = add_stream(&mut store, "root", None).await;
        add_item(&mut store, root, ItemStatus::Pending).await;

        let cache = AggregateCache::new();
        {
            let aggregator = RollupAggregator::new(store.as_ref(), &cache);
            let first = aggregator.aggregate(root).await.unwrap();
            assert_eq!(first.completed, 0);
        }

        // Mutate behind the cache's back: the stale entry must survive
        // until invalidated, then the next aggregate recomputes.
        store
            .set_status(crate::domain::ItemId::new(1), ItemStatus::Completed)
            .await
            .unwrap();

        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        assert_eq!(aggregator.aggregate(root).await.unwrap().completed, 0);

        cache.remove_many(&[root]);
        assert_eq!(aggregator.aggregate(root).await.unwrap().completed, 1);
    }

    #[tokio::test]
    async fn test_missing_stream_errors() {
        let store = new_in_memory_store(3);
        let cache = AggregateCache::new();
        let aggregator = RollupAggregator::new(store.as_ref(), &cache);
        let result = aggregator.aggregate(StreamId::new(9)).await;
        assert!(matches!(result, Err(Error::StreamNotFound(_))));
    }
}
