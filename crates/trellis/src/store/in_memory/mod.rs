//! In-memory implementation of [`PortfolioStore`].
//!
//! State lives in [`inner::PortfolioInner`] behind a single async mutex;
//! each trait method locks once and runs to completion, which is what makes
//! the validate-then-mutate operations atomic. The pure algorithms are split
//! out so they can be composed and tested without the lock:
//!
//! - [`tree`]: ancestor/descendant walks, cycle checks, depth bookkeeping
//! - [`graph`]: petgraph traversals over the dependency edges
//! - [`snapshot`]: JSONL persistence and the resilient load
//!
//! [`PortfolioStore`]: crate::store::PortfolioStore

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::store::PortfolioStore;

mod graph;
mod inner;
mod snapshot;
mod trait_impl;
mod tree;

pub use snapshot::{load_snapshot, save_snapshot, LoadWarning, SnapshotRecord};

use inner::PortfolioInner;

/// In-memory portfolio store.
pub struct InMemoryStore {
    inner: Arc<Mutex<PortfolioInner>>,
}

impl InMemoryStore {
    /// Create an empty store with the given hierarchy depth limit.
    pub fn new(max_depth: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PortfolioInner::new(max_depth))),
        }
    }

    pub(crate) fn from_inner(inner: PortfolioInner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

/// Create a boxed in-memory store.
pub fn new_in_memory_store(max_depth: u32) -> Box<dyn PortfolioStore> {
    Box::new(InMemoryStore::new(max_depth))
}
