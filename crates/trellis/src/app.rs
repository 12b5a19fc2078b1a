//! Application context wiring the store, config, and rollup cache together.
//!
//! [`App`] is what the CLI layer talks to. Mutating helpers pair each store
//! write with the rollup cache invalidation it requires, so a command cannot
//! forget to drop stale aggregates.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::commands::init::find_trellis_root;
use crate::config::{TrellisConfig, CONFIG_FILE_NAME, TRELLIS_DIR_NAME};
use crate::domain::{
    DependencyEdge, EdgeKind, GrantScope, ItemId, ItemStatus, NewItem, NewStream, PermissionGrant,
    PermissionKind, PrincipalId, StreamId, WorkItem, Workstream,
};
use crate::error::{Error, Result};
use crate::rollup::AggregateCache;
use crate::store::{create_store, PortfolioStore, StoreBackend};

/// Application context holding the store, configuration, and rollup cache.
pub struct App {
    store: Box<dyn PortfolioStore>,
    cache: AggregateCache,
    config: TrellisConfig,
    root_dir: PathBuf,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("root_dir", &self.root_dir)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Open the portfolio containing `start_dir`, walking up parents to find
    /// the `.trellis/` directory.
    ///
    /// # Errors
    ///
    /// - `Config` if no portfolio is found or the config file is invalid
    /// - `Snapshot` if the snapshot file cannot be loaded
    pub async fn from_directory(start_dir: &Path) -> Result<Self> {
        let root_dir = find_trellis_root(start_dir).ok_or_else(|| {
            Error::Config(format!(
                "Not a trellis portfolio (no '{TRELLIS_DIR_NAME}' found in this or any parent directory). Run 'trellis init' first"
            ))
        })?;

        let config_path = root_dir.join(TRELLIS_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = TrellisConfig::load(&config_path).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let store = create_store(backend, config.max_depth()).await?;

        Ok(Self {
            store,
            cache: AggregateCache::new(),
            config,
            root_dir,
        })
    }

    /// Build a context over a volatile in-memory store. Used by tests.
    pub async fn in_memory(max_depth: u32) -> Result<Self> {
        let store = create_store(StoreBackend::InMemory, max_depth).await?;
        let mut config = TrellisConfig::new(max_depth);
        config.storage.backend = "memory".to_string();
        Ok(Self {
            store,
            cache: AggregateCache::new(),
            config,
            root_dir: PathBuf::new(),
        })
    }

    /// Read access to the store.
    pub fn store(&self) -> &dyn PortfolioStore {
        self.store.as_ref()
    }

    /// The rollup cache.
    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// The loaded configuration.
    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    /// The portfolio root directory.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Persist the store if the backend is file-based.
    pub async fn save(&self) -> Result<()> {
        self.store.save().await
    }

    /// Drop cached rollups for a workstream and its whole ancestor chain.
    ///
    /// Every aggregate that includes the stream's items lives on that chain,
    /// so this is the single invalidation primitive the mutations share.
    async fn invalidate_rollups(&self, stream: StreamId) -> Result<()> {
        let mut affected: Vec<StreamId> = vec![stream];
        affected.extend(self.store.ancestors(stream).await?.iter().map(|a| a.id));
        self.cache.remove_many(&affected);
        Ok(())
    }

    // ========== Hierarchy mutations ==========

    /// Create a workstream and invalidate the rollups it now contributes to.
    pub async fn create_stream(&mut self, new_stream: NewStream) -> Result<Workstream> {
        let stream = self.store.create_stream(new_stream).await?;
        self.invalidate_rollups(stream.id).await?;
        Ok(stream)
    }

    /// Move a workstream, invalidating rollups on both the old and the new
    /// ancestor chain.
    pub async fn move_stream(
        &mut self,
        stream: StreamId,
        new_parent: Option<StreamId>,
    ) -> Result<Workstream> {
        // The chain the subtree leaves must be captured before the move.
        let mut affected: Vec<StreamId> = vec![stream];
        affected.extend(self.store.ancestors(stream).await?.iter().map(|a| a.id));

        let moved = self.store.set_parent(stream, new_parent).await?;

        affected.extend(self.store.ancestors(stream).await?.iter().map(|a| a.id));
        self.cache.remove_many(&affected);
        Ok(moved)
    }

    /// Delete a leaf workstream, invalidating its former ancestors.
    pub async fn delete_stream(&mut self, stream: StreamId) -> Result<()> {
        let mut affected: Vec<StreamId> = vec![stream];
        affected.extend(self.store.ancestors(stream).await?.iter().map(|a| a.id));

        self.store.delete_stream(stream).await?;
        self.cache.remove_many(&affected);
        Ok(())
    }

    // ========== Item mutations ==========

    /// Create a work item and invalidate the rollups that count it.
    pub async fn create_item(&mut self, new_item: NewItem) -> Result<WorkItem> {
        let item = self.store.create_item(new_item).await?;
        self.invalidate_rollups(item.stream).await?;
        Ok(item)
    }

    /// Change an item's status and invalidate its stream's rollup chain.
    pub async fn set_status(&mut self, item: ItemId, status: ItemStatus) -> Result<WorkItem> {
        let updated = self.store.set_status(item, status).await?;
        self.invalidate_rollups(updated.stream).await?;
        Ok(updated)
    }

    /// Change an item's target date. Rollups do not count dates, so no
    /// invalidation happens.
    pub async fn reschedule_item(&mut self, item: ItemId, date: NaiveDate) -> Result<WorkItem> {
        self.store.reschedule(item, date).await
    }

    /// Delete a work item and invalidate its former stream's rollup chain.
    pub async fn delete_item(&mut self, item: ItemId) -> Result<()> {
        let stream = self
            .store
            .item(item)
            .await?
            .ok_or(Error::ItemNotFound(item))?
            .stream;
        self.store.delete_item(item).await?;
        self.invalidate_rollups(stream).await?;
        Ok(())
    }

    // ========== Graph and grant mutations ==========

    /// Add a dependency edge. Edges do not affect rollups.
    pub async fn link(
        &mut self,
        prerequisite: ItemId,
        dependent: ItemId,
        kind: EdgeKind,
    ) -> Result<DependencyEdge> {
        self.store.add_edge(prerequisite, dependent, kind).await
    }

    /// Remove a dependency edge.
    pub async fn unlink(&mut self, prerequisite: ItemId, dependent: ItemId) -> Result<()> {
        self.store.remove_edge(prerequisite, dependent).await
    }

    /// Record a permission grant.
    pub async fn grant(&mut self, grant: PermissionGrant) -> Result<PermissionGrant> {
        self.store.grant(grant).await
    }

    /// Revoke a permission grant.
    pub async fn revoke(
        &mut self,
        stream: StreamId,
        principal: PrincipalId,
        kind: PermissionKind,
        scope: GrantScope,
    ) -> Result<()> {
        self.store.revoke(stream, principal, kind, scope).await
    }
}
