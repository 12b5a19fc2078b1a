//! Permission resolution over the workstream hierarchy.
//!
//! Grants attach to workstreams; a principal's effective access on a node is
//! the union of what is granted directly and what flows down from ancestors
//! via subtree-scoped grants. Access only ever accumulates down the tree: a
//! child cannot weaken what an ancestor granted.

use std::collections::BTreeSet;

use crate::domain::{
    EffectiveAccess, GrantScope, InheritedGrant, PermissionKind, PrincipalId, StreamId,
};
use crate::error::Result;
use crate::store::PortfolioStore;

/// Resolves effective access by combining direct and inherited grants.
///
/// Borrows the store; construct one per query batch.
pub struct PermissionResolver<'a> {
    store: &'a dyn PortfolioStore,
}

impl<'a> PermissionResolver<'a> {
    /// Create a resolver over the given store.
    pub fn new(store: &'a dyn PortfolioStore) -> Self {
        Self { store }
    }

    /// Resolve one principal's access on one workstream.
    ///
    /// Direct kinds come from grants on the node itself, whatever their
    /// scope. Inherited kinds come from ancestors' `NodeAndDescendants`
    /// grants, nearest ancestor first, each carrying provenance. The
    /// effective set is the union of both, closed downward (admin implies
    /// edit implies view).
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if the workstream does not exist
    pub async fn resolve(
        &self,
        stream: StreamId,
        principal: PrincipalId,
    ) -> Result<EffectiveAccess> {
        // ancestors() distinguishes a missing stream from a root.
        let ancestors = self.store.ancestors(stream).await?;

        let mut direct: Vec<PermissionKind> = self
            .store
            .grants_for(stream)
            .await?
            .into_iter()
            .filter(|g| g.principal == principal)
            .map(|g| g.kind)
            .collect();
        direct.sort_unstable_by(|a, b| b.cmp(a));
        direct.dedup();

        let mut inherited: Vec<InheritedGrant> = Vec::new();
        for ancestor in &ancestors {
            for grant in self.store.grants_for(ancestor.id).await? {
                if grant.principal == principal && grant.scope == GrantScope::NodeAndDescendants {
                    inherited.push(InheritedGrant {
                        kind: grant.kind,
                        from_stream: ancestor.id,
                        from_name: ancestor.name.clone(),
                    });
                }
            }
        }

        let mut effective: BTreeSet<PermissionKind> = BTreeSet::new();
        for kind in direct.iter().copied().chain(inherited.iter().map(|g| g.kind)) {
            effective.extend(kind.implied_kinds());
        }

        Ok(EffectiveAccess {
            direct,
            inherited,
            effective,
        })
    }

    /// Whether the principal holds at least `kind` on the workstream.
    pub async fn allows(
        &self,
        stream: StreamId,
        principal: PrincipalId,
        kind: PermissionKind,
    ) -> Result<bool> {
        Ok(self.resolve(stream, principal).await?.allows(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewStream, PermissionGrant};
    use crate::error::Error;
    use crate::store::in_memory::new_in_memory_store;
    use crate::store::PortfolioStore;

    async fn three_level_store() -> (Box<dyn PortfolioStore>, StreamId, StreamId, StreamId) {
        let mut store = new_in_memory_store(3);
        let root = store
            .create_stream(NewStream {
                name: "Platform".to_string(),
                parent: None,
                owner: PrincipalId::new(1),
            })
            .await
            .unwrap();
        let mid = store
            .create_stream(NewStream {
                name: "Backend".to_string(),
                parent: Some(root.id),
                owner: PrincipalId::new(1),
            })
            .await
            .unwrap();
        let leaf = store
            .create_stream(NewStream {
                name: "API".to_string(),
                parent: Some(mid.id),
                owner: PrincipalId::new(1),
            })
            .await
            .unwrap();
        (store, root.id, mid.id, leaf.id)
    }

    fn grant(
        stream: StreamId,
        principal: i64,
        kind: PermissionKind,
        scope: GrantScope,
    ) -> PermissionGrant {
        PermissionGrant {
            stream,
            principal: PrincipalId::new(principal),
            kind,
            scope,
        }
    }

    #[tokio::test]
    async fn test_direct_grant_only() {
        let (mut store, root, _, _) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::Edit, GrantScope::NodeOnly))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(root, PrincipalId::new(7)).await.unwrap();

        assert_eq!(access.direct, vec![PermissionKind::Edit]);
        assert!(access.inherited.is_empty());
        assert!(access.allows(PermissionKind::View));
        assert!(access.allows(PermissionKind::Edit));
        assert!(!access.allows(PermissionKind::Admin));
    }

    #[tokio::test]
    async fn test_subtree_grant_flows_down_with_provenance() {
        let (mut store, root, _, leaf) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::View, GrantScope::NodeAndDescendants))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(leaf, PrincipalId::new(7)).await.unwrap();

        assert!(access.direct.is_empty());
        assert_eq!(access.inherited.len(), 1);
        assert_eq!(access.inherited[0].from_stream, root);
        assert_eq!(access.inherited[0].from_name, "Platform");
        assert!(access.allows(PermissionKind::View));
    }

    #[tokio::test]
    async fn test_node_only_grant_does_not_flow() {
        let (mut store, root, _, leaf) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::Admin, GrantScope::NodeOnly))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(leaf, PrincipalId::new(7)).await.unwrap();

        assert!(access.effective.is_empty());
        assert!(!access.allows(PermissionKind::View));
    }

    #[tokio::test]
    async fn test_union_never_weakens_ancestor_grant() {
        // Edit flows down from the root; a weaker direct View on the leaf
        // must not mask it.
        let (mut store, root, _, leaf) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::Edit, GrantScope::NodeAndDescendants))
            .await
            .unwrap();
        store
            .grant(grant(leaf, 7, PermissionKind::View, GrantScope::NodeOnly))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(leaf, PrincipalId::new(7)).await.unwrap();

        assert!(access.allows(PermissionKind::Edit));
        assert_eq!(access.direct, vec![PermissionKind::View]);
    }

    #[tokio::test]
    async fn test_inherited_ordered_nearest_first() {
        let (mut store, root, mid, leaf) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::View, GrantScope::NodeAndDescendants))
            .await
            .unwrap();
        store
            .grant(grant(mid, 7, PermissionKind::Edit, GrantScope::NodeAndDescendants))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(leaf, PrincipalId::new(7)).await.unwrap();

        let sources: Vec<StreamId> = access.inherited.iter().map(|g| g.from_stream).collect();
        assert_eq!(sources, vec![mid, root]);
    }

    #[tokio::test]
    async fn test_other_principals_do_not_leak() {
        let (mut store, root, _, _) = three_level_store().await;
        store
            .grant(grant(root, 7, PermissionKind::Admin, GrantScope::NodeAndDescendants))
            .await
            .unwrap();

        let resolver = PermissionResolver::new(store.as_ref());
        let access = resolver.resolve(root, PrincipalId::new(8)).await.unwrap();
        assert!(access.effective.is_empty());
    }

    #[tokio::test]
    async fn test_missing_stream_errors() {
        let (store, _, _, _) = three_level_store().await;
        let resolver = PermissionResolver::new(store.as_ref());
        let result = resolver.resolve(StreamId::new(99), PrincipalId::new(7)).await;
        assert!(matches!(result, Err(Error::StreamNotFound(_))));
    }
}
