//! Integration tests for permission flow through the hierarchy.
//!
//! Exercises the resolver against stores built through the public trait,
//! including a property test that a subtree-scoped admin grant reaches every
//! descendant with the full implied set.

use proptest::prelude::*;
use trellis::domain::{
    GrantScope, NewStream, PermissionGrant, PermissionKind, PrincipalId, StreamId,
};
use trellis::permissions::PermissionResolver;
use trellis::store::in_memory::new_in_memory_store;
use trellis::store::PortfolioStore;

fn new_stream(name: &str, parent: Option<StreamId>) -> NewStream {
    NewStream {
        name: name.to_string(),
        parent,
        owner: PrincipalId::new(1),
    }
}

fn grant(stream: StreamId, principal: i64, kind: PermissionKind, scope: GrantScope) -> PermissionGrant {
    PermissionGrant {
        stream,
        principal: PrincipalId::new(principal),
        kind,
        scope,
    }
}

// ========== Grant Lifecycle ==========

#[tokio::test]
async fn test_revoke_removes_inherited_access() {
    let mut store = new_in_memory_store(3);
    let root = store.create_stream(new_stream("root", None)).await.unwrap();
    let child = store
        .create_stream(new_stream("child", Some(root.id)))
        .await
        .unwrap();

    store
        .grant(grant(root.id, 7, PermissionKind::Edit, GrantScope::NodeAndDescendants))
        .await
        .unwrap();

    let resolver = PermissionResolver::new(store.as_ref());
    assert!(resolver
        .allows(child.id, PrincipalId::new(7), PermissionKind::Edit)
        .await
        .unwrap());

    store
        .revoke(
            root.id,
            PrincipalId::new(7),
            PermissionKind::Edit,
            GrantScope::NodeAndDescendants,
        )
        .await
        .unwrap();

    let resolver = PermissionResolver::new(store.as_ref());
    assert!(!resolver
        .allows(child.id, PrincipalId::new(7), PermissionKind::View)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_grant_is_idempotent() {
    let mut store = new_in_memory_store(3);
    let root = store.create_stream(new_stream("root", None)).await.unwrap();

    let g = grant(root.id, 7, PermissionKind::View, GrantScope::NodeOnly);
    store.grant(g.clone()).await.unwrap();
    store.grant(g).await.unwrap();

    assert_eq!(store.grants_for(root.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_kind_different_scope_are_distinct_grants() {
    let mut store = new_in_memory_store(3);
    let root = store.create_stream(new_stream("root", None)).await.unwrap();
    let child = store
        .create_stream(new_stream("child", Some(root.id)))
        .await
        .unwrap();

    store
        .grant(grant(root.id, 7, PermissionKind::View, GrantScope::NodeOnly))
        .await
        .unwrap();
    store
        .grant(grant(root.id, 7, PermissionKind::View, GrantScope::NodeAndDescendants))
        .await
        .unwrap();
    assert_eq!(store.grants_for(root.id).await.unwrap().len(), 2);

    // Revoking the node-only grant must leave the subtree grant working.
    store
        .revoke(
            root.id,
            PrincipalId::new(7),
            PermissionKind::View,
            GrantScope::NodeOnly,
        )
        .await
        .unwrap();

    let resolver = PermissionResolver::new(store.as_ref());
    assert!(resolver
        .allows(child.id, PrincipalId::new(7), PermissionKind::View)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_move_changes_inherited_access() {
    // Inheritance follows the current ancestor chain, not the one the
    // stream was created under.
    let mut store = new_in_memory_store(3);
    let granted = store.create_stream(new_stream("granted", None)).await.unwrap();
    let plain = store.create_stream(new_stream("plain", None)).await.unwrap();
    let child = store
        .create_stream(new_stream("child", Some(granted.id)))
        .await
        .unwrap();

    store
        .grant(grant(granted.id, 7, PermissionKind::Edit, GrantScope::NodeAndDescendants))
        .await
        .unwrap();

    let resolver = PermissionResolver::new(store.as_ref());
    assert!(resolver
        .allows(child.id, PrincipalId::new(7), PermissionKind::Edit)
        .await
        .unwrap());

    store.set_parent(child.id, Some(plain.id)).await.unwrap();

    let resolver = PermissionResolver::new(store.as_ref());
    assert!(!resolver
        .allows(child.id, PrincipalId::new(7), PermissionKind::View)
        .await
        .unwrap());
}

// ========== Subtree Admin Property ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// An admin grant scoped to a subtree gives the principal admin, edit,
    /// and view on every stream of that subtree, whatever its shape.
    #[test]
    fn prop_subtree_admin_reaches_every_descendant(
        parents in prop::collection::vec(prop::option::of(0usize..6), 1..8),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async move {
            let mut store = new_in_memory_store(16);
            let root = store.create_stream(new_stream("root", None)).await.unwrap();
            let mut ids = vec![root.id];

            for (i, parent_choice) in parents.iter().enumerate() {
                let parent = ids[parent_choice.unwrap_or(0) % ids.len()];
                let stream = store
                    .create_stream(new_stream(&format!("s{i}"), Some(parent)))
                    .await
                    .unwrap();
                ids.push(stream.id);
            }

            store
                .grant(grant(root.id, 7, PermissionKind::Admin, GrantScope::NodeAndDescendants))
                .await
                .unwrap();

            let resolver = PermissionResolver::new(store.as_ref());
            for id in &ids {
                let access = resolver.resolve(*id, PrincipalId::new(7)).await.unwrap();
                assert!(access.allows(PermissionKind::Admin));
                assert!(access.allows(PermissionKind::Edit));
                assert!(access.allows(PermissionKind::View));
                if *id != root.id {
                    assert_eq!(access.inherited.len(), 1);
                    assert_eq!(access.inherited[0].from_stream, root.id);
                }
            }
        });
    }
}
