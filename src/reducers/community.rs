//! The Community Store reducer.

use crate::ops::{CommunityStoreOperation, CommunityStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::community::{CommunityInfo, CommunityStore};

use super::ReducerResult;

type CommunityReducerResult = ReducerResult<CommunityStore, CommunityStoreOperation>;

/// Reduce the Community Store over one action.
pub fn reduce_community_store(store: CommunityStore, action: &Action) -> CommunityReducerResult {
    match action {
        Action::AddCommunity {
            community_id,
            farcaster_channel_id,
        } => {
            let community_info = CommunityInfo {
                farcaster_channel_id: farcaster_channel_id.clone(),
            };
            if store.community_infos.get(community_id) == Some(&community_info) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![CommunityStoreOperation::Replace {
                    id: community_id.clone(),
                    community_info,
                }],
            )
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.community_infos.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![CommunityStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(
    store: CommunityStore,
    operations: Vec<CommunityStoreOperation>,
) -> CommunityReducerResult {
    let store = CommunityStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_community_then_link_channel() {
        let added = reduce_community_store(
            CommunityStore::default(),
            &Action::AddCommunity {
                community_id: "256|1".to_string(),
                farcaster_channel_id: None,
            },
        );
        assert!(added.store.community_infos["256|1"]
            .farcaster_channel_id
            .is_none());

        let linked = reduce_community_store(
            added.store,
            &Action::AddCommunity {
                community_id: "256|1".to_string(),
                farcaster_channel_id: Some("memes".to_string()),
            },
        );
        assert_eq!(
            linked.store.community_infos["256|1"].farcaster_channel_id,
            Some("memes".to_string())
        );
        assert_eq!(linked.operations.len(), 1);
    }

    #[test]
    fn test_readding_identical_community_is_a_no_op() {
        let added = reduce_community_store(
            CommunityStore::default(),
            &Action::AddCommunity {
                community_id: "256|1".to_string(),
                farcaster_channel_id: Some("memes".to_string()),
            },
        );
        let again = reduce_community_store(
            added.store,
            &Action::AddCommunity {
                community_id: "256|1".to_string(),
                farcaster_channel_id: Some("memes".to_string()),
            },
        );
        assert!(again.operations.is_empty());
    }
}
