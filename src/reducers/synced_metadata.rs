//! The Synced Metadata Store reducer.

use crate::ops::{StoreOpsHandler, SyncedMetadataStoreOperation, SyncedMetadataStoreOpsHandler};
use crate::types::action::Action;
use crate::types::synced_metadata::SyncedMetadataStore;

use super::ReducerResult;

type SyncedMetadataReducerResult = ReducerResult<SyncedMetadataStore, SyncedMetadataStoreOperation>;

/// Reduce the Synced Metadata Store over one action.
pub fn reduce_synced_metadata_store(
    store: SyncedMetadataStore,
    action: &Action,
) -> SyncedMetadataReducerResult {
    match action {
        Action::SetSyncedMetadata { name, value } => {
            if store.synced_metadata.get(name) == Some(value) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![SyncedMetadataStoreOperation::Replace {
                    name: name.clone(),
                    value: value.clone(),
                }],
            )
        }
        Action::ClearSyncedMetadata { name } => {
            if !store.synced_metadata.contains_key(name) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![SyncedMetadataStoreOperation::Remove {
                    names: vec![name.clone()],
                }],
            )
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.synced_metadata.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![SyncedMetadataStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(
    store: SyncedMetadataStore,
    operations: Vec<SyncedMetadataStoreOperation>,
) -> SyncedMetadataReducerResult {
    let store = SyncedMetadataStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}
