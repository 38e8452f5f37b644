//! The Keyserver Store reducer.
//!
//! Logout disconnects every keyserver but keeps the records: the URL and
//! watermark survive so the next session can resume incremental sync.
//! Account deletion drops the records entirely.

use crate::ops::{KeyserverStoreOperation, KeyserverStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::keyserver::{KeyserverConnectionStatus, KeyserverStore};

use super::ReducerResult;

type KeyserverReducerResult = ReducerResult<KeyserverStore, KeyserverStoreOperation>;

/// Reduce the Keyserver Store over one action.
pub fn reduce_keyserver_store(store: KeyserverStore, action: &Action) -> KeyserverReducerResult {
    match action {
        Action::AddKeyserver {
            keyserver_id,
            keyserver_info,
        } => {
            if store.keyserver_infos.get(keyserver_id) == Some(keyserver_info) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![KeyserverStoreOperation::Replace {
                    id: keyserver_id.clone(),
                    keyserver_info: keyserver_info.clone(),
                }],
            )
        }
        Action::RemoveKeyserver { keyserver_id } => {
            if !store.keyserver_infos.contains_key(keyserver_id) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![KeyserverStoreOperation::Remove {
                    ids: vec![keyserver_id.clone()],
                }],
            )
        }
        Action::UpdateKeyserverConnectionStatus {
            keyserver_id,
            status,
        } => {
            let Some(keyserver_info) = store.keyserver_infos.get(keyserver_id) else {
                return ReducerResult::unchanged(store);
            };
            if keyserver_info.connection == *status {
                return ReducerResult::unchanged(store);
            }
            let mut updated = keyserver_info.clone();
            updated.connection = *status;
            apply(
                store,
                vec![KeyserverStoreOperation::Replace {
                    id: keyserver_id.clone(),
                    keyserver_info: updated,
                }],
            )
        }
        Action::LogOutSuccess | Action::SessionInvalidated => disconnect_all(store),
        Action::DeleteAccountSuccess => {
            if store.keyserver_infos.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![KeyserverStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(
    store: KeyserverStore,
    operations: Vec<KeyserverStoreOperation>,
) -> KeyserverReducerResult {
    let store = KeyserverStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

fn disconnect_all(store: KeyserverStore) -> KeyserverReducerResult {
    let mut ids: Vec<&String> = store
        .keyserver_infos
        .iter()
        .filter(|(_, keyserver_info)| {
            keyserver_info.connection != KeyserverConnectionStatus::Disconnected
        })
        .map(|(id, _)| id)
        .collect();
    ids.sort();
    let operations: Vec<KeyserverStoreOperation> = ids
        .into_iter()
        .map(|id| {
            let mut updated = store.keyserver_infos[id].clone();
            updated.connection = KeyserverConnectionStatus::Disconnected;
            KeyserverStoreOperation::Replace {
                id: id.clone(),
                keyserver_info: updated,
            }
        })
        .collect();
    if operations.is_empty() {
        return ReducerResult::unchanged(store);
    }
    apply(store, operations)
}
