//! The Thread Activity Store reducer: local navigation/prune timestamps
//! that drive message-history pruning.

use crate::ops::{StoreOpsHandler, ThreadActivityStoreOperation, ThreadActivityStoreOpsHandler};
use crate::types::action::Action;
use crate::types::thread_activity::ThreadActivityStore;
use crate::types::update::ClientUpdateInfo;
use crate::updates::compact_updates;

use super::ReducerResult;

type ThreadActivityReducerResult =
    ReducerResult<ThreadActivityStore, ThreadActivityStoreOperation>;

/// Reduce the Thread Activity Store over one action.
pub fn reduce_thread_activity_store(
    store: ThreadActivityStore,
    action: &Action,
) -> ThreadActivityReducerResult {
    match action {
        Action::UpdateThreadLastNavigated { thread_id, time } => {
            let mut entry = store
                .thread_activity_store
                .get(thread_id)
                .copied()
                .unwrap_or_default();
            entry.last_navigated_to = *time;
            apply(
                store,
                vec![ThreadActivityStoreOperation::Replace {
                    id: thread_id.clone(),
                    entry,
                }],
            )
        }
        Action::MessageStorePrune { thread_ids } => {
            let now = crate::time::now_timestamp_millis();
            let operations: Vec<ThreadActivityStoreOperation> = thread_ids
                .iter()
                .map(|thread_id| {
                    let mut entry = store
                        .thread_activity_store
                        .get(thread_id)
                        .copied()
                        .unwrap_or_default();
                    entry.last_pruned = now;
                    ThreadActivityStoreOperation::Replace {
                        id: thread_id.clone(),
                        entry,
                    }
                })
                .collect();
            if operations.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, operations)
        }
        Action::IncrementalStateSync(payload) => {
            remove_deleted_threads(store, &payload.new_updates)
        }
        Action::ProcessUpdates { new_updates } => remove_deleted_threads(store, new_updates),
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.thread_activity_store.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![ThreadActivityStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(
    store: ThreadActivityStore,
    operations: Vec<ThreadActivityStoreOperation>,
) -> ThreadActivityReducerResult {
    let store = ThreadActivityStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

/// Activity entries for deleted threads would otherwise leak forever.
fn remove_deleted_threads(
    store: ThreadActivityStore,
    new_updates: &[ClientUpdateInfo],
) -> ThreadActivityReducerResult {
    let ids: Vec<String> = compact_updates(new_updates)
        .iter()
        .filter_map(|update| match update {
            ClientUpdateInfo::DeleteThread { thread_id, .. }
                if store.thread_activity_store.contains_key(thread_id) =>
            {
                Some(thread_id.clone())
            }
            _ => None,
        })
        .collect();
    if ids.is_empty() {
        return ReducerResult::unchanged(store);
    }
    apply(store, vec![ThreadActivityStoreOperation::Remove { ids }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_creates_entry_and_prune_preserves_it() {
        let navigated = reduce_thread_activity_store(
            ThreadActivityStore::default(),
            &Action::UpdateThreadLastNavigated {
                thread_id: "256|84015".to_string(),
                time: 9_000,
            },
        );
        assert_eq!(
            navigated.store.thread_activity_store["256|84015"].last_navigated_to,
            9_000
        );

        let pruned = reduce_thread_activity_store(
            navigated.store,
            &Action::MessageStorePrune {
                thread_ids: vec!["256|84015".to_string()],
            },
        );
        let entry = &pruned.store.thread_activity_store["256|84015"];
        assert_eq!(entry.last_navigated_to, 9_000);
        assert!(entry.last_pruned > 0);
    }

    #[test]
    fn test_delete_thread_update_drops_entry() {
        let navigated = reduce_thread_activity_store(
            ThreadActivityStore::default(),
            &Action::UpdateThreadLastNavigated {
                thread_id: "256|84015".to_string(),
                time: 9_000,
            },
        );
        let result = reduce_thread_activity_store(
            navigated.store,
            &Action::ProcessUpdates {
                new_updates: vec![ClientUpdateInfo::DeleteThread {
                    id: "u1".to_string(),
                    time: 10_000,
                    thread_id: "256|84015".to_string(),
                }],
            },
        );
        assert!(result.store.thread_activity_store.is_empty());
    }

    #[test]
    fn test_delete_of_unknown_thread_is_a_no_op() {
        let result = reduce_thread_activity_store(
            ThreadActivityStore::default(),
            &Action::ProcessUpdates {
                new_updates: vec![ClientUpdateInfo::DeleteThread {
                    id: "u1".to_string(),
                    time: 10_000,
                    thread_id: "256|84015".to_string(),
                }],
            },
        );
        assert!(result.operations.is_empty());
    }
}
