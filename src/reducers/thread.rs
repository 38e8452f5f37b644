//! The Thread Store reducer.
//!
//! Two mutation paths converge here: server-driven reconciliation
//! (full state syncs and CHECK_STATE corrections, where the server's
//! declaration overwrites local state unconditionally) and update-driven
//! mutation (the per-kind specs in [`crate::updates`]). Divergence that
//! survives reconciliation is reported, never raised.

use std::collections::HashMap;

use crate::ops::{StoreOpsHandler, ThreadStoreOperation, ThreadStoreOpsHandler};
use crate::types::action::{Action, CheckStateChanges};
use crate::types::report::{ClientInconsistencyReport, InconsistencyReportType};
use crate::types::thread::{RawThreadInfo, ThreadStore};
use crate::types::update::ClientUpdateInfo;
use crate::updates::{compact_updates, update_spec_for};

use super::ReducerResult;

type ThreadReducerResult = ReducerResult<ThreadStore, ThreadStoreOperation>;

/// Reduce the Thread Store over one action.
pub fn reduce_thread_store(store: ThreadStore, action: &Action) -> ThreadReducerResult {
    match action {
        Action::LogInSuccess(payload) | Action::FullStateSync(payload) => {
            full_replace(store, &payload.thread_infos)
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            clear(store)
        }
        Action::IncrementalStateSync(payload) => {
            apply_updates(store, &payload.new_updates)
        }
        Action::ProcessUpdates { new_updates } => apply_updates(store, new_updates),
        Action::ProcessServerRequests {
            state_changes: Some(state_changes),
        } => reconcile(store, state_changes),
        Action::SetThreadUnreadStatus { thread_id, unread } => {
            let Some(stored) = store.thread_infos.get(thread_id) else {
                return ReducerResult::unchanged(store);
            };
            if stored.current_user.unread == *unread {
                return ReducerResult::unchanged(store);
            }
            let mut updated = stored.clone();
            updated.current_user.unread = *unread;
            apply(store, vec![ThreadStoreOperation::replace(updated)])
        }
        Action::UpdateSubscription {
            thread_id,
            subscription,
        } => {
            let Some(stored) = store.thread_infos.get(thread_id) else {
                return ReducerResult::unchanged(store);
            };
            if &stored.current_user.subscription == subscription {
                return ReducerResult::unchanged(store);
            }
            let mut updated = stored.clone();
            updated.current_user.subscription = subscription.clone();
            apply(store, vec![ThreadStoreOperation::replace(updated)])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(store: ThreadStore, operations: Vec<ThreadStoreOperation>) -> ThreadReducerResult {
    let store = ThreadStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

fn clear(store: ThreadStore) -> ThreadReducerResult {
    if store.thread_infos.is_empty() {
        return ReducerResult::unchanged(store);
    }
    apply(store, vec![ThreadStoreOperation::RemoveAll])
}

/// Full state replacement: remove everything, then replace with the
/// server's complete declaration.
fn full_replace(
    store: ThreadStore,
    thread_infos: &HashMap<String, RawThreadInfo>,
) -> ThreadReducerResult {
    let mut operations = vec![ThreadStoreOperation::RemoveAll];
    let mut declared: Vec<&RawThreadInfo> = thread_infos.values().collect();
    declared.sort_by(|a, b| a.id.cmp(&b.id));
    for thread_info in declared {
        operations.push(ThreadStoreOperation::replace(thread_info.clone()));
    }
    apply(store, operations)
}

/// Update-driven mutation: each update's spec generates operations
/// against the evolving map, so later updates in the same delivery see
/// the effect of earlier ones.
fn apply_updates(store: ThreadStore, new_updates: &[ClientUpdateInfo]) -> ThreadReducerResult {
    let mut working = store;
    let mut operations = Vec::new();
    for update in compact_updates(new_updates) {
        let spec = update_spec_for(update.update_type());
        let Some(update_ops) = spec.generate_ops_for_thread_updates(&working.thread_infos, &update)
        else {
            continue;
        };
        working = ThreadStoreOpsHandler::process_store_operations(working, &update_ops);
        operations.extend(update_ops);
    }
    ReducerResult::with_ops(working, operations)
}

/// CHECK_STATE reconciliation: the server is authoritative. Every
/// declared thread gets a replace and every declared deletion a remove,
/// with no equality check against the in-memory copy: the persisted row
/// may have diverged even when the in-memory thread matches, and the
/// unconditional operation is what repairs it. Divergence that somehow
/// survives is reported as telemetry.
fn reconcile(store: ThreadStore, state_changes: &CheckStateChanges) -> ThreadReducerResult {
    let mut operations = Vec::new();
    if let Some(raw_thread_infos) = &state_changes.raw_thread_infos {
        for thread_info in raw_thread_infos {
            operations.push(ThreadStoreOperation::replace(thread_info.clone()));
        }
    }
    if let Some(delete_thread_ids) = &state_changes.delete_thread_ids {
        if !delete_thread_ids.is_empty() {
            operations.push(ThreadStoreOperation::Remove {
                ids: delete_thread_ids.clone(),
            });
        }
    }
    if operations.is_empty() {
        return ReducerResult::unchanged(store);
    }

    let before = store.clone();
    let next = ThreadStoreOpsHandler::process_store_operations(store, &operations);

    let mut inconsistencies = Vec::new();
    if let Some(divergence) = find_reconciliation_divergence(&next, state_changes) {
        tracing::warn!(divergence = %divergence, "thread store diverged after reconciliation");
        inconsistencies.push(ClientInconsistencyReport {
            id: uuid::Uuid::new_v4().to_string(),
            report_type: InconsistencyReportType::ThreadInconsistency,
            before_action: serde_json::to_value(&before.thread_infos)
                .unwrap_or(serde_json::Value::Null),
            action: "CHECK_STATE".to_string(),
            push_result: serde_json::to_value(&next.thread_infos)
                .unwrap_or(serde_json::Value::Null),
            time: crate::time::now_timestamp_millis(),
        });
    }

    ReducerResult {
        store: next,
        operations,
        inconsistencies,
    }
}

/// Diagnostic only: after applying the server's declaration, does the
/// resulting local state still differ from it? Convergence is not
/// blocked by a hit here.
fn find_reconciliation_divergence(
    store: &ThreadStore,
    state_changes: &CheckStateChanges,
) -> Option<String> {
    if let Some(raw_thread_infos) = &state_changes.raw_thread_infos {
        for thread_info in raw_thread_infos {
            if store.thread_infos.get(&thread_info.id) != Some(thread_info) {
                return Some(format!("declared thread {} not applied", thread_info.id));
            }
        }
    }
    if let Some(delete_thread_ids) = &state_changes.delete_thread_ids {
        for id in delete_thread_ids {
            if store.thread_infos.contains_key(id) {
                return Some(format!("deleted thread {id} still present"));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::action::FullStateSyncPayload;
    use crate::types::thread::{ThreadCurrentUserInfo, ThreadSubscription};
    use std::collections::BTreeMap;

    fn sample_thread(id: &str) -> RawThreadInfo {
        RawThreadInfo {
            id: id.to_string(),
            thread_type: 3,
            name: Some("general".to_string()),
            description: None,
            color: "648caa".to_string(),
            creation_time: 1_689_091_732_528,
            parent_thread_id: None,
            containing_thread_id: None,
            community: None,
            members: vec![],
            roles: BTreeMap::new(),
            current_user: ThreadCurrentUserInfo {
                role: None,
                permissions: BTreeMap::new(),
                subscription: ThreadSubscription {
                    home: true,
                    push_notifs: true,
                },
                unread: false,
            },
            replies_count: 0,
            pinned_count: 0,
            avatar: None,
        }
    }

    fn store_with(threads: Vec<RawThreadInfo>) -> ThreadStore {
        ThreadStore {
            thread_infos: threads
                .into_iter()
                .map(|thread_info| (thread_info.id.clone(), thread_info))
                .collect(),
        }
    }

    #[test]
    fn test_full_sync_replaces_everything() {
        let store = store_with(vec![sample_thread("256|1")]);
        let payload = FullStateSyncPayload {
            thread_infos: HashMap::from([(
                "256|84015".to_string(),
                sample_thread("256|84015"),
            )]),
            raw_message_infos: vec![],
            truncation_statuses: HashMap::new(),
            user_infos: vec![],
            current_as_of: 1_000,
        };
        let result = reduce_thread_store(store, &Action::FullStateSync(payload));
        assert_eq!(result.operations[0], ThreadStoreOperation::RemoveAll);
        assert_eq!(result.store.thread_infos.len(), 1);
        assert!(result.store.thread_infos.contains_key("256|84015"));
    }

    #[test]
    fn test_unmatched_action_is_a_no_op() {
        let store = store_with(vec![sample_thread("256|84015")]);
        let before = store.clone();
        let result = reduce_thread_store(
            store,
            &Action::SetSyncedMetadata {
                name: "x".to_string(),
                value: "y".to_string(),
            },
        );
        assert!(result.operations.is_empty());
        assert_eq!(result.store, before);
    }

    #[test]
    fn test_check_state_overwrites_and_deletes() {
        let store = store_with(vec![sample_thread("256|84015"), sample_thread("256|84020")]);
        let mut corrected = sample_thread("256|84015");
        corrected.name = Some("corrected".to_string());
        let result = reduce_thread_store(
            store,
            &Action::ProcessServerRequests {
                state_changes: Some(CheckStateChanges {
                    raw_thread_infos: Some(vec![corrected.clone()]),
                    delete_thread_ids: Some(vec!["256|84020".to_string()]),
                }),
            },
        );
        assert_eq!(result.store.thread_infos.len(), 1);
        assert_eq!(result.store.thread_infos["256|84015"], corrected);
        assert!(result.inconsistencies.is_empty());
    }

    #[test]
    fn test_check_state_emits_replace_even_when_memory_matches() {
        // The persisted row may have diverged while the in-memory copy
        // matches the declaration, so the replace goes out regardless.
        let thread_info = sample_thread("256|84015");
        let store = store_with(vec![thread_info.clone()]);
        let result = reduce_thread_store(
            store,
            &Action::ProcessServerRequests {
                state_changes: Some(CheckStateChanges {
                    raw_thread_infos: Some(vec![thread_info.clone()]),
                    delete_thread_ids: Some(vec!["256|99999".to_string()]),
                }),
            },
        );
        assert_eq!(
            result.operations,
            vec![
                ThreadStoreOperation::replace(thread_info),
                ThreadStoreOperation::Remove {
                    ids: vec!["256|99999".to_string()],
                },
            ],
        );
        assert!(result.inconsistencies.is_empty());
    }

    #[test]
    fn test_update_driven_replace() {
        let store = store_with(vec![sample_thread("256|84015")]);
        let mut renamed = sample_thread("256|84015");
        renamed.name = Some("general-2".to_string());
        let result = reduce_thread_store(
            store,
            &Action::ProcessUpdates {
                new_updates: vec![ClientUpdateInfo::UpdateThread {
                    id: "u1".to_string(),
                    time: 2_000,
                    thread_info: renamed.clone(),
                }],
            },
        );
        assert_eq!(result.operations.len(), 1);
        assert_eq!(result.store.thread_infos["256|84015"], renamed);
    }

    #[test]
    fn test_identical_update_emits_no_operations() {
        let thread_info = sample_thread("256|84015");
        let store = store_with(vec![thread_info.clone()]);
        let result = reduce_thread_store(
            store,
            &Action::ProcessUpdates {
                new_updates: vec![ClientUpdateInfo::JoinThread {
                    id: "u1".to_string(),
                    time: 2_000,
                    thread_info,
                    raw_message_infos: vec![],
                }],
            },
        );
        assert!(result.operations.is_empty());
    }

    #[test]
    fn test_logout_clears_store_once() {
        let store = store_with(vec![sample_thread("256|84015")]);
        let result = reduce_thread_store(store, &Action::LogOutSuccess);
        assert_eq!(result.operations, vec![ThreadStoreOperation::RemoveAll]);
        let again = reduce_thread_store(result.store, &Action::LogOutSuccess);
        assert!(again.operations.is_empty());
    }

    #[test]
    fn test_set_unread_status() {
        let store = store_with(vec![sample_thread("256|84015")]);
        let result = reduce_thread_store(
            store,
            &Action::SetThreadUnreadStatus {
                thread_id: "256|84015".to_string(),
                unread: true,
            },
        );
        assert!(result.store.thread_infos["256|84015"].current_user.unread);
        // Setting it to the same value again changes nothing.
        let again = reduce_thread_store(
            result.store,
            &Action::SetThreadUnreadStatus {
                thread_id: "256|84015".to_string(),
                unread: true,
            },
        );
        assert!(again.operations.is_empty());
    }
}
