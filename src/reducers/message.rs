//! The Message Store reducer.
//!
//! Everything here funnels through two helpers: `merge_messages`, which
//! folds newly delivered messages into the flat table and rebuilds the
//! ordered views of affected threads, and `apply`, which keeps the
//! returned snapshot equal to the fold of the returned operations.
//!
//! One deliberate exception to the snapshot/operations equivalence: the
//! `current_as_of` watermark is set directly and never produces an
//! operation, because it is not persisted through the message tables (a
//! cold start re-derives it from the next state sync).

use std::collections::{BTreeSet, HashMap};

use crate::integrity::pruning::DEFAULT_NUMBER_PER_THREAD;
use crate::ops::{MessageStoreOperation, MessageStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::message::{
    LocalMessageInfo, MessageStore, MessageTruncationStatus, RawMessageInfo, ThreadMessageInfo,
};
use crate::types::update::ClientUpdateInfo;
use crate::updates::update_spec_for;

use super::ReducerResult;

type MessageReducerResult = ReducerResult<MessageStore, MessageStoreOperation>;

/// Reduce the Message Store over one action.
pub fn reduce_message_store(store: MessageStore, action: &Action) -> MessageReducerResult {
    match action {
        Action::LogInSuccess(payload) | Action::FullStateSync(payload) => {
            let mut result = full_replace(store, &payload.raw_message_infos, |thread_id| {
                payload.truncation_statuses.get(thread_id).copied()
            });
            result.store.current_as_of = payload.current_as_of;
            result
        }
        Action::IncrementalStateSync(payload) => {
            let mut delivered = payload.raw_message_infos.clone();
            delivered.extend(update_seed_messages(&payload.new_updates));
            let mut result = merge_and_apply(store, &delivered, &payload.truncation_statuses);
            result.store.current_as_of = payload.current_as_of;
            result
        }
        Action::ProcessUpdates { new_updates } => {
            let delivered = update_seed_messages(new_updates);
            merge_and_apply(store, &delivered, &HashMap::new())
        }
        Action::NewMessages {
            raw_message_infos,
            truncation_statuses,
        } => merge_and_apply(store, raw_message_infos, truncation_statuses),
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store == MessageStore::default() {
                return ReducerResult::unchanged(store);
            }
            let mut result = apply(
                store,
                vec![
                    MessageStoreOperation::RemoveAll,
                    MessageStoreOperation::RemoveAllThreads,
                ],
            );
            result.store.current_as_of = 0;
            result
        }
        Action::SendMessageStarted { message_info } => {
            assert!(
                message_info.id.is_none() && message_info.local_id.is_some(),
                "optimistic message must carry a local id and no server id"
            );
            let mut result = merge_and_apply(
                store,
                std::slice::from_ref(message_info),
                &HashMap::new(),
            );
            let local_op = MessageStoreOperation::ReplaceLocal {
                id: message_info.message_id().to_string(),
                local_message_info: LocalMessageInfo { send_failed: false },
            };
            result.store = MessageStoreOpsHandler::process_store_operations(
                result.store,
                std::slice::from_ref(&local_op),
            );
            result.operations.push(local_op);
            result
        }
        Action::SendMessageSuccess {
            local_id,
            server_id,
            thread_id,
            time,
        } => send_message_success(store, local_id, server_id, thread_id, *time),
        Action::SendMessageFailed { local_id, .. } => {
            if !store.messages.contains_key(local_id) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![MessageStoreOperation::ReplaceLocal {
                    id: local_id.clone(),
                    local_message_info: LocalMessageInfo { send_failed: true },
                }],
            )
        }
        Action::MessageStorePrune { thread_ids } => prune(store, thread_ids),
        Action::UpdateThreadLastNavigated { thread_id, time } => {
            let Some(view) = store.threads.get(thread_id) else {
                return ReducerResult::unchanged(store);
            };
            let mut updated = view.clone();
            updated.last_navigated_to = *time;
            apply(
                store,
                vec![MessageStoreOperation::ReplaceThreads {
                    threads: HashMap::from([(thread_id.clone(), updated)]),
                }],
            )
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(store: MessageStore, operations: Vec<MessageStoreOperation>) -> MessageReducerResult {
    let store = MessageStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

/// Messages seeded inside server updates (JoinThread history)
fn update_seed_messages(new_updates: &[ClientUpdateInfo]) -> Vec<RawMessageInfo> {
    let mut delivered = Vec::new();
    for update in new_updates {
        let spec = update_spec_for(update.update_type());
        delivered.extend(spec.raw_message_infos(update));
    }
    delivered
}

/// All message ids of a thread, in descending time order.
fn ordered_thread_message_ids(store: &MessageStore, thread_id: &str) -> Vec<String> {
    let mut ids_with_times: Vec<(&String, i64)> = store
        .messages
        .iter()
        .filter(|(_, info)| info.thread_id == thread_id)
        .map(|(id, info)| (id, info.time))
        .collect();
    ids_with_times.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));
    ids_with_times.into_iter().map(|(id, _)| id.clone()).collect()
}

fn rebuilt_view(
    store: &MessageStore,
    thread_id: &str,
    truncation: Option<MessageTruncationStatus>,
) -> ThreadMessageInfo {
    let existing = store.threads.get(thread_id);
    let start_reached = match truncation {
        Some(MessageTruncationStatus::Exhaustive) => true,
        Some(MessageTruncationStatus::Truncated) => false,
        Some(MessageTruncationStatus::Unchanged) | None => {
            existing.map(|view| view.start_reached).unwrap_or(false)
        }
    };
    ThreadMessageInfo {
        message_ids: ordered_thread_message_ids(store, thread_id),
        start_reached,
        last_navigated_to: existing.map(|view| view.last_navigated_to).unwrap_or(0),
        last_pruned: existing.map(|view| view.last_pruned).unwrap_or(0),
    }
}

/// Fold delivered messages into the store: rekey local copies the server
/// just confirmed, replace anything new or changed, then rebuild the
/// ordered views of every affected thread.
fn merge_and_apply(
    store: MessageStore,
    delivered: &[RawMessageInfo],
    truncation_statuses: &HashMap<String, MessageTruncationStatus>,
) -> MessageReducerResult {
    let mut working = store;
    let mut operations: Vec<MessageStoreOperation> = Vec::new();
    let mut affected: BTreeSet<String> = truncation_statuses.keys().cloned().collect();

    let mut push = |working: &mut MessageStore,
                    operations: &mut Vec<MessageStoreOperation>,
                    op: MessageStoreOperation| {
        *working = MessageStoreOpsHandler::process_store_operations(
            std::mem::take(working),
            std::slice::from_ref(&op),
        );
        operations.push(op);
    };

    for message_info in delivered {
        let key = message_info.message_id().to_string();
        // A confirmed delivery for a message we still hold under its
        // local id: promote it before replacing.
        if let (Some(server_id), Some(local_id)) = (&message_info.id, &message_info.local_id) {
            if working.messages.contains_key(local_id) && local_id != server_id {
                push(
                    &mut working,
                    &mut operations,
                    MessageStoreOperation::Rekey {
                        from: local_id.clone(),
                        to: server_id.clone(),
                    },
                );
            }
            if working.local.contains_key(local_id) {
                push(
                    &mut working,
                    &mut operations,
                    MessageStoreOperation::RemoveLocals {
                        ids: vec![local_id.clone()],
                    },
                );
            }
        }
        if working.messages.get(&key) != Some(message_info) {
            push(
                &mut working,
                &mut operations,
                MessageStoreOperation::Replace {
                    message_info: message_info.clone(),
                },
            );
        }
        affected.insert(message_info.thread_id.clone());
    }

    let mut new_views = HashMap::new();
    for thread_id in &affected {
        let view = rebuilt_view(&working, thread_id, truncation_statuses.get(thread_id).copied());
        if working.threads.get(thread_id) != Some(&view) {
            new_views.insert(thread_id.clone(), view);
        }
    }
    if !new_views.is_empty() {
        push(
            &mut working,
            &mut operations,
            MessageStoreOperation::ReplaceThreads { threads: new_views },
        );
    }

    ReducerResult::with_ops(working, operations)
}

/// Full state replacement: a fresh store built from the server's
/// declaration, carrying over only the local navigation/prune timestamps.
fn full_replace(
    store: MessageStore,
    raw_message_infos: &[RawMessageInfo],
    truncation_for: impl Fn(&str) -> Option<MessageTruncationStatus>,
) -> MessageReducerResult {
    let mut operations = vec![
        MessageStoreOperation::RemoveAll,
        MessageStoreOperation::RemoveAllThreads,
    ];
    let mut sorted: Vec<&RawMessageInfo> = raw_message_infos.iter().collect();
    sorted.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.message_id().cmp(b.message_id()))
    });
    let mut thread_ids: BTreeSet<String> = BTreeSet::new();
    for message_info in &sorted {
        operations.push(MessageStoreOperation::Replace {
            message_info: (*message_info).clone(),
        });
        thread_ids.insert(message_info.thread_id.clone());
    }

    let old_views = store.threads.clone();
    let mut working = MessageStoreOpsHandler::process_store_operations(store, &operations);

    let mut views = HashMap::new();
    for thread_id in &thread_ids {
        let start_reached = matches!(
            truncation_for(thread_id),
            Some(MessageTruncationStatus::Exhaustive)
        );
        let old = old_views.get(thread_id);
        views.insert(
            thread_id.clone(),
            ThreadMessageInfo {
                message_ids: ordered_thread_message_ids(&working, thread_id),
                start_reached,
                last_navigated_to: old.map(|view| view.last_navigated_to).unwrap_or(0),
                last_pruned: old.map(|view| view.last_pruned).unwrap_or(0),
            },
        );
    }
    let views_op = MessageStoreOperation::ReplaceThreads { threads: views };
    working =
        MessageStoreOpsHandler::process_store_operations(working, std::slice::from_ref(&views_op));
    operations.push(views_op);

    ReducerResult::with_ops(working, operations)
}

fn send_message_success(
    store: MessageStore,
    local_id: &str,
    server_id: &str,
    thread_id: &str,
    time: i64,
) -> MessageReducerResult {
    let mut operations = Vec::new();
    let mut working = store;

    if working.messages.contains_key(local_id) {
        let rekey_op = MessageStoreOperation::Rekey {
            from: local_id.to_string(),
            to: server_id.to_string(),
        };
        working =
            MessageStoreOpsHandler::process_store_operations(working, std::slice::from_ref(&rekey_op));
        operations.push(rekey_op);
        if let Some(confirmed) = working.messages.get(server_id) {
            if confirmed.time != time {
                let mut updated = confirmed.clone();
                updated.time = time;
                let replace_op = MessageStoreOperation::Replace {
                    message_info: updated,
                };
                working = MessageStoreOpsHandler::process_store_operations(
                    working,
                    std::slice::from_ref(&replace_op),
                );
                operations.push(replace_op);
            }
        }
    }

    if working.local.contains_key(local_id) {
        let remove_op = MessageStoreOperation::RemoveLocals {
            ids: vec![local_id.to_string()],
        };
        working =
            MessageStoreOpsHandler::process_store_operations(working, std::slice::from_ref(&remove_op));
        operations.push(remove_op);
    }

    if operations.is_empty() {
        return ReducerResult::unchanged(working);
    }

    let view = rebuilt_view(&working, thread_id, None);
    if working.threads.get(thread_id) != Some(&view) {
        let views_op = MessageStoreOperation::ReplaceThreads {
            threads: HashMap::from([(thread_id.to_string(), view)]),
        };
        working =
            MessageStoreOpsHandler::process_store_operations(working, std::slice::from_ref(&views_op));
        operations.push(views_op);
    }

    ReducerResult::with_ops(working, operations)
}

/// Evict everything past the retained count for each named thread, and
/// stamp the prune time even when nothing was evicted so the scheduler
/// backs off.
fn prune(store: MessageStore, thread_ids: &[String]) -> MessageReducerResult {
    let now = crate::time::now_timestamp_millis();
    let mut evicted_ids: Vec<String> = Vec::new();
    let mut new_views = HashMap::new();
    for thread_id in thread_ids {
        let Some(view) = store.threads.get(thread_id) else {
            continue;
        };
        let evicted: Vec<String> = view
            .message_ids
            .iter()
            .skip(DEFAULT_NUMBER_PER_THREAD)
            .cloned()
            .collect();
        let mut updated = view.clone();
        updated.message_ids.truncate(DEFAULT_NUMBER_PER_THREAD);
        if !evicted.is_empty() {
            updated.start_reached = false;
        }
        updated.last_pruned = now;
        evicted_ids.extend(evicted);
        new_views.insert(thread_id.clone(), updated);
    }

    if new_views.is_empty() {
        return ReducerResult::unchanged(store);
    }

    let mut operations = Vec::new();
    if !evicted_ids.is_empty() {
        let locals: Vec<String> = evicted_ids
            .iter()
            .filter(|id| store.local.contains_key(*id))
            .cloned()
            .collect();
        operations.push(MessageStoreOperation::Remove { ids: evicted_ids });
        if !locals.is_empty() {
            operations.push(MessageStoreOperation::RemoveLocals { ids: locals });
        }
    }
    operations.push(MessageStoreOperation::ReplaceThreads { threads: new_views });
    apply(store, operations)
}
