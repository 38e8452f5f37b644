//! # DB Ops Queue
//!
//! The FIFO queue between reducers and the database.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DB OPS QUEUE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  dispatch ──▶ queue_db_ops ──▶ queued_ops: [entry, entry, ...]         │
//! │                                      │                                  │
//! │                                      │ drained strictly in order,      │
//! │                                      │ one transaction per entry       │
//! │                                      ▼                                  │
//! │                           OpsProcessingFinished(action ids)             │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                            reduce_db_ops_store                          │
//! │                     removes committed entries, resolves waiters         │
//! │                     (see db_ops::context)                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never reordered and never coalesced across entries: a
//! later batch may depend on rows a former batch writes. An entry whose
//! commit fails stays at the head of the queue, which is what makes
//! delivery at-least-once rather than at-most-once.

use serde::{Deserialize, Serialize};

use crate::ops::{MessageSearchStoreOperation, MessageStoreOperation, StoreOperations};
use crate::types::action::{ActionID, DispatchMetadata};
use crate::types::message::MessageContent;
use crate::types::thread::thread_id_is_keyserver_backed;

pub mod context;

/// One queued batch: everything a single dispatch asked to persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DBOpsEntry {
    /// Identity of the dispatch, when the caller wants a completion
    /// signal
    pub dispatch_metadata: Option<DispatchMetadata>,
    /// The operations to persist
    pub ops: StoreOperations,
    /// Opaque payload handed to the notifications layer after commit
    pub notifications_creation_data: Option<serde_json::Value>,
}

/// The queue state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DBOpsStore {
    /// Pending batches, oldest first
    pub queued_ops: Vec<DBOpsEntry>,
    /// Dispatches that produced no operations but still asked for a
    /// completion signal; they complete on the next queue observation
    pub no_ops_actions: Vec<ActionID>,
}

/// Enqueue one dispatch's operations.
///
/// A dispatch with operations is queued as an entry; a dispatch with
/// tracking metadata but no operations is recorded so its waiter still
/// resolves; a dispatch with neither leaves the store untouched.
///
/// Because a tracked no-op dispatch is never queued, its waiter resolves
/// on the next queue observation even when an earlier batch is still
/// pending and could yet fail. With nothing of its own to persist the
/// only guarantee given up is ordering relative to those earlier
/// batches.
pub fn queue_db_ops(
    mut store: DBOpsStore,
    dispatch_metadata: Option<DispatchMetadata>,
    mut ops: StoreOperations,
    notifications_creation_data: Option<serde_json::Value>,
) -> DBOpsStore {
    ops.message_search_store_operations
        .extend(derive_search_ops(&ops.message_store_operations));
    if !ops.is_empty() {
        store.queued_ops.push(DBOpsEntry {
            dispatch_metadata,
            ops,
            notifications_creation_data,
        });
    } else if let Some(metadata) = dispatch_metadata {
        store.no_ops_actions.push(metadata.action_id);
    }
    store
}

/// Remove committed entries after the processor reports completion.
///
/// Processing is strictly FIFO, so everything queued ahead of the last
/// completed entry was committed in the same drain; untracked entries in
/// that prefix are removed along with the tracked ones.
pub fn reduce_db_ops_store(mut store: DBOpsStore, completed: &[ActionID]) -> DBOpsStore {
    let is_completed = |entry: &DBOpsEntry| {
        entry
            .dispatch_metadata
            .as_ref()
            .is_some_and(|metadata| completed.contains(&metadata.action_id))
    };
    let drained_prefix_end = store
        .queued_ops
        .iter()
        .rposition(is_completed)
        .map(|index| index + 1)
        .unwrap_or(0);
    let mut index = 0;
    store.queued_ops.retain(|entry| {
        let in_drained_prefix = index < drained_prefix_end;
        index += 1;
        if is_completed(entry) {
            return false;
        }
        !(in_drained_prefix && entry.dispatch_metadata.is_none())
    });
    store
        .no_ops_actions
        .retain(|action_id| !completed.contains(action_id));
    store
}

/// Search-index deltas implied by message operations. Only locally-owned
/// (non-keyserver-backed) threads are indexed on the client.
fn derive_search_ops(
    message_ops: &[MessageStoreOperation],
) -> Vec<MessageSearchStoreOperation> {
    let mut search_ops = Vec::new();
    for op in message_ops {
        let MessageStoreOperation::Replace { message_info } = op else {
            continue;
        };
        if thread_id_is_keyserver_backed(&message_info.thread_id) {
            continue;
        }
        let message_id = message_info.message_id().to_string();
        match &message_info.content {
            MessageContent::Text { text } => {
                search_ops.push(MessageSearchStoreOperation::UpdateSearchMessages {
                    original_message_id: message_id.clone(),
                    message_id,
                    content: text.clone(),
                });
            }
            MessageContent::EditMessage {
                target_message_id,
                text,
            } => {
                search_ops.push(MessageSearchStoreOperation::UpdateSearchMessages {
                    original_message_id: target_message_id.clone(),
                    message_id,
                    content: text.clone(),
                });
            }
            MessageContent::DeleteMessage { target_message_id } => {
                search_ops.push(MessageSearchStoreOperation::DeleteSearchMessage {
                    message_id: target_message_id.clone(),
                });
            }
            _ => {}
        }
    }
    search_ops
}
