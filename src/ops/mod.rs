//! # Store Operations
//!
//! The per-store operation vocabulary and handlers.
//!
//! ## Operation Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       OPERATION PIPELINE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Action (UI dispatch / server push / background job)                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   per-store reducers derive declarative deltas    │
//! │  │    Reducers     │──────────────┐                                    │
//! │  └────────┬────────┘              │                                    │
//! │           │ ops                   │ ops (copy)                         │
//! │           ▼                       ▼                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ process_store_  │   │  DB Ops Queue   │  FIFO, dispatch metadata    │
//! │  │ operations      │   │  (db_ops)       │  for completion signaling   │
//! │  │ (in-memory)     │   └────────┬────────┘                             │
//! │  └─────────────────┘            │ drain, in order                      │
//! │                                 ▼                                      │
//! │                        ┌─────────────────┐                             │
//! │                        │ convert_ops_to_ │  JSON-stringify nested      │
//! │                        │ client_db_ops   │  payloads into row shapes   │
//! │                        └────────┬────────┘                             │
//! │                                 │                                      │
//! │                                 ▼                                      │
//! │                        ┌─────────────────┐                             │
//! │                        │    Database     │  one transaction per batch  │
//! │                        └────────┬────────┘                             │
//! │                                 │ cold start                           │
//! │                                 ▼                                      │
//! │                        ┌─────────────────┐                             │
//! │                        │ translate_      │  exact left inverse of the  │
//! │                        │ client_db_data  │  conversion above           │
//! │                        └─────────────────┘                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations are declarative deltas, never diffs: applying the same
//! operation list to any snapshot yields the same result, which is what
//! makes at-least-once redelivery to persistence safe. Within one list,
//! operations apply strictly in array order; `remove_all` empties the
//! store mid-fold and later operations still apply after it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod aux_user_store_ops;
pub mod community_store_ops;
pub mod dm_operations_store_ops;
pub mod entry_store_ops;
pub mod integrity_store_ops;
pub mod keyserver_store_ops;
pub mod message_store_ops;
pub mod report_store_ops;
pub mod synced_metadata_store_ops;
pub mod thread_activity_store_ops;
pub mod thread_store_ops;
pub mod user_store_ops;

pub use aux_user_store_ops::{AuxUserStoreOperation, AuxUserStoreOpsHandler};
pub use community_store_ops::{CommunityStoreOperation, CommunityStoreOpsHandler};
pub use dm_operations_store_ops::{DMOperationStoreOperation, DMOperationStoreOpsHandler};
pub use entry_store_ops::{EntryStoreOperation, EntryStoreOpsHandler};
pub use integrity_store_ops::{IntegrityStoreOperation, IntegrityStoreOpsHandler};
pub use keyserver_store_ops::{KeyserverStoreOperation, KeyserverStoreOpsHandler};
pub use message_store_ops::{MessageStoreOperation, MessageStoreOpsHandler};
pub use report_store_ops::{ReportStoreOperation, ReportStoreOpsHandler};
pub use synced_metadata_store_ops::{SyncedMetadataStoreOperation, SyncedMetadataStoreOpsHandler};
pub use thread_activity_store_ops::{ThreadActivityStoreOperation, ThreadActivityStoreOpsHandler};
pub use thread_store_ops::{ThreadStoreOperation, ThreadStoreOpsHandler};
pub use user_store_ops::{UserStoreOperation, UserStoreOpsHandler};

// ============================================================================
// Handler Contract
// ============================================================================

/// The contract every store's operation handler implements.
///
/// All three functions are pure. `process_store_operations` folds the
/// operation list left-to-right over the in-memory store;
/// `convert_ops_to_client_db_ops` maps operations to their persisted row
/// shapes; `translate_client_db_data` is the exact left inverse of the
/// conversion for any data that round-tripped through storage.
pub trait StoreOpsHandler {
    /// The in-memory store this handler mutates
    type Store;
    /// The in-memory operation variant
    type Operation;
    /// The persistable operation variant
    type ClientDBOperation;
    /// Persisted rows consumed at cold-start hydration
    type DBData;

    /// Fold the operations over the store, strictly in array order.
    /// Removing a missing id is a silent no-op; a replace fully
    /// overwrites; `remove_all` empties the store and later operations
    /// in the same list still apply.
    fn process_store_operations(store: Self::Store, ops: &[Self::Operation]) -> Self::Store;

    /// Map operations to serialization-ready row shapes. Operations with
    /// an empty effective payload are dropped, not emitted as empty rows.
    fn convert_ops_to_client_db_ops(
        ops: &[Self::Operation],
    ) -> Result<Vec<Self::ClientDBOperation>>;

    /// Rebuild the in-memory store from persisted rows. Output is keyed
    /// by each row's own id field, never by input iteration order.
    fn translate_client_db_data(data: Self::DBData) -> Result<Self::Store>;
}

// ============================================================================
// Pass-Through Operations
// ============================================================================

/// Draft text operations. Drafts never live in a reducer-owned store —
/// the UI writes them straight through the queue to the database — so
/// these are carried and converted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftStoreOperation {
    /// Set the draft text for a key
    UpdateDraft {
        /// Draft key (thread id, or thread id + suffix)
        key: String,
        /// Draft text
        text: String,
    },
    /// Move a draft between keys (pending thread id promoted)
    MoveDraft {
        /// Previous key
        old_key: String,
        /// New key
        new_key: String,
    },
    /// Remove drafts by key
    RemoveDrafts {
        /// Keys to remove
        ids: Vec<String>,
    },
    /// Remove every draft
    RemoveAllDrafts,
}

/// An encrypted message bound for a peer device, persisted until the
/// transport confirms delivery. Opaque to the sync engine; carried
/// through the queue unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundP2PMessage {
    /// Client-assigned message id
    #[serde(rename = "messageID")]
    pub message_id: String,
    /// Target device id
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Target user id
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Enqueue time, Unix ms
    pub timestamp: i64,
    /// Plaintext payload, kept until encryption succeeds
    pub plaintext: String,
    /// Ciphertext payload, empty until encryption succeeds
    pub ciphertext: String,
    /// Delivery status tag ("persisted", "encrypted", "sent")
    pub status: String,
}

/// Full-text search index operations, derived inside the queue from
/// message operations (see [`crate::db_ops`]) and already in their
/// persistable shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSearchStoreOperation {
    /// Insert or update the indexed text for a message
    UpdateSearchMessages {
        /// Id of the message whose text is current (the original for an
        /// edit chain)
        #[serde(rename = "originalMessageID")]
        original_message_id: String,
        /// Id of the message that produced this text
        #[serde(rename = "messageID")]
        message_id: String,
        /// The text to index
        content: String,
    },
    /// Drop a message from the index
    DeleteSearchMessage {
        /// Id of the deleted message
        #[serde(rename = "messageID")]
        message_id: String,
    },
}

// ============================================================================
// The Batch Shape
// ============================================================================

/// One operation list per domain store: the full set of operations one
/// action produced, bundled so they commit atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOperations {
    /// Draft operations (pass-through)
    pub draft_store_operations: Vec<DraftStoreOperation>,
    /// Thread Store operations
    pub thread_store_operations: Vec<ThreadStoreOperation>,
    /// Message Store operations
    pub message_store_operations: Vec<MessageStoreOperation>,
    /// Report Store operations
    pub report_store_operations: Vec<ReportStoreOperation>,
    /// Keyserver Store operations
    pub keyserver_store_operations: Vec<KeyserverStoreOperation>,
    /// User Store operations
    pub user_store_operations: Vec<UserStoreOperation>,
    /// Integrity Store operations
    pub integrity_store_operations: Vec<IntegrityStoreOperation>,
    /// Community Store operations
    pub community_store_operations: Vec<CommunityStoreOperation>,
    /// Synced Metadata Store operations
    pub synced_metadata_store_operations: Vec<SyncedMetadataStoreOperation>,
    /// Aux User Store operations
    pub aux_user_store_operations: Vec<AuxUserStoreOperation>,
    /// Thread Activity Store operations
    pub thread_activity_store_operations: Vec<ThreadActivityStoreOperation>,
    /// Entry Store operations
    pub entry_store_operations: Vec<EntryStoreOperation>,
    /// Search index operations (derived, pass-through)
    pub message_search_store_operations: Vec<MessageSearchStoreOperation>,
    /// Outbound peer messages (pass-through)
    #[serde(rename = "outboundP2PMessages")]
    pub outbound_p2p_messages: Vec<OutboundP2PMessage>,
    /// DM Operations Store operations
    pub dm_operation_store_operations: Vec<DMOperationStoreOperation>,
}

impl StoreOperations {
    /// Whether every operation list is empty. A batch that is empty and
    /// carries no dispatch metadata is never enqueued.
    pub fn is_empty(&self) -> bool {
        self.draft_store_operations.is_empty()
            && self.thread_store_operations.is_empty()
            && self.message_store_operations.is_empty()
            && self.report_store_operations.is_empty()
            && self.keyserver_store_operations.is_empty()
            && self.user_store_operations.is_empty()
            && self.integrity_store_operations.is_empty()
            && self.community_store_operations.is_empty()
            && self.synced_metadata_store_operations.is_empty()
            && self.aux_user_store_operations.is_empty()
            && self.thread_activity_store_operations.is_empty()
            && self.entry_store_operations.is_empty()
            && self.message_search_store_operations.is_empty()
            && self.outbound_p2p_messages.is_empty()
            && self.dm_operation_store_operations.is_empty()
    }

    /// Append another batch's operations onto this one, preserving the
    /// relative order of both.
    pub fn append(&mut self, mut other: StoreOperations) {
        self.draft_store_operations
            .append(&mut other.draft_store_operations);
        self.thread_store_operations
            .append(&mut other.thread_store_operations);
        self.message_store_operations
            .append(&mut other.message_store_operations);
        self.report_store_operations
            .append(&mut other.report_store_operations);
        self.keyserver_store_operations
            .append(&mut other.keyserver_store_operations);
        self.user_store_operations
            .append(&mut other.user_store_operations);
        self.integrity_store_operations
            .append(&mut other.integrity_store_operations);
        self.community_store_operations
            .append(&mut other.community_store_operations);
        self.synced_metadata_store_operations
            .append(&mut other.synced_metadata_store_operations);
        self.aux_user_store_operations
            .append(&mut other.aux_user_store_operations);
        self.thread_activity_store_operations
            .append(&mut other.thread_activity_store_operations);
        self.entry_store_operations
            .append(&mut other.entry_store_operations);
        self.message_search_store_operations
            .append(&mut other.message_search_store_operations);
        self.outbound_p2p_messages
            .append(&mut other.outbound_p2p_messages);
        self.dm_operation_store_operations
            .append(&mut other.dm_operation_store_operations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_operations_are_empty() {
        assert!(StoreOperations::default().is_empty());
    }

    #[test]
    fn test_store_operations_with_any_list_are_not_empty() {
        let ops = StoreOperations {
            synced_metadata_store_operations: vec![SyncedMetadataStoreOperation::RemoveAll],
            ..Default::default()
        };
        assert!(!ops.is_empty());
    }

    #[test]
    fn test_append_preserves_both_sides_in_order() {
        let mut a = StoreOperations {
            draft_store_operations: vec![DraftStoreOperation::RemoveAllDrafts],
            ..Default::default()
        };
        let b = StoreOperations {
            draft_store_operations: vec![DraftStoreOperation::UpdateDraft {
                key: "256|84015".to_string(),
                text: "hello".to_string(),
            }],
            ..Default::default()
        };
        a.append(b);
        assert_eq!(a.draft_store_operations.len(), 2);
        assert_eq!(
            a.draft_store_operations[0],
            DraftStoreOperation::RemoveAllDrafts
        );
    }
}
