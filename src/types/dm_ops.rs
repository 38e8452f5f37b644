//! Queued DM operations: peer-to-peer protocol operations that arrived
//! before the record they target (a message for a thread we have not
//! created yet, a reaction for a message still in flight). Each is parked
//! under a condition key until the prerequisite exists, then replayed.
//!
//! The operation payloads themselves are opaque to the sync engine — they
//! belong to the DM protocol layer — so they are carried as raw JSON and
//! never interpreted here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An opaque DM protocol operation payload
pub type DMOperation = serde_json::Value;

/// What a queued DM operation is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueDMOpsCondition {
    /// Waiting for a thread to exist
    Thread {
        /// The awaited thread id
        #[serde(rename = "threadID")]
        thread_id: String,
    },
    /// Waiting for a calendar entry to exist
    Entry {
        /// The awaited entry id
        #[serde(rename = "entryID")]
        entry_id: String,
    },
    /// Waiting for a message to exist
    Message {
        /// The awaited message id
        #[serde(rename = "messageID")]
        message_id: String,
    },
    /// Waiting for a user's membership in a thread
    Membership {
        /// The thread in question
        #[serde(rename = "threadID")]
        thread_id: String,
        /// The awaited member
        #[serde(rename = "userID")]
        user_id: String,
    },
}

impl QueueDMOpsCondition {
    /// Stable string tag, persisted as the queue type column
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Thread { .. } => "thread",
            Self::Entry { .. } => "entry",
            Self::Message { .. } => "message",
            Self::Membership { .. } => "membership",
        }
    }

    /// Stable key within the queue type. Membership keys compose the
    /// thread and user ids with `#`, matching the persisted format.
    pub fn queue_key(&self) -> String {
        match self {
            Self::Thread { thread_id } => thread_id.clone(),
            Self::Entry { entry_id } => entry_id.clone(),
            Self::Message { message_id } => message_id.clone(),
            Self::Membership { thread_id, user_id } => {
                format!("{}#{}", thread_id, user_id)
            }
        }
    }
}

/// One parked operation with its arrival time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedDMOperation {
    /// The opaque protocol operation
    pub operation: DMOperation,
    /// Arrival time, Unix ms (used for staleness pruning)
    pub timestamp: i64,
}

/// An operation shimmed for a future client version: recognized as a DM
/// operation but not yet processable, persisted so an upgrade can replay
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DMOperationEntity {
    /// Operation id
    pub id: String,
    /// Declared operation type tag
    #[serde(rename = "type")]
    pub op_type: String,
    /// The opaque payload
    pub operation: DMOperation,
}

/// The Queued DM Operations store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedDMOperations {
    /// Operations waiting on a thread, keyed by thread id
    pub thread_queue: HashMap<String, Vec<QueuedDMOperation>>,
    /// Operations waiting on a message, keyed by message id
    pub message_queue: HashMap<String, Vec<QueuedDMOperation>>,
    /// Operations waiting on an entry, keyed by entry id
    pub entry_queue: HashMap<String, Vec<QueuedDMOperation>>,
    /// Operations waiting on a membership, keyed by thread id then user id
    pub membership_queue: HashMap<String, HashMap<String, Vec<QueuedDMOperation>>>,
    /// Shimmed operations awaiting a future client version
    pub shimmed_operations: Vec<DMOperationEntity>,
}
