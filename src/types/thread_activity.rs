//! The Thread Activity Store: local-only navigation/prune timestamps per
//! thread, never synced to the server. This store exists purely to drive
//! message-history pruning (see [`crate::integrity::pruning`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local activity timestamps for one thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadActivityStoreEntry {
    /// Last time the user navigated to the thread, Unix ms
    pub last_navigated_to: i64,
    /// Last time the thread's message history was pruned, Unix ms
    pub last_pruned: i64,
}

/// The Thread Activity Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadActivityStore {
    /// Activity entries keyed by thread id
    pub thread_activity_store: HashMap<String, ThreadActivityStoreEntry>,
}
