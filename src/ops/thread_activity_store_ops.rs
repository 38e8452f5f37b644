//! Thread Activity Store operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::thread_activity::{ThreadActivityStore, ThreadActivityStoreEntry};

use super::StoreOpsHandler;

/// A mutation of the Thread Activity Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadActivityStoreOperation {
    /// Fully overwrite one thread's activity entry
    Replace {
        /// Thread id
        id: String,
        /// The new entry
        entry: ThreadActivityStoreEntry,
    },
    /// Remove entries by thread id; missing ids are silently ignored
    Remove {
        /// Thread ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one thread's activity entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBThreadActivityEntry {
    /// Thread id
    pub id: String,
    /// JSON-encoded [`ThreadActivityStoreEntry`]
    pub thread_activity_store_entry: String,
}

/// Persistable form of a Thread Activity Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBThreadActivityStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        entry: ClientDBThreadActivityEntry,
    },
    /// Delete rows by thread id
    Remove {
        /// Thread ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Thread Activity Store
pub struct ThreadActivityStoreOpsHandler;

impl StoreOpsHandler for ThreadActivityStoreOpsHandler {
    type Store = ThreadActivityStore;
    type Operation = ThreadActivityStoreOperation;
    type ClientDBOperation = ClientDBThreadActivityStoreOperation;
    type DBData = Vec<ClientDBThreadActivityEntry>;

    fn process_store_operations(
        mut store: ThreadActivityStore,
        ops: &[ThreadActivityStoreOperation],
    ) -> ThreadActivityStore {
        for op in ops {
            match op {
                ThreadActivityStoreOperation::Replace { id, entry } => {
                    store.thread_activity_store.insert(id.clone(), *entry);
                }
                ThreadActivityStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.thread_activity_store.remove(id);
                    }
                }
                ThreadActivityStoreOperation::RemoveAll => {
                    store.thread_activity_store.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[ThreadActivityStoreOperation],
    ) -> Result<Vec<ClientDBThreadActivityStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                ThreadActivityStoreOperation::Replace { id, entry } => {
                    Ok(ClientDBThreadActivityStoreOperation::Replace {
                        entry: ClientDBThreadActivityEntry {
                            id: id.clone(),
                            thread_activity_store_entry: serde_json::to_string(entry)?,
                        },
                    })
                }
                ThreadActivityStoreOperation::Remove { ids } => {
                    Ok(ClientDBThreadActivityStoreOperation::Remove { ids: ids.clone() })
                }
                ThreadActivityStoreOperation::RemoveAll => {
                    Ok(ClientDBThreadActivityStoreOperation::RemoveAll)
                }
            })
            .collect()
    }

    fn translate_client_db_data(
        rows: Vec<ClientDBThreadActivityEntry>,
    ) -> Result<ThreadActivityStore> {
        let mut thread_activity_store = HashMap::with_capacity(rows.len());
        for row in &rows {
            let entry: ThreadActivityStoreEntry =
                serde_json::from_str(&row.thread_activity_store_entry).map_err(|_| {
                    Error::MalformedRecord(format!(
                        "thread activity entry {} failed to parse",
                        row.id
                    ))
                })?;
            thread_activity_store.insert(row.id.clone(), entry);
        }
        Ok(ThreadActivityStore {
            thread_activity_store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_row_round_trip() {
        let entry = ThreadActivityStoreEntry {
            last_navigated_to: 1_689_091_732_528,
            last_pruned: 1_689_000_000_000,
        };
        let ops = ThreadActivityStoreOpsHandler::convert_ops_to_client_db_ops(&[
            ThreadActivityStoreOperation::Replace {
                id: "256|84015".to_string(),
                entry,
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBThreadActivityStoreOperation::Replace { entry }) => vec![entry],
            other => panic!("expected replace, got {other:?}"),
        };
        let store = ThreadActivityStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.thread_activity_store["256|84015"], entry);
    }
}
