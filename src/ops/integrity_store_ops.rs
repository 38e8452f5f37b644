//! Integrity Store operations.
//!
//! Hash values are 53-bit-safe integers (see [`crate::integrity`]) stored
//! as string columns. A replace operation carrying zero hashes would
//! persist nothing, so it is dropped at conversion time rather than
//! emitted as an empty row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::integrity::IntegrityStore;

use super::StoreOpsHandler;

/// A mutation of the Integrity Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityStoreOperation {
    /// Merge one-or-many hash entries; existing ids are overwritten
    ReplaceThreadHashes {
        /// New hash values keyed by thread id
        thread_hashes: HashMap<String, u64>,
    },
    /// Remove hash entries by thread id
    RemoveThreadHashes {
        /// Thread ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAllThreadHashes,
}

/// Persisted row for one thread hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBIntegrityThreadHash {
    /// Thread id
    pub id: String,
    /// Hash value as a string column
    pub thread_hash: String,
}

/// Persistable form of an Integrity Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBIntegrityStoreOperation {
    /// Insert or overwrite hash rows
    ReplaceIntegrityThreadHashes {
        /// The rows
        thread_hashes: Vec<ClientDBIntegrityThreadHash>,
    },
    /// Delete rows by thread id
    RemoveIntegrityThreadHashes {
        /// Thread ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAllIntegrityThreadHashes,
}

/// Operation handler for the Integrity Store
pub struct IntegrityStoreOpsHandler;

impl StoreOpsHandler for IntegrityStoreOpsHandler {
    type Store = IntegrityStore;
    type Operation = IntegrityStoreOperation;
    type ClientDBOperation = ClientDBIntegrityStoreOperation;
    type DBData = Vec<ClientDBIntegrityThreadHash>;

    fn process_store_operations(
        mut store: IntegrityStore,
        ops: &[IntegrityStoreOperation],
    ) -> IntegrityStore {
        for op in ops {
            match op {
                IntegrityStoreOperation::ReplaceThreadHashes { thread_hashes } => {
                    for (id, hash) in thread_hashes {
                        store.thread_hashes.insert(id.clone(), *hash);
                    }
                }
                IntegrityStoreOperation::RemoveThreadHashes { ids } => {
                    for id in ids {
                        store.thread_hashes.remove(id);
                    }
                }
                IntegrityStoreOperation::RemoveAllThreadHashes => {
                    store.thread_hashes.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[IntegrityStoreOperation],
    ) -> Result<Vec<ClientDBIntegrityStoreOperation>> {
        let mut converted = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                IntegrityStoreOperation::ReplaceThreadHashes { thread_hashes } => {
                    // Nothing to persist for an empty hash map.
                    if thread_hashes.is_empty() {
                        continue;
                    }
                    let mut rows: Vec<ClientDBIntegrityThreadHash> = thread_hashes
                        .iter()
                        .map(|(id, hash)| ClientDBIntegrityThreadHash {
                            id: id.clone(),
                            thread_hash: hash.to_string(),
                        })
                        .collect();
                    rows.sort_by(|a, b| a.id.cmp(&b.id));
                    converted.push(ClientDBIntegrityStoreOperation::ReplaceIntegrityThreadHashes {
                        thread_hashes: rows,
                    });
                }
                IntegrityStoreOperation::RemoveThreadHashes { ids } => {
                    converted.push(ClientDBIntegrityStoreOperation::RemoveIntegrityThreadHashes {
                        ids: ids.clone(),
                    });
                }
                IntegrityStoreOperation::RemoveAllThreadHashes => {
                    converted
                        .push(ClientDBIntegrityStoreOperation::RemoveAllIntegrityThreadHashes);
                }
            }
        }
        Ok(converted)
    }

    fn translate_client_db_data(
        rows: Vec<ClientDBIntegrityThreadHash>,
    ) -> Result<IntegrityStore> {
        let mut thread_hashes = HashMap::with_capacity(rows.len());
        for row in &rows {
            let hash = row.thread_hash.parse::<u64>().map_err(|_| {
                Error::MalformedRecord(format!(
                    "integrity hash for thread {} is non-numeric",
                    row.id
                ))
            })?;
            thread_hashes.insert(row.id.clone(), hash);
        }
        Ok(IntegrityStore { thread_hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, u64)]) -> IntegrityStore {
        IntegrityStore {
            thread_hashes: entries
                .iter()
                .map(|(id, hash)| (id.to_string(), *hash))
                .collect(),
        }
    }

    #[test]
    fn test_remove_thread_hashes() {
        let store = store_with(&[("A", 1), ("B", 2), ("C", 3)]);
        let store = IntegrityStoreOpsHandler::process_store_operations(
            store,
            &[IntegrityStoreOperation::RemoveThreadHashes {
                ids: vec!["A".to_string(), "B".to_string()],
            }],
        );
        assert_eq!(store, store_with(&[("C", 3)]));
    }

    #[test]
    fn test_replace_merges_into_existing_map() {
        let store = store_with(&[("A", 1)]);
        let store = IntegrityStoreOpsHandler::process_store_operations(
            store,
            &[IntegrityStoreOperation::ReplaceThreadHashes {
                thread_hashes: HashMap::from([("B".to_string(), 2), ("A".to_string(), 9)]),
            }],
        );
        assert_eq!(store, store_with(&[("A", 9), ("B", 2)]));
    }

    #[test]
    fn test_empty_replace_is_dropped_at_conversion() {
        let converted = IntegrityStoreOpsHandler::convert_ops_to_client_db_ops(&[
            IntegrityStoreOperation::ReplaceThreadHashes {
                thread_hashes: HashMap::new(),
            },
        ])
        .unwrap();
        assert!(converted.is_empty());
    }

    #[test]
    fn test_hash_round_trip_through_string_column() {
        let converted = IntegrityStoreOpsHandler::convert_ops_to_client_db_ops(&[
            IntegrityStoreOperation::ReplaceThreadHashes {
                thread_hashes: HashMap::from([("256|84015".to_string(), 8_217_211_572_166_262)]),
            },
        ])
        .unwrap();
        let rows = match converted.into_iter().next() {
            Some(ClientDBIntegrityStoreOperation::ReplaceIntegrityThreadHashes {
                thread_hashes,
            }) => thread_hashes,
            other => panic!("expected replace, got {other:?}"),
        };
        assert_eq!(rows[0].thread_hash, "8217211572166262");
        let store = IntegrityStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.thread_hashes["256|84015"], 8_217_211_572_166_262);
    }
}
