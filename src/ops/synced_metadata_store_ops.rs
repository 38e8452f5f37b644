//! Synced Metadata Store operations. Values are already flat strings, so
//! the persisted row needs no JSON encoding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::synced_metadata::SyncedMetadataStore;

use super::StoreOpsHandler;

/// A mutation of the Synced Metadata Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncedMetadataStoreOperation {
    /// Set one metadata value
    Replace {
        /// Metadata name
        name: String,
        /// Metadata value
        value: String,
    },
    /// Remove metadata values by name; missing names are silently ignored
    Remove {
        /// Names to remove
        names: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one metadata value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBSyncedMetadataEntry {
    /// Metadata name
    pub name: String,
    /// Metadata value
    pub data: String,
}

/// Persistable form of a Synced Metadata Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBSyncedMetadataStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        entry: ClientDBSyncedMetadataEntry,
    },
    /// Delete rows by name
    Remove {
        /// Names to delete
        names: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Synced Metadata Store
pub struct SyncedMetadataStoreOpsHandler;

impl StoreOpsHandler for SyncedMetadataStoreOpsHandler {
    type Store = SyncedMetadataStore;
    type Operation = SyncedMetadataStoreOperation;
    type ClientDBOperation = ClientDBSyncedMetadataStoreOperation;
    type DBData = Vec<ClientDBSyncedMetadataEntry>;

    fn process_store_operations(
        mut store: SyncedMetadataStore,
        ops: &[SyncedMetadataStoreOperation],
    ) -> SyncedMetadataStore {
        for op in ops {
            match op {
                SyncedMetadataStoreOperation::Replace { name, value } => {
                    store.synced_metadata.insert(name.clone(), value.clone());
                }
                SyncedMetadataStoreOperation::Remove { names } => {
                    for name in names {
                        store.synced_metadata.remove(name);
                    }
                }
                SyncedMetadataStoreOperation::RemoveAll => {
                    store.synced_metadata.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[SyncedMetadataStoreOperation],
    ) -> Result<Vec<ClientDBSyncedMetadataStoreOperation>> {
        Ok(ops
            .iter()
            .map(|op| match op {
                SyncedMetadataStoreOperation::Replace { name, value } => {
                    ClientDBSyncedMetadataStoreOperation::Replace {
                        entry: ClientDBSyncedMetadataEntry {
                            name: name.clone(),
                            data: value.clone(),
                        },
                    }
                }
                SyncedMetadataStoreOperation::Remove { names } => {
                    ClientDBSyncedMetadataStoreOperation::Remove {
                        names: names.clone(),
                    }
                }
                SyncedMetadataStoreOperation::RemoveAll => {
                    ClientDBSyncedMetadataStoreOperation::RemoveAll
                }
            })
            .collect())
    }

    fn translate_client_db_data(
        rows: Vec<ClientDBSyncedMetadataEntry>,
    ) -> Result<SyncedMetadataStore> {
        let mut synced_metadata = HashMap::with_capacity(rows.len());
        for row in rows {
            synced_metadata.insert(row.name, row.data);
        }
        Ok(SyncedMetadataStore { synced_metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_then_remove() {
        let store = SyncedMetadataStoreOpsHandler::process_store_operations(
            SyncedMetadataStore::default(),
            &[
                SyncedMetadataStoreOperation::Replace {
                    name: "current_user_id".to_string(),
                    value: "256".to_string(),
                },
                SyncedMetadataStoreOperation::Remove {
                    names: vec!["current_user_id".to_string()],
                },
            ],
        );
        assert!(store.synced_metadata.is_empty());
    }

    #[test]
    fn test_metadata_round_trip() {
        let ops = SyncedMetadataStoreOpsHandler::convert_ops_to_client_db_ops(&[
            SyncedMetadataStoreOperation::Replace {
                name: "db_version".to_string(),
                value: "4".to_string(),
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBSyncedMetadataStoreOperation::Replace { entry }) => vec![entry],
            other => panic!("expected replace, got {other:?}"),
        };
        let store = SyncedMetadataStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.synced_metadata["db_version"], "4");
    }
}
