//! Entry Store operations. Entries persist as one JSON blob per row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::entry::{EntryStore, RawEntryInfo};

use super::StoreOpsHandler;

/// A mutation of the Entry Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryStoreOperation {
    /// Fully overwrite one entry record
    Replace {
        /// The complete new record
        entry: RawEntryInfo,
    },
    /// Remove entries by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one calendar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBEntryInfo {
    /// Entry id
    pub id: String,
    /// JSON-encoded [`RawEntryInfo`]
    pub entry: String,
}

/// Persistable form of an Entry Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBEntryStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        entry: ClientDBEntryInfo,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Entry Store
pub struct EntryStoreOpsHandler;

impl StoreOpsHandler for EntryStoreOpsHandler {
    type Store = EntryStore;
    type Operation = EntryStoreOperation;
    type ClientDBOperation = ClientDBEntryStoreOperation;
    type DBData = Vec<ClientDBEntryInfo>;

    fn process_store_operations(mut store: EntryStore, ops: &[EntryStoreOperation]) -> EntryStore {
        for op in ops {
            match op {
                EntryStoreOperation::Replace { entry } => {
                    store
                        .entry_infos
                        .insert(entry.entry_id().to_string(), entry.clone());
                }
                EntryStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.entry_infos.remove(id);
                    }
                }
                EntryStoreOperation::RemoveAll => {
                    store.entry_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[EntryStoreOperation],
    ) -> Result<Vec<ClientDBEntryStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                EntryStoreOperation::Replace { entry } => {
                    Ok(ClientDBEntryStoreOperation::Replace {
                        entry: ClientDBEntryInfo {
                            id: entry.entry_id().to_string(),
                            entry: serde_json::to_string(entry)?,
                        },
                    })
                }
                EntryStoreOperation::Remove { ids } => {
                    Ok(ClientDBEntryStoreOperation::Remove { ids: ids.clone() })
                }
                EntryStoreOperation::RemoveAll => Ok(ClientDBEntryStoreOperation::RemoveAll),
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBEntryInfo>) -> Result<EntryStore> {
        let mut entry_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let entry: RawEntryInfo = serde_json::from_str(&row.entry).map_err(|_| {
                Error::MalformedRecord(format!("entry {} failed to parse", row.id))
            })?;
            entry_infos.insert(row.id.clone(), entry);
        }
        Ok(EntryStore { entry_infos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(id: &str) -> RawEntryInfo {
        RawEntryInfo {
            id: Some(id.to_string()),
            local_id: None,
            thread_id: "256|84015".to_string(),
            text: "dentist".to_string(),
            year: 2023,
            month: 7,
            day: 11,
            creation_time: 1_689_091_732_528,
            creator_id: "256".to_string(),
            deleted: false,
        }
    }

    #[test]
    fn test_entry_row_round_trip() {
        let entry = sample_entry("90210");
        let ops = EntryStoreOpsHandler::convert_ops_to_client_db_ops(&[
            EntryStoreOperation::Replace {
                entry: entry.clone(),
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBEntryStoreOperation::Replace { entry }) => vec![entry],
            other => panic!("expected replace, got {other:?}"),
        };
        let store = EntryStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.entry_infos["90210"], entry);
    }

    #[test]
    fn test_remove_missing_id_is_a_no_op() {
        let store = EntryStoreOpsHandler::process_store_operations(
            EntryStore::default(),
            &[EntryStoreOperation::Replace {
                entry: sample_entry("90210"),
            }],
        );
        let before = store.clone();
        let after = EntryStoreOpsHandler::process_store_operations(
            store,
            &[EntryStoreOperation::Remove {
                ids: vec!["90211".to_string()],
            }],
        );
        assert_eq!(before, after);
    }
}
