//! Keyserver Store operations.
//!
//! The keyserver id is not part of [`KeyserverInfo`], so replace
//! operations carry it explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::keyserver::{KeyserverInfo, KeyserverStore};

use super::StoreOpsHandler;

/// A mutation of the Keyserver Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyserverStoreOperation {
    /// Fully overwrite one keyserver record
    Replace {
        /// Keyserver id
        id: String,
        /// The complete new record
        keyserver_info: KeyserverInfo,
    },
    /// Remove keyservers by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one keyserver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBKeyserverInfo {
    /// Keyserver id
    pub id: String,
    /// JSON-encoded [`KeyserverInfo`]
    pub keyserver_info: String,
}

/// Persistable form of a Keyserver Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBKeyserverStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        keyserver_info: ClientDBKeyserverInfo,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Keyserver Store
pub struct KeyserverStoreOpsHandler;

impl StoreOpsHandler for KeyserverStoreOpsHandler {
    type Store = KeyserverStore;
    type Operation = KeyserverStoreOperation;
    type ClientDBOperation = ClientDBKeyserverStoreOperation;
    type DBData = Vec<ClientDBKeyserverInfo>;

    fn process_store_operations(
        mut store: KeyserverStore,
        ops: &[KeyserverStoreOperation],
    ) -> KeyserverStore {
        for op in ops {
            match op {
                KeyserverStoreOperation::Replace { id, keyserver_info } => {
                    store
                        .keyserver_infos
                        .insert(id.clone(), keyserver_info.clone());
                }
                KeyserverStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.keyserver_infos.remove(id);
                    }
                }
                KeyserverStoreOperation::RemoveAll => {
                    store.keyserver_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[KeyserverStoreOperation],
    ) -> Result<Vec<ClientDBKeyserverStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                KeyserverStoreOperation::Replace { id, keyserver_info } => {
                    Ok(ClientDBKeyserverStoreOperation::Replace {
                        keyserver_info: ClientDBKeyserverInfo {
                            id: id.clone(),
                            keyserver_info: serde_json::to_string(keyserver_info)?,
                        },
                    })
                }
                KeyserverStoreOperation::Remove { ids } => {
                    Ok(ClientDBKeyserverStoreOperation::Remove { ids: ids.clone() })
                }
                KeyserverStoreOperation::RemoveAll => {
                    Ok(ClientDBKeyserverStoreOperation::RemoveAll)
                }
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBKeyserverInfo>) -> Result<KeyserverStore> {
        let mut keyserver_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let keyserver_info: KeyserverInfo = serde_json::from_str(&row.keyserver_info)
                .map_err(|_| {
                    Error::MalformedRecord(format!("keyserver {} failed to parse", row.id))
                })?;
            keyserver_infos.insert(row.id.clone(), keyserver_info);
        }
        Ok(KeyserverStore { keyserver_infos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::keyserver::KeyserverConnectionStatus;

    #[test]
    fn test_keyserver_row_round_trip() {
        let keyserver_info = KeyserverInfo {
            url_prefix: "https://keyserver.example".to_string(),
            connection: KeyserverConnectionStatus::Connected,
            updates_current_as_of: 1_689_091_732_528,
            last_communicated: Some(1_689_091_800_000),
        };
        let ops = KeyserverStoreOpsHandler::convert_ops_to_client_db_ops(&[
            KeyserverStoreOperation::Replace {
                id: "256".to_string(),
                keyserver_info: keyserver_info.clone(),
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBKeyserverStoreOperation::Replace { keyserver_info }) => {
                vec![keyserver_info]
            }
            other => panic!("expected replace, got {other:?}"),
        };
        let store = KeyserverStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.keyserver_infos["256"], keyserver_info);
    }
}
