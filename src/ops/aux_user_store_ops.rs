//! Aux User Store operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::user::{AuxUserInfo, AuxUserStore};

use super::StoreOpsHandler;

/// A mutation of the Aux User Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuxUserStoreOperation {
    /// Fully overwrite one aux user record
    Replace {
        /// User id
        id: String,
        /// The complete new record
        aux_user_info: AuxUserInfo,
    },
    /// Remove aux records by user id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one aux user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBAuxUserInfo {
    /// User id
    pub id: String,
    /// JSON-encoded [`AuxUserInfo`]
    pub aux_user_info: String,
}

/// Persistable form of an Aux User Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBAuxUserStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        aux_user_info: ClientDBAuxUserInfo,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Aux User Store
pub struct AuxUserStoreOpsHandler;

impl StoreOpsHandler for AuxUserStoreOpsHandler {
    type Store = AuxUserStore;
    type Operation = AuxUserStoreOperation;
    type ClientDBOperation = ClientDBAuxUserStoreOperation;
    type DBData = Vec<ClientDBAuxUserInfo>;

    fn process_store_operations(
        mut store: AuxUserStore,
        ops: &[AuxUserStoreOperation],
    ) -> AuxUserStore {
        for op in ops {
            match op {
                AuxUserStoreOperation::Replace { id, aux_user_info } => {
                    store
                        .aux_user_infos
                        .insert(id.clone(), aux_user_info.clone());
                }
                AuxUserStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.aux_user_infos.remove(id);
                    }
                }
                AuxUserStoreOperation::RemoveAll => {
                    store.aux_user_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[AuxUserStoreOperation],
    ) -> Result<Vec<ClientDBAuxUserStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                AuxUserStoreOperation::Replace { id, aux_user_info } => {
                    Ok(ClientDBAuxUserStoreOperation::Replace {
                        aux_user_info: ClientDBAuxUserInfo {
                            id: id.clone(),
                            aux_user_info: serde_json::to_string(aux_user_info)?,
                        },
                    })
                }
                AuxUserStoreOperation::Remove { ids } => {
                    Ok(ClientDBAuxUserStoreOperation::Remove { ids: ids.clone() })
                }
                AuxUserStoreOperation::RemoveAll => Ok(ClientDBAuxUserStoreOperation::RemoveAll),
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBAuxUserInfo>) -> Result<AuxUserStore> {
        let mut aux_user_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let aux_user_info: AuxUserInfo = serde_json::from_str(&row.aux_user_info)
                .map_err(|_| {
                    Error::MalformedRecord(format!("aux user {} failed to parse", row.id))
                })?;
            aux_user_infos.insert(row.id.clone(), aux_user_info);
        }
        Ok(AuxUserStore { aux_user_infos })
    }
}
