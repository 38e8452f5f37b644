//! User Store operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::user::{UserInfo, UserStore};

use super::StoreOpsHandler;

/// A mutation of the User Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserStoreOperation {
    /// Fully overwrite one user record
    Replace {
        /// The complete new record
        user_info: UserInfo,
    },
    /// Remove users by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBUserInfo {
    /// User id
    pub id: String,
    /// JSON-encoded [`UserInfo`]
    pub user_info: String,
}

/// Persistable form of a User Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBUserStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        user_info: ClientDBUserInfo,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the User Store
pub struct UserStoreOpsHandler;

impl StoreOpsHandler for UserStoreOpsHandler {
    type Store = UserStore;
    type Operation = UserStoreOperation;
    type ClientDBOperation = ClientDBUserStoreOperation;
    type DBData = Vec<ClientDBUserInfo>;

    fn process_store_operations(mut store: UserStore, ops: &[UserStoreOperation]) -> UserStore {
        for op in ops {
            match op {
                UserStoreOperation::Replace { user_info } => {
                    store
                        .user_infos
                        .insert(user_info.id.clone(), user_info.clone());
                }
                UserStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.user_infos.remove(id);
                    }
                }
                UserStoreOperation::RemoveAll => {
                    store.user_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[UserStoreOperation],
    ) -> Result<Vec<ClientDBUserStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                UserStoreOperation::Replace { user_info } => {
                    Ok(ClientDBUserStoreOperation::Replace {
                        user_info: ClientDBUserInfo {
                            id: user_info.id.clone(),
                            user_info: serde_json::to_string(user_info)?,
                        },
                    })
                }
                UserStoreOperation::Remove { ids } => {
                    Ok(ClientDBUserStoreOperation::Remove { ids: ids.clone() })
                }
                UserStoreOperation::RemoveAll => Ok(ClientDBUserStoreOperation::RemoveAll),
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBUserInfo>) -> Result<UserStore> {
        let mut user_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let user_info: UserInfo = serde_json::from_str(&row.user_info).map_err(|_| {
                Error::MalformedRecord(format!("user {} failed to parse", row.id))
            })?;
            user_infos.insert(row.id.clone(), user_info);
        }
        Ok(UserStore { user_infos })
    }
}
