//! Community Store operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::community::{CommunityInfo, CommunityStore};

use super::StoreOpsHandler;

/// A mutation of the Community Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommunityStoreOperation {
    /// Fully overwrite one community record
    Replace {
        /// Community root thread id
        id: String,
        /// The complete new record
        community_info: CommunityInfo,
    },
    /// Remove communities by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBCommunityInfo {
    /// Community root thread id
    pub id: String,
    /// JSON-encoded [`CommunityInfo`]
    pub community_info: String,
}

/// Persistable form of a Community Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBCommunityStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        community_info: ClientDBCommunityInfo,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Community Store
pub struct CommunityStoreOpsHandler;

impl StoreOpsHandler for CommunityStoreOpsHandler {
    type Store = CommunityStore;
    type Operation = CommunityStoreOperation;
    type ClientDBOperation = ClientDBCommunityStoreOperation;
    type DBData = Vec<ClientDBCommunityInfo>;

    fn process_store_operations(
        mut store: CommunityStore,
        ops: &[CommunityStoreOperation],
    ) -> CommunityStore {
        for op in ops {
            match op {
                CommunityStoreOperation::Replace { id, community_info } => {
                    store
                        .community_infos
                        .insert(id.clone(), community_info.clone());
                }
                CommunityStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.community_infos.remove(id);
                    }
                }
                CommunityStoreOperation::RemoveAll => {
                    store.community_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[CommunityStoreOperation],
    ) -> Result<Vec<ClientDBCommunityStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                CommunityStoreOperation::Replace { id, community_info } => {
                    Ok(ClientDBCommunityStoreOperation::Replace {
                        community_info: ClientDBCommunityInfo {
                            id: id.clone(),
                            community_info: serde_json::to_string(community_info)?,
                        },
                    })
                }
                CommunityStoreOperation::Remove { ids } => {
                    Ok(ClientDBCommunityStoreOperation::Remove { ids: ids.clone() })
                }
                CommunityStoreOperation::RemoveAll => {
                    Ok(ClientDBCommunityStoreOperation::RemoveAll)
                }
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBCommunityInfo>) -> Result<CommunityStore> {
        let mut community_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let community_info: CommunityInfo = serde_json::from_str(&row.community_info)
                .map_err(|_| {
                    Error::MalformedRecord(format!("community {} failed to parse", row.id))
                })?;
            community_infos.insert(row.id.clone(), community_info);
        }
        Ok(CommunityStore { community_infos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_community_row_round_trip() {
        let community_info = CommunityInfo {
            farcaster_channel_id: Some("memes".to_string()),
        };
        let ops = CommunityStoreOpsHandler::convert_ops_to_client_db_ops(&[
            CommunityStoreOperation::Replace {
                id: "256|1".to_string(),
                community_info: community_info.clone(),
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBCommunityStoreOperation::Replace { community_info }) => {
                vec![community_info]
            }
            other => panic!("expected replace, got {other:?}"),
        };
        let store = CommunityStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.community_infos["256|1"], community_info);
    }
}
