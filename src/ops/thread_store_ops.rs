//! Thread Store operations and their persisted row shape.
//!
//! The persisted row keeps scalar columns flat and JSON-stringifies the
//! nested structures (members, roles, current user, avatar). Creation
//! time is stored as a string column so the row shape is stable across
//! platforms that lack 64-bit integers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::thread::{
    MemberInfo, RawThreadInfo, RoleInfo, ThreadAvatar, ThreadCurrentUserInfo, ThreadStore,
};

use super::StoreOpsHandler;

/// A mutation of the Thread Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadStoreOperation {
    /// Fully overwrite one thread record
    Replace {
        /// The complete new record
        thread_info: RawThreadInfo,
        /// Whether the thread belongs in device backups, derived at
        /// operation-creation time so persistence never re-derives it
        is_backed_up: bool,
    },
    /// Remove threads by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

impl ThreadStoreOperation {
    /// Build a replace operation, deriving the backup flag from the
    /// thread's protocol classification.
    pub fn replace(thread_info: RawThreadInfo) -> Self {
        let is_backed_up = thread_info.is_backed_up();
        Self::Replace {
            thread_info,
            is_backed_up,
        }
    }
}

/// Persisted row for one thread. Nested structures are JSON strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBThreadInfo {
    /// Thread id
    pub id: String,
    /// Thread type code
    #[serde(rename = "type")]
    pub thread_type: i32,
    /// Thread name
    pub name: Option<String>,
    /// Thread description
    pub description: Option<String>,
    /// Display color
    pub color: String,
    /// Creation time, Unix ms, as a string column
    pub creation_time: String,
    /// Parent thread id
    #[serde(rename = "parentThreadID")]
    pub parent_thread_id: Option<String>,
    /// Containing thread id
    #[serde(rename = "containingThreadID")]
    pub containing_thread_id: Option<String>,
    /// Community root id
    pub community: Option<String>,
    /// JSON-encoded member list
    pub members: String,
    /// JSON-encoded role map
    pub roles: String,
    /// JSON-encoded viewer state
    pub current_user: String,
    /// Reply count
    pub replies_count: i64,
    /// Pinned message count
    pub pinned_count: i64,
    /// JSON-encoded avatar, NULL when unset
    pub avatar: Option<String>,
}

/// Persistable form of a Thread Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBThreadStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        thread_info: ClientDBThreadInfo,
        /// Backup flag, forwarded from the in-memory operation
        is_backed_up: bool,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Flatten a thread record into its persisted row.
pub fn convert_thread_info_to_client_db_thread_info(
    thread_info: &RawThreadInfo,
) -> Result<ClientDBThreadInfo> {
    Ok(ClientDBThreadInfo {
        id: thread_info.id.clone(),
        thread_type: thread_info.thread_type,
        name: thread_info.name.clone(),
        description: thread_info.description.clone(),
        color: thread_info.color.clone(),
        creation_time: thread_info.creation_time.to_string(),
        parent_thread_id: thread_info.parent_thread_id.clone(),
        containing_thread_id: thread_info.containing_thread_id.clone(),
        community: thread_info.community.clone(),
        members: serde_json::to_string(&thread_info.members)?,
        roles: serde_json::to_string(&thread_info.roles)?,
        current_user: serde_json::to_string(&thread_info.current_user)?,
        replies_count: thread_info.replies_count,
        pinned_count: thread_info.pinned_count,
        avatar: thread_info
            .avatar
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?,
    })
}

/// Rebuild a thread record from its persisted row.
pub fn convert_client_db_thread_info_to_raw_thread_info(
    row: &ClientDBThreadInfo,
) -> Result<RawThreadInfo> {
    let members: Vec<MemberInfo> = serde_json::from_str(&row.members)?;
    let roles: std::collections::BTreeMap<String, RoleInfo> = serde_json::from_str(&row.roles)?;
    let current_user: ThreadCurrentUserInfo = serde_json::from_str(&row.current_user)?;
    let avatar: Option<ThreadAvatar> = row
        .avatar
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    let creation_time = row.creation_time.parse::<i64>().map_err(|_| {
        crate::error::Error::MalformedRecord(format!(
            "thread {} has non-numeric creation time",
            row.id
        ))
    })?;
    Ok(RawThreadInfo {
        id: row.id.clone(),
        thread_type: row.thread_type,
        name: row.name.clone(),
        description: row.description.clone(),
        color: row.color.clone(),
        creation_time,
        parent_thread_id: row.parent_thread_id.clone(),
        containing_thread_id: row.containing_thread_id.clone(),
        community: row.community.clone(),
        members,
        roles,
        current_user,
        replies_count: row.replies_count,
        pinned_count: row.pinned_count,
        avatar,
    })
}

/// Operation handler for the Thread Store
pub struct ThreadStoreOpsHandler;

impl StoreOpsHandler for ThreadStoreOpsHandler {
    type Store = ThreadStore;
    type Operation = ThreadStoreOperation;
    type ClientDBOperation = ClientDBThreadStoreOperation;
    type DBData = Vec<ClientDBThreadInfo>;

    fn process_store_operations(mut store: ThreadStore, ops: &[ThreadStoreOperation]) -> ThreadStore {
        for op in ops {
            match op {
                ThreadStoreOperation::Replace { thread_info, .. } => {
                    store
                        .thread_infos
                        .insert(thread_info.id.clone(), thread_info.clone());
                }
                ThreadStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.thread_infos.remove(id);
                    }
                }
                ThreadStoreOperation::RemoveAll => {
                    store.thread_infos.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[ThreadStoreOperation],
    ) -> Result<Vec<ClientDBThreadStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                ThreadStoreOperation::Replace {
                    thread_info,
                    is_backed_up,
                } => Ok(ClientDBThreadStoreOperation::Replace {
                    thread_info: convert_thread_info_to_client_db_thread_info(thread_info)?,
                    is_backed_up: *is_backed_up,
                }),
                ThreadStoreOperation::Remove { ids } => {
                    Ok(ClientDBThreadStoreOperation::Remove { ids: ids.clone() })
                }
                ThreadStoreOperation::RemoveAll => Ok(ClientDBThreadStoreOperation::RemoveAll),
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBThreadInfo>) -> Result<ThreadStore> {
        let mut thread_infos = HashMap::with_capacity(rows.len());
        for row in &rows {
            let thread_info = convert_client_db_thread_info_to_raw_thread_info(row)?;
            thread_infos.insert(row.id.clone(), thread_info);
        }
        Ok(ThreadStore { thread_infos })
    }
}
