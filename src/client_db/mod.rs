//! # Client DB Translation
//!
//! The boundary between typed store state and the persisted row world:
//! one batch-level conversion fanning out to every store's handler, and
//! the inverse hydration that rebuilds every store from rows at cold
//! start.
//!
//! Pass-through operations (drafts, outbound peer messages, search index
//! deltas) are already in their persistable shape and are forwarded
//! unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::integrity::IntegrityStore;
use crate::ops::aux_user_store_ops::{ClientDBAuxUserInfo, ClientDBAuxUserStoreOperation};
use crate::ops::community_store_ops::{ClientDBCommunityInfo, ClientDBCommunityStoreOperation};
use crate::ops::dm_operations_store_ops::{
    ClientDBDMOperation, ClientDBDMOperationStoreOperation, ClientDBQueuedDMOperation,
    DMOperationsData,
};
use crate::ops::entry_store_ops::{ClientDBEntryInfo, ClientDBEntryStoreOperation};
use crate::ops::integrity_store_ops::{
    ClientDBIntegrityStoreOperation, ClientDBIntegrityThreadHash,
};
use crate::ops::keyserver_store_ops::{ClientDBKeyserverInfo, ClientDBKeyserverStoreOperation};
use crate::ops::message_store_ops::{
    ClientDBLocalMessageInfo, ClientDBMessageInfo, ClientDBMessageStoreOperation,
    ClientDBThreadMessageInfo, MessageStoreData,
};
use crate::ops::report_store_ops::{ClientDBReport, ClientDBReportStoreOperation};
use crate::ops::synced_metadata_store_ops::{
    ClientDBSyncedMetadataEntry, ClientDBSyncedMetadataStoreOperation,
};
use crate::ops::thread_activity_store_ops::{
    ClientDBThreadActivityEntry, ClientDBThreadActivityStoreOperation,
};
use crate::ops::thread_store_ops::{
    convert_client_db_thread_info_to_raw_thread_info, convert_thread_info_to_client_db_thread_info,
    ClientDBThreadInfo, ClientDBThreadStoreOperation,
};
use crate::ops::user_store_ops::{ClientDBUserInfo, ClientDBUserStoreOperation};
use crate::ops::{
    AuxUserStoreOpsHandler, CommunityStoreOpsHandler, DMOperationStoreOpsHandler,
    DraftStoreOperation, EntryStoreOpsHandler, IntegrityStoreOpsHandler, KeyserverStoreOpsHandler,
    MessageSearchStoreOperation, MessageStoreOpsHandler, OutboundP2PMessage, ReportStoreOpsHandler,
    StoreOperations, StoreOpsHandler, SyncedMetadataStoreOpsHandler, ThreadActivityStoreOpsHandler,
    ThreadStoreOperation, ThreadStoreOpsHandler, UserStoreOpsHandler,
};
use crate::types::community::CommunityStore;
use crate::types::dm_ops::QueuedDMOperations;
use crate::types::entry::EntryStore;
use crate::types::keyserver::KeyserverStore;
use crate::types::message::MessageStore;
use crate::types::report::ReportStore;
use crate::types::synced_metadata::SyncedMetadataStore;
use crate::types::thread::{RawThreadInfo, ThreadStore};
use crate::types::thread_activity::ThreadActivityStore;
use crate::types::user::{AuxUserStore, UserStore};

/// One dispatch's operations, fully converted to their persistable
/// shapes. This is the unit the database commits in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBStoreOperations {
    /// Draft operations (pass-through)
    pub draft_store_operations: Vec<DraftStoreOperation>,
    /// Thread Store operations
    pub thread_store_operations: Vec<ClientDBThreadStoreOperation>,
    /// Message Store operations
    pub message_store_operations: Vec<ClientDBMessageStoreOperation>,
    /// Report Store operations
    pub report_store_operations: Vec<ClientDBReportStoreOperation>,
    /// Keyserver Store operations
    pub keyserver_store_operations: Vec<ClientDBKeyserverStoreOperation>,
    /// User Store operations
    pub user_store_operations: Vec<ClientDBUserStoreOperation>,
    /// Integrity Store operations
    pub integrity_store_operations: Vec<ClientDBIntegrityStoreOperation>,
    /// Community Store operations
    pub community_store_operations: Vec<ClientDBCommunityStoreOperation>,
    /// Synced Metadata Store operations
    pub synced_metadata_store_operations: Vec<ClientDBSyncedMetadataStoreOperation>,
    /// Aux User Store operations
    pub aux_user_store_operations: Vec<ClientDBAuxUserStoreOperation>,
    /// Thread Activity Store operations
    pub thread_activity_store_operations: Vec<ClientDBThreadActivityStoreOperation>,
    /// Entry Store operations
    pub entry_store_operations: Vec<ClientDBEntryStoreOperation>,
    /// Search index operations (pass-through)
    pub message_search_store_operations: Vec<MessageSearchStoreOperation>,
    /// Outbound peer messages (pass-through)
    #[serde(rename = "outboundP2PMessages")]
    pub outbound_p2p_messages: Vec<OutboundP2PMessage>,
    /// DM Operations Store operations
    pub dm_operation_store_operations: Vec<ClientDBDMOperationStoreOperation>,
}

impl ClientDBStoreOperations {
    /// Whether every operation list is empty.
    pub fn is_empty(&self) -> bool {
        self.draft_store_operations.is_empty()
            && self.thread_store_operations.is_empty()
            && self.message_store_operations.is_empty()
            && self.report_store_operations.is_empty()
            && self.keyserver_store_operations.is_empty()
            && self.user_store_operations.is_empty()
            && self.integrity_store_operations.is_empty()
            && self.community_store_operations.is_empty()
            && self.synced_metadata_store_operations.is_empty()
            && self.aux_user_store_operations.is_empty()
            && self.thread_activity_store_operations.is_empty()
            && self.entry_store_operations.is_empty()
            && self.message_search_store_operations.is_empty()
            && self.outbound_p2p_messages.is_empty()
            && self.dm_operation_store_operations.is_empty()
    }
}

/// Convert a full batch of store operations to persistable shapes,
/// fanning out to each store's handler.
pub fn convert_store_operations_to_client_db_store_operations(
    ops: &StoreOperations,
) -> Result<ClientDBStoreOperations> {
    Ok(ClientDBStoreOperations {
        draft_store_operations: ops.draft_store_operations.clone(),
        thread_store_operations: ThreadStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.thread_store_operations,
        )?,
        message_store_operations: MessageStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.message_store_operations,
        )?,
        report_store_operations: ReportStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.report_store_operations,
        )?,
        keyserver_store_operations: KeyserverStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.keyserver_store_operations,
        )?,
        user_store_operations: UserStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.user_store_operations,
        )?,
        integrity_store_operations: IntegrityStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.integrity_store_operations,
        )?,
        community_store_operations: CommunityStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.community_store_operations,
        )?,
        synced_metadata_store_operations:
            SyncedMetadataStoreOpsHandler::convert_ops_to_client_db_ops(
                &ops.synced_metadata_store_operations,
            )?,
        aux_user_store_operations: AuxUserStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.aux_user_store_operations,
        )?,
        thread_activity_store_operations:
            ThreadActivityStoreOpsHandler::convert_ops_to_client_db_ops(
                &ops.thread_activity_store_operations,
            )?,
        entry_store_operations: EntryStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.entry_store_operations,
        )?,
        message_search_store_operations: ops.message_search_store_operations.clone(),
        outbound_p2p_messages: ops.outbound_p2p_messages.clone(),
        dm_operation_store_operations: DMOperationStoreOpsHandler::convert_ops_to_client_db_ops(
            &ops.dm_operation_store_operations,
        )?,
    })
}

// ============================================================================
// Cold-Start Hydration
// ============================================================================

/// Every persisted row, loaded in one pass at cold start.
#[derive(Debug, Clone, Default)]
pub struct ClientDBStore {
    /// Thread rows
    pub threads: Vec<ClientDBThreadInfo>,
    /// Message rows
    pub messages: Vec<ClientDBMessageInfo>,
    /// Per-thread message view rows
    pub message_store_threads: Vec<ClientDBThreadMessageInfo>,
    /// Local message bookkeeping rows
    pub local_messages: Vec<ClientDBLocalMessageInfo>,
    /// Report rows
    pub reports: Vec<ClientDBReport>,
    /// User rows
    pub users: Vec<ClientDBUserInfo>,
    /// Keyserver rows
    pub keyservers: Vec<ClientDBKeyserverInfo>,
    /// Community rows
    pub communities: Vec<ClientDBCommunityInfo>,
    /// Integrity hash rows
    pub integrity_thread_hashes: Vec<ClientDBIntegrityThreadHash>,
    /// Synced metadata rows
    pub synced_metadata: Vec<ClientDBSyncedMetadataEntry>,
    /// Aux user rows
    pub aux_user_infos: Vec<ClientDBAuxUserInfo>,
    /// Thread activity rows
    pub thread_activity_entries: Vec<ClientDBThreadActivityEntry>,
    /// Entry rows
    pub entries: Vec<ClientDBEntryInfo>,
    /// Shimmed DM operation rows
    pub dm_operations: Vec<ClientDBDMOperation>,
    /// Parked DM operation rows
    pub queued_dm_operations: Vec<ClientDBQueuedDMOperation>,
}

/// All typed stores rebuilt from persisted rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydratedStores {
    pub thread_store: ThreadStore,
    pub message_store: MessageStore,
    pub report_store: ReportStore,
    pub user_store: UserStore,
    pub keyserver_store: KeyserverStore,
    pub community_store: CommunityStore,
    pub integrity_store: IntegrityStore,
    pub synced_metadata_store: SyncedMetadataStore,
    pub aux_user_store: AuxUserStore,
    pub thread_activity_store: ThreadActivityStore,
    pub entry_store: EntryStore,
    pub queued_dm_operations: QueuedDMOperations,
}

/// Rebuild every store from its rows. Any malformed row fails the whole
/// hydration; the caller decides whether to fall back to an empty state.
pub fn translate_client_db_store(db_store: ClientDBStore) -> Result<HydratedStores> {
    Ok(HydratedStores {
        thread_store: ThreadStoreOpsHandler::translate_client_db_data(db_store.threads)?,
        message_store: MessageStoreOpsHandler::translate_client_db_data(MessageStoreData {
            messages: db_store.messages,
            threads: db_store.message_store_threads,
            local: db_store.local_messages,
        })?,
        report_store: ReportStoreOpsHandler::translate_client_db_data(db_store.reports)?,
        user_store: UserStoreOpsHandler::translate_client_db_data(db_store.users)?,
        keyserver_store: KeyserverStoreOpsHandler::translate_client_db_data(db_store.keyservers)?,
        community_store: CommunityStoreOpsHandler::translate_client_db_data(
            db_store.communities,
        )?,
        integrity_store: IntegrityStoreOpsHandler::translate_client_db_data(
            db_store.integrity_thread_hashes,
        )?,
        synced_metadata_store: SyncedMetadataStoreOpsHandler::translate_client_db_data(
            db_store.synced_metadata,
        )?,
        aux_user_store: AuxUserStoreOpsHandler::translate_client_db_data(
            db_store.aux_user_infos,
        )?,
        thread_activity_store: ThreadActivityStoreOpsHandler::translate_client_db_data(
            db_store.thread_activity_entries,
        )?,
        entry_store: EntryStoreOpsHandler::translate_client_db_data(db_store.entries)?,
        queued_dm_operations: DMOperationStoreOpsHandler::translate_client_db_data(
            DMOperationsData {
                operations: db_store.dm_operations,
                queued: db_store.queued_dm_operations,
            },
        )?,
    })
}

// ============================================================================
// Schema Migrations Over Thread Rows
// ============================================================================

/// Rebuild the persisted thread table through a migration function: the
/// rows are reconstituted into typed records, transformed, and written
/// back as a single `remove_all` plus one replace per surviving record.
pub fn create_update_db_ops_for_thread_store_thread_infos(
    rows: Vec<ClientDBThreadInfo>,
    migrate: impl FnOnce(HashMap<String, RawThreadInfo>) -> HashMap<String, RawThreadInfo>,
) -> Result<Vec<ClientDBThreadStoreOperation>> {
    let mut thread_infos = HashMap::with_capacity(rows.len());
    for row in &rows {
        let thread_info = convert_client_db_thread_info_to_raw_thread_info(row)?;
        thread_infos.insert(row.id.clone(), thread_info);
    }
    let migrated = migrate(thread_infos);

    let mut sorted: Vec<RawThreadInfo> = migrated.into_values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let mut operations = vec![ClientDBThreadStoreOperation::RemoveAll];
    for thread_info in sorted {
        let is_backed_up = thread_info.is_backed_up();
        operations.push(ClientDBThreadStoreOperation::Replace {
            thread_info: convert_thread_info_to_client_db_thread_info(&thread_info)?,
            is_backed_up,
        });
    }
    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{SyncedMetadataStoreOperation, UserStoreOperation};
    use crate::types::thread::{ThreadCurrentUserInfo, ThreadSubscription};
    use crate::types::user::UserInfo;
    use std::collections::BTreeMap;

    fn sample_thread(id: &str) -> RawThreadInfo {
        RawThreadInfo {
            id: id.to_string(),
            thread_type: 3,
            name: Some("general".to_string()),
            description: None,
            color: "648caa".to_string(),
            creation_time: 1_689_091_732_528,
            parent_thread_id: None,
            containing_thread_id: None,
            community: None,
            members: vec![],
            roles: BTreeMap::new(),
            current_user: ThreadCurrentUserInfo {
                role: None,
                permissions: BTreeMap::new(),
                subscription: ThreadSubscription {
                    home: true,
                    push_notifs: true,
                },
                unread: false,
            },
            replies_count: 0,
            pinned_count: 0,
            avatar: None,
        }
    }

    #[test]
    fn test_batch_conversion_fans_out_every_store() {
        let ops = StoreOperations {
            thread_store_operations: vec![ThreadStoreOperation::replace(sample_thread(
                "256|84015",
            ))],
            user_store_operations: vec![UserStoreOperation::Replace {
                user_info: UserInfo {
                    id: "256".to_string(),
                    username: Some("ashoat".to_string()),
                    relationship_status: None,
                    avatar: None,
                },
            }],
            synced_metadata_store_operations: vec![SyncedMetadataStoreOperation::RemoveAll],
            ..Default::default()
        };
        let converted = convert_store_operations_to_client_db_store_operations(&ops).unwrap();
        assert_eq!(converted.thread_store_operations.len(), 1);
        assert_eq!(converted.user_store_operations.len(), 1);
        assert_eq!(converted.synced_metadata_store_operations.len(), 1);
        assert!(converted.message_store_operations.is_empty());
    }

    #[test]
    fn test_hydration_of_empty_database_yields_default_stores() {
        let hydrated = translate_client_db_store(ClientDBStore::default()).unwrap();
        assert_eq!(hydrated, HydratedStores::default());
    }

    #[test]
    fn test_hydration_round_trips_thread_rows() {
        let ops = StoreOperations {
            thread_store_operations: vec![ThreadStoreOperation::replace(sample_thread(
                "256|84015",
            ))],
            ..Default::default()
        };
        let converted = convert_store_operations_to_client_db_store_operations(&ops).unwrap();
        let rows: Vec<ClientDBThreadInfo> = converted
            .thread_store_operations
            .into_iter()
            .map(|op| match op {
                ClientDBThreadStoreOperation::Replace { thread_info, .. } => thread_info,
                other => panic!("expected replace, got {other:?}"),
            })
            .collect();
        let hydrated = translate_client_db_store(ClientDBStore {
            threads: rows,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            hydrated.thread_store.thread_infos["256|84015"],
            sample_thread("256|84015")
        );
    }

    #[test]
    fn test_thread_migration_rewrites_the_whole_table() {
        let rows = vec![
            convert_thread_info_to_client_db_thread_info(&sample_thread("256|84015")).unwrap(),
            convert_thread_info_to_client_db_thread_info(&sample_thread("256|84020")).unwrap(),
        ];
        let operations =
            create_update_db_ops_for_thread_store_thread_infos(rows, |mut thread_infos| {
                thread_infos.remove("256|84020");
                for thread_info in thread_infos.values_mut() {
                    thread_info.color = "aa0000".to_string();
                }
                thread_infos
            })
            .unwrap();
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0], ClientDBThreadStoreOperation::RemoveAll);
        match &operations[1] {
            ClientDBThreadStoreOperation::Replace { thread_info, .. } => {
                assert_eq!(thread_info.id, "256|84015");
                assert_eq!(thread_info.color, "aa0000");
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }
}
