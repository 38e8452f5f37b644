//! # App State
//!
//! The root of the sync engine: every domain store, the DB ops queue,
//! and the single reduce entry point the host dispatches through.
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DISPATCH PIPELINE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Action ──▶ AppState::reduce                                           │
//! │                  │                                                      │
//! │                  ├──▶ per-store reducers (threads, messages, users,    │
//! │                  │    keyservers, entries, communities, aux users,     │
//! │                  │    synced metadata, thread activity, DM ops)        │
//! │                  │                                                      │
//! │                  ├──▶ integrity ops paired from the thread ops         │
//! │                  │                                                      │
//! │                  ├──▶ inconsistency reports folded into the            │
//! │                  │    Report Store                                      │
//! │                  │                                                      │
//! │                  └──▶ queue_db_ops: one batch per dispatch,            │
//! │                       appended to the FIFO queue                        │
//! │                                                                         │
//! │  OpsProcessingFinished ──▶ reduce_db_ops_store: release committed      │
//! │                            entries                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every reducer applies its own operations, so after a dispatch the
//! in-memory stores and the queued batch always describe the same delta.

use std::collections::HashSet;
use std::mem::take;

use crate::client_db::HydratedStores;
use crate::db_ops::{queue_db_ops, reduce_db_ops_store, DBOpsStore};
use crate::error::Result;
use crate::integrity::{integrity_ops_for_thread_ops, IntegrityStore};
use crate::ops::{IntegrityStoreOpsHandler, StoreOperations, StoreOpsHandler};
use crate::reducers;
use crate::types::action::{Action, ActionID, DispatchMetadata};
use crate::types::community::CommunityStore;
use crate::types::dm_ops::QueuedDMOperations;
use crate::types::entry::EntryStore;
use crate::types::keyserver::KeyserverStore;
use crate::types::message::MessageStore;
use crate::types::report::ReportStore;
use crate::types::synced_metadata::SyncedMetadataStore;
use crate::types::thread::ThreadStore;
use crate::types::thread_activity::ThreadActivityStore;
use crate::types::user::{AuxUserStore, UserStore};

/// Every domain store plus the persistence queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Thread records
    pub thread_store: ThreadStore,
    /// Messages, per-thread views, local bookkeeping
    pub message_store: MessageStore,
    /// Queued inconsistency reports
    pub report_store: ReportStore,
    /// Known users
    pub user_store: UserStore,
    /// Keyserver records and connection state
    pub keyserver_store: KeyserverStore,
    /// Community metadata
    pub community_store: CommunityStore,
    /// Per-thread content hashes, in lockstep with the Thread Store
    pub integrity_store: IntegrityStore,
    /// Small replicated named values
    pub synced_metadata_store: SyncedMetadataStore,
    /// Auxiliary user metadata
    pub aux_user_store: AuxUserStore,
    /// Navigation and prune timestamps
    pub thread_activity_store: ThreadActivityStore,
    /// Calendar entries
    pub entry_store: EntryStore,
    /// Parked and shimmed DM operations
    pub queued_dm_operations: QueuedDMOperations,
    /// The FIFO queue of unpersisted batches
    pub db_ops: DBOpsStore,
}

impl AppState {
    /// An empty state with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the app state from stores hydrated at cold start. The
    /// queue starts empty: anything that was committed is in the stores
    /// already, and anything that was not is gone with the process.
    pub fn from_hydrated(stores: HydratedStores) -> Self {
        Self {
            thread_store: stores.thread_store,
            message_store: stores.message_store,
            report_store: stores.report_store,
            user_store: stores.user_store,
            keyserver_store: stores.keyserver_store,
            community_store: stores.community_store,
            integrity_store: stores.integrity_store,
            synced_metadata_store: stores.synced_metadata_store,
            aux_user_store: stores.aux_user_store,
            thread_activity_store: stores.thread_activity_store,
            entry_store: stores.entry_store,
            queued_dm_operations: stores.queued_dm_operations,
            db_ops: DBOpsStore::default(),
        }
    }

    /// Run one action through every reducer and queue the resulting
    /// batch.
    pub fn reduce(
        &mut self,
        action: &Action,
        dispatch_metadata: Option<DispatchMetadata>,
    ) -> Result<()> {
        if let Action::OpsProcessingFinished { action_ids } = action {
            self.db_ops = reduce_db_ops_store(take(&mut self.db_ops), action_ids);
            return Ok(());
        }

        let thread_result =
            reducers::thread::reduce_thread_store(take(&mut self.thread_store), action);
        let message_result =
            reducers::message::reduce_message_store(take(&mut self.message_store), action);
        let user_result = reducers::user::reduce_user_store(take(&mut self.user_store), action);
        let keyserver_result =
            reducers::keyserver::reduce_keyserver_store(take(&mut self.keyserver_store), action);
        let community_result =
            reducers::community::reduce_community_store(take(&mut self.community_store), action);
        let synced_metadata_result = reducers::synced_metadata::reduce_synced_metadata_store(
            take(&mut self.synced_metadata_store),
            action,
        );
        let aux_user_result =
            reducers::aux_user::reduce_aux_user_store(take(&mut self.aux_user_store), action);
        let thread_activity_result = reducers::thread_activity::reduce_thread_activity_store(
            take(&mut self.thread_activity_store),
            action,
        );
        let entry_result = reducers::entry::reduce_entry_store(take(&mut self.entry_store), action);
        let dm_result = reducers::dm_operations::reduce_dm_operations_store(
            take(&mut self.queued_dm_operations),
            action,
        );

        // The Integrity Store never reduces on its own; it mirrors
        // whatever the thread reducer emitted this dispatch.
        let integrity_ops = integrity_ops_for_thread_ops(&thread_result.operations)?;
        self.integrity_store = IntegrityStoreOpsHandler::process_store_operations(
            take(&mut self.integrity_store),
            &integrity_ops,
        );

        let mut inconsistencies = thread_result.inconsistencies;
        inconsistencies.extend(message_result.inconsistencies);
        inconsistencies.extend(user_result.inconsistencies);

        let report_result =
            reducers::report::reduce_report_store(take(&mut self.report_store), action);
        let queued_reports = reducers::report::queue_reports(report_result.store, inconsistencies);
        let mut report_ops = report_result.operations;
        report_ops.extend(queued_reports.operations);

        self.thread_store = thread_result.store;
        self.message_store = message_result.store;
        self.user_store = user_result.store;
        self.keyserver_store = keyserver_result.store;
        self.community_store = community_result.store;
        self.synced_metadata_store = synced_metadata_result.store;
        self.aux_user_store = aux_user_result.store;
        self.thread_activity_store = thread_activity_result.store;
        self.entry_store = entry_result.store;
        self.queued_dm_operations = dm_result.store;
        self.report_store = queued_reports.store;

        let ops = StoreOperations {
            thread_store_operations: thread_result.operations,
            message_store_operations: message_result.operations,
            report_store_operations: report_ops,
            user_store_operations: user_result.operations,
            keyserver_store_operations: keyserver_result.operations,
            integrity_store_operations: integrity_ops,
            community_store_operations: community_result.operations,
            synced_metadata_store_operations: synced_metadata_result.operations,
            aux_user_store_operations: aux_user_result.operations,
            thread_activity_store_operations: thread_activity_result.operations,
            entry_store_operations: entry_result.operations,
            dm_operation_store_operations: dm_result.operations,
            ..Default::default()
        };
        self.db_ops = queue_db_ops(take(&mut self.db_ops), dispatch_metadata, ops, None);
        Ok(())
    }

    /// Tracked action ids still waiting in the queue. Dispatches recorded
    /// in `no_ops_actions` are deliberately absent: they have nothing to
    /// commit, so their waiters resolve on the next queue observation.
    pub fn queued_action_ids(&self) -> HashSet<ActionID> {
        self.db_ops
            .queued_ops
            .iter()
            .filter_map(|entry| entry.dispatch_metadata.as_ref())
            .map(|metadata| metadata.action_id.clone())
            .collect()
    }
}
