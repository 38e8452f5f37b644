//! The action vocabulary: every event the reducers can consume.
//!
//! Actions are produced by the host (UI dispatch, the socket layer,
//! background jobs) and fed through [`crate::state::AppState::reduce`].
//! Reducers match exhaustively over this enum; an action a given reducer
//! does not care about must leave that reducer's store referentially
//! unchanged — that guarantee is what lets the DB ops queue skip deep
//! equality checks for no-op elimination.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::dm_ops::{DMOperation, DMOperationEntity, QueueDMOpsCondition};
use super::entry::RawEntryInfo;
use super::keyserver::{KeyserverConnectionStatus, KeyserverInfo};
use super::message::{MessageTruncationStatus, RawMessageInfo};
use super::thread::{RawThreadInfo, ThreadSubscription};
use super::update::ClientUpdateInfo;
use super::user::{AuxUserInfo, UserInfo};

/// Opaque action correlation id, used solely for completion signaling —
/// never for ordering or business logic.
pub type ActionID = String;

/// Generate a fresh action id for dispatch-completion tracking.
pub fn new_action_id() -> ActionID {
    uuid::Uuid::new_v4().to_string()
}

/// Dispatch metadata correlating a queued batch to its originating caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMetadata {
    /// The correlation id the caller awaits on
    #[serde(rename = "actionID")]
    pub action_id: ActionID,
}

/// Payload of a full state sync: the server's complete declared state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullStateSyncPayload {
    /// Complete thread set, keyed by thread id
    pub thread_infos: HashMap<String, RawThreadInfo>,
    /// Recent messages across all threads
    pub raw_message_infos: Vec<RawMessageInfo>,
    /// Per-thread truncation statuses for the message fetch
    pub truncation_statuses: HashMap<String, MessageTruncationStatus>,
    /// Complete known-user set
    pub user_infos: Vec<UserInfo>,
    /// Watermark for the synced state, Unix ms
    pub current_as_of: i64,
}

/// Payload of an incremental state sync: deltas since the last watermark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalStateSyncPayload {
    /// New updates from the server's event log
    pub new_updates: Vec<ClientUpdateInfo>,
    /// New messages delivered alongside the updates
    pub raw_message_infos: Vec<RawMessageInfo>,
    /// Per-thread truncation statuses for the delivered messages
    pub truncation_statuses: HashMap<String, MessageTruncationStatus>,
    /// User records referenced by the deltas
    pub user_infos: Vec<UserInfo>,
    /// New watermark, Unix ms
    pub current_as_of: i64,
}

/// Server-declared corrections delivered with a CHECK_STATE request.
/// The server is authoritative: declared threads overwrite local state
/// unconditionally, and remaining divergence is reported as telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStateChanges {
    /// Threads the server declares, to be replaced wholesale
    pub raw_thread_infos: Option<Vec<RawThreadInfo>>,
    /// Threads the server declares deleted
    #[serde(rename = "deleteThreadIDs")]
    pub delete_thread_ids: Option<Vec<String>>,
}

/// Every event the reducers consume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Successful login: full state replacement
    LogInSuccess(FullStateSyncPayload),
    /// Socket-driven full state sync: full state replacement
    FullStateSync(FullStateSyncPayload),
    /// Socket-driven incremental sync
    IncrementalStateSync(IncrementalStateSyncPayload),
    /// Updates delivered outside a state sync (push, fetch responses)
    ProcessUpdates {
        /// The new updates
        new_updates: Vec<ClientUpdateInfo>,
    },
    /// Server requests piggybacked on a response; only CHECK_STATE's
    /// state changes concern the sync engine
    ProcessServerRequests {
        /// CHECK_STATE corrections, when present
        state_changes: Option<CheckStateChanges>,
    },
    /// Logout succeeded: clear synced stores
    LogOutSuccess,
    /// Account deletion succeeded: clear synced stores
    DeleteAccountSuccess,
    /// The server invalidated our session cookie: clear synced stores
    SessionInvalidated,

    /// An optimistic local message was composed (text send started)
    SendMessageStarted {
        /// The local message; must carry a local id and no server id
        message_info: RawMessageInfo,
    },
    /// The server confirmed a message send
    SendMessageSuccess {
        /// The local id being promoted
        #[serde(rename = "localID")]
        local_id: String,
        /// The server-assigned id
        #[serde(rename = "serverID")]
        server_id: String,
        /// Thread the message belongs to
        #[serde(rename = "threadID")]
        thread_id: String,
        /// Server-recorded send time, Unix ms
        time: i64,
    },
    /// A message send failed
    SendMessageFailed {
        /// Local id of the failed message
        #[serde(rename = "localID")]
        local_id: String,
        /// Thread the message belongs to
        #[serde(rename = "threadID")]
        thread_id: String,
    },
    /// New messages arrived (fetch response or push delivery)
    NewMessages {
        /// The delivered messages
        raw_message_infos: Vec<RawMessageInfo>,
        /// Per-thread truncation statuses
        truncation_statuses: HashMap<String, MessageTruncationStatus>,
    },
    /// Evict old message history for the given threads
    MessageStorePrune {
        /// Threads to prune
        #[serde(rename = "threadIDs")]
        thread_ids: Vec<String>,
    },
    /// The user navigated to a thread
    UpdateThreadLastNavigated {
        /// The navigated-to thread
        #[serde(rename = "threadID")]
        thread_id: String,
        /// Navigation time, Unix ms
        time: i64,
    },

    /// The viewer toggled a thread's unread status
    SetThreadUnreadStatus {
        /// The affected thread
        #[serde(rename = "threadID")]
        thread_id: String,
        /// New unread value
        unread: bool,
    },
    /// The viewer changed a thread subscription
    UpdateSubscription {
        /// The affected thread
        #[serde(rename = "threadID")]
        thread_id: String,
        /// The new subscription
        subscription: ThreadSubscription,
    },

    /// A calendar entry was created or updated
    CreateOrUpdateEntry {
        /// The complete entry record
        entry_info: RawEntryInfo,
    },
    /// A calendar entry was deleted
    DeleteEntry {
        /// Id of the deleted entry
        #[serde(rename = "entryID")]
        entry_id: String,
    },

    /// New or changed user records arrived
    UpdateUserInfos {
        /// The user records
        user_infos: Vec<UserInfo>,
    },
    /// Aux user metadata arrived (identity search, device list sync)
    AddAuxUserInfos {
        /// Aux records keyed by user id
        aux_user_infos: HashMap<String, AuxUserInfo>,
    },

    /// A keyserver was added
    AddKeyserver {
        /// Keyserver id
        #[serde(rename = "keyserverID")]
        keyserver_id: String,
        /// The keyserver record
        keyserver_info: KeyserverInfo,
    },
    /// A keyserver was removed
    RemoveKeyserver {
        /// Keyserver id
        #[serde(rename = "keyserverID")]
        keyserver_id: String,
    },
    /// A keyserver socket changed state
    UpdateKeyserverConnectionStatus {
        /// Keyserver id
        #[serde(rename = "keyserverID")]
        keyserver_id: String,
        /// The new status
        status: KeyserverConnectionStatus,
    },

    /// A community was linked to a Farcaster channel
    AddCommunity {
        /// Community root thread id
        #[serde(rename = "communityID")]
        community_id: String,
        /// The linked Farcaster channel id
        #[serde(rename = "farcasterChannelID")]
        farcaster_channel_id: Option<String>,
    },

    /// A synced metadata value was set
    SetSyncedMetadata {
        /// Metadata name
        name: String,
        /// Metadata value
        value: String,
    },
    /// A synced metadata value was cleared
    ClearSyncedMetadata {
        /// Metadata name
        name: String,
    },

    /// A DM operation arrived before its prerequisite; park it
    QueueDMOperation {
        /// What the operation is waiting for
        condition: QueueDMOpsCondition,
        /// The opaque operation
        operation: DMOperation,
        /// Arrival time, Unix ms
        timestamp: i64,
    },
    /// A prerequisite now exists; drop the parked queue for it
    ClearDMOperationsQueue {
        /// The satisfied condition
        condition: QueueDMOpsCondition,
    },
    /// Evict parked DM operations older than the cutoff
    PruneDMOperationsQueue {
        /// Operations with `timestamp < prune_max_timestamp` are dropped
        prune_max_timestamp: i64,
    },
    /// Persist an operation shimmed for a future client version
    SaveShimmedDMOperation {
        /// The shimmed operation
        operation: DMOperationEntity,
    },
    /// Shimmed operations were processed after an upgrade
    RemoveShimmedDMOperations {
        /// Ids of the processed operations
        ids: Vec<String>,
    },

    /// The persistence consumer finished committing batches for the
    /// given action ids; their queue entries are released and any
    /// awaiting callers resolve
    OpsProcessingFinished {
        /// Completed action ids
        #[serde(rename = "actionIDs")]
        action_ids: Vec<ActionID>,
    },
}
