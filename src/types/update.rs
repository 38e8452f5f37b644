//! Server update records: the append-only event log a keyserver delivers
//! to describe state changes since the client's last watermark.
//!
//! Each update kind has a dedicated handler spec in [`crate::updates`];
//! this module only defines the data. New update kinds arriving from a
//! newer server are wrapped as [`ClientUpdateInfo::Unsupported`] with the
//! payload preserved, never discarded.

use serde::{Deserialize, Serialize};

use super::message::RawMessageInfo;
use super::thread::RawThreadInfo;
use super::user::UserInfo;

/// Discriminant for update kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// A thread's content changed
    UpdateThread,
    /// The viewer joined a thread
    JoinThread,
    /// A thread's read status flipped
    UpdateThreadReadStatus,
    /// A thread was deleted
    DeleteThread,
    /// A user account was deleted
    DeleteAccount,
    /// Another user's public record changed
    UpdateUser,
    /// The viewer's own record changed
    UpdateCurrentUser,
    /// The server invalidated a push token
    BadDeviceToken,
    /// Unknown future update kind
    Unsupported,
}

/// One update from the server's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientUpdateInfo {
    /// A thread's content changed; carries the complete new record
    UpdateThread {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The complete new thread record
        thread_info: RawThreadInfo,
    },
    /// The viewer joined a thread; carries the record plus seed messages
    JoinThread {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The complete thread record
        thread_info: RawThreadInfo,
        /// Recent messages for the joined thread
        raw_message_infos: Vec<RawMessageInfo>,
    },
    /// A thread's unread flag flipped
    UpdateThreadReadStatus {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The affected thread
        #[serde(rename = "threadID")]
        thread_id: String,
        /// New unread value
        unread: bool,
    },
    /// A thread was deleted
    DeleteThread {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The deleted thread
        #[serde(rename = "threadID")]
        thread_id: String,
    },
    /// A user account was deleted; their memberships must be scrubbed
    DeleteAccount {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The deleted user
        #[serde(rename = "deletedUserID")]
        deleted_user_id: String,
    },
    /// Another user's public record changed
    UpdateUser {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The new user record
        user_info: UserInfo,
    },
    /// The viewer's own record changed
    UpdateCurrentUser {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The new record for the viewer
        user_info: UserInfo,
    },
    /// The server invalidated a push token (handled outside the engine;
    /// carried so the event log stays gapless)
    BadDeviceToken {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The invalidated token
        device_token: String,
    },
    /// Unknown future update kind, payload preserved for a later version
    Unsupported {
        /// Update id
        id: String,
        /// Server time of the update, Unix ms
        time: i64,
        /// The sender's declared kind tag
        future_type: String,
        /// The original payload, untouched
        content: serde_json::Value,
    },
}

impl ClientUpdateInfo {
    /// The discriminant for this update
    pub fn update_type(&self) -> UpdateType {
        match self {
            Self::UpdateThread { .. } => UpdateType::UpdateThread,
            Self::JoinThread { .. } => UpdateType::JoinThread,
            Self::UpdateThreadReadStatus { .. } => UpdateType::UpdateThreadReadStatus,
            Self::DeleteThread { .. } => UpdateType::DeleteThread,
            Self::DeleteAccount { .. } => UpdateType::DeleteAccount,
            Self::UpdateUser { .. } => UpdateType::UpdateUser,
            Self::UpdateCurrentUser { .. } => UpdateType::UpdateCurrentUser,
            Self::BadDeviceToken { .. } => UpdateType::BadDeviceToken,
            Self::Unsupported { .. } => UpdateType::Unsupported,
        }
    }

    /// Update id
    pub fn id(&self) -> &str {
        match self {
            Self::UpdateThread { id, .. }
            | Self::JoinThread { id, .. }
            | Self::UpdateThreadReadStatus { id, .. }
            | Self::DeleteThread { id, .. }
            | Self::DeleteAccount { id, .. }
            | Self::UpdateUser { id, .. }
            | Self::UpdateCurrentUser { id, .. }
            | Self::BadDeviceToken { id, .. }
            | Self::Unsupported { id, .. } => id,
        }
    }

    /// Server time of the update, Unix ms
    pub fn time(&self) -> i64 {
        match self {
            Self::UpdateThread { time, .. }
            | Self::JoinThread { time, .. }
            | Self::UpdateThreadReadStatus { time, .. }
            | Self::DeleteThread { time, .. }
            | Self::DeleteAccount { time, .. }
            | Self::UpdateUser { time, .. }
            | Self::UpdateCurrentUser { time, .. }
            | Self::BadDeviceToken { time, .. }
            | Self::Unsupported { time, .. } => *time,
        }
    }
}
