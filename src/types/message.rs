//! Message records and the Message Store.
//!
//! ## Store Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          MESSAGE STORE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  messages: map<message id, RawMessageInfo>                             │
//! │     The flat message table. Keys are server ids when confirmed,        │
//! │     local ids while a send is in flight.                               │
//! │                                                                         │
//! │  threads: map<thread id, ThreadMessageInfo>                            │
//! │     Per-thread ordered view. message_ids is maintained in              │
//! │     DESCENDING time order (newest first). Every id listed must        │
//! │     exist in `messages` or be eligible for lazy removal on prune.     │
//! │                                                                         │
//! │  local: map<message id, LocalMessageInfo>                              │
//! │     Client-only delivery bookkeeping (send failures).                  │
//! │                                                                         │
//! │  current_as_of: Unix ms watermark of the newest server state this     │
//! │     store reflects.                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message type codes, stable across the wire and the client DB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Plain text message
    Text,
    /// Thread creation record
    CreateThread,
    /// Members were added
    AddMembers,
    /// Thread settings changed
    ChangeSettings,
    /// Members were removed
    RemoveMembers,
    /// A member left
    LeaveThread,
    /// A member joined
    JoinThread,
    /// Unknown future message type, payload preserved opaquely
    Unsupported,
    /// Photo attachments
    Images,
    /// Mixed photo/video attachments
    Multimedia,
    /// Reaction to another message
    Reaction,
    /// Edit of an earlier text message
    EditMessage,
    /// Deletion of an earlier message
    DeleteMessage,
}

impl MessageType {
    /// Get the numeric type code (persisted as a string in the client DB)
    pub fn code(&self) -> i32 {
        match self {
            Self::Text => 0,
            Self::CreateThread => 1,
            Self::AddMembers => 2,
            Self::ChangeSettings => 4,
            Self::RemoveMembers => 5,
            Self::LeaveThread => 7,
            Self::JoinThread => 8,
            Self::Unsupported => 13,
            Self::Images => 14,
            Self::Multimedia => 15,
            Self::Reaction => 19,
            Self::EditMessage => 20,
            Self::DeleteMessage => 21,
        }
    }

    /// Parse from a numeric code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::CreateThread),
            2 => Some(Self::AddMembers),
            4 => Some(Self::ChangeSettings),
            5 => Some(Self::RemoveMembers),
            7 => Some(Self::LeaveThread),
            8 => Some(Self::JoinThread),
            13 => Some(Self::Unsupported),
            14 => Some(Self::Images),
            15 => Some(Self::Multimedia),
            19 => Some(Self::Reaction),
            20 => Some(Self::EditMessage),
            21 => Some(Self::DeleteMessage),
            _ => None,
        }
    }
}

/// Pixel dimensions of a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Height in pixels
    pub height: u32,
    /// Width in pixels
    pub width: u32,
}

/// A media attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    /// A photo
    Photo {
        /// Upload id
        id: String,
        /// Content URI
        uri: String,
        /// Pixel dimensions
        dimensions: Dimensions,
        /// Compact perceptual placeholder hash
        #[serde(skip_serializing_if = "Option::is_none")]
        thumb_hash: Option<String>,
    },
    /// A video with a photo thumbnail
    Video {
        /// Upload id
        id: String,
        /// Content URI
        uri: String,
        /// Pixel dimensions
        dimensions: Dimensions,
        /// Whether the video loops
        #[serde(rename = "loop")]
        loops: bool,
        /// Upload id of the thumbnail
        #[serde(rename = "thumbnailID")]
        thumbnail_id: String,
        /// URI of the thumbnail
        #[serde(rename = "thumbnailURI")]
        thumbnail_uri: String,
    },
}

impl Media {
    /// Upload id of the primary content
    pub fn id(&self) -> &str {
        match self {
            Self::Photo { id, .. } | Self::Video { id, .. } => id,
        }
    }
}

/// Typed message content, one variant per message type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text {
        /// The message text
        text: String,
    },
    /// Thread creation record
    CreateThread {
        /// Snapshot of the initial thread state
        initial_thread_state: serde_json::Value,
    },
    /// Members added
    AddMembers {
        /// Ids of the added users
        #[serde(rename = "addedUserIDs")]
        added_user_ids: Vec<String>,
    },
    /// Settings changed
    ChangeSettings {
        /// Name of the changed field
        field: String,
        /// New value, as JSON
        value: serde_json::Value,
    },
    /// Members removed
    RemoveMembers {
        /// Ids of the removed users
        #[serde(rename = "removedUserIDs")]
        removed_user_ids: Vec<String>,
    },
    /// A member left
    LeaveThread,
    /// A member joined
    JoinThread,
    /// Photo attachments
    Images {
        /// The attached photos
        media: Vec<Media>,
    },
    /// Mixed attachments
    Multimedia {
        /// The attached media
        media: Vec<Media>,
    },
    /// Reaction to another message
    Reaction {
        /// Id of the message reacted to
        #[serde(rename = "targetMessageID")]
        target_message_id: String,
        /// The reaction content (emoji)
        reaction: String,
        /// "add_reaction" or "remove_reaction"
        action: String,
    },
    /// Edit of an earlier text message
    EditMessage {
        /// Id of the edited message
        #[serde(rename = "targetMessageID")]
        target_message_id: String,
        /// Replacement text
        text: String,
    },
    /// Deletion of an earlier message
    DeleteMessage {
        /// Id of the deleted message
        #[serde(rename = "targetMessageID")]
        target_message_id: String,
    },
    /// A message type this client version does not understand. The opaque
    /// payload is preserved verbatim so a future client can reinterpret
    /// it instead of losing data.
    Unsupported {
        /// The sender's declared type code
        future_type: i32,
        /// The original payload, untouched
        content: serde_json::Value,
    },
}

impl MessageContent {
    /// The message type for this content
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text { .. } => MessageType::Text,
            Self::CreateThread { .. } => MessageType::CreateThread,
            Self::AddMembers { .. } => MessageType::AddMembers,
            Self::ChangeSettings { .. } => MessageType::ChangeSettings,
            Self::RemoveMembers { .. } => MessageType::RemoveMembers,
            Self::LeaveThread => MessageType::LeaveThread,
            Self::JoinThread => MessageType::JoinThread,
            Self::Images { .. } => MessageType::Images,
            Self::Multimedia { .. } => MessageType::Multimedia,
            Self::Reaction { .. } => MessageType::Reaction,
            Self::EditMessage { .. } => MessageType::EditMessage,
            Self::DeleteMessage { .. } => MessageType::DeleteMessage,
            Self::Unsupported { .. } => MessageType::Unsupported,
        }
    }
}

/// The complete client-side record for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageInfo {
    /// Server-confirmed id (None while a local send is in flight)
    pub id: Option<String>,
    /// Client-local id assigned at compose time
    #[serde(rename = "localID")]
    pub local_id: Option<String>,
    /// Thread the message belongs to
    #[serde(rename = "threadID")]
    pub thread_id: String,
    /// User id of the sender
    #[serde(rename = "creatorID")]
    pub creator_id: String,
    /// Send time, Unix ms
    pub time: i64,
    /// Typed content
    #[serde(flatten)]
    pub content: MessageContent,
}

impl RawMessageInfo {
    /// The store key for this message: the server id once confirmed,
    /// otherwise the local id.
    ///
    /// # Panics
    ///
    /// Panics if the message has neither id — that is a structurally
    /// impossible record and indicates a programmer error upstream.
    pub fn message_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.local_id.as_deref())
            .expect("message must have a server id or a local id")
    }
}

/// Per-thread ordered message view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessageInfo {
    /// Message ids in descending time order (newest first)
    #[serde(rename = "messageIDs")]
    pub message_ids: Vec<String>,
    /// Whether the full history start has been fetched
    pub start_reached: bool,
    /// Last time the user navigated to this thread, Unix ms
    pub last_navigated_to: i64,
    /// Last time this thread's history was pruned, Unix ms
    pub last_pruned: i64,
}

/// Client-only delivery bookkeeping for one message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMessageInfo {
    /// Whether the most recent send attempt failed
    pub send_failed: bool,
}

/// Truncation status the server reports alongside a message fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTruncationStatus {
    /// The fetch reached the start of the thread's history
    Exhaustive,
    /// Older history exists beyond the fetched window
    Truncated,
    /// The fetch did not change what we know about history bounds
    Unchanged,
}

/// The Message Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStore {
    /// Flat message table keyed by message id
    pub messages: HashMap<String, RawMessageInfo>,
    /// Per-thread ordered views keyed by thread id
    pub threads: HashMap<String, ThreadMessageInfo>,
    /// Client-only bookkeeping keyed by message id
    pub local: HashMap<String, LocalMessageInfo>,
    /// Watermark of the newest server state reflected, Unix ms
    pub current_as_of: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(id: &str, thread: &str, time: i64) -> RawMessageInfo {
        RawMessageInfo {
            id: Some(id.to_string()),
            local_id: None,
            thread_id: thread.to_string(),
            creator_id: "256".to_string(),
            time,
            content: MessageContent::Text {
                text: "hi".to_string(),
            },
        }
    }

    #[test]
    fn test_message_id_prefers_server_id() {
        let mut msg = text_message("103502", "256|84015", 1_000);
        msg.local_id = Some("local1".to_string());
        assert_eq!(msg.message_id(), "103502");
    }

    #[test]
    fn test_message_id_falls_back_to_local_id() {
        let mut msg = text_message("103502", "256|84015", 1_000);
        msg.id = None;
        msg.local_id = Some("local1".to_string());
        assert_eq!(msg.message_id(), "local1");
    }

    #[test]
    fn test_message_type_codes_round_trip() {
        for ty in [
            MessageType::Text,
            MessageType::Unsupported,
            MessageType::Images,
            MessageType::Multimedia,
            MessageType::EditMessage,
            MessageType::DeleteMessage,
        ] {
            assert_eq!(MessageType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(MessageType::from_code(999), None);
    }
}
