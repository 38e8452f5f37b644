//! Thread records and the Thread Store.
//!
//! Thread identifiers are globally meaningful. Keyserver-backed threads
//! encode their origin authority as a prefix (`"<keyserverID>|<local>"`);
//! fully peer-to-peer threads carry a bare id with no separator; threads
//! the server has not yet assigned a final identity use a `"pending/"`
//! prefix. The helpers below are the only place this lexical scheme is
//! interpreted — if the identifier scheme ever changes, only this module
//! needs to learn the new shape.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Separator between the origin-authority prefix and the local id part.
pub const KEYSERVER_ID_SEPARATOR: char = '|';

/// Prefix for threads not yet confirmed by the server.
pub const PENDING_THREAD_PREFIX: &str = "pending/";

/// Whether a thread id belongs to a keyserver-backed thread.
pub fn thread_id_is_keyserver_backed(id: &str) -> bool {
    id.contains(KEYSERVER_ID_SEPARATOR)
}

/// Whether a thread id is a client-local pending id.
pub fn thread_id_is_pending(id: &str) -> bool {
    id.starts_with(PENDING_THREAD_PREFIX)
}

/// A single permission entry: granted or not, and the thread id that was
/// the source of the grant (None when not granted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPermission {
    /// Whether the permission is granted
    pub value: bool,
    /// Thread id the permission was inherited from
    pub source: Option<String>,
}

/// Full permission map for one member, keyed by permission name.
pub type ThreadPermissions = BTreeMap<String, ThreadPermission>;

/// A member of a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    /// User id of the member
    pub id: String,
    /// Role id within this thread (None when the member has left)
    pub role: Option<String>,
    /// Resolved permissions for this member
    pub permissions: ThreadPermissions,
    /// Whether this member has sent a message in the thread
    pub is_sender: bool,
}

/// A role definition within a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    /// Role id
    pub id: String,
    /// Human-readable role name
    pub name: String,
    /// Permissions granted by this role, keyed by permission name
    pub permissions: BTreeMap<String, bool>,
    /// Whether new members get this role by default
    pub is_default: bool,
}

/// Notification subscription for the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSubscription {
    /// Thread appears in the home tab
    pub home: bool,
    /// Push notifications enabled
    pub push_notifs: bool,
}

/// The viewer's own relationship to a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCurrentUserInfo {
    /// Viewer's role id (None when not a member)
    pub role: Option<String>,
    /// Viewer's resolved permissions
    pub permissions: ThreadPermissions,
    /// Viewer's notification subscription
    pub subscription: ThreadSubscription,
    /// Whether the thread has unread activity
    pub unread: bool,
}

/// Thread avatar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadAvatar {
    /// Emoji on a colored background
    Emoji {
        /// Background color (hex, no leading '#')
        color: String,
        /// The emoji character
        emoji: String,
    },
    /// Uploaded image
    Image {
        /// Upload id of the image
        #[serde(rename = "uploadID")]
        upload_id: String,
        /// URI of the image
        uri: String,
    },
}

/// The complete client-side record for one thread
///
/// This is the canonical representation: integrity hashes are computed
/// over this record's serialized form (see [`crate::integrity`]), and
/// `replace` operations always carry a complete record — there are no
/// partial merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawThreadInfo {
    /// Globally meaningful thread id
    pub id: String,
    /// Thread type code (chat, sidebar, community root, ...)
    #[serde(rename = "type")]
    pub thread_type: i32,
    /// Thread name (None for unnamed personal threads)
    pub name: Option<String>,
    /// Thread description
    pub description: Option<String>,
    /// Display color (hex, no leading '#')
    pub color: String,
    /// Creation time, Unix ms
    pub creation_time: i64,
    /// Parent thread id
    #[serde(rename = "parentThreadID")]
    pub parent_thread_id: Option<String>,
    /// Nearest containing thread id
    #[serde(rename = "containingThreadID")]
    pub containing_thread_id: Option<String>,
    /// Community root id
    pub community: Option<String>,
    /// Thread members
    pub members: Vec<MemberInfo>,
    /// Role definitions keyed by role id
    pub roles: BTreeMap<String, RoleInfo>,
    /// The viewer's own state
    pub current_user: ThreadCurrentUserInfo,
    /// Number of replies (sidebar threads)
    pub replies_count: i64,
    /// Number of pinned messages
    pub pinned_count: i64,
    /// Thread avatar
    pub avatar: Option<ThreadAvatar>,
}

impl RawThreadInfo {
    /// Whether this thread should be included in device backups.
    ///
    /// Keyserver-backed threads are re-derivable from the keyserver and
    /// are not backed up; fully peer-to-peer threads exist only on
    /// clients. Recorded on every `replace` operation at creation time so
    /// the persistence layer never re-derives it.
    pub fn is_backed_up(&self) -> bool {
        !thread_id_is_keyserver_backed(&self.id) && !thread_id_is_pending(&self.id)
    }
}

/// The Thread Store: current truth for every known thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStore {
    /// All known threads, keyed by thread id
    pub thread_infos: HashMap<String, RawThreadInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyserver_backed_detection() {
        assert!(thread_id_is_keyserver_backed("256|84015"));
        assert!(!thread_id_is_keyserver_backed(
            "8edbc655-c6ed-4afa-b249-b5fc05b72a5c"
        ));
    }

    #[test]
    fn test_pending_detection() {
        assert!(thread_id_is_pending("pending/sidebar/83809"));
        assert!(!thread_id_is_pending("256|84015"));
    }
}
