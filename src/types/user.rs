//! User records: the User Store and the Aux User Store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::thread::ThreadAvatar;

/// Relationship between the viewer and another user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// Mutual friends
    Friend,
    /// The viewer blocked this user
    BlockedByViewer,
    /// This user blocked the viewer
    BlockedViewer,
    /// Both directions blocked
    BothBlocked,
    /// Friend request sent by the viewer
    RequestSent,
    /// Friend request received by the viewer
    RequestReceived,
}

/// The client-side record for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User id
    pub id: String,
    /// Username (None when not yet resolved)
    pub username: Option<String>,
    /// Relationship to the viewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_status: Option<RelationshipStatus>,
    /// User avatar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<ThreadAvatar>,
}

/// The User Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStore {
    /// All known users, keyed by user id
    pub user_infos: HashMap<String, UserInfo>,
}

/// Auxiliary, locally-enriched user metadata (federation identity,
/// device lists) kept separate from the server-synced User Store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxUserInfo {
    /// Farcaster id, when linked
    pub fid: Option<String>,
    /// Known device ids for this user
    pub device_list: Option<Vec<String>>,
}

/// The Aux User Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxUserStore {
    /// Aux metadata keyed by user id
    pub aux_user_infos: HashMap<String, AuxUserInfo>,
}
