//! Community records and the Community Store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client-side metadata for one community root thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityInfo {
    /// Linked Farcaster channel id, when the community is bridged
    #[serde(rename = "farcasterChannelID")]
    pub farcaster_channel_id: Option<String>,
}

/// The Community Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStore {
    /// Community metadata keyed by community root thread id
    pub community_infos: HashMap<String, CommunityInfo>,
}
