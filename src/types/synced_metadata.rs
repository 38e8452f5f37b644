//! The Synced Metadata Store: small named values replicated across the
//! user's own devices (current user id, device list revision, ...).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The Synced Metadata Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedMetadataStore {
    /// Metadata values keyed by name
    pub synced_metadata: HashMap<String, String>,
}
