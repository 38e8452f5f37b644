//! Calendar entry records and the Entry Store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The client-side record for one calendar entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntryInfo {
    /// Server-confirmed id (None while a create is in flight)
    pub id: Option<String>,
    /// Client-local id assigned at compose time
    #[serde(rename = "localID")]
    pub local_id: Option<String>,
    /// Thread the entry belongs to
    #[serde(rename = "threadID")]
    pub thread_id: String,
    /// Entry text
    pub text: String,
    /// Calendar year
    pub year: i32,
    /// Calendar month (1-12)
    pub month: i32,
    /// Calendar day (1-31)
    pub day: i32,
    /// Creation time, Unix ms
    pub creation_time: i64,
    /// User id of the creator
    #[serde(rename = "creatorID")]
    pub creator_id: String,
    /// Soft-deletion flag; deleted entries stay resident for undo
    pub deleted: bool,
}

impl RawEntryInfo {
    /// The store key for this entry: server id once confirmed, local id
    /// otherwise.
    ///
    /// # Panics
    ///
    /// Panics when neither id is set (programmer error).
    pub fn entry_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.local_id.as_deref())
            .expect("entry must have a server id or a local id")
    }
}

/// The Entry Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStore {
    /// All known entries, keyed by entry id
    pub entry_infos: HashMap<String, RawEntryInfo>,
}
