//! Keyserver records and the Keyserver Store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Connection status to a keyserver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyserverConnectionStatus {
    /// Socket open and authenticated
    Connected,
    /// Handshake in progress
    Connecting,
    /// Reconnect scheduled after a drop
    Reconnecting,
    /// No socket
    #[default]
    Disconnected,
    /// Server rejected our session
    Forbidden,
}

/// The client-side record for one keyserver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyserverInfo {
    /// Base URL of the keyserver
    #[serde(rename = "urlPrefix")]
    pub url_prefix: String,
    /// Current connection status
    pub connection: KeyserverConnectionStatus,
    /// Watermark of the newest update applied from this keyserver, Unix ms
    pub updates_current_as_of: i64,
    /// Last successful round-trip, Unix ms (None before first contact)
    pub last_communicated: Option<i64>,
}

/// The Keyserver Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyserverStore {
    /// All known keyservers, keyed by keyserver id
    pub keyserver_infos: HashMap<String, KeyserverInfo>,
}
