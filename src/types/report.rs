//! Inconsistency reports: telemetry records produced when local state
//! disagreed with server-declared state during reconciliation. Divergence
//! is not an error — it is recorded here and resolved by overwriting local
//! state with the server's ("server wins"). Reports are queued in the
//! Report Store until uploaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of store diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyReportType {
    /// Thread Store divergence
    ThreadInconsistency,
    /// Entry Store divergence
    EntryInconsistency,
    /// User Store divergence
    UserInconsistency,
}

/// One queued inconsistency report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInconsistencyReport {
    /// Report id (client-generated)
    pub id: String,
    /// Which store diverged
    pub report_type: InconsistencyReportType,
    /// Local state before the reconciling action, serialized
    pub before_action: serde_json::Value,
    /// Short description of the action that exposed the divergence
    pub action: String,
    /// Local state after applying the server's declaration, serialized
    pub push_result: serde_json::Value,
    /// When the divergence was observed, Unix ms
    pub time: i64,
}

/// The Report Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStore {
    /// Queued reports keyed by report id
    pub queued_reports: HashMap<String, ClientInconsistencyReport>,
}
