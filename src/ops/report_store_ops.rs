//! Report Store operations: persistence for queued inconsistency
//! telemetry, so divergence observed before a crash still gets uploaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::report::{ClientInconsistencyReport, ReportStore};

use super::StoreOpsHandler;

/// A mutation of the Report Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportStoreOperation {
    /// Queue or overwrite one report
    Replace {
        /// The report
        report: ClientInconsistencyReport,
    },
    /// Remove reports by id (after a successful upload)
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Empty the store
    RemoveAll,
}

/// Persisted row for one queued report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBReport {
    /// Report id
    pub id: String,
    /// JSON-encoded [`ClientInconsistencyReport`]
    pub report: String,
}

/// Persistable form of a Report Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBReportStoreOperation {
    /// Insert or overwrite one row
    Replace {
        /// The row
        report: ClientDBReport,
    },
    /// Delete rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every row
    RemoveAll,
}

/// Operation handler for the Report Store
pub struct ReportStoreOpsHandler;

impl StoreOpsHandler for ReportStoreOpsHandler {
    type Store = ReportStore;
    type Operation = ReportStoreOperation;
    type ClientDBOperation = ClientDBReportStoreOperation;
    type DBData = Vec<ClientDBReport>;

    fn process_store_operations(
        mut store: ReportStore,
        ops: &[ReportStoreOperation],
    ) -> ReportStore {
        for op in ops {
            match op {
                ReportStoreOperation::Replace { report } => {
                    store
                        .queued_reports
                        .insert(report.id.clone(), report.clone());
                }
                ReportStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.queued_reports.remove(id);
                    }
                }
                ReportStoreOperation::RemoveAll => {
                    store.queued_reports.clear();
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[ReportStoreOperation],
    ) -> Result<Vec<ClientDBReportStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                ReportStoreOperation::Replace { report } => {
                    Ok(ClientDBReportStoreOperation::Replace {
                        report: ClientDBReport {
                            id: report.id.clone(),
                            report: serde_json::to_string(report)?,
                        },
                    })
                }
                ReportStoreOperation::Remove { ids } => {
                    Ok(ClientDBReportStoreOperation::Remove { ids: ids.clone() })
                }
                ReportStoreOperation::RemoveAll => Ok(ClientDBReportStoreOperation::RemoveAll),
            })
            .collect()
    }

    fn translate_client_db_data(rows: Vec<ClientDBReport>) -> Result<ReportStore> {
        let mut queued_reports = HashMap::with_capacity(rows.len());
        for row in &rows {
            let report: ClientInconsistencyReport = serde_json::from_str(&row.report)
                .map_err(|_| {
                    Error::MalformedRecord(format!("report {} failed to parse", row.id))
                })?;
            queued_reports.insert(row.id.clone(), report);
        }
        Ok(ReportStore { queued_reports })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::report::InconsistencyReportType;

    #[test]
    fn test_report_row_round_trip() {
        let report = ClientInconsistencyReport {
            id: "report-1".to_string(),
            report_type: InconsistencyReportType::ThreadInconsistency,
            before_action: serde_json::json!({"threadInfos": {}}),
            action: "CHECK_STATE".to_string(),
            push_result: serde_json::json!({"threadInfos": {}}),
            time: 1_689_091_732_528,
        };
        let ops = ReportStoreOpsHandler::convert_ops_to_client_db_ops(&[
            ReportStoreOperation::Replace {
                report: report.clone(),
            },
        ])
        .unwrap();
        let rows = match ops.into_iter().next() {
            Some(ClientDBReportStoreOperation::Replace { report }) => vec![report],
            other => panic!("expected replace, got {other:?}"),
        };
        let store = ReportStoreOpsHandler::translate_client_db_data(rows).unwrap();
        assert_eq!(store.queued_reports["report-1"], report);
    }
}
