//! The Report Store reducer.
//!
//! Inconsistency reports are produced by other reducers during the same
//! dispatch; [`queue_reports`] folds them in after the per-store passes
//! so the queued operations land in the same transaction.

use crate::ops::{ReportStoreOperation, ReportStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::report::{ClientInconsistencyReport, ReportStore};

use super::ReducerResult;

type ReportReducerResult = ReducerResult<ReportStore, ReportStoreOperation>;

/// Reduce the Report Store over one action.
pub fn reduce_report_store(store: ReportStore, action: &Action) -> ReportReducerResult {
    match action {
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.queued_reports.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![ReportStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

/// Queue inconsistency reports collected from the other reducers.
pub fn queue_reports(
    store: ReportStore,
    reports: Vec<ClientInconsistencyReport>,
) -> ReportReducerResult {
    if reports.is_empty() {
        return ReducerResult::unchanged(store);
    }
    let operations = reports
        .into_iter()
        .map(|report| ReportStoreOperation::Replace { report })
        .collect();
    apply(store, operations)
}

fn apply(store: ReportStore, operations: Vec<ReportStoreOperation>) -> ReportReducerResult {
    let store = ReportStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::report::InconsistencyReportType;

    fn sample_report(id: &str) -> ClientInconsistencyReport {
        ClientInconsistencyReport {
            id: id.to_string(),
            report_type: InconsistencyReportType::ThreadInconsistency,
            before_action: serde_json::json!({}),
            action: "CHECK_STATE".to_string(),
            push_result: serde_json::json!({}),
            time: 1_000,
        }
    }

    #[test]
    fn test_queue_reports_then_logout_clears() {
        let queued = queue_reports(ReportStore::default(), vec![sample_report("r1")]);
        assert!(queued.store.queued_reports.contains_key("r1"));
        assert_eq!(queued.operations.len(), 1);

        let cleared = reduce_report_store(queued.store, &Action::LogOutSuccess);
        assert!(cleared.store.queued_reports.is_empty());
    }

    #[test]
    fn test_empty_report_batch_is_a_no_op() {
        let result = queue_reports(ReportStore::default(), vec![]);
        assert!(result.operations.is_empty());
    }
}
