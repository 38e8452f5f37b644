//! # Reducers
//!
//! One reducer per domain store: given the current snapshot and an
//! action, compute the next snapshot, the operations describing the
//! delta, and any detected inconsistencies.
//!
//! Contract:
//! - Unmatched actions return the original store unchanged with empty
//!   operations. The queue relies on empty operations to skip the batch
//!   without deep-equality checks.
//! - The returned store must equal the result of folding the returned
//!   operations over the input store. Reducers apply their own
//!   operations via the store's handler rather than mutating ad hoc, so
//!   the in-memory state and the queued delta can never disagree.
//! - Reducers never fail on malformed known payloads; they degrade to a
//!   no-op plus an inconsistency report. Structural precondition
//!   violations panic.

use crate::types::report::ClientInconsistencyReport;

pub mod aux_user;
pub mod community;
pub mod dm_operations;
pub mod entry;
pub mod keyserver;
pub mod message;
pub mod report;
pub mod synced_metadata;
pub mod thread;
pub mod thread_activity;
pub mod user;

/// Output of one reducer pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerResult<S, Op> {
    /// The next snapshot
    pub store: S,
    /// Declarative delta from the input snapshot to `store`
    pub operations: Vec<Op>,
    /// Observational divergence reports (thread reducer only)
    pub inconsistencies: Vec<ClientInconsistencyReport>,
}

impl<S, Op> ReducerResult<S, Op> {
    /// The no-op result: the store passes through untouched.
    pub fn unchanged(store: S) -> Self {
        Self {
            store,
            operations: Vec::new(),
            inconsistencies: Vec::new(),
        }
    }

    /// A result with operations and no inconsistencies.
    pub fn with_ops(store: S, operations: Vec<Op>) -> Self {
        Self {
            store,
            operations,
            inconsistencies: Vec::new(),
        }
    }
}
