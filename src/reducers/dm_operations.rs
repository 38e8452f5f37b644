//! The DM Operations Store reducer: parked protocol operations and
//! shimmed operations awaiting a client upgrade.

use crate::ops::{DMOperationStoreOperation, DMOperationStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::dm_ops::{QueueDMOpsCondition, QueuedDMOperation, QueuedDMOperations};

use super::ReducerResult;

type DMOperationsReducerResult = ReducerResult<QueuedDMOperations, DMOperationStoreOperation>;

/// Reduce the DM Operations Store over one action.
pub fn reduce_dm_operations_store(
    store: QueuedDMOperations,
    action: &Action,
) -> DMOperationsReducerResult {
    match action {
        Action::QueueDMOperation {
            condition,
            operation,
            timestamp,
        } => apply(
            store,
            vec![DMOperationStoreOperation::AddQueuedDMOperation {
                condition: condition.clone(),
                operation: operation.clone(),
                timestamp: *timestamp,
            }],
        ),
        Action::ClearDMOperationsQueue { condition } => {
            if queue_for(&store, condition).is_none() {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![DMOperationStoreOperation::ClearDMOperationsQueue {
                    condition: condition.clone(),
                }],
            )
        }
        Action::PruneDMOperationsQueue { prune_max_timestamp } => {
            if !has_operations_older_than(&store, *prune_max_timestamp) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![DMOperationStoreOperation::PruneQueuedDMOperations {
                    prune_max_timestamp: *prune_max_timestamp,
                }],
            )
        }
        Action::SaveShimmedDMOperation { operation } => {
            if store
                .shimmed_operations
                .iter()
                .any(|existing| existing == operation)
            {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![DMOperationStoreOperation::ReplaceDMOperation {
                    operation: operation.clone(),
                }],
            )
        }
        Action::RemoveShimmedDMOperations { ids } => {
            let present: Vec<String> = ids
                .iter()
                .filter(|id| {
                    store
                        .shimmed_operations
                        .iter()
                        .any(|existing| &existing.id == *id)
                })
                .cloned()
                .collect();
            if present.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![DMOperationStoreOperation::RemoveDMOperations { ids: present }],
            )
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store == QueuedDMOperations::default() {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![
                    DMOperationStoreOperation::RemoveAllDMOperations,
                    DMOperationStoreOperation::PruneQueuedDMOperations {
                        prune_max_timestamp: i64::MAX,
                    },
                ],
            )
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(
    store: QueuedDMOperations,
    operations: Vec<DMOperationStoreOperation>,
) -> DMOperationsReducerResult {
    let store = DMOperationStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

fn queue_for<'a>(
    store: &'a QueuedDMOperations,
    condition: &QueueDMOpsCondition,
) -> Option<&'a Vec<QueuedDMOperation>> {
    match condition {
        QueueDMOpsCondition::Thread { thread_id } => store.thread_queue.get(thread_id),
        QueueDMOpsCondition::Entry { entry_id } => store.entry_queue.get(entry_id),
        QueueDMOpsCondition::Message { message_id } => store.message_queue.get(message_id),
        QueueDMOpsCondition::Membership { thread_id, user_id } => store
            .membership_queue
            .get(thread_id)
            .and_then(|by_user| by_user.get(user_id)),
    }
}

fn has_operations_older_than(store: &QueuedDMOperations, cutoff: i64) -> bool {
    let flat_queues = [&store.thread_queue, &store.message_queue, &store.entry_queue];
    flat_queues
        .iter()
        .flat_map(|queue| queue.values())
        .chain(
            store
                .membership_queue
                .values()
                .flat_map(|by_user| by_user.values()),
        )
        .flatten()
        .any(|entry| entry.timestamp < cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dm_ops::DMOperationEntity;

    fn thread_condition(thread_id: &str) -> QueueDMOpsCondition {
        QueueDMOpsCondition::Thread {
            thread_id: thread_id.to_string(),
        }
    }

    #[test]
    fn test_queue_then_clear_on_satisfied_condition() {
        let queued = reduce_dm_operations_store(
            QueuedDMOperations::default(),
            &Action::QueueDMOperation {
                condition: thread_condition("t1"),
                operation: serde_json::json!({"op": "send_message"}),
                timestamp: 1_000,
            },
        );
        assert_eq!(queued.store.thread_queue["t1"].len(), 1);

        let cleared = reduce_dm_operations_store(
            queued.store,
            &Action::ClearDMOperationsQueue {
                condition: thread_condition("t1"),
            },
        );
        assert!(cleared.store.thread_queue.is_empty());
    }

    #[test]
    fn test_clear_of_empty_queue_is_a_no_op() {
        let result = reduce_dm_operations_store(
            QueuedDMOperations::default(),
            &Action::ClearDMOperationsQueue {
                condition: thread_condition("t1"),
            },
        );
        assert!(result.operations.is_empty());
    }

    #[test]
    fn test_prune_is_a_no_op_when_nothing_is_stale() {
        let queued = reduce_dm_operations_store(
            QueuedDMOperations::default(),
            &Action::QueueDMOperation {
                condition: thread_condition("t1"),
                operation: serde_json::json!({"op": "send_message"}),
                timestamp: 5_000,
            },
        );
        let result = reduce_dm_operations_store(
            queued.store,
            &Action::PruneDMOperationsQueue {
                prune_max_timestamp: 2_000,
            },
        );
        assert!(result.operations.is_empty());
    }

    #[test]
    fn test_shimmed_operation_lifecycle() {
        let entity = DMOperationEntity {
            id: "op-1".to_string(),
            op_type: "send_sticker".to_string(),
            operation: serde_json::json!({"sticker": "wave"}),
        };
        let saved = reduce_dm_operations_store(
            QueuedDMOperations::default(),
            &Action::SaveShimmedDMOperation {
                operation: entity.clone(),
            },
        );
        assert_eq!(saved.store.shimmed_operations.len(), 1);

        // Saving the identical operation again emits nothing.
        let again = reduce_dm_operations_store(
            saved.store,
            &Action::SaveShimmedDMOperation { operation: entity },
        );
        assert!(again.operations.is_empty());

        let removed = reduce_dm_operations_store(
            again.store,
            &Action::RemoveShimmedDMOperations {
                ids: vec!["op-1".to_string(), "missing".to_string()],
            },
        );
        assert!(removed.store.shimmed_operations.is_empty());
        assert_eq!(
            removed.operations,
            vec![DMOperationStoreOperation::RemoveDMOperations {
                ids: vec!["op-1".to_string()],
            }]
        );
    }

    #[test]
    fn test_logout_drops_everything() {
        let queued = reduce_dm_operations_store(
            QueuedDMOperations::default(),
            &Action::QueueDMOperation {
                condition: thread_condition("t1"),
                operation: serde_json::json!({"op": "send_message"}),
                timestamp: 1_000,
            },
        );
        let result = reduce_dm_operations_store(queued.store, &Action::LogOutSuccess);
        assert_eq!(result.store, QueuedDMOperations::default());
    }
}
