//! DM Operations Store operations: shimmed operations awaiting a client
//! upgrade, and condition-keyed queues of operations that arrived before
//! their prerequisite record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::dm_ops::{
    DMOperation, DMOperationEntity, QueueDMOpsCondition, QueuedDMOperation, QueuedDMOperations,
};

use super::StoreOpsHandler;

/// A mutation of the DM Operations Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DMOperationStoreOperation {
    /// Persist or overwrite one shimmed operation
    ReplaceDMOperation {
        /// The shimmed operation
        operation: DMOperationEntity,
    },
    /// Remove shimmed operations by id (processed after an upgrade)
    RemoveDMOperations {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Remove every shimmed operation
    RemoveAllDMOperations,
    /// Park an operation under the condition it is waiting for
    AddQueuedDMOperation {
        /// What the operation is waiting for
        condition: QueueDMOpsCondition,
        /// The opaque operation
        operation: DMOperation,
        /// Arrival time, Unix ms
        timestamp: i64,
    },
    /// Drop the parked queue for a now-satisfied condition
    ClearDMOperationsQueue {
        /// The satisfied condition
        condition: QueueDMOpsCondition,
    },
    /// Drop parked operations older than the cutoff, across every queue
    PruneQueuedDMOperations {
        /// Operations with `timestamp < prune_max_timestamp` are dropped
        prune_max_timestamp: i64,
    },
}

// ============================================================================
// Persisted Row Shapes
// ============================================================================

/// Persisted row for one shimmed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBDMOperation {
    /// Operation id
    pub id: String,
    /// Declared operation type tag
    #[serde(rename = "type")]
    pub op_type: String,
    /// JSON-encoded opaque payload
    pub operation: String,
}

/// Persisted row for one parked operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBQueuedDMOperation {
    /// Queue type tag ("thread", "entry", "message", "membership")
    pub queue_type: String,
    /// Key within the queue type; membership keys are `<thread>#<user>`
    pub queue_key: String,
    /// JSON-encoded opaque payload
    pub operation: String,
    /// Arrival time, Unix ms
    pub timestamp: i64,
}

/// Persistable form of a DM Operations Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBDMOperationStoreOperation {
    /// Insert or overwrite one shimmed-operation row
    ReplaceDMOperation {
        /// The row
        operation: ClientDBDMOperation,
    },
    /// Delete shimmed-operation rows by id
    RemoveDMOperations {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete every shimmed-operation row
    RemoveAllDMOperations,
    /// Insert one parked-operation row
    AddQueuedDMOperation {
        /// The row
        operation: ClientDBQueuedDMOperation,
    },
    /// Delete every parked-operation row for a queue key
    ClearDMOperationsQueue {
        /// Queue type tag
        queue_type: String,
        /// Key within the queue type
        queue_key: String,
    },
    /// Delete parked-operation rows older than the cutoff
    PruneQueuedDMOperations {
        /// The cutoff, Unix ms
        prune_max_timestamp: i64,
    },
}

// ============================================================================
// Handler
// ============================================================================

/// Persisted rows consumed when hydrating the DM Operations Store
#[derive(Debug, Clone, Default)]
pub struct DMOperationsData {
    /// Shimmed-operation rows
    pub operations: Vec<ClientDBDMOperation>,
    /// Parked-operation rows
    pub queued: Vec<ClientDBQueuedDMOperation>,
}

fn push_queued(
    store: &mut QueuedDMOperations,
    condition: &QueueDMOpsCondition,
    entry: QueuedDMOperation,
) {
    match condition {
        QueueDMOpsCondition::Thread { thread_id } => {
            store
                .thread_queue
                .entry(thread_id.clone())
                .or_default()
                .push(entry);
        }
        QueueDMOpsCondition::Entry { entry_id } => {
            store
                .entry_queue
                .entry(entry_id.clone())
                .or_default()
                .push(entry);
        }
        QueueDMOpsCondition::Message { message_id } => {
            store
                .message_queue
                .entry(message_id.clone())
                .or_default()
                .push(entry);
        }
        QueueDMOpsCondition::Membership { thread_id, user_id } => {
            store
                .membership_queue
                .entry(thread_id.clone())
                .or_default()
                .entry(user_id.clone())
                .or_default()
                .push(entry);
        }
    }
}

fn prune_queue(queue: &mut HashMap<String, Vec<QueuedDMOperation>>, cutoff: i64) {
    for entries in queue.values_mut() {
        entries.retain(|entry| entry.timestamp >= cutoff);
    }
    queue.retain(|_, entries| !entries.is_empty());
}

/// Operation handler for the DM Operations Store
pub struct DMOperationStoreOpsHandler;

impl StoreOpsHandler for DMOperationStoreOpsHandler {
    type Store = QueuedDMOperations;
    type Operation = DMOperationStoreOperation;
    type ClientDBOperation = ClientDBDMOperationStoreOperation;
    type DBData = DMOperationsData;

    fn process_store_operations(
        mut store: QueuedDMOperations,
        ops: &[DMOperationStoreOperation],
    ) -> QueuedDMOperations {
        for op in ops {
            match op {
                DMOperationStoreOperation::ReplaceDMOperation { operation } => {
                    match store
                        .shimmed_operations
                        .iter_mut()
                        .find(|existing| existing.id == operation.id)
                    {
                        Some(existing) => *existing = operation.clone(),
                        None => store.shimmed_operations.push(operation.clone()),
                    }
                }
                DMOperationStoreOperation::RemoveDMOperations { ids } => {
                    store
                        .shimmed_operations
                        .retain(|existing| !ids.contains(&existing.id));
                }
                DMOperationStoreOperation::RemoveAllDMOperations => {
                    store.shimmed_operations.clear();
                }
                DMOperationStoreOperation::AddQueuedDMOperation {
                    condition,
                    operation,
                    timestamp,
                } => {
                    push_queued(
                        &mut store,
                        condition,
                        QueuedDMOperation {
                            operation: operation.clone(),
                            timestamp: *timestamp,
                        },
                    );
                }
                DMOperationStoreOperation::ClearDMOperationsQueue { condition } => {
                    match condition {
                        QueueDMOpsCondition::Thread { thread_id } => {
                            store.thread_queue.remove(thread_id);
                        }
                        QueueDMOpsCondition::Entry { entry_id } => {
                            store.entry_queue.remove(entry_id);
                        }
                        QueueDMOpsCondition::Message { message_id } => {
                            store.message_queue.remove(message_id);
                        }
                        QueueDMOpsCondition::Membership { thread_id, user_id } => {
                            if let Some(by_user) = store.membership_queue.get_mut(thread_id) {
                                by_user.remove(user_id);
                                if by_user.is_empty() {
                                    store.membership_queue.remove(thread_id);
                                }
                            }
                        }
                    }
                }
                DMOperationStoreOperation::PruneQueuedDMOperations {
                    prune_max_timestamp,
                } => {
                    prune_queue(&mut store.thread_queue, *prune_max_timestamp);
                    prune_queue(&mut store.message_queue, *prune_max_timestamp);
                    prune_queue(&mut store.entry_queue, *prune_max_timestamp);
                    for by_user in store.membership_queue.values_mut() {
                        prune_queue(by_user, *prune_max_timestamp);
                    }
                    store
                        .membership_queue
                        .retain(|_, by_user| !by_user.is_empty());
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[DMOperationStoreOperation],
    ) -> Result<Vec<ClientDBDMOperationStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                DMOperationStoreOperation::ReplaceDMOperation { operation } => {
                    Ok(ClientDBDMOperationStoreOperation::ReplaceDMOperation {
                        operation: ClientDBDMOperation {
                            id: operation.id.clone(),
                            op_type: operation.op_type.clone(),
                            operation: serde_json::to_string(&operation.operation)?,
                        },
                    })
                }
                DMOperationStoreOperation::RemoveDMOperations { ids } => {
                    Ok(ClientDBDMOperationStoreOperation::RemoveDMOperations {
                        ids: ids.clone(),
                    })
                }
                DMOperationStoreOperation::RemoveAllDMOperations => {
                    Ok(ClientDBDMOperationStoreOperation::RemoveAllDMOperations)
                }
                DMOperationStoreOperation::AddQueuedDMOperation {
                    condition,
                    operation,
                    timestamp,
                } => Ok(ClientDBDMOperationStoreOperation::AddQueuedDMOperation {
                    operation: ClientDBQueuedDMOperation {
                        queue_type: condition.type_tag().to_string(),
                        queue_key: condition.queue_key(),
                        operation: serde_json::to_string(operation)?,
                        timestamp: *timestamp,
                    },
                }),
                DMOperationStoreOperation::ClearDMOperationsQueue { condition } => {
                    Ok(ClientDBDMOperationStoreOperation::ClearDMOperationsQueue {
                        queue_type: condition.type_tag().to_string(),
                        queue_key: condition.queue_key(),
                    })
                }
                DMOperationStoreOperation::PruneQueuedDMOperations {
                    prune_max_timestamp,
                } => Ok(ClientDBDMOperationStoreOperation::PruneQueuedDMOperations {
                    prune_max_timestamp: *prune_max_timestamp,
                }),
            })
            .collect()
    }

    fn translate_client_db_data(data: DMOperationsData) -> Result<QueuedDMOperations> {
        let mut store = QueuedDMOperations::default();
        for row in &data.operations {
            let operation: DMOperation = serde_json::from_str(&row.operation).map_err(|_| {
                Error::MalformedRecord(format!("dm operation {} failed to parse", row.id))
            })?;
            store.shimmed_operations.push(DMOperationEntity {
                id: row.id.clone(),
                op_type: row.op_type.clone(),
                operation,
            });
        }

        // Group rows by queue, oldest first within each queue.
        let mut queued = data.queued;
        queued.sort_by_key(|row| row.timestamp);
        for row in &queued {
            let operation: DMOperation = serde_json::from_str(&row.operation).map_err(|_| {
                Error::MalformedRecord(format!(
                    "queued dm operation under {} failed to parse",
                    row.queue_key
                ))
            })?;
            let condition = match row.queue_type.as_str() {
                "thread" => QueueDMOpsCondition::Thread {
                    thread_id: row.queue_key.clone(),
                },
                "entry" => QueueDMOpsCondition::Entry {
                    entry_id: row.queue_key.clone(),
                },
                "message" => QueueDMOpsCondition::Message {
                    message_id: row.queue_key.clone(),
                },
                "membership" => {
                    let (thread_id, user_id) =
                        row.queue_key.split_once('#').ok_or_else(|| {
                            Error::MalformedRecord(format!(
                                "membership queue key {} is missing a separator",
                                row.queue_key
                            ))
                        })?;
                    QueueDMOpsCondition::Membership {
                        thread_id: thread_id.to_string(),
                        user_id: user_id.to_string(),
                    }
                }
                other => {
                    return Err(Error::MalformedRecord(format!(
                        "unknown dm operation queue type: {other}"
                    )));
                }
            };
            push_queued(
                &mut store,
                &condition,
                QueuedDMOperation {
                    operation,
                    timestamp: row.timestamp,
                },
            );
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_op(thread: &str, payload: &str, timestamp: i64) -> DMOperationStoreOperation {
        DMOperationStoreOperation::AddQueuedDMOperation {
            condition: QueueDMOpsCondition::Thread {
                thread_id: thread.to_string(),
            },
            operation: serde_json::json!({ "op": payload }),
            timestamp,
        }
    }

    #[test]
    fn test_queue_then_clear() {
        let store = DMOperationStoreOpsHandler::process_store_operations(
            QueuedDMOperations::default(),
            &[
                queue_op("t1", "send_message", 1_000),
                queue_op("t1", "send_reaction", 1_001),
                queue_op("t2", "send_message", 1_002),
                DMOperationStoreOperation::ClearDMOperationsQueue {
                    condition: QueueDMOpsCondition::Thread {
                        thread_id: "t1".to_string(),
                    },
                },
            ],
        );
        assert!(!store.thread_queue.contains_key("t1"));
        assert_eq!(store.thread_queue["t2"].len(), 1);
    }

    #[test]
    fn test_prune_drops_only_stale_operations() {
        let store = DMOperationStoreOpsHandler::process_store_operations(
            QueuedDMOperations::default(),
            &[
                queue_op("t1", "old", 1_000),
                queue_op("t1", "fresh", 5_000),
                DMOperationStoreOperation::PruneQueuedDMOperations {
                    prune_max_timestamp: 2_000,
                },
            ],
        );
        let remaining = &store.thread_queue["t1"];
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp, 5_000);
    }

    #[test]
    fn test_replace_shimmed_operation_overwrites_by_id() {
        let entity = DMOperationEntity {
            id: "op-1".to_string(),
            op_type: "send_sticker".to_string(),
            operation: serde_json::json!({"sticker": "old"}),
        };
        let mut updated = entity.clone();
        updated.operation = serde_json::json!({"sticker": "new"});
        let store = DMOperationStoreOpsHandler::process_store_operations(
            QueuedDMOperations::default(),
            &[
                DMOperationStoreOperation::ReplaceDMOperation { operation: entity },
                DMOperationStoreOperation::ReplaceDMOperation {
                    operation: updated.clone(),
                },
            ],
        );
        assert_eq!(store.shimmed_operations, vec![updated]);
    }

    #[test]
    fn test_membership_queue_round_trip() {
        let ops = [DMOperationStoreOperation::AddQueuedDMOperation {
            condition: QueueDMOpsCondition::Membership {
                thread_id: "t1".to_string(),
                user_id: "u9".to_string(),
            },
            operation: serde_json::json!({"op": "add_member"}),
            timestamp: 1_000,
        }];
        let converted = DMOperationStoreOpsHandler::convert_ops_to_client_db_ops(&ops).unwrap();
        let row = match converted.into_iter().next() {
            Some(ClientDBDMOperationStoreOperation::AddQueuedDMOperation { operation }) => {
                operation
            }
            other => panic!("expected queued add, got {other:?}"),
        };
        assert_eq!(row.queue_type, "membership");
        assert_eq!(row.queue_key, "t1#u9");
        let store = DMOperationStoreOpsHandler::translate_client_db_data(DMOperationsData {
            operations: vec![],
            queued: vec![row],
        })
        .unwrap();
        assert_eq!(store.membership_queue["t1"]["u9"].len(), 1);
    }
}
