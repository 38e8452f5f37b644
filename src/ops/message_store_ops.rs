//! Message Store operations and their persisted row shapes.
//!
//! The message table is flat: one row per message, typed content encoded
//! into the `type`/`content`/`future_type` columns and media attachments
//! split into their own rows. Per-thread ordering is NOT persisted —
//! `message_ids` is rebuilt at hydration by sorting each thread's
//! messages in descending time order, so the persisted form can never
//! disagree with the flat table.
//!
//! `rekey` is the one operation that is not a plain keyed write: it moves
//! a record from a client-local id to a server-confirmed id, exactly once
//! per record. When the target id already exists (duplicate delivery
//! race) the server-confirmed record is canonical and the local copy is
//! dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::message::{
    LocalMessageInfo, Media, MessageContent, MessageStore, MessageType, RawMessageInfo,
    ThreadMessageInfo,
};

use super::StoreOpsHandler;

/// A mutation of the Message Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageStoreOperation {
    /// Fully overwrite one message record
    Replace {
        /// The complete new record
        message_info: RawMessageInfo,
    },
    /// Move a record from a local id to a server-confirmed id
    Rekey {
        /// The local id being retired
        from: String,
        /// The server-confirmed id
        to: String,
    },
    /// Remove messages by id; missing ids are silently ignored
    Remove {
        /// Ids to remove
        ids: Vec<String>,
    },
    /// Remove every message belonging to the given threads from the flat
    /// table (and local bookkeeping). Does not touch the per-thread
    /// ordered views — clearing `message_ids` is a separate
    /// `replace_threads`, the two operations are independent.
    RemoveAllForThreads {
        /// Threads whose messages are removed
        #[serde(rename = "threadIDs")]
        thread_ids: Vec<String>,
    },
    /// Empty the flat table and local bookkeeping
    RemoveAll,
    /// Overwrite per-thread ordered views
    ReplaceThreads {
        /// The new views, keyed by thread id
        threads: HashMap<String, ThreadMessageInfo>,
    },
    /// Remove per-thread views by thread id
    RemoveThreads {
        /// Thread ids to remove
        ids: Vec<String>,
    },
    /// Remove every per-thread view
    RemoveAllThreads,
    /// Overwrite the local bookkeeping for one message
    ReplaceLocal {
        /// Message id
        id: String,
        /// The bookkeeping record
        local_message_info: LocalMessageInfo,
    },
    /// Remove local bookkeeping by message id
    RemoveLocals {
        /// Message ids to clear
        ids: Vec<String>,
    },
}

// ============================================================================
// Persisted Row Shapes
// ============================================================================

/// Persisted row for one media attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBMediaInfo {
    /// Upload id of the primary content
    pub id: String,
    /// Content URI, denormalized for cleanup queries
    pub uri: String,
    /// "photo" or "video", denormalized
    #[serde(rename = "type")]
    pub media_type: String,
    /// JSON-encoded complete media record
    pub extras: String,
}

/// Persisted row for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBMessageInfo {
    /// Store key: server id once confirmed, local id while in flight
    pub id: String,
    /// Client-local id, when the message was composed on this device
    pub local_id: Option<String>,
    /// Thread the message belongs to
    pub thread: String,
    /// User id of the sender
    pub user: String,
    /// Message type code, as a string column
    #[serde(rename = "type")]
    pub message_type: String,
    /// Sender-declared type code for unsupported messages
    pub future_type: Option<String>,
    /// Type-dependent content column (see conversion helpers)
    pub content: Option<String>,
    /// Send time, Unix ms, as a string column
    pub time: String,
    /// Media attachment rows
    pub media_infos: Vec<ClientDBMediaInfo>,
}

/// Persisted row for one per-thread ordered view (ordering itself is
/// derived, not stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBThreadMessageInfo {
    /// Thread id
    pub id: String,
    /// Whether the full history start has been fetched
    pub start_reached: bool,
    /// Last navigation time, Unix ms
    pub last_navigated_to: i64,
    /// Last prune time, Unix ms
    pub last_pruned: i64,
}

/// Persisted row for one message's local bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDBLocalMessageInfo {
    /// Message id
    pub id: String,
    /// JSON-encoded [`LocalMessageInfo`]
    pub local_message_info: String,
}

/// Persistable form of a Message Store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientDBMessageStoreOperation {
    /// Insert or overwrite one message row (and its media rows)
    Replace {
        /// The row
        message_info: ClientDBMessageInfo,
    },
    /// Move a row between ids
    Rekey {
        /// The local id being retired
        from: String,
        /// The server-confirmed id
        to: String,
    },
    /// Delete message rows by id
    Remove {
        /// Ids to delete
        ids: Vec<String>,
    },
    /// Delete all message rows for the given threads
    RemoveAllForThreads {
        /// Thread ids
        #[serde(rename = "threadIDs")]
        thread_ids: Vec<String>,
    },
    /// Delete every message row
    RemoveAll,
    /// Insert or overwrite per-thread view rows
    ReplaceThreads {
        /// The rows
        threads: Vec<ClientDBThreadMessageInfo>,
    },
    /// Delete per-thread view rows by thread id
    RemoveThreads {
        /// Thread ids to delete
        ids: Vec<String>,
    },
    /// Delete every per-thread view row
    RemoveAllThreads,
    /// Insert or overwrite one local bookkeeping row
    ReplaceLocal {
        /// The row
        local_message_info: ClientDBLocalMessageInfo,
    },
    /// Delete local bookkeeping rows by message id
    RemoveLocals {
        /// Message ids
        ids: Vec<String>,
    },
}

// ============================================================================
// Row Conversion
// ============================================================================

fn convert_media_to_client_db_media_info(media: &Media) -> Result<ClientDBMediaInfo> {
    let media_type = match media {
        Media::Photo { .. } => "photo",
        Media::Video { .. } => "video",
    };
    let uri = match media {
        Media::Photo { uri, .. } | Media::Video { uri, .. } => uri.clone(),
    };
    Ok(ClientDBMediaInfo {
        id: media.id().to_string(),
        uri,
        media_type: media_type.to_string(),
        extras: serde_json::to_string(media)?,
    })
}

/// Flatten a message record into its persisted row.
pub fn convert_message_info_to_client_db_message_info(
    message_info: &RawMessageInfo,
) -> Result<ClientDBMessageInfo> {
    let message_type = message_info.content.message_type();
    let (future_type, content, media_infos) = match &message_info.content {
        MessageContent::Text { text } => (None, Some(text.clone()), Vec::new()),
        MessageContent::Images { media } | MessageContent::Multimedia { media } => {
            let rows = media
                .iter()
                .map(convert_media_to_client_db_media_info)
                .collect::<Result<Vec<_>>>()?;
            (None, None, rows)
        }
        MessageContent::Unsupported {
            future_type,
            content,
        } => (
            Some(future_type.to_string()),
            Some(content.to_string()),
            Vec::new(),
        ),
        other => (None, Some(serde_json::to_string(other)?), Vec::new()),
    };
    Ok(ClientDBMessageInfo {
        id: message_info.message_id().to_string(),
        local_id: message_info.local_id.clone(),
        thread: message_info.thread_id.clone(),
        user: message_info.creator_id.clone(),
        message_type: message_type.code().to_string(),
        future_type,
        content,
        time: message_info.time.to_string(),
        media_infos,
    })
}

fn content_from_columns(row: &ClientDBMessageInfo) -> Result<MessageContent> {
    let code = row
        .message_type
        .parse::<i32>()
        .map_err(|_| malformed(row, "non-numeric type code"))?;
    let Some(message_type) = MessageType::from_code(code) else {
        // Future type code from a newer client: preserve the payload.
        let content = match &row.content {
            Some(raw) => serde_json::from_str(raw).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        };
        return Ok(MessageContent::Unsupported {
            future_type: code,
            content,
        });
    };
    match message_type {
        MessageType::Text => {
            let text = row
                .content
                .clone()
                .ok_or_else(|| malformed(row, "text message without content"))?;
            Ok(MessageContent::Text { text })
        }
        MessageType::Images | MessageType::Multimedia => {
            let media = row
                .media_infos
                .iter()
                .map(|m| serde_json::from_str::<Media>(&m.extras))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| malformed(row, "unparseable media extras"))?;
            match message_type {
                MessageType::Images => Ok(MessageContent::Images { media }),
                _ => Ok(MessageContent::Multimedia { media }),
            }
        }
        MessageType::Unsupported => {
            let future_type = row
                .future_type
                .as_deref()
                .and_then(|t| t.parse::<i32>().ok())
                .ok_or_else(|| malformed(row, "unsupported message without future type"))?;
            let content = match &row.content {
                Some(raw) => serde_json::from_str(raw).unwrap_or(serde_json::Value::Null),
                None => serde_json::Value::Null,
            };
            Ok(MessageContent::Unsupported {
                future_type,
                content,
            })
        }
        _ => {
            let raw = row
                .content
                .as_deref()
                .ok_or_else(|| malformed(row, "message without content"))?;
            serde_json::from_str::<MessageContent>(raw)
                .map_err(|_| malformed(row, "unparseable content"))
        }
    }
}

fn malformed(row: &ClientDBMessageInfo, what: &str) -> Error {
    Error::MalformedRecord(format!("message {}: {}", row.id, what))
}

/// Rebuild a message record from its persisted row.
pub fn convert_client_db_message_info_to_raw_message_info(
    row: &ClientDBMessageInfo,
) -> Result<RawMessageInfo> {
    let content = content_from_columns(row)?;
    let time = row
        .time
        .parse::<i64>()
        .map_err(|_| malformed(row, "non-numeric time"))?;
    // A row keyed by its own local id is an unconfirmed local message.
    let id = if row.local_id.as_deref() == Some(row.id.as_str()) {
        None
    } else {
        Some(row.id.clone())
    };
    Ok(RawMessageInfo {
        id,
        local_id: row.local_id.clone(),
        thread_id: row.thread.clone(),
        creator_id: row.user.clone(),
        time,
        content,
    })
}

// ============================================================================
// Handler
// ============================================================================

/// Persisted rows consumed when hydrating the Message Store
#[derive(Debug, Clone, Default)]
pub struct MessageStoreData {
    /// Message rows
    pub messages: Vec<ClientDBMessageInfo>,
    /// Per-thread view rows
    pub threads: Vec<ClientDBThreadMessageInfo>,
    /// Local bookkeeping rows
    pub local: Vec<ClientDBLocalMessageInfo>,
}

/// Operation handler for the Message Store
pub struct MessageStoreOpsHandler;

impl StoreOpsHandler for MessageStoreOpsHandler {
    type Store = MessageStore;
    type Operation = MessageStoreOperation;
    type ClientDBOperation = ClientDBMessageStoreOperation;
    type DBData = MessageStoreData;

    fn process_store_operations(
        mut store: MessageStore,
        ops: &[MessageStoreOperation],
    ) -> MessageStore {
        for op in ops {
            match op {
                MessageStoreOperation::Replace { message_info } => {
                    store.messages.insert(
                        message_info.message_id().to_string(),
                        message_info.clone(),
                    );
                }
                MessageStoreOperation::Rekey { from, to } => {
                    let Some(mut moved) = store.messages.remove(from) else {
                        continue;
                    };
                    if store.messages.contains_key(to) {
                        // Duplicate delivery race: the server-confirmed
                        // record is canonical, the local copy is dropped.
                        tracing::warn!(from = %from, to = %to, "rekey target already exists, dropping local copy");
                        continue;
                    }
                    moved.id = Some(to.clone());
                    store.messages.insert(to.clone(), moved);
                }
                MessageStoreOperation::Remove { ids } => {
                    for id in ids {
                        store.messages.remove(id);
                    }
                }
                MessageStoreOperation::RemoveAllForThreads { thread_ids } => {
                    let removed: Vec<String> = store
                        .messages
                        .iter()
                        .filter(|(_, info)| thread_ids.contains(&info.thread_id))
                        .map(|(id, _)| id.clone())
                        .collect();
                    for id in removed {
                        store.messages.remove(&id);
                        store.local.remove(&id);
                    }
                }
                MessageStoreOperation::RemoveAll => {
                    store.messages.clear();
                    store.local.clear();
                }
                MessageStoreOperation::ReplaceThreads { threads } => {
                    for (id, thread) in threads {
                        store.threads.insert(id.clone(), thread.clone());
                    }
                }
                MessageStoreOperation::RemoveThreads { ids } => {
                    for id in ids {
                        store.threads.remove(id);
                    }
                }
                MessageStoreOperation::RemoveAllThreads => {
                    store.threads.clear();
                }
                MessageStoreOperation::ReplaceLocal {
                    id,
                    local_message_info,
                } => {
                    store.local.insert(id.clone(), local_message_info.clone());
                }
                MessageStoreOperation::RemoveLocals { ids } => {
                    for id in ids {
                        store.local.remove(id);
                    }
                }
            }
        }
        store
    }

    fn convert_ops_to_client_db_ops(
        ops: &[MessageStoreOperation],
    ) -> Result<Vec<ClientDBMessageStoreOperation>> {
        ops.iter()
            .map(|op| match op {
                MessageStoreOperation::Replace { message_info } => {
                    Ok(ClientDBMessageStoreOperation::Replace {
                        message_info: convert_message_info_to_client_db_message_info(
                            message_info,
                        )?,
                    })
                }
                MessageStoreOperation::Rekey { from, to } => {
                    Ok(ClientDBMessageStoreOperation::Rekey {
                        from: from.clone(),
                        to: to.clone(),
                    })
                }
                MessageStoreOperation::Remove { ids } => {
                    Ok(ClientDBMessageStoreOperation::Remove { ids: ids.clone() })
                }
                MessageStoreOperation::RemoveAllForThreads { thread_ids } => {
                    Ok(ClientDBMessageStoreOperation::RemoveAllForThreads {
                        thread_ids: thread_ids.clone(),
                    })
                }
                MessageStoreOperation::RemoveAll => Ok(ClientDBMessageStoreOperation::RemoveAll),
                MessageStoreOperation::ReplaceThreads { threads } => {
                    let mut rows: Vec<ClientDBThreadMessageInfo> = threads
                        .iter()
                        .map(|(id, thread)| ClientDBThreadMessageInfo {
                            id: id.clone(),
                            start_reached: thread.start_reached,
                            last_navigated_to: thread.last_navigated_to,
                            last_pruned: thread.last_pruned,
                        })
                        .collect();
                    rows.sort_by(|a, b| a.id.cmp(&b.id));
                    Ok(ClientDBMessageStoreOperation::ReplaceThreads { threads: rows })
                }
                MessageStoreOperation::RemoveThreads { ids } => {
                    Ok(ClientDBMessageStoreOperation::RemoveThreads { ids: ids.clone() })
                }
                MessageStoreOperation::RemoveAllThreads => {
                    Ok(ClientDBMessageStoreOperation::RemoveAllThreads)
                }
                MessageStoreOperation::ReplaceLocal {
                    id,
                    local_message_info,
                } => Ok(ClientDBMessageStoreOperation::ReplaceLocal {
                    local_message_info: ClientDBLocalMessageInfo {
                        id: id.clone(),
                        local_message_info: serde_json::to_string(local_message_info)?,
                    },
                }),
                MessageStoreOperation::RemoveLocals { ids } => {
                    Ok(ClientDBMessageStoreOperation::RemoveLocals { ids: ids.clone() })
                }
            })
            .collect()
    }

    fn translate_client_db_data(data: MessageStoreData) -> Result<MessageStore> {
        let mut messages = HashMap::with_capacity(data.messages.len());
        // thread id -> (message id, time), for rebuilding the ordered views
        let mut by_thread: HashMap<String, Vec<(String, i64)>> = HashMap::new();
        for row in &data.messages {
            let message_info = convert_client_db_message_info_to_raw_message_info(row)?;
            by_thread
                .entry(message_info.thread_id.clone())
                .or_default()
                .push((row.id.clone(), message_info.time));
            messages.insert(row.id.clone(), message_info);
        }

        let mut threads = HashMap::with_capacity(data.threads.len());
        for row in &data.threads {
            let mut ids_with_times = by_thread.remove(&row.id).unwrap_or_default();
            // Descending time order, id as a deterministic tie-break.
            ids_with_times.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
            threads.insert(
                row.id.clone(),
                ThreadMessageInfo {
                    message_ids: ids_with_times.into_iter().map(|(id, _)| id).collect(),
                    start_reached: row.start_reached,
                    last_navigated_to: row.last_navigated_to,
                    last_pruned: row.last_pruned,
                },
            );
        }

        let mut local = HashMap::with_capacity(data.local.len());
        for row in &data.local {
            let info: LocalMessageInfo = serde_json::from_str(&row.local_message_info)
                .map_err(|_| {
                    Error::MalformedRecord(format!(
                        "local message info {} failed to parse",
                        row.id
                    ))
                })?;
            local.insert(row.id.clone(), info);
        }

        // The watermark is not persisted here; hydration starts at zero
        // and the next state sync refreshes it.
        Ok(MessageStore {
            messages,
            threads,
            local,
            current_as_of: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::Dimensions;

    fn text_message(id: &str, thread: &str, time: i64) -> RawMessageInfo {
        RawMessageInfo {
            id: Some(id.to_string()),
            local_id: None,
            thread_id: thread.to_string(),
            creator_id: "256".to_string(),
            time,
            content: MessageContent::Text {
                text: format!("message {id}"),
            },
        }
    }

    fn store_with(messages: Vec<RawMessageInfo>) -> MessageStore {
        let ops: Vec<_> = messages
            .into_iter()
            .map(|message_info| MessageStoreOperation::Replace { message_info })
            .collect();
        MessageStoreOpsHandler::process_store_operations(MessageStore::default(), &ops)
    }

    #[test]
    fn test_rekey_moves_record_to_server_id() {
        let mut local = text_message("unused", "256|84015", 1_000);
        local.id = None;
        local.local_id = Some("local1".to_string());
        let store = store_with(vec![local]);
        let store = MessageStoreOpsHandler::process_store_operations(
            store,
            &[MessageStoreOperation::Rekey {
                from: "local1".to_string(),
                to: "103502".to_string(),
            }],
        );
        assert!(!store.messages.contains_key("local1"));
        let moved = &store.messages["103502"];
        assert_eq!(moved.id.as_deref(), Some("103502"));
        assert_eq!(moved.local_id.as_deref(), Some("local1"));
    }

    #[test]
    fn test_rekey_keeps_server_record_on_duplicate_delivery() {
        let mut local = text_message("unused", "256|84015", 1_000);
        local.id = None;
        local.local_id = Some("local1".to_string());
        let server = text_message("103502", "256|84015", 1_001);
        let store = store_with(vec![local, server.clone()]);
        let store = MessageStoreOpsHandler::process_store_operations(
            store,
            &[MessageStoreOperation::Rekey {
                from: "local1".to_string(),
                to: "103502".to_string(),
            }],
        );
        assert!(!store.messages.contains_key("local1"));
        assert_eq!(store.messages["103502"], server);
    }

    #[test]
    fn test_remove_all_for_threads_leaves_thread_views_untouched() {
        let store = store_with(vec![
            text_message("m1", "256|84015", 1_000),
            text_message("m2", "256|84015", 1_001),
            text_message("m3", "256|84020", 1_002),
        ]);
        let store = MessageStoreOpsHandler::process_store_operations(
            store,
            &[MessageStoreOperation::ReplaceThreads {
                threads: HashMap::from([(
                    "256|84015".to_string(),
                    ThreadMessageInfo {
                        message_ids: vec!["m2".to_string(), "m1".to_string()],
                        start_reached: false,
                        last_navigated_to: 0,
                        last_pruned: 0,
                    },
                )]),
            }],
        );
        let store = MessageStoreOpsHandler::process_store_operations(
            store,
            &[MessageStoreOperation::RemoveAllForThreads {
                thread_ids: vec!["256|84015".to_string()],
            }],
        );
        assert!(!store.messages.contains_key("m1"));
        assert!(!store.messages.contains_key("m2"));
        assert!(store.messages.contains_key("m3"));
        // The per-thread view is structurally unchanged.
        assert_eq!(
            store.threads["256|84015"].message_ids,
            vec!["m2".to_string(), "m1".to_string()]
        );
    }

    #[test]
    fn test_remove_all_then_replace_keeps_only_the_replacement() {
        let store = store_with(vec![
            text_message("m1", "256|84015", 1_000),
            text_message("m2", "256|84015", 1_001),
        ]);
        let store = MessageStoreOpsHandler::process_store_operations(
            store,
            &[
                MessageStoreOperation::RemoveAll,
                MessageStoreOperation::Replace {
                    message_info: text_message("m3", "256|84015", 1_002),
                },
            ],
        );
        assert_eq!(store.messages.len(), 1);
        assert!(store.messages.contains_key("m3"));
    }

    #[test]
    fn test_text_message_row_round_trip() {
        let message_info = text_message("103502", "256|84015", 1_689_091_732_528);
        let row = convert_message_info_to_client_db_message_info(&message_info).unwrap();
        assert_eq!(row.message_type, "0");
        assert_eq!(row.content.as_deref(), Some("message 103502"));
        assert_eq!(row.time, "1689091732528");
        let back = convert_client_db_message_info_to_raw_message_info(&row).unwrap();
        assert_eq!(back, message_info);
    }

    #[test]
    fn test_multimedia_message_row_round_trip() {
        let message_info = RawMessageInfo {
            id: Some("103503".to_string()),
            local_id: None,
            thread_id: "256|84015".to_string(),
            creator_id: "256".to_string(),
            time: 1_000,
            content: MessageContent::Multimedia {
                media: vec![
                    Media::Photo {
                        id: "upload1".to_string(),
                        uri: "https://cdn.example/upload1".to_string(),
                        dimensions: Dimensions {
                            height: 100,
                            width: 200,
                        },
                        thumb_hash: None,
                    },
                    Media::Video {
                        id: "upload2".to_string(),
                        uri: "https://cdn.example/upload2".to_string(),
                        dimensions: Dimensions {
                            height: 720,
                            width: 1280,
                        },
                        loops: false,
                        thumbnail_id: "upload3".to_string(),
                        thumbnail_uri: "https://cdn.example/upload3".to_string(),
                    },
                ],
            },
        };
        let row = convert_message_info_to_client_db_message_info(&message_info).unwrap();
        assert_eq!(row.media_infos.len(), 2);
        assert_eq!(row.media_infos[0].media_type, "photo");
        assert_eq!(row.media_infos[1].media_type, "video");
        assert!(row.content.is_none());
        let back = convert_client_db_message_info_to_raw_message_info(&row).unwrap();
        assert_eq!(back, message_info);
    }

    #[test]
    fn test_reaction_message_row_round_trip() {
        let message_info = RawMessageInfo {
            id: Some("103504".to_string()),
            local_id: None,
            thread_id: "256|84015".to_string(),
            creator_id: "512".to_string(),
            time: 1_000,
            content: MessageContent::Reaction {
                target_message_id: "103502".to_string(),
                reaction: "👍".to_string(),
                action: "add_reaction".to_string(),
            },
        };
        let row = convert_message_info_to_client_db_message_info(&message_info).unwrap();
        assert_eq!(row.message_type, "19");
        let back = convert_client_db_message_info_to_raw_message_info(&row).unwrap();
        assert_eq!(back, message_info);
    }

    #[test]
    fn test_unknown_type_code_translates_to_unsupported() {
        let row = ClientDBMessageInfo {
            id: "103505".to_string(),
            local_id: None,
            thread: "256|84015".to_string(),
            user: "256".to_string(),
            message_type: "73".to_string(),
            future_type: None,
            content: Some("{\"somePayload\":true}".to_string()),
            time: "1000".to_string(),
            media_infos: vec![],
        };
        let back = convert_client_db_message_info_to_raw_message_info(&row).unwrap();
        match back.content {
            MessageContent::Unsupported { future_type, .. } => assert_eq!(future_type, 73),
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_local_only_row_translates_without_server_id() {
        let mut message_info = text_message("unused", "256|84015", 1_000);
        message_info.id = None;
        message_info.local_id = Some("local1".to_string());
        let row = convert_message_info_to_client_db_message_info(&message_info).unwrap();
        assert_eq!(row.id, "local1");
        let back = convert_client_db_message_info_to_raw_message_info(&row).unwrap();
        assert_eq!(back.id, None);
        assert_eq!(back.local_id.as_deref(), Some("local1"));
    }

    #[test]
    fn test_translate_rebuilds_descending_order() {
        let rows = vec![
            convert_message_info_to_client_db_message_info(&text_message(
                "m1", "256|84015", 1_000,
            ))
            .unwrap(),
            convert_message_info_to_client_db_message_info(&text_message(
                "m3", "256|84015", 3_000,
            ))
            .unwrap(),
            convert_message_info_to_client_db_message_info(&text_message(
                "m2", "256|84015", 2_000,
            ))
            .unwrap(),
        ];
        let store = MessageStoreOpsHandler::translate_client_db_data(MessageStoreData {
            messages: rows,
            threads: vec![ClientDBThreadMessageInfo {
                id: "256|84015".to_string(),
                start_reached: true,
                last_navigated_to: 5_000,
                last_pruned: 0,
            }],
            local: vec![],
        })
        .unwrap();
        assert_eq!(
            store.threads["256|84015"].message_ids,
            vec!["m3".to_string(), "m2".to_string(), "m1".to_string()]
        );
        assert!(store.threads["256|84015"].start_reached);
    }
}
