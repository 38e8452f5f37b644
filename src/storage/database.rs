//! # Database
//!
//! SQLite persistence for the client stores.
//!
//! ## Commit Path
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         COMMIT PATH                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────┐                                               │
//! │  │ ClientDBStore-      │  one converted batch from the queue           │
//! │  │ Operations          │                                               │
//! │  └──────────┬──────────┘                                               │
//! │             │ process_store_operations                                 │
//! │             ▼                                                           │
//! │  ┌─────────────────────┐  BEGIN                                        │
//! │  │     Database        │    apply every store's list, in order         │
//! │  │   (this file)       │  COMMIT — all or nothing                      │
//! │  └──────────┬──────────┘                                               │
//! │             │ load_client_db_store (cold start)                        │
//! │             ▼                                                           │
//! │  ┌─────────────────────┐                                               │
//! │  │   ClientDBStore     │  every row, handed to client_db hydration     │
//! │  └─────────────────────┘                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch commits atomically: a failed statement rolls the whole
//! transaction back and the queue entry stays pending.

use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

use crate::client_db::{ClientDBStore, ClientDBStoreOperations};
use crate::error::{Error, Result};
use crate::ops::aux_user_store_ops::{ClientDBAuxUserInfo, ClientDBAuxUserStoreOperation};
use crate::ops::community_store_ops::{ClientDBCommunityInfo, ClientDBCommunityStoreOperation};
use crate::ops::dm_operations_store_ops::{
    ClientDBDMOperation, ClientDBDMOperationStoreOperation, ClientDBQueuedDMOperation,
};
use crate::ops::entry_store_ops::{ClientDBEntryInfo, ClientDBEntryStoreOperation};
use crate::ops::integrity_store_ops::{
    ClientDBIntegrityStoreOperation, ClientDBIntegrityThreadHash,
};
use crate::ops::keyserver_store_ops::{ClientDBKeyserverInfo, ClientDBKeyserverStoreOperation};
use crate::ops::message_store_ops::{
    ClientDBLocalMessageInfo, ClientDBMediaInfo, ClientDBMessageInfo,
    ClientDBMessageStoreOperation, ClientDBThreadMessageInfo,
};
use crate::ops::report_store_ops::{ClientDBReport, ClientDBReportStoreOperation};
use crate::ops::synced_metadata_store_ops::{
    ClientDBSyncedMetadataEntry, ClientDBSyncedMetadataStoreOperation,
};
use crate::ops::thread_activity_store_ops::{
    ClientDBThreadActivityEntry, ClientDBThreadActivityStoreOperation,
};
use crate::ops::thread_store_ops::{ClientDBThreadInfo, ClientDBThreadStoreOperation};
use crate::ops::user_store_ops::{ClientDBUserInfo, ClientDBUserStoreOperation};
use crate::ops::{DraftStoreOperation, MessageSearchStoreOperation, OutboundP2PMessage};

use super::schema;

/// The client database handle
///
/// Wraps a SQLite connection behind a mutex; every batch commits in one
/// transaction.
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database.
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| {
                    Error::DatabaseError(format!("Failed to set schema version: {}", e))
                })?;
                tracing::info!(
                    "Database schema created (version {})",
                    schema::SCHEMA_VERSION
                );
            }
            Some(v) if v < schema::SCHEMA_VERSION => {
                if v < 2 {
                    tracing::info!("Running migration v1 → v2 (DM operations)");
                    conn.execute_batch(schema::MIGRATE_V1_TO_V2)
                        .map_err(|e| Error::DatabaseError(format!("Migration v1→v2 failed: {}", e)))?;
                }
                tracing::info!(
                    "All migrations complete (now at version {})",
                    schema::SCHEMA_VERSION
                );
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    // ========================================================================
    // COMMIT
    // ========================================================================

    /// Apply one converted batch in a single transaction.
    pub fn process_store_operations(&self, ops: &ClientDBStoreOperations) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        apply_draft_ops(&tx, &ops.draft_store_operations)?;
        apply_thread_ops(&tx, &ops.thread_store_operations)?;
        apply_message_ops(&tx, &ops.message_store_operations)?;
        apply_report_ops(&tx, &ops.report_store_operations)?;
        apply_keyserver_ops(&tx, &ops.keyserver_store_operations)?;
        apply_user_ops(&tx, &ops.user_store_operations)?;
        apply_integrity_ops(&tx, &ops.integrity_store_operations)?;
        apply_community_ops(&tx, &ops.community_store_operations)?;
        apply_synced_metadata_ops(&tx, &ops.synced_metadata_store_operations)?;
        apply_aux_user_ops(&tx, &ops.aux_user_store_operations)?;
        apply_thread_activity_ops(&tx, &ops.thread_activity_store_operations)?;
        apply_entry_ops(&tx, &ops.entry_store_operations)?;
        apply_search_ops(&tx, &ops.message_search_store_operations)?;
        apply_outbound_p2p_messages(&tx, &ops.outbound_p2p_messages)?;
        apply_dm_operation_ops(&tx, &ops.dm_operation_store_operations)?;

        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // COLD-START LOAD
    // ========================================================================

    /// Read every persisted row in one pass.
    pub fn load_client_db_store(&self) -> Result<ClientDBStore> {
        let conn = self.conn.lock();

        let mut media_by_container: HashMap<String, Vec<ClientDBMediaInfo>> = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT id, container, uri, type, extras FROM media")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    ClientDBMediaInfo {
                        id: row.get(0)?,
                        uri: row.get(2)?,
                        media_type: row.get(3)?,
                        extras: row.get(4)?,
                    },
                ))
            })?;
            for row in rows {
                let (container, media_info) = row?;
                media_by_container.entry(container).or_default().push(media_info);
            }
        }

        let messages = {
            let mut stmt = conn.prepare(
                "SELECT id, local_id, thread, user, type, future_type, content, time \
                 FROM messages",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ClientDBMessageInfo {
                    id: row.get(0)?,
                    local_id: row.get(1)?,
                    thread: row.get(2)?,
                    user: row.get(3)?,
                    message_type: row.get(4)?,
                    future_type: row.get(5)?,
                    content: row.get(6)?,
                    time: row.get(7)?,
                    media_infos: Vec::new(),
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                let mut message = row?;
                if let Some(media_infos) = media_by_container.remove(&message.id) {
                    message.media_infos = media_infos;
                }
                messages.push(message);
            }
            messages
        };

        Ok(ClientDBStore {
            threads: load_threads(&conn)?,
            messages,
            message_store_threads: load_message_store_threads(&conn)?,
            local_messages: load_kv_rows(&conn, "SELECT id, local_message_info FROM local_messages", |id, blob| {
                ClientDBLocalMessageInfo {
                    id,
                    local_message_info: blob,
                }
            })?,
            reports: load_kv_rows(&conn, "SELECT id, report FROM reports", |id, blob| {
                ClientDBReport { id, report: blob }
            })?,
            users: load_kv_rows(&conn, "SELECT id, user_info FROM users", |id, blob| {
                ClientDBUserInfo {
                    id,
                    user_info: blob,
                }
            })?,
            keyservers: load_kv_rows(&conn, "SELECT id, keyserver_info FROM keyservers", |id, blob| {
                ClientDBKeyserverInfo {
                    id,
                    keyserver_info: blob,
                }
            })?,
            communities: load_kv_rows(
                &conn,
                "SELECT id, community_info FROM communities",
                |id, blob| ClientDBCommunityInfo {
                    id,
                    community_info: blob,
                },
            )?,
            integrity_thread_hashes: load_kv_rows(
                &conn,
                "SELECT id, thread_hash FROM integrity_store",
                |id, blob| ClientDBIntegrityThreadHash {
                    id,
                    thread_hash: blob,
                },
            )?,
            synced_metadata: load_kv_rows(
                &conn,
                "SELECT name, data FROM synced_metadata",
                |name, data| ClientDBSyncedMetadataEntry { name, data },
            )?,
            aux_user_infos: load_kv_rows(&conn, "SELECT id, aux_user_info FROM aux_users", |id, blob| {
                ClientDBAuxUserInfo {
                    id,
                    aux_user_info: blob,
                }
            })?,
            thread_activity_entries: load_kv_rows(
                &conn,
                "SELECT id, thread_activity_store_entry FROM thread_activity",
                |id, blob| ClientDBThreadActivityEntry {
                    id,
                    thread_activity_store_entry: blob,
                },
            )?,
            entries: load_kv_rows(&conn, "SELECT id, entry FROM entries", |id, blob| {
                ClientDBEntryInfo { id, entry: blob }
            })?,
            dm_operations: load_dm_operations(&conn)?,
            queued_dm_operations: load_queued_dm_operations(&conn)?,
        })
    }

    /// Read all outbound peer messages, oldest first.
    pub fn load_outbound_p2p_messages(&self) -> Result<Vec<OutboundP2PMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT message_id, device_id, user_id, timestamp, plaintext, ciphertext, status \
             FROM outbound_p2p_messages ORDER BY timestamp",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(OutboundP2PMessage {
                message_id: row.get(0)?,
                device_id: row.get(1)?,
                user_id: row.get(2)?,
                timestamp: row.get(3)?,
                plaintext: row.get(4)?,
                ciphertext: row.get(5)?,
                status: row.get(6)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Read the draft text for one key.
    pub fn load_draft(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        match conn.query_row("SELECT text FROM drafts WHERE key = ?1", params![key], |row| {
            row.get(0)
        }) {
            Ok(text) => Ok(Some(text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Per-Store Application
// ============================================================================

fn remove_rows(tx: &Transaction, table: &str, column: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM {table} WHERE {column} IN ({placeholders})");
    tx.execute(&sql, rusqlite::params_from_iter(ids))?;
    Ok(())
}

fn apply_draft_ops(tx: &Transaction, ops: &[DraftStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            DraftStoreOperation::UpdateDraft { key, text } => {
                tx.execute(
                    "INSERT OR REPLACE INTO drafts (key, text) VALUES (?1, ?2)",
                    params![key, text],
                )?;
            }
            DraftStoreOperation::MoveDraft { old_key, new_key } => {
                tx.execute(
                    "UPDATE OR REPLACE drafts SET key = ?1 WHERE key = ?2",
                    params![new_key, old_key],
                )?;
            }
            DraftStoreOperation::RemoveDrafts { ids } => {
                remove_rows(tx, "drafts", "key", ids)?;
            }
            DraftStoreOperation::RemoveAllDrafts => {
                tx.execute("DELETE FROM drafts", [])?;
            }
        }
    }
    Ok(())
}

fn insert_thread_row(
    tx: &Transaction,
    thread_info: &ClientDBThreadInfo,
    is_backed_up: bool,
) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO threads \
         (id, type, name, description, color, creation_time, parent_thread_id, \
          containing_thread_id, community, members, roles, current_user, \
          replies_count, pinned_count, avatar, is_backed_up) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            thread_info.id,
            thread_info.thread_type,
            thread_info.name,
            thread_info.description,
            thread_info.color,
            thread_info.creation_time,
            thread_info.parent_thread_id,
            thread_info.containing_thread_id,
            thread_info.community,
            thread_info.members,
            thread_info.roles,
            thread_info.current_user,
            thread_info.replies_count,
            thread_info.pinned_count,
            thread_info.avatar,
            is_backed_up,
        ],
    )?;
    Ok(())
}

fn apply_thread_ops(tx: &Transaction, ops: &[ClientDBThreadStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBThreadStoreOperation::Replace {
                thread_info,
                is_backed_up,
            } => insert_thread_row(tx, thread_info, *is_backed_up)?,
            ClientDBThreadStoreOperation::Remove { ids } => {
                remove_rows(tx, "threads", "id", ids)?;
            }
            ClientDBThreadStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM threads", [])?;
            }
        }
    }
    Ok(())
}

fn insert_message_row(tx: &Transaction, message_info: &ClientDBMessageInfo) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO messages \
         (id, local_id, thread, user, type, future_type, content, time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            message_info.id,
            message_info.local_id,
            message_info.thread,
            message_info.user,
            message_info.message_type,
            message_info.future_type,
            message_info.content,
            message_info.time,
        ],
    )?;
    tx.execute(
        "DELETE FROM media WHERE container = ?1",
        params![message_info.id],
    )?;
    for media_info in &message_info.media_infos {
        tx.execute(
            "INSERT INTO media (id, container, uri, type, extras) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                media_info.id,
                message_info.id,
                media_info.uri,
                media_info.media_type,
                media_info.extras,
            ],
        )?;
    }
    Ok(())
}

fn apply_message_ops(tx: &Transaction, ops: &[ClientDBMessageStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBMessageStoreOperation::Replace { message_info } => {
                insert_message_row(tx, message_info)?;
            }
            ClientDBMessageStoreOperation::Rekey { from, to } => {
                let server_row_exists: bool = tx.query_row(
                    "SELECT EXISTS (SELECT 1 FROM messages WHERE id = ?1)",
                    params![to],
                    |row| row.get(0),
                )?;
                if server_row_exists {
                    // Duplicate delivery race: the server-confirmed row is
                    // canonical, the local row and its media are dropped.
                    tracing::warn!(%from, %to, "rekey target already exists, dropping local row");
                    tx.execute("DELETE FROM media WHERE container = ?1", params![from])?;
                    tx.execute("DELETE FROM messages WHERE id = ?1", params![from])?;
                } else {
                    tx.execute(
                        "UPDATE messages SET id = ?1 WHERE id = ?2",
                        params![to, from],
                    )?;
                    tx.execute(
                        "UPDATE media SET container = ?1 WHERE container = ?2",
                        params![to, from],
                    )?;
                }
            }
            ClientDBMessageStoreOperation::Remove { ids } => {
                remove_rows(tx, "media", "container", ids)?;
                remove_rows(tx, "messages", "id", ids)?;
            }
            ClientDBMessageStoreOperation::RemoveAllForThreads { thread_ids } => {
                if thread_ids.is_empty() {
                    continue;
                }
                let placeholders = vec!["?"; thread_ids.len()].join(", ");
                tx.execute(
                    &format!(
                        "DELETE FROM media WHERE container IN \
                         (SELECT id FROM messages WHERE thread IN ({placeholders}))"
                    ),
                    rusqlite::params_from_iter(thread_ids),
                )?;
                tx.execute(
                    &format!("DELETE FROM messages WHERE thread IN ({placeholders})"),
                    rusqlite::params_from_iter(thread_ids),
                )?;
            }
            ClientDBMessageStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM media", [])?;
                tx.execute("DELETE FROM messages", [])?;
            }
            ClientDBMessageStoreOperation::ReplaceThreads { threads } => {
                for thread in threads {
                    tx.execute(
                        "INSERT OR REPLACE INTO message_store_threads \
                         (id, start_reached, last_navigated_to, last_pruned) \
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            thread.id,
                            thread.start_reached,
                            thread.last_navigated_to,
                            thread.last_pruned,
                        ],
                    )?;
                }
            }
            ClientDBMessageStoreOperation::RemoveThreads { ids } => {
                remove_rows(tx, "message_store_threads", "id", ids)?;
            }
            ClientDBMessageStoreOperation::RemoveAllThreads => {
                tx.execute("DELETE FROM message_store_threads", [])?;
            }
            ClientDBMessageStoreOperation::ReplaceLocal { local_message_info } => {
                tx.execute(
                    "INSERT OR REPLACE INTO local_messages (id, local_message_info) \
                     VALUES (?1, ?2)",
                    params![
                        local_message_info.id,
                        local_message_info.local_message_info
                    ],
                )?;
            }
            ClientDBMessageStoreOperation::RemoveLocals { ids } => {
                remove_rows(tx, "local_messages", "id", ids)?;
            }
        }
    }
    Ok(())
}

fn apply_report_ops(tx: &Transaction, ops: &[ClientDBReportStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBReportStoreOperation::Replace { report } => {
                tx.execute(
                    "INSERT OR REPLACE INTO reports (id, report) VALUES (?1, ?2)",
                    params![report.id, report.report],
                )?;
            }
            ClientDBReportStoreOperation::Remove { ids } => {
                remove_rows(tx, "reports", "id", ids)?;
            }
            ClientDBReportStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM reports", [])?;
            }
        }
    }
    Ok(())
}

fn apply_keyserver_ops(tx: &Transaction, ops: &[ClientDBKeyserverStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBKeyserverStoreOperation::Replace { keyserver_info } => {
                tx.execute(
                    "INSERT OR REPLACE INTO keyservers (id, keyserver_info) VALUES (?1, ?2)",
                    params![keyserver_info.id, keyserver_info.keyserver_info],
                )?;
            }
            ClientDBKeyserverStoreOperation::Remove { ids } => {
                remove_rows(tx, "keyservers", "id", ids)?;
            }
            ClientDBKeyserverStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM keyservers", [])?;
            }
        }
    }
    Ok(())
}

fn apply_user_ops(tx: &Transaction, ops: &[ClientDBUserStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBUserStoreOperation::Replace { user_info } => {
                tx.execute(
                    "INSERT OR REPLACE INTO users (id, user_info) VALUES (?1, ?2)",
                    params![user_info.id, user_info.user_info],
                )?;
            }
            ClientDBUserStoreOperation::Remove { ids } => {
                remove_rows(tx, "users", "id", ids)?;
            }
            ClientDBUserStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM users", [])?;
            }
        }
    }
    Ok(())
}

fn apply_integrity_ops(tx: &Transaction, ops: &[ClientDBIntegrityStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBIntegrityStoreOperation::ReplaceIntegrityThreadHashes { thread_hashes } => {
                for row in thread_hashes {
                    tx.execute(
                        "INSERT OR REPLACE INTO integrity_store (id, thread_hash) \
                         VALUES (?1, ?2)",
                        params![row.id, row.thread_hash],
                    )?;
                }
            }
            ClientDBIntegrityStoreOperation::RemoveIntegrityThreadHashes { ids } => {
                remove_rows(tx, "integrity_store", "id", ids)?;
            }
            ClientDBIntegrityStoreOperation::RemoveAllIntegrityThreadHashes => {
                tx.execute("DELETE FROM integrity_store", [])?;
            }
        }
    }
    Ok(())
}

fn apply_community_ops(tx: &Transaction, ops: &[ClientDBCommunityStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBCommunityStoreOperation::Replace { community_info } => {
                tx.execute(
                    "INSERT OR REPLACE INTO communities (id, community_info) VALUES (?1, ?2)",
                    params![community_info.id, community_info.community_info],
                )?;
            }
            ClientDBCommunityStoreOperation::Remove { ids } => {
                remove_rows(tx, "communities", "id", ids)?;
            }
            ClientDBCommunityStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM communities", [])?;
            }
        }
    }
    Ok(())
}

fn apply_synced_metadata_ops(
    tx: &Transaction,
    ops: &[ClientDBSyncedMetadataStoreOperation],
) -> Result<()> {
    for op in ops {
        match op {
            ClientDBSyncedMetadataStoreOperation::Replace { entry } => {
                tx.execute(
                    "INSERT OR REPLACE INTO synced_metadata (name, data) VALUES (?1, ?2)",
                    params![entry.name, entry.data],
                )?;
            }
            ClientDBSyncedMetadataStoreOperation::Remove { names } => {
                remove_rows(tx, "synced_metadata", "name", names)?;
            }
            ClientDBSyncedMetadataStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM synced_metadata", [])?;
            }
        }
    }
    Ok(())
}

fn apply_aux_user_ops(tx: &Transaction, ops: &[ClientDBAuxUserStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBAuxUserStoreOperation::Replace { aux_user_info } => {
                tx.execute(
                    "INSERT OR REPLACE INTO aux_users (id, aux_user_info) VALUES (?1, ?2)",
                    params![aux_user_info.id, aux_user_info.aux_user_info],
                )?;
            }
            ClientDBAuxUserStoreOperation::Remove { ids } => {
                remove_rows(tx, "aux_users", "id", ids)?;
            }
            ClientDBAuxUserStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM aux_users", [])?;
            }
        }
    }
    Ok(())
}

fn apply_thread_activity_ops(
    tx: &Transaction,
    ops: &[ClientDBThreadActivityStoreOperation],
) -> Result<()> {
    for op in ops {
        match op {
            ClientDBThreadActivityStoreOperation::Replace { entry } => {
                tx.execute(
                    "INSERT OR REPLACE INTO thread_activity \
                     (id, thread_activity_store_entry) VALUES (?1, ?2)",
                    params![entry.id, entry.thread_activity_store_entry],
                )?;
            }
            ClientDBThreadActivityStoreOperation::Remove { ids } => {
                remove_rows(tx, "thread_activity", "id", ids)?;
            }
            ClientDBThreadActivityStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM thread_activity", [])?;
            }
        }
    }
    Ok(())
}

fn apply_entry_ops(tx: &Transaction, ops: &[ClientDBEntryStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            ClientDBEntryStoreOperation::Replace { entry } => {
                tx.execute(
                    "INSERT OR REPLACE INTO entries (id, entry) VALUES (?1, ?2)",
                    params![entry.id, entry.entry],
                )?;
            }
            ClientDBEntryStoreOperation::Remove { ids } => {
                remove_rows(tx, "entries", "id", ids)?;
            }
            ClientDBEntryStoreOperation::RemoveAll => {
                tx.execute("DELETE FROM entries", [])?;
            }
        }
    }
    Ok(())
}

fn apply_search_ops(tx: &Transaction, ops: &[MessageSearchStoreOperation]) -> Result<()> {
    for op in ops {
        match op {
            MessageSearchStoreOperation::UpdateSearchMessages {
                original_message_id,
                message_id,
                content,
            } => {
                tx.execute(
                    "INSERT OR REPLACE INTO message_search \
                     (original_message_id, message_id, content) VALUES (?1, ?2, ?3)",
                    params![original_message_id, message_id, content],
                )?;
            }
            MessageSearchStoreOperation::DeleteSearchMessage { message_id } => {
                tx.execute(
                    "DELETE FROM message_search WHERE original_message_id = ?1",
                    params![message_id],
                )?;
            }
        }
    }
    Ok(())
}

fn apply_outbound_p2p_messages(tx: &Transaction, messages: &[OutboundP2PMessage]) -> Result<()> {
    for message in messages {
        tx.execute(
            "INSERT OR REPLACE INTO outbound_p2p_messages \
             (message_id, device_id, user_id, timestamp, plaintext, ciphertext, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.message_id,
                message.device_id,
                message.user_id,
                message.timestamp,
                message.plaintext,
                message.ciphertext,
                message.status,
            ],
        )?;
    }
    Ok(())
}

fn apply_dm_operation_ops(
    tx: &Transaction,
    ops: &[ClientDBDMOperationStoreOperation],
) -> Result<()> {
    for op in ops {
        match op {
            ClientDBDMOperationStoreOperation::ReplaceDMOperation { operation } => {
                tx.execute(
                    "INSERT OR REPLACE INTO dm_operations (id, type, operation) \
                     VALUES (?1, ?2, ?3)",
                    params![operation.id, operation.op_type, operation.operation],
                )?;
            }
            ClientDBDMOperationStoreOperation::RemoveDMOperations { ids } => {
                remove_rows(tx, "dm_operations", "id", ids)?;
            }
            ClientDBDMOperationStoreOperation::RemoveAllDMOperations => {
                tx.execute("DELETE FROM dm_operations", [])?;
            }
            ClientDBDMOperationStoreOperation::AddQueuedDMOperation { operation } => {
                tx.execute(
                    "INSERT INTO queued_dm_operations \
                     (queue_type, queue_key, operation, timestamp) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        operation.queue_type,
                        operation.queue_key,
                        operation.operation,
                        operation.timestamp,
                    ],
                )?;
            }
            ClientDBDMOperationStoreOperation::ClearDMOperationsQueue {
                queue_type,
                queue_key,
            } => {
                tx.execute(
                    "DELETE FROM queued_dm_operations \
                     WHERE queue_type = ?1 AND queue_key = ?2",
                    params![queue_type, queue_key],
                )?;
            }
            ClientDBDMOperationStoreOperation::PruneQueuedDMOperations {
                prune_max_timestamp,
            } => {
                tx.execute(
                    "DELETE FROM queued_dm_operations WHERE timestamp < ?1",
                    params![prune_max_timestamp],
                )?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Row Loading
// ============================================================================

fn load_threads(conn: &Connection) -> Result<Vec<ClientDBThreadInfo>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, name, description, color, creation_time, parent_thread_id, \
         containing_thread_id, community, members, roles, current_user, \
         replies_count, pinned_count, avatar FROM threads",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClientDBThreadInfo {
            id: row.get(0)?,
            thread_type: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            color: row.get(4)?,
            creation_time: row.get(5)?,
            parent_thread_id: row.get(6)?,
            containing_thread_id: row.get(7)?,
            community: row.get(8)?,
            members: row.get(9)?,
            roles: row.get(10)?,
            current_user: row.get(11)?,
            replies_count: row.get(12)?,
            pinned_count: row.get(13)?,
            avatar: row.get(14)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn load_message_store_threads(conn: &Connection) -> Result<Vec<ClientDBThreadMessageInfo>> {
    let mut stmt = conn.prepare(
        "SELECT id, start_reached, last_navigated_to, last_pruned FROM message_store_threads",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClientDBThreadMessageInfo {
            id: row.get(0)?,
            start_reached: row.get(1)?,
            last_navigated_to: row.get(2)?,
            last_pruned: row.get(3)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn load_kv_rows<T>(
    conn: &Connection,
    sql: &str,
    build: impl Fn(String, String) -> T,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(build(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn load_dm_operations(conn: &Connection) -> Result<Vec<ClientDBDMOperation>> {
    let mut stmt = conn.prepare("SELECT id, type, operation FROM dm_operations")?;
    let rows = stmt.query_map([], |row| {
        Ok(ClientDBDMOperation {
            id: row.get(0)?,
            op_type: row.get(1)?,
            operation: row.get(2)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn load_queued_dm_operations(conn: &Connection) -> Result<Vec<ClientDBQueuedDMOperation>> {
    let mut stmt = conn.prepare(
        "SELECT queue_type, queue_key, operation, timestamp FROM queued_dm_operations \
         ORDER BY timestamp",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClientDBQueuedDMOperation {
            queue_type: row.get(0)?,
            queue_key: row.get(1)?,
            operation: row.get(2)?,
            timestamp: row.get(3)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_db::{
        convert_store_operations_to_client_db_store_operations, translate_client_db_store,
    };
    use crate::ops::{
        DraftStoreOperation, MessageStoreOperation, StoreOperations, SyncedMetadataStoreOperation,
        ThreadStoreOperation,
    };
    use crate::types::message::{MessageContent, RawMessageInfo};
    use crate::types::thread::{RawThreadInfo, ThreadCurrentUserInfo, ThreadSubscription};
    use std::collections::BTreeMap;

    fn sample_thread(id: &str) -> RawThreadInfo {
        RawThreadInfo {
            id: id.to_string(),
            thread_type: 3,
            name: Some("general".to_string()),
            description: None,
            color: "648caa".to_string(),
            creation_time: 1_689_091_732_528,
            parent_thread_id: None,
            containing_thread_id: None,
            community: None,
            members: vec![],
            roles: BTreeMap::new(),
            current_user: ThreadCurrentUserInfo {
                role: None,
                permissions: BTreeMap::new(),
                subscription: ThreadSubscription {
                    home: true,
                    push_notifs: true,
                },
                unread: false,
            },
            replies_count: 0,
            pinned_count: 0,
            avatar: None,
        }
    }

    fn text_message(id: &str, thread: &str, time: i64) -> RawMessageInfo {
        RawMessageInfo {
            id: Some(id.to_string()),
            local_id: None,
            thread_id: thread.to_string(),
            creator_id: "256".to_string(),
            time,
            content: MessageContent::Text {
                text: "hello".to_string(),
            },
        }
    }

    fn commit(db: &Database, ops: StoreOperations) {
        let converted = convert_store_operations_to_client_db_store_operations(&ops).unwrap();
        db.process_store_operations(&converted).unwrap();
    }

    #[test]
    fn test_commit_then_hydrate_round_trips_stores() {
        let db = Database::open(None).unwrap();
        commit(
            &db,
            StoreOperations {
                thread_store_operations: vec![ThreadStoreOperation::replace(sample_thread(
                    "256|84015",
                ))],
                message_store_operations: vec![MessageStoreOperation::Replace {
                    message_info: text_message("m1", "256|84015", 1_000),
                }],
                synced_metadata_store_operations: vec![SyncedMetadataStoreOperation::Replace {
                    name: "current_user_id".to_string(),
                    value: "256".to_string(),
                }],
                ..Default::default()
            },
        );

        let hydrated = translate_client_db_store(db.load_client_db_store().unwrap()).unwrap();
        assert_eq!(
            hydrated.thread_store.thread_infos["256|84015"],
            sample_thread("256|84015")
        );
        assert_eq!(
            hydrated.message_store.messages["m1"],
            text_message("m1", "256|84015", 1_000)
        );
        assert_eq!(
            hydrated.synced_metadata_store.synced_metadata["current_user_id"],
            "256"
        );
    }

    #[test]
    fn test_remove_all_then_replace_within_one_transaction() {
        let db = Database::open(None).unwrap();
        commit(
            &db,
            StoreOperations {
                thread_store_operations: vec![
                    ThreadStoreOperation::replace(sample_thread("256|84015")),
                    ThreadStoreOperation::replace(sample_thread("256|84020")),
                ],
                ..Default::default()
            },
        );
        commit(
            &db,
            StoreOperations {
                thread_store_operations: vec![
                    ThreadStoreOperation::RemoveAll,
                    ThreadStoreOperation::replace(sample_thread("256|84020")),
                ],
                ..Default::default()
            },
        );
        let hydrated = translate_client_db_store(db.load_client_db_store().unwrap()).unwrap();
        assert_eq!(hydrated.thread_store.thread_infos.len(), 1);
        assert!(hydrated
            .thread_store
            .thread_infos
            .contains_key("256|84020"));
    }

    #[test]
    fn test_rekey_moves_the_message_row() {
        let db = Database::open(None).unwrap();
        let mut local = text_message("local1", "256|84015", 1_000);
        local.id = None;
        local.local_id = Some("local1".to_string());
        commit(
            &db,
            StoreOperations {
                message_store_operations: vec![MessageStoreOperation::Replace {
                    message_info: local,
                }],
                ..Default::default()
            },
        );
        commit(
            &db,
            StoreOperations {
                message_store_operations: vec![MessageStoreOperation::Rekey {
                    from: "local1".to_string(),
                    to: "103502".to_string(),
                }],
                ..Default::default()
            },
        );
        let hydrated = translate_client_db_store(db.load_client_db_store().unwrap()).unwrap();
        assert!(!hydrated.message_store.messages.contains_key("local1"));
        let moved = &hydrated.message_store.messages["103502"];
        assert_eq!(moved.id.as_deref(), Some("103502"));
        assert_eq!(moved.local_id.as_deref(), Some("local1"));
    }

    #[test]
    fn test_rekey_duplicate_delivery_keeps_server_row() {
        let db = Database::open(None).unwrap();
        let mut local = text_message("local1", "256|84015", 1_000);
        local.id = None;
        local.local_id = Some("local1".to_string());
        local.content = MessageContent::Images {
            media: vec![crate::types::message::Media::Photo {
                id: "upload9".to_string(),
                uri: "https://cdn.example/upload9".to_string(),
                dimensions: crate::types::message::Dimensions {
                    height: 100,
                    width: 100,
                },
                thumb_hash: None,
            }],
        };
        let mut server = text_message("103502", "256|84015", 1_200);
        server.content = MessageContent::Text {
            text: "server canonical text".to_string(),
        };
        commit(
            &db,
            StoreOperations {
                message_store_operations: vec![
                    MessageStoreOperation::Replace {
                        message_info: local,
                    },
                    MessageStoreOperation::Replace {
                        message_info: server.clone(),
                    },
                ],
                ..Default::default()
            },
        );
        commit(
            &db,
            StoreOperations {
                message_store_operations: vec![MessageStoreOperation::Rekey {
                    from: "local1".to_string(),
                    to: "103502".to_string(),
                }],
                ..Default::default()
            },
        );
        let raw = db.load_client_db_store().unwrap();
        // The local row's media must not get re-parented onto the
        // server message.
        assert!(raw
            .messages
            .iter()
            .all(|message_info| message_info.media_infos.is_empty()));
        let hydrated = translate_client_db_store(raw).unwrap();
        assert!(!hydrated.message_store.messages.contains_key("local1"));
        assert_eq!(hydrated.message_store.messages["103502"], server);
    }

    #[test]
    fn test_drafts_persist_and_move() {
        let db = Database::open(None).unwrap();
        commit(
            &db,
            StoreOperations {
                draft_store_operations: vec![DraftStoreOperation::UpdateDraft {
                    key: "pending/type6/256".to_string(),
                    text: "hey there".to_string(),
                }],
                ..Default::default()
            },
        );
        commit(
            &db,
            StoreOperations {
                draft_store_operations: vec![DraftStoreOperation::MoveDraft {
                    old_key: "pending/type6/256".to_string(),
                    new_key: "256|84015".to_string(),
                }],
                ..Default::default()
            },
        );
        assert_eq!(db.load_draft("pending/type6/256").unwrap(), None);
        assert_eq!(
            db.load_draft("256|84015").unwrap(),
            Some("hey there".to_string())
        );
    }

    #[test]
    fn test_file_backed_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.db");
        let path = path.to_str().unwrap();
        {
            let db = Database::open(Some(path)).unwrap();
            commit(
                &db,
                StoreOperations {
                    thread_store_operations: vec![ThreadStoreOperation::replace(sample_thread(
                        "256|84015",
                    ))],
                    ..Default::default()
                },
            );
        }
        let db = Database::open(Some(path)).unwrap();
        let hydrated = translate_client_db_store(db.load_client_db_store().unwrap()).unwrap();
        assert!(hydrated
            .thread_store
            .thread_infos
            .contains_key("256|84015"));
    }
}
