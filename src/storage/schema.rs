//! # Database Schema
//!
//! SQL schema definitions for the client database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐      ┌─────────────────┐    │
//! │  │    threads      │    │    messages     │      │      media      │    │
//! │  ├─────────────────┤    ├─────────────────┤      ├─────────────────┤    │
//! │  │ id              │◄───│ thread          │      │ id              │    │
//! │  │ type            │    │ id              │◄─────│ container       │    │
//! │  │ name            │    │ local_id        │      │ uri             │    │
//! │  │ creation_time   │    │ user            │      │ type            │    │
//! │  │ members (JSON)  │    │ type            │      │ extras (JSON)   │    │
//! │  │ roles (JSON)    │    │ future_type     │      └─────────────────┘    │
//! │  │ current_user    │    │ content         │                             │
//! │  │ avatar (JSON)   │    │ time            │      ┌─────────────────┐    │
//! │  └─────────────────┘    └─────────────────┘      │ message_store_  │    │
//! │                                                  │ threads         │    │
//! │  One row table per remaining store:              ├─────────────────┤    │
//! │  drafts, local_messages, entries, users,         │ id              │    │
//! │  keyservers, communities, integrity_store,       │ start_reached   │    │
//! │  aux_users, synced_metadata, thread_activity,    │ last_navigated  │    │
//! │  reports, message_search, outbound_p2p,          │ last_pruned     │    │
//! │  dm_operations, queued_dm_operations             └─────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nested structures are JSON text columns; timestamps that originate as
//! 64-bit integers on the wire are stored as TEXT where the row shape
//! must stay stable across platforms without 64-bit integers.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Draft text, written straight through the queue by the UI
CREATE TABLE IF NOT EXISTS drafts (
    key TEXT PRIMARY KEY,
    text TEXT NOT NULL
);

-- Thread records; nested structures are JSON text columns
CREATE TABLE IF NOT EXISTS threads (
    id TEXT PRIMARY KEY,
    type INTEGER NOT NULL,
    name TEXT,
    description TEXT,
    color TEXT NOT NULL,
    -- Unix ms, stored as text
    creation_time TEXT NOT NULL,
    parent_thread_id TEXT,
    containing_thread_id TEXT,
    community TEXT,
    members TEXT NOT NULL,
    roles TEXT NOT NULL,
    current_user TEXT NOT NULL,
    replies_count INTEGER NOT NULL DEFAULT 0,
    pinned_count INTEGER NOT NULL DEFAULT 0,
    avatar TEXT,
    is_backed_up INTEGER NOT NULL DEFAULT 0
);

-- Flat message table; the per-thread ordering is derived at hydration
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    local_id TEXT,
    thread TEXT NOT NULL,
    user TEXT NOT NULL,
    -- Message type code, as text
    type TEXT NOT NULL,
    -- Sender-declared code for unsupported messages
    future_type TEXT,
    content TEXT,
    -- Unix ms, stored as text
    time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread);

-- Media attachments, one row per attachment
CREATE TABLE IF NOT EXISTS media (
    id TEXT NOT NULL,
    -- Message id the attachment belongs to
    container TEXT NOT NULL,
    uri TEXT NOT NULL,
    type TEXT NOT NULL,
    -- JSON-encoded complete media record
    extras TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_media_container ON media(container);

-- Per-thread message view scalars (the id list is derived)
CREATE TABLE IF NOT EXISTS message_store_threads (
    id TEXT PRIMARY KEY,
    start_reached INTEGER NOT NULL DEFAULT 0,
    last_navigated_to INTEGER NOT NULL DEFAULT 0,
    last_pruned INTEGER NOT NULL DEFAULT 0
);

-- Client-only delivery bookkeeping
CREATE TABLE IF NOT EXISTS local_messages (
    id TEXT PRIMARY KEY,
    local_message_info TEXT NOT NULL
);

-- Calendar entries
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    entry TEXT NOT NULL
);

-- User records
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    user_info TEXT NOT NULL
);

-- Keyserver records
CREATE TABLE IF NOT EXISTS keyservers (
    id TEXT PRIMARY KEY,
    keyserver_info TEXT NOT NULL
);

-- Community metadata
CREATE TABLE IF NOT EXISTS communities (
    id TEXT PRIMARY KEY,
    community_info TEXT NOT NULL
);

-- Per-thread integrity hashes, stored as decimal text
CREATE TABLE IF NOT EXISTS integrity_store (
    id TEXT PRIMARY KEY,
    thread_hash TEXT NOT NULL
);

-- Auxiliary user metadata
CREATE TABLE IF NOT EXISTS aux_users (
    id TEXT PRIMARY KEY,
    aux_user_info TEXT NOT NULL
);

-- Small named values replicated across the user's devices
CREATE TABLE IF NOT EXISTS synced_metadata (
    name TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

-- Local navigation/prune timestamps
CREATE TABLE IF NOT EXISTS thread_activity (
    id TEXT PRIMARY KEY,
    thread_activity_store_entry TEXT NOT NULL
);

-- Queued inconsistency reports
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    report TEXT NOT NULL
);

-- Full-text search index over locally-owned threads. One row per
-- original message; edits overwrite the row in place.
CREATE TABLE IF NOT EXISTS message_search (
    original_message_id TEXT PRIMARY KEY,
    message_id TEXT NOT NULL,
    content TEXT NOT NULL
);

-- Encrypted messages bound for peer devices
CREATE TABLE IF NOT EXISTS outbound_p2p_messages (
    message_id TEXT PRIMARY KEY,
    device_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    plaintext TEXT NOT NULL,
    ciphertext TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Shimmed DM operations awaiting a client upgrade
CREATE TABLE IF NOT EXISTS dm_operations (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    operation TEXT NOT NULL
);

-- Condition-keyed queues of DM operations awaiting a prerequisite
CREATE TABLE IF NOT EXISTS queued_dm_operations (
    queue_type TEXT NOT NULL,
    queue_key TEXT NOT NULL,
    operation TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_queued_dm_operations_queue
    ON queued_dm_operations(queue_type, queue_key);
"#;

/// Migration from v1 to v2: the DM operations tables
pub const MIGRATE_V1_TO_V2: &str = r#"
CREATE TABLE IF NOT EXISTS dm_operations (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    operation TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queued_dm_operations (
    queue_type TEXT NOT NULL,
    queue_key TEXT NOT NULL,
    operation TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_queued_dm_operations_queue
    ON queued_dm_operations(queue_type, queue_key);

UPDATE schema_version SET version = 2;
"#;
