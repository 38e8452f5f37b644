//! # Driftline Sync
//!
//! The offline-first store synchronization engine for the Driftline
//! messaging app: per-store reducers derive declarative operations from
//! actions, a FIFO queue carries the operations to SQLite, and the same
//! operations keep the in-memory stores and the database describing the
//! identical state.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       DRIFTLINE SYNC MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Actions   │  │  Reducers   │  │   Updates   │  │  Integrity   │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Syncs     │  │ - Threads   │  │ - Per-kind  │  │ - SHA-256    │   │
//! │  │ - Messages  │  │ - Messages  │  │   specs     │  │ - 53-bit     │   │
//! │  │ - Logout    │  │ - Users, …  │  │ - Compact   │  │ - Pairing    │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────────────┴────────────────┘           │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌─────────────┐ │ ┌─────────────────────────────────┐│
//! │  │  DB Ops     │  │  Client DB  │ │ │           Storage               ││
//! │  │  Queue      │  │ Translation │◄┘ │ - SQLite (rusqlite)            ││
//! │  │             │  │             │   │ - One transaction per batch     ││
//! │  │ - FIFO      │  │ - Row shape │   │ - Cold-start hydration          ││
//! │  │ - Tracking  │  │ - Inverse   │   │ - Sequential migrations         ││
//! │  └─────────────┘  └─────────────┘   └─────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`time`] - Timestamp helpers
//! - [`types`] - Store snapshots, actions, and wire payloads
//! - [`ops`] - Per-store operation vocabularies and handlers
//! - [`updates`] - Per-kind handling of server updates
//! - [`reducers`] - One reducer per domain store
//! - [`integrity`] - Thread hashing and message pruning
//! - [`db_ops`] - The FIFO queue and dispatch-completion tracking
//! - [`client_db`] - Typed-state ↔ persisted-row translation
//! - [`storage`] - SQLite persistence
//! - [`state`] - The root app state and reduce entry point
//!
//! ## Consistency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CONSISTENCY MODEL                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  One source of truth per dispatch: the operation list.                 │
//! │  ─────────────────────────────────────────────────────                  │
//! │  Reducers fold their own operations over the in-memory store AND      │
//! │  queue the same operations for the database, so the two can only      │
//! │  disagree while a batch is still in the queue — and replaying the     │
//! │  queue closes exactly that gap.                                        │
//! │                                                                         │
//! │  At-least-once persistence.                                            │
//! │  ───────────────────────────                                            │
//! │  Batches commit in one transaction each, strictly FIFO. A failed      │
//! │  commit leaves the batch at the head for retry; operations are        │
//! │  declarative deltas, so redelivery is harmless.                        │
//! │                                                                         │
//! │  Server-authoritative reconciliation.                                  │
//! │  ─────────────────────────────────────                                  │
//! │  Full syncs replace wholesale; CHECK_STATE corrections overwrite      │
//! │  unconditionally; surviving divergence becomes a queued telemetry     │
//! │  report, never an error.                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod client_db;
pub mod db_ops;
pub mod error;
pub mod integrity;
pub mod ops;
pub mod reducers;
pub mod state;
pub mod storage;
/// Timestamp helpers shared by reducers and pruning.
pub mod time;
pub mod types;
pub mod updates;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use db_ops::context::OpsContext;
pub use error::{Error, Result};
pub use state::AppState;
pub use storage::Database;
pub use types::action::{new_action_id, Action, ActionID, DispatchMetadata};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
