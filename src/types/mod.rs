//! # Domain Types
//!
//! Record types and store snapshots for every domain store, plus the
//! action and update vocabularies consumed by the reducers.
//!
//! Every store is a keyed collection representing one domain's current
//! truth, exclusively owned by [`crate::state::AppState`]. Nested maps use
//! `BTreeMap` so canonical serialization (integrity hashing, persisted-row
//! JSON) is deterministic regardless of insertion order.

pub mod action;
pub mod community;
pub mod dm_ops;
pub mod entry;
pub mod keyserver;
pub mod message;
pub mod report;
pub mod synced_metadata;
pub mod thread;
pub mod thread_activity;
pub mod update;
pub mod user;

pub use action::{Action, ActionID, DispatchMetadata};
pub use message::{MessageStore, RawMessageInfo};
pub use thread::{RawThreadInfo, ThreadStore};
pub use update::ClientUpdateInfo;
