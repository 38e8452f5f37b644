//! # Integrity
//!
//! Thread hashing for divergence detection, and the pairing rule that
//! keeps the Integrity Store in lockstep with the Thread Store.
//!
//! ## Hash Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         THREAD HASHING                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  RawThreadInfo                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────┐  canonical JSON: struct fields in declaration     │
//! │  │  serde_json     │  order, nested maps are BTreeMaps so object       │
//! │  │  serialization  │  keys are always sorted                           │
//! │  └────────┬────────┘                                                   │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    SHA-256      │                                                   │
//! │  └────────┬────────┘                                                   │
//! │           ▼                                                             │
//! │  first 8 bytes, big-endian u64, masked to 53 bits                      │
//! │  (survives transport through IEEE-754 doubles unchanged)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pairing rule: every Thread Store operation a reducer emits gets an
//! equivalent Integrity operation in the same batch — replace recomputes
//! the hash, remove/remove_all drop the entries. The two stores must
//! never diverge; a hash row without its thread (or the reverse) is a
//! correctness bug.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::Result;
use crate::ops::{IntegrityStoreOperation, ThreadStoreOperation};
use crate::types::thread::RawThreadInfo;

pub mod pruning;

/// Hash values are masked to 53 bits so they survive being handled as
/// IEEE-754 doubles by keyservers and older clients.
pub const THREAD_HASH_BITS: u32 = 53;

const THREAD_HASH_MASK: u64 = (1 << THREAD_HASH_BITS) - 1;

/// The Integrity Store: one canonical-content hash per known thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityStore {
    /// Hash values keyed by thread id
    pub thread_hashes: HashMap<String, u64>,
}

/// Compute the canonical-content hash for one thread.
pub fn hash_thread_info(thread_info: &RawThreadInfo) -> Result<u64> {
    let canonical = serde_json::to_vec(thread_info)?;
    let digest = Sha256::digest(&canonical);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    Ok(u64::from_be_bytes(prefix) & THREAD_HASH_MASK)
}

/// Derive the Integrity operations that pair with a batch of Thread
/// Store operations, preserving the batch's order.
pub fn integrity_ops_for_thread_ops(
    thread_ops: &[ThreadStoreOperation],
) -> Result<Vec<IntegrityStoreOperation>> {
    let mut integrity_ops = Vec::with_capacity(thread_ops.len());
    for op in thread_ops {
        match op {
            ThreadStoreOperation::Replace { thread_info, .. } => {
                let hash = hash_thread_info(thread_info)?;
                integrity_ops.push(IntegrityStoreOperation::ReplaceThreadHashes {
                    thread_hashes: HashMap::from([(thread_info.id.clone(), hash)]),
                });
            }
            ThreadStoreOperation::Remove { ids } => {
                integrity_ops.push(IntegrityStoreOperation::RemoveThreadHashes {
                    ids: ids.clone(),
                });
            }
            ThreadStoreOperation::RemoveAll => {
                integrity_ops.push(IntegrityStoreOperation::RemoveAllThreadHashes);
            }
        }
    }
    Ok(integrity_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{IntegrityStoreOpsHandler, StoreOpsHandler, ThreadStoreOpsHandler};
    use crate::types::thread::{ThreadCurrentUserInfo, ThreadStore, ThreadSubscription};
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

    #[test]
    fn test_hash_is_deterministic() {
        let thread_info = sample_thread("256|84015");
        let a = hash_thread_info(&thread_info).unwrap();
        let b = hash_thread_info(&thread_info.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_fits_in_53_bits() {
        let hash = hash_thread_info(&sample_thread("256|84015")).unwrap();
        assert!(hash < (1 << THREAD_HASH_BITS));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = hash_thread_info(&sample_thread("256|84015")).unwrap();
        let mut renamed = sample_thread("256|84015");
        renamed.name = Some("general-2".to_string());
        let b = hash_thread_info(&renamed).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_paired_ops_keep_stores_in_lockstep() {
        let thread_ops = vec![
            ThreadStoreOperation::replace(sample_thread("256|84015")),
            ThreadStoreOperation::replace(sample_thread("256|84020")),
            ThreadStoreOperation::Remove {
                ids: vec!["256|84020".to_string()],
            },
        ];
        let integrity_ops = integrity_ops_for_thread_ops(&thread_ops).unwrap();

        let thread_store =
            ThreadStoreOpsHandler::process_store_operations(ThreadStore::default(), &thread_ops);
        let integrity_store = IntegrityStoreOpsHandler::process_store_operations(
            IntegrityStore::default(),
            &integrity_ops,
        );

        assert_eq!(
            thread_store.thread_infos.len(),
            integrity_store.thread_hashes.len()
        );
        for (id, thread_info) in &thread_store.thread_infos {
            assert_eq!(
                integrity_store.thread_hashes[id],
                hash_thread_info(thread_info).unwrap()
            );
        }
    }

    #[test]
    fn test_remove_all_pairs_with_remove_all() {
        let integrity_ops =
            integrity_ops_for_thread_ops(&[ThreadStoreOperation::RemoveAll]).unwrap();
        assert_eq!(
            integrity_ops,
            vec![IntegrityStoreOperation::RemoveAllThreadHashes]
        );
    }
}
