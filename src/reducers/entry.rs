//! The Entry Store reducer.

use crate::ops::{EntryStoreOperation, EntryStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::entry::EntryStore;

use super::ReducerResult;

type EntryReducerResult = ReducerResult<EntryStore, EntryStoreOperation>;

/// Reduce the Entry Store over one action.
pub fn reduce_entry_store(store: EntryStore, action: &Action) -> EntryReducerResult {
    match action {
        Action::CreateOrUpdateEntry { entry_info } => {
            let key = entry_info.entry_id();
            if store.entry_infos.get(key) == Some(entry_info) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![EntryStoreOperation::Replace {
                    entry: entry_info.clone(),
                }],
            )
        }
        Action::DeleteEntry { entry_id } => {
            if !store.entry_infos.contains_key(entry_id) {
                return ReducerResult::unchanged(store);
            }
            apply(
                store,
                vec![EntryStoreOperation::Remove {
                    ids: vec![entry_id.clone()],
                }],
            )
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.entry_infos.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![EntryStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(store: EntryStore, operations: Vec<EntryStoreOperation>) -> EntryReducerResult {
    let store = EntryStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::entry::RawEntryInfo;

    fn sample_entry(id: &str, text: &str) -> RawEntryInfo {
        RawEntryInfo {
            id: Some(id.to_string()),
            local_id: None,
            thread_id: "256|84015".to_string(),
            text: text.to_string(),
            year: 2024,
            month: 7,
            day: 11,
            creation_time: 1_689_091_732_528,
            creator_id: "256".to_string(),
            deleted: false,
        }
    }

    #[test]
    fn test_create_then_delete_entry() {
        let created = reduce_entry_store(
            EntryStore::default(),
            &Action::CreateOrUpdateEntry {
                entry_info: sample_entry("e1", "dentist"),
            },
        );
        assert!(created.store.entry_infos.contains_key("e1"));

        let deleted = reduce_entry_store(
            created.store,
            &Action::DeleteEntry {
                entry_id: "e1".to_string(),
            },
        );
        assert!(deleted.store.entry_infos.is_empty());
    }

    #[test]
    fn test_identical_entry_is_a_no_op() {
        let created = reduce_entry_store(
            EntryStore::default(),
            &Action::CreateOrUpdateEntry {
                entry_info: sample_entry("e1", "dentist"),
            },
        );
        let again = reduce_entry_store(
            created.store,
            &Action::CreateOrUpdateEntry {
                entry_info: sample_entry("e1", "dentist"),
            },
        );
        assert!(again.operations.is_empty());
    }

    #[test]
    fn test_delete_of_missing_entry_is_a_no_op() {
        let result = reduce_entry_store(
            EntryStore::default(),
            &Action::DeleteEntry {
                entry_id: "missing".to_string(),
            },
        );
        assert!(result.operations.is_empty());
    }
}
