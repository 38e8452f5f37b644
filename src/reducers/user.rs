//! The User Store reducer.

use crate::ops::{StoreOpsHandler, UserStoreOperation, UserStoreOpsHandler};
use crate::types::action::Action;
use crate::types::user::{UserInfo, UserStore};
use crate::updates::{compact_updates, update_spec_for};

use super::ReducerResult;

type UserReducerResult = ReducerResult<UserStore, UserStoreOperation>;

/// Reduce the User Store over one action.
pub fn reduce_user_store(store: UserStore, action: &Action) -> UserReducerResult {
    match action {
        Action::LogInSuccess(payload) | Action::FullStateSync(payload) => {
            full_replace(store, &payload.user_infos)
        }
        Action::IncrementalStateSync(payload) => {
            let result = merge(store, &payload.user_infos);
            apply_updates(result, &payload.new_updates)
        }
        Action::ProcessUpdates { new_updates } => {
            apply_updates(ReducerResult::unchanged(store), new_updates)
        }
        Action::UpdateUserInfos { user_infos } => merge(store, user_infos),
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.user_infos.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![UserStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(store: UserStore, operations: Vec<UserStoreOperation>) -> UserReducerResult {
    let store = UserStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

/// Full state replacement: everything local goes, the server's
/// declaration comes in.
fn full_replace(store: UserStore, user_infos: &[UserInfo]) -> UserReducerResult {
    let mut operations = vec![UserStoreOperation::RemoveAll];
    let mut sorted: Vec<&UserInfo> = user_infos.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    for user_info in sorted {
        operations.push(UserStoreOperation::Replace {
            user_info: user_info.clone(),
        });
    }
    apply(store, operations)
}

/// Replace only the records that actually changed.
fn merge(store: UserStore, user_infos: &[UserInfo]) -> UserReducerResult {
    let mut operations = Vec::new();
    for user_info in user_infos {
        if store.user_infos.get(&user_info.id) != Some(user_info) {
            operations.push(UserStoreOperation::Replace {
                user_info: user_info.clone(),
            });
        }
    }
    if operations.is_empty() {
        return ReducerResult::unchanged(store);
    }
    apply(store, operations)
}

fn apply_updates(
    mut result: UserReducerResult,
    new_updates: &[crate::types::update::ClientUpdateInfo],
) -> UserReducerResult {
    for update in compact_updates(new_updates) {
        let spec = update_spec_for(update.update_type());
        let Some(ops) = spec.reduce_user_infos(&result.store.user_infos, &update) else {
            continue;
        };
        result.store = UserStoreOpsHandler::process_store_operations(result.store, &ops);
        result.operations.extend(ops);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::update::ClientUpdateInfo;

    fn sample_user(id: &str, username: &str) -> UserInfo {
        UserInfo {
            id: id.to_string(),
            username: Some(username.to_string()),
            relationship_status: None,
            avatar: None,
        }
    }

    #[test]
    fn test_update_user_infos_skips_identical_records() {
        let seeded = reduce_user_store(
            UserStore::default(),
            &Action::UpdateUserInfos {
                user_infos: vec![sample_user("256", "ashoat")],
            },
        );
        assert_eq!(seeded.operations.len(), 1);
        let again = reduce_user_store(
            seeded.store,
            &Action::UpdateUserInfos {
                user_infos: vec![sample_user("256", "ashoat")],
            },
        );
        assert!(again.operations.is_empty());
    }

    #[test]
    fn test_delete_account_update_removes_user() {
        let seeded = reduce_user_store(
            UserStore::default(),
            &Action::UpdateUserInfos {
                user_infos: vec![sample_user("256", "ashoat"), sample_user("512", "gone")],
            },
        );
        let result = reduce_user_store(
            seeded.store,
            &Action::ProcessUpdates {
                new_updates: vec![ClientUpdateInfo::DeleteAccount {
                    id: "u1".to_string(),
                    time: 1_000,
                    deleted_user_id: "512".to_string(),
                }],
            },
        );
        assert!(!result.store.user_infos.contains_key("512"));
        assert!(result.store.user_infos.contains_key("256"));
    }

    #[test]
    fn test_logout_clears_store() {
        let seeded = reduce_user_store(
            UserStore::default(),
            &Action::UpdateUserInfos {
                user_infos: vec![sample_user("256", "ashoat")],
            },
        );
        let result = reduce_user_store(seeded.store, &Action::LogOutSuccess);
        assert!(result.store.user_infos.is_empty());
        assert_eq!(result.operations, vec![UserStoreOperation::RemoveAll]);
        // Logging out twice emits nothing the second time.
        let again = reduce_user_store(result.store, &Action::LogOutSuccess);
        assert!(again.operations.is_empty());
    }
}
