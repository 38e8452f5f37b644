//! The Aux User Store reducer.

use crate::ops::{AuxUserStoreOperation, AuxUserStoreOpsHandler, StoreOpsHandler};
use crate::types::action::Action;
use crate::types::user::AuxUserStore;

use super::ReducerResult;

type AuxUserReducerResult = ReducerResult<AuxUserStore, AuxUserStoreOperation>;

/// Reduce the Aux User Store over one action.
pub fn reduce_aux_user_store(store: AuxUserStore, action: &Action) -> AuxUserReducerResult {
    match action {
        Action::AddAuxUserInfos { aux_user_infos } => {
            let mut ids: Vec<&String> = aux_user_infos
                .iter()
                .filter(|(id, aux_user_info)| {
                    store.aux_user_infos.get(*id) != Some(aux_user_info)
                })
                .map(|(id, _)| id)
                .collect();
            ids.sort();
            let operations: Vec<AuxUserStoreOperation> = ids
                .into_iter()
                .map(|id| AuxUserStoreOperation::Replace {
                    id: id.clone(),
                    aux_user_info: aux_user_infos[id].clone(),
                })
                .collect();
            if operations.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, operations)
        }
        Action::LogOutSuccess | Action::DeleteAccountSuccess | Action::SessionInvalidated => {
            if store.aux_user_infos.is_empty() {
                return ReducerResult::unchanged(store);
            }
            apply(store, vec![AuxUserStoreOperation::RemoveAll])
        }
        _ => ReducerResult::unchanged(store),
    }
}

fn apply(store: AuxUserStore, operations: Vec<AuxUserStoreOperation>) -> AuxUserReducerResult {
    let store = AuxUserStoreOpsHandler::process_store_operations(store, &operations);
    ReducerResult::with_ops(store, operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::user::AuxUserInfo;
    use std::collections::HashMap;

    fn linked(fid: &str) -> AuxUserInfo {
        AuxUserInfo {
            fid: Some(fid.to_string()),
            device_list: None,
        }
    }

    #[test]
    fn test_add_aux_user_infos_replaces_only_changed_records() {
        let seeded = reduce_aux_user_store(
            AuxUserStore::default(),
            &Action::AddAuxUserInfos {
                aux_user_infos: HashMap::from([
                    ("256".to_string(), linked("12")),
                    ("512".to_string(), linked("34")),
                ]),
            },
        );
        assert_eq!(seeded.operations.len(), 2);

        let result = reduce_aux_user_store(
            seeded.store,
            &Action::AddAuxUserInfos {
                aux_user_infos: HashMap::from([
                    ("256".to_string(), linked("12")),
                    ("512".to_string(), linked("99")),
                ]),
            },
        );
        assert_eq!(result.operations.len(), 1);
        assert_eq!(
            result.store.aux_user_infos["512"].fid,
            Some("99".to_string())
        );
    }

    #[test]
    fn test_logout_clears_store() {
        let seeded = reduce_aux_user_store(
            AuxUserStore::default(),
            &Action::AddAuxUserInfos {
                aux_user_infos: HashMap::from([("256".to_string(), linked("12"))]),
            },
        );
        let result = reduce_aux_user_store(seeded.store, &Action::LogOutSuccess);
        assert!(result.store.aux_user_infos.is_empty());
    }
}
