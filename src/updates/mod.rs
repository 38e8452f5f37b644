//! Per-kind handling of server updates.
//!
//! Each update kind gets a small spec object implementing the optional
//! capabilities it needs; dispatch is a match over the kind tag in
//! [`update_spec_for`]. New update kinds are added by writing a new spec
//! and extending that match — reducer control flow never changes.
//!
//! A capability returning `None` means "this update implies no mutation
//! here": a JoinThread whose thread content is already identical emits
//! nothing, avoiding a redundant write and a redundant hash recompute.

use std::collections::HashMap;

use crate::ops::{ThreadStoreOperation, UserStoreOperation};
use crate::types::thread::RawThreadInfo;
use crate::types::update::{ClientUpdateInfo, UpdateType};
use crate::types::user::UserInfo;
use crate::types::RawMessageInfo;

/// How an update supersedes earlier pending updates for the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDeleteCondition {
    /// Supersedes every earlier update for the key
    AllForKey,
    /// Supersedes earlier updates of these kinds for the key
    Kinds(&'static [UpdateType]),
}

/// An update's supersession claim: the key it owns and how far back it
/// reaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSupersession {
    /// The record key (thread id, user id, device token)
    pub key: String,
    /// What the update supersedes
    pub condition: UpdateDeleteCondition,
}

/// Optional capabilities one update kind may implement
pub trait UpdateSpec {
    /// Thread Store operations this update implies, or `None` when the
    /// stored state already matches.
    fn generate_ops_for_thread_updates(
        &self,
        _thread_infos: &HashMap<String, RawThreadInfo>,
        _update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        None
    }

    /// User Store operations this update implies
    fn reduce_user_infos(
        &self,
        _user_infos: &HashMap<String, UserInfo>,
        _update: &ClientUpdateInfo,
    ) -> Option<Vec<UserStoreOperation>> {
        None
    }

    /// Messages delivered inside this update (JoinThread seeds history)
    fn raw_message_infos(&self, _update: &ClientUpdateInfo) -> Vec<RawMessageInfo> {
        Vec::new()
    }

    /// Which earlier pending updates this one makes redundant
    fn delete_condition(&self, _update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        None
    }
}

// ============================================================================
// Per-Kind Specs
// ============================================================================

struct UpdateThreadSpec;

impl UpdateSpec for UpdateThreadSpec {
    fn generate_ops_for_thread_updates(
        &self,
        thread_infos: &HashMap<String, RawThreadInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        let ClientUpdateInfo::UpdateThread { thread_info, .. } = update else {
            return None;
        };
        if thread_infos.get(&thread_info.id) == Some(thread_info) {
            return None;
        }
        Some(vec![ThreadStoreOperation::replace(thread_info.clone())])
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::UpdateThread { thread_info, .. } = update else {
            return None;
        };
        Some(UpdateSupersession {
            key: thread_info.id.clone(),
            condition: UpdateDeleteCondition::Kinds(&[
                UpdateType::UpdateThread,
                UpdateType::UpdateThreadReadStatus,
            ]),
        })
    }
}

struct JoinThreadSpec;

impl UpdateSpec for JoinThreadSpec {
    fn generate_ops_for_thread_updates(
        &self,
        thread_infos: &HashMap<String, RawThreadInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        let ClientUpdateInfo::JoinThread { thread_info, .. } = update else {
            return None;
        };
        if thread_infos.get(&thread_info.id) == Some(thread_info) {
            return None;
        }
        Some(vec![ThreadStoreOperation::replace(thread_info.clone())])
    }

    fn raw_message_infos(&self, update: &ClientUpdateInfo) -> Vec<RawMessageInfo> {
        match update {
            ClientUpdateInfo::JoinThread {
                raw_message_infos, ..
            } => raw_message_infos.clone(),
            _ => Vec::new(),
        }
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::JoinThread { thread_info, .. } = update else {
            return None;
        };
        Some(UpdateSupersession {
            key: thread_info.id.clone(),
            condition: UpdateDeleteCondition::Kinds(&[
                UpdateType::UpdateThread,
                UpdateType::UpdateThreadReadStatus,
            ]),
        })
    }
}

struct UpdateThreadReadStatusSpec;

impl UpdateSpec for UpdateThreadReadStatusSpec {
    fn generate_ops_for_thread_updates(
        &self,
        thread_infos: &HashMap<String, RawThreadInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        let ClientUpdateInfo::UpdateThreadReadStatus {
            thread_id, unread, ..
        } = update
        else {
            return None;
        };
        let stored = thread_infos.get(thread_id)?;
        if stored.current_user.unread == *unread {
            return None;
        }
        let mut updated = stored.clone();
        updated.current_user.unread = *unread;
        Some(vec![ThreadStoreOperation::replace(updated)])
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::UpdateThreadReadStatus { thread_id, .. } = update else {
            return None;
        };
        Some(UpdateSupersession {
            key: thread_id.clone(),
            condition: UpdateDeleteCondition::Kinds(&[UpdateType::UpdateThreadReadStatus]),
        })
    }
}

struct DeleteThreadSpec;

impl UpdateSpec for DeleteThreadSpec {
    fn generate_ops_for_thread_updates(
        &self,
        thread_infos: &HashMap<String, RawThreadInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        let ClientUpdateInfo::DeleteThread { thread_id, .. } = update else {
            return None;
        };
        if !thread_infos.contains_key(thread_id) {
            return None;
        }
        Some(vec![ThreadStoreOperation::Remove {
            ids: vec![thread_id.clone()],
        }])
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::DeleteThread { thread_id, .. } = update else {
            return None;
        };
        Some(UpdateSupersession {
            key: thread_id.clone(),
            condition: UpdateDeleteCondition::AllForKey,
        })
    }
}

struct DeleteAccountSpec;

impl UpdateSpec for DeleteAccountSpec {
    fn generate_ops_for_thread_updates(
        &self,
        thread_infos: &HashMap<String, RawThreadInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<ThreadStoreOperation>> {
        let ClientUpdateInfo::DeleteAccount {
            deleted_user_id, ..
        } = update
        else {
            return None;
        };
        // Scrub the deleted user's memberships everywhere.
        let mut ops = Vec::new();
        let mut touched: Vec<&RawThreadInfo> = thread_infos
            .values()
            .filter(|thread_info| {
                thread_info
                    .members
                    .iter()
                    .any(|member| &member.id == deleted_user_id)
            })
            .collect();
        touched.sort_by(|a, b| a.id.cmp(&b.id));
        for thread_info in touched {
            let mut updated = thread_info.clone();
            updated
                .members
                .retain(|member| &member.id != deleted_user_id);
            ops.push(ThreadStoreOperation::replace(updated));
        }
        if ops.is_empty() {
            return None;
        }
        Some(ops)
    }

    fn reduce_user_infos(
        &self,
        user_infos: &HashMap<String, UserInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<UserStoreOperation>> {
        let ClientUpdateInfo::DeleteAccount {
            deleted_user_id, ..
        } = update
        else {
            return None;
        };
        if !user_infos.contains_key(deleted_user_id) {
            return None;
        }
        Some(vec![UserStoreOperation::Remove {
            ids: vec![deleted_user_id.clone()],
        }])
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::DeleteAccount {
            deleted_user_id, ..
        } = update
        else {
            return None;
        };
        Some(UpdateSupersession {
            key: deleted_user_id.clone(),
            condition: UpdateDeleteCondition::AllForKey,
        })
    }
}

struct UpdateUserSpec;

impl UpdateSpec for UpdateUserSpec {
    fn reduce_user_infos(
        &self,
        user_infos: &HashMap<String, UserInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<UserStoreOperation>> {
        let ClientUpdateInfo::UpdateUser { user_info, .. } = update else {
            return None;
        };
        if user_infos.get(&user_info.id) == Some(user_info) {
            return None;
        }
        Some(vec![UserStoreOperation::Replace {
            user_info: user_info.clone(),
        }])
    }

    fn delete_condition(&self, update: &ClientUpdateInfo) -> Option<UpdateSupersession> {
        let ClientUpdateInfo::UpdateUser { user_info, .. } = update else {
            return None;
        };
        Some(UpdateSupersession {
            key: user_info.id.clone(),
            condition: UpdateDeleteCondition::Kinds(&[UpdateType::UpdateUser]),
        })
    }
}

struct UpdateCurrentUserSpec;

impl UpdateSpec for UpdateCurrentUserSpec {
    fn reduce_user_infos(
        &self,
        user_infos: &HashMap<String, UserInfo>,
        update: &ClientUpdateInfo,
    ) -> Option<Vec<UserStoreOperation>> {
        let ClientUpdateInfo::UpdateCurrentUser { user_info, .. } = update else {
            return None;
        };
        if user_infos.get(&user_info.id) == Some(user_info) {
            return None;
        }
        Some(vec![UserStoreOperation::Replace {
            user_info: user_info.clone(),
        }])
    }
}

struct BadDeviceTokenSpec;

// Push-token invalidation is handled by the notification layer; the
// update carries no store mutation here.
impl UpdateSpec for BadDeviceTokenSpec {}

struct UnsupportedSpec;

impl UpdateSpec for UnsupportedSpec {}

/// Look up the spec for an update kind.
pub fn update_spec_for(update_type: UpdateType) -> &'static dyn UpdateSpec {
    match update_type {
        UpdateType::UpdateThread => &UpdateThreadSpec,
        UpdateType::JoinThread => &JoinThreadSpec,
        UpdateType::UpdateThreadReadStatus => &UpdateThreadReadStatusSpec,
        UpdateType::DeleteThread => &DeleteThreadSpec,
        UpdateType::DeleteAccount => &DeleteAccountSpec,
        UpdateType::UpdateUser => &UpdateUserSpec,
        UpdateType::UpdateCurrentUser => &UpdateCurrentUserSpec,
        UpdateType::BadDeviceToken => &BadDeviceTokenSpec,
        UpdateType::Unsupported => &UnsupportedSpec,
    }
}

/// Drop updates made redundant by later updates in the same delivery,
/// preserving the relative order of what remains.
pub fn compact_updates(updates: &[ClientUpdateInfo]) -> Vec<ClientUpdateInfo> {
    let mut kept: Vec<ClientUpdateInfo> = Vec::with_capacity(updates.len());
    // Walk newest-first so each update is checked against everything
    // that arrives after it.
    let mut claims: Vec<UpdateSupersession> = Vec::new();
    for update in updates.iter().rev() {
        let update_type = update.update_type();
        let spec = update_spec_for(update_type);
        let own = spec.delete_condition(update);
        let superseded = own
            .as_ref()
            .map(|own| {
                claims.iter().any(|claim| {
                    claim.key == own.key
                        && match claim.condition {
                            UpdateDeleteCondition::AllForKey => true,
                            UpdateDeleteCondition::Kinds(kinds) => kinds.contains(&update_type),
                        }
                })
            })
            .unwrap_or(false);
        if superseded {
            continue;
        }
        if let Some(own) = own {
            claims.push(own);
        }
        kept.push(update.clone());
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::thread::{ThreadCurrentUserInfo, ThreadSubscription};
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

    fn update_thread(id: &str, thread_info: RawThreadInfo) -> ClientUpdateInfo {
        ClientUpdateInfo::UpdateThread {
            id: id.to_string(),
            time: 1_000,
            thread_info,
        }
    }

    #[test]
    fn test_identical_thread_update_emits_nothing() {
        let thread_info = sample_thread("256|84015");
        let thread_infos = HashMap::from([(thread_info.id.clone(), thread_info.clone())]);
        let update = update_thread("u1", thread_info);
        let spec = update_spec_for(UpdateType::UpdateThread);
        assert!(spec
            .generate_ops_for_thread_updates(&thread_infos, &update)
            .is_none());
    }

    #[test]
    fn test_changed_thread_update_emits_replace() {
        let stored = sample_thread("256|84015");
        let thread_infos = HashMap::from([(stored.id.clone(), stored)]);
        let mut incoming = sample_thread("256|84015");
        incoming.name = Some("general-2".to_string());
        let update = update_thread("u1", incoming.clone());
        let spec = update_spec_for(UpdateType::UpdateThread);
        let ops = spec
            .generate_ops_for_thread_updates(&thread_infos, &update)
            .unwrap();
        assert_eq!(ops, vec![ThreadStoreOperation::replace(incoming)]);
    }

    #[test]
    fn test_delete_account_scrubs_memberships_and_user() {
        let mut thread_info = sample_thread("256|84015");
        thread_info.members = vec![
            crate::types::thread::MemberInfo {
                id: "256".to_string(),
                role: None,
                permissions: BTreeMap::new(),
                is_sender: false,
            },
            crate::types::thread::MemberInfo {
                id: "512".to_string(),
                role: None,
                permissions: BTreeMap::new(),
                is_sender: true,
            },
        ];
        let thread_infos = HashMap::from([(thread_info.id.clone(), thread_info)]);
        let user_infos = HashMap::from([(
            "512".to_string(),
            UserInfo {
                id: "512".to_string(),
                username: Some("gone".to_string()),
                relationship_status: None,
                avatar: None,
            },
        )]);
        let update = ClientUpdateInfo::DeleteAccount {
            id: "u1".to_string(),
            time: 1_000,
            deleted_user_id: "512".to_string(),
        };
        let spec = update_spec_for(UpdateType::DeleteAccount);

        let thread_ops = spec
            .generate_ops_for_thread_updates(&thread_infos, &update)
            .unwrap();
        match &thread_ops[0] {
            ThreadStoreOperation::Replace { thread_info, .. } => {
                assert_eq!(thread_info.members.len(), 1);
                assert_eq!(thread_info.members[0].id, "256");
            }
            other => panic!("expected replace, got {other:?}"),
        }

        let user_ops = spec.reduce_user_infos(&user_infos, &update).unwrap();
        assert_eq!(
            user_ops,
            vec![UserStoreOperation::Remove {
                ids: vec!["512".to_string()],
            }]
        );
    }

    #[test]
    fn test_read_status_update_flips_unread() {
        let stored = sample_thread("256|84015");
        let thread_infos = HashMap::from([(stored.id.clone(), stored)]);
        let update = ClientUpdateInfo::UpdateThreadReadStatus {
            id: "u1".to_string(),
            time: 1_000,
            thread_id: "256|84015".to_string(),
            unread: true,
        };
        let spec = update_spec_for(UpdateType::UpdateThreadReadStatus);
        let ops = spec
            .generate_ops_for_thread_updates(&thread_infos, &update)
            .unwrap();
        match &ops[0] {
            ThreadStoreOperation::Replace { thread_info, .. } => {
                assert!(thread_info.current_user.unread);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn test_compact_drops_update_superseded_by_delete() {
        let updates = vec![
            update_thread("u1", sample_thread("256|84015")),
            update_thread("u2", sample_thread("256|84020")),
            ClientUpdateInfo::DeleteThread {
                id: "u3".to_string(),
                time: 2_000,
                thread_id: "256|84015".to_string(),
            },
        ];
        let compacted = compact_updates(&updates);
        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted[0].id(), "u2");
        assert_eq!(compacted[1].id(), "u3");
    }

    #[test]
    fn test_compact_keeps_latest_of_repeated_thread_updates() {
        let mut renamed = sample_thread("256|84015");
        renamed.name = Some("general-2".to_string());
        let updates = vec![
            update_thread("u1", sample_thread("256|84015")),
            update_thread("u2", renamed),
        ];
        let compacted = compact_updates(&updates);
        assert_eq!(compacted.len(), 1);
        assert_eq!(compacted[0].id(), "u2");
    }
}
