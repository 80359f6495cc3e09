//! Optimistic records for the three chats every new workspace starts with.

use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    domain::{ChatType, PendingAction, PolicyId, ReportId, ReportStateNum, ReportStatusNum},
    keys::EntityKey,
    protocol::{Patch, PatchSet},
};

use crate::ids::{generate_report_action_id, generate_report_id};

pub const ANNOUNCE_CHAT_NAME: &str = "#announce";
pub const ADMINS_CHAT_NAME: &str = "#admins";
/// Owner recorded on system rooms, which belong to no single account.
pub const SYSTEM_ROOM_OWNER: &str = "__fake__";
const CREATED_ACTION: &str = "CREATED";
const CREATED_SEQUENCE: &str = "0";

#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticChat {
    pub report_id: ReportId,
    pub report: Value,
    /// Created action keyed by its sequence number, ready for a SET of the
    /// chat's report actions.
    pub created_action: Value,
}

impl OptimisticChat {
    fn build(
        policy_id: &PolicyId,
        chat_type: ChatType,
        report_name: &str,
        owner_email: &str,
        actor_email: &str,
    ) -> Self {
        let report_id = generate_report_id();
        let report = json!({
            "reportID": report_id,
            "reportName": report_name,
            "chatType": chat_type,
            "policyID": policy_id,
            "ownerEmail": owner_email,
            "participants": [actor_email],
            "stateNum": ReportStateNum::Open,
            "statusNum": ReportStatusNum::Open,
            "isOptimisticReport": true,
            "pendingAction": PendingAction::Add,
        });
        let created_action = json!({
            CREATED_SEQUENCE: {
                "reportActionID": generate_report_action_id(),
                "actionName": CREATED_ACTION,
                "actorEmail": actor_email,
                "created": Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                "sequenceNumber": 0,
                "pendingAction": PendingAction::Add,
            }
        });
        Self {
            report_id,
            report,
            created_action,
        }
    }

    pub fn report_key(&self) -> EntityKey {
        EntityKey::report(self.report_id)
    }

    pub fn actions_key(&self) -> EntityKey {
        EntityKey::report_actions(self.report_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceChats {
    pub announce: OptimisticChat,
    pub admins: OptimisticChat,
    pub expense: OptimisticChat,
}

pub fn build_optimistic_workspace_chats(
    policy_id: &PolicyId,
    policy_name: &str,
    owner_email: &str,
) -> WorkspaceChats {
    WorkspaceChats {
        announce: OptimisticChat::build(
            policy_id,
            ChatType::PolicyAnnounce,
            ANNOUNCE_CHAT_NAME,
            SYSTEM_ROOM_OWNER,
            owner_email,
        ),
        admins: OptimisticChat::build(
            policy_id,
            ChatType::PolicyAdmins,
            ADMINS_CHAT_NAME,
            SYSTEM_ROOM_OWNER,
            owner_email,
        ),
        expense: OptimisticChat::build(
            policy_id,
            ChatType::PolicyExpenseChat,
            policy_name,
            owner_email,
            owner_email,
        ),
    }
}

impl WorkspaceChats {
    pub fn iter(&self) -> impl Iterator<Item = &OptimisticChat> {
        [&self.announce, &self.admins, &self.expense].into_iter()
    }

    pub fn optimistic_patches(&self) -> PatchSet {
        self.iter()
            .flat_map(|chat| {
                [
                    Patch::set(chat.report_key(), chat.report.clone()),
                    Patch::set(chat.actions_key(), chat.created_action.clone()),
                ]
            })
            .collect()
    }

    pub fn success_patches(&self) -> PatchSet {
        self.iter()
            .flat_map(|chat| {
                [
                    Patch::merge(chat.report_key(), json!({"pendingAction": null})),
                    Patch::merge(
                        chat.actions_key(),
                        json!({CREATED_SEQUENCE: {"pendingAction": null}}),
                    ),
                ]
            })
            .collect()
    }

    pub fn failure_patches(&self) -> PatchSet {
        self.iter()
            .flat_map(|chat| [Patch::remove(chat.report_key()), Patch::remove(chat.actions_key())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use shared::records::ReportRecord;

    use super::*;

    #[test]
    fn chats_are_distinct_and_tagged_with_the_policy() {
        let policy_id = PolicyId::from("0123456789ABCDEF");
        let chats =
            build_optimistic_workspace_chats(&policy_id, "Acme's Workspace", "bob@acme.com");

        let ids: Vec<ReportId> = chats.iter().map(|chat| chat.report_id).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);

        let expense: ReportRecord =
            serde_json::from_value(chats.expense.report.clone()).expect("report decodes");
        assert_eq!(expense.policy_id, Some(policy_id));
        assert_eq!(expense.report_name, "Acme's Workspace");
        assert_eq!(expense.chat_type, Some(ChatType::PolicyExpenseChat));
        assert_eq!(expense.owner_email, "bob@acme.com");
        assert_eq!(expense.pending_action, Some(PendingAction::Add));
        assert_eq!(chats.announce.report["reportName"], ANNOUNCE_CHAT_NAME);
        assert_eq!(chats.announce.report["chatType"], "policyAnnounce");
    }

    #[test]
    fn projections_cover_report_and_actions_for_each_chat() {
        let policy_id = PolicyId::from("0123456789ABCDEF");
        let chats = build_optimistic_workspace_chats(&policy_id, "W", "a@b.com");

        assert_eq!(chats.optimistic_patches().len(), 6);
        assert_eq!(chats.success_patches().len(), 6);
        let failure = chats.failure_patches();
        assert_eq!(failure.len(), 6);
        assert!(failure.iter().all(|patch| patch.value.is_null()));
        assert_eq!(chats.announce.created_action["0"]["actionName"], CREATED_ACTION);
    }
}
