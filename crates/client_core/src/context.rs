use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{PolicyId, ReportId},
    keys::{Collection, EntityKey, SingleKey},
    records::{MemberList, PolicyRecord, ReportRecord, ReportStatusSnapshot, Session},
};
use store::ReactiveStore;
use tracing::warn;

/// Read side of the workspace actions: session, last-accessed workspace and
/// the policy collection, all read from the injected store at call time.
#[derive(Clone)]
pub struct WorkspaceContext {
    store: Arc<ReactiveStore>,
}

impl WorkspaceContext {
    pub fn new(store: Arc<ReactiveStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ReactiveStore> {
        &self.store
    }

    pub fn session_email(&self) -> String {
        match self
            .store
            .get_as::<Session>(&EntityKey::single(SingleKey::Session))
        {
            Ok(session) => session.map(|session| session.email).unwrap_or_default(),
            Err(err) => {
                warn!("context: unreadable session record: {err}");
                String::new()
            }
        }
    }

    pub fn last_accessed_workspace_policy_id(&self) -> Option<PolicyId> {
        match self
            .store
            .get(&EntityKey::single(SingleKey::LastAccessedWorkspacePolicyId))?
        {
            Value::String(raw) if !raw.is_empty() => Some(PolicyId::new(raw)),
            _ => None,
        }
    }

    /// Raw record, for capturing exact prior field values.
    pub fn policy_value(&self, policy_id: &PolicyId) -> Option<Value> {
        self.store.get(&EntityKey::policy(policy_id))
    }

    pub fn policy(&self, policy_id: &PolicyId) -> Option<PolicyRecord> {
        let key = EntityKey::policy(policy_id);
        match self.store.get_as::<PolicyRecord>(&key) {
            Ok(policy) => policy,
            Err(err) => {
                warn!(policy_id = %policy_id, "context: unreadable policy record: {err}");
                None
            }
        }
    }

    /// Every readable policy; records that fail to decode are skipped.
    pub fn policies(&self) -> Vec<PolicyRecord> {
        self.store
            .collection(Collection::Policy)
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(policy) => Some(policy),
                Err(err) => {
                    warn!(key = %key, "context: skipping unreadable policy record: {err}");
                    None
                }
            })
            .collect()
    }

    /// Names of every stored policy, read without decoding the rest of the
    /// record so one odd field cannot hide a name.
    pub fn policy_names(&self) -> Vec<String> {
        self.store
            .collection(Collection::Policy)
            .into_iter()
            .filter_map(|(_, value)| value.get("name")?.as_str().map(str::to_string))
            .collect()
    }

    pub fn member_list(&self, policy_id: &PolicyId) -> MemberList {
        let key = EntityKey::policy_member_list(policy_id);
        match self.store.get_as::<MemberList>(&key) {
            Ok(members) => members.unwrap_or_default(),
            Err(err) => {
                warn!(policy_id = %policy_id, "context: unreadable member list: {err}");
                MemberList::new()
            }
        }
    }

    pub fn report(&self, report_id: ReportId) -> Option<ReportRecord> {
        self.store
            .get_as::<ReportRecord>(&EntityKey::report(report_id))
            .ok()
            .flatten()
    }

    /// Status of every report that belongs to `policy_id`.
    pub fn reports_for_policy(&self, policy_id: &PolicyId) -> Vec<ReportStatusSnapshot> {
        self.store
            .collection(Collection::Report)
            .into_iter()
            .filter(|(_, value)| {
                value.get("policyID").and_then(Value::as_str) == Some(policy_id.as_str())
            })
            .filter_map(|(key, value)| {
                let Some(report_id) = key.member_id().and_then(|id| id.parse().ok()) else {
                    warn!(key = %key, "context: report key without a numeric id");
                    return None;
                };
                Some(ReportStatusSnapshot::from_record(ReportId(report_id), &value))
            })
            .collect()
    }
}
