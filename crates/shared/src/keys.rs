//! Addresses of records inside the client-side store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{PolicyId, ReportId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Policy,
    PolicyMemberList,
    Report,
    ReportActions,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Policy,
        Collection::PolicyMemberList,
        Collection::Report,
        Collection::ReportActions,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Collection::Policy => "policy_",
            Collection::PolicyMemberList => "policyMemberList_",
            Collection::Report => "report_",
            Collection::ReportActions => "reportActions_",
        }
    }
}

/// Keys that address exactly one record rather than a collection member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleKey {
    Session,
    LastAccessedWorkspacePolicyId,
}

impl SingleKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SingleKey::Session => "session",
            SingleKey::LastAccessedWorkspacePolicyId => "lastAccessedWorkspacePolicyID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn member(collection: Collection, id: impl fmt::Display) -> Self {
        Self(format!("{}{id}", collection.prefix()))
    }

    pub fn single(key: SingleKey) -> Self {
        Self(key.as_str().to_string())
    }

    pub fn policy(policy_id: &PolicyId) -> Self {
        Self::member(Collection::Policy, policy_id)
    }

    pub fn policy_member_list(policy_id: &PolicyId) -> Self {
        Self::member(Collection::PolicyMemberList, policy_id)
    }

    pub fn report(report_id: ReportId) -> Self {
        Self::member(Collection::Report, report_id)
    }

    pub fn report_actions(report_id: ReportId) -> Self {
        Self::member(Collection::ReportActions, report_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collection this key belongs to, if any.
    ///
    /// `policyMemberList_` and `policy_` share no prefix, so the first match is
    /// unambiguous; the same holds for `reportActions_` and `report_`.
    pub fn collection(&self) -> Option<Collection> {
        Collection::ALL
            .into_iter()
            .find(|collection| self.0.starts_with(collection.prefix()))
    }

    /// Identifier part of a collection member key.
    pub fn member_id(&self) -> Option<&str> {
        let collection = self.collection()?;
        self.0.strip_prefix(collection.prefix())
    }

    pub fn belongs_to(&self, collection: Collection) -> bool {
        self.collection() == Some(collection)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SingleKey> for EntityKey {
    fn from(value: SingleKey) -> Self {
        Self::single(value)
    }
}
