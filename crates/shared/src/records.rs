//! Typed snapshots of the records held by the client store.
//!
//! Store values are plain JSON; these structs are what callers read back
//! before building a mutation. Unknown keys are ignored and missing keys take
//! their defaults, since partially merged records are the norm.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::domain::{
    ChatType, PendingAction, PolicyId, PolicyRole, PolicyType, ReportId, ReportStateNum,
    ReportStatusNum,
};

/// Error messages keyed by a unique microsecond timestamp.
pub type ErrorEntries = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PolicyRole>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<PolicyType>,
    pub owner: String,
    pub output_currency: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_units: BTreeMap<String, CustomUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_from_full_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pending_fields: BTreeMap<String, PendingAction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ErrorEntries,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub error_fields: BTreeMap<String, ErrorEntries>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alert_message: String,
}

impl PolicyRecord {
    pub fn pending_field(&self, field: &str) -> Option<PendingAction> {
        self.pending_fields.get(field).copied()
    }

    pub fn field_errors(&self, field: &str) -> Option<&ErrorEntries> {
        self.error_fields.get(field).filter(|errors| !errors.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomUnit {
    #[serde(rename = "customUnitID")]
    pub custom_unit_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub attributes: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rates: BTreeMap<String, CustomUnitRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ErrorEntries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomUnitRate {
    #[serde(rename = "customUnitRateID")]
    pub custom_unit_rate_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ErrorEntries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PolicyRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ErrorEntries,
}

/// Member list of a workspace, keyed by login.
pub type MemberList = BTreeMap<String, MemberEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportRecord {
    #[serde(rename = "reportID")]
    pub report_id: ReportId,
    pub report_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<ChatType>,
    #[serde(rename = "policyID", skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<PolicyId>,
    pub owner_email: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_num: Option<ReportStateNum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_num: Option<ReportStatusNum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_optimistic_report: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
}

/// The part of a report that a workspace deletion touches.
///
/// State and status stay raw so a failed deletion writes back exactly what
/// was there, including values the client has no variant for. `Null` means
/// the field was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStatusSnapshot {
    pub report_id: ReportId,
    pub state_num: Value,
    pub status_num: Value,
}

impl ReportStatusSnapshot {
    pub fn from_record(report_id: ReportId, record: &Value) -> Self {
        Self {
            report_id,
            state_num: record.get("stateNum").cloned().unwrap_or(Value::Null),
            status_num: record.get("statusNum").cloned().unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub email: String,
}
