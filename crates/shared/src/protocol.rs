use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::EntityKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchMethod {
    /// Replace the record wholesale; `null` removes it.
    Set,
    /// Recursive partial update; `null` under a key removes that key.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(rename = "onyxMethod")]
    pub method: PatchMethod,
    pub key: EntityKey,
    pub value: Value,
}

impl Patch {
    pub fn set(key: EntityKey, value: impl Into<Value>) -> Self {
        Self {
            method: PatchMethod::Set,
            key,
            value: value.into(),
        }
    }

    pub fn merge(key: EntityKey, value: impl Into<Value>) -> Self {
        Self {
            method: PatchMethod::Merge,
            key,
            value: value.into(),
        }
    }

    /// SET to `null`: the record disappears from the store.
    pub fn remove(key: EntityKey) -> Self {
        Self::set(key, Value::Null)
    }
}

/// Ordered batch of patches, applied atomically and in sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet(Vec<Patch>);

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, patch: Patch) {
        self.0.push(patch);
    }

    pub fn with(mut self, patch: Patch) -> Self {
        self.0.push(patch);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.0.iter()
    }

    pub fn patches(&self) -> &[Patch] {
        &self.0
    }
}

impl From<Vec<Patch>> for PatchSet {
    fn from(value: Vec<Patch>) -> Self {
        Self(value)
    }
}

impl FromIterator<Patch> for PatchSet {
    fn from_iter<T: IntoIterator<Item = Patch>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Patch> for PatchSet {
    fn extend<T: IntoIterator<Item = Patch>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for PatchSet {
    type Item = Patch;
    type IntoIter = std::vec::IntoIter<Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Remote commands issued by the workspace actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    CreateWorkspace,
    DeleteWorkspace,
    UpdateWorkspaceGeneralSettings,
    UpdateWorkspaceAvatar,
    DeleteWorkspaceAvatar,
    UpdateWorkspaceCustomUnit,
    UpdateWorkspaceCustomUnitRate,
    AddMembersToWorkspace,
    DeleteMembersFromWorkspace,
    GetFullPolicy,
    OpenWorkspaceReimburseView,
    OpenWorkspaceMembersPage,
    OpenWorkspaceInvitePage,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::CreateWorkspace => "CreateWorkspace",
            Command::DeleteWorkspace => "DeleteWorkspace",
            Command::UpdateWorkspaceGeneralSettings => "UpdateWorkspaceGeneralSettings",
            Command::UpdateWorkspaceAvatar => "UpdateWorkspaceAvatar",
            Command::DeleteWorkspaceAvatar => "DeleteWorkspaceAvatar",
            Command::UpdateWorkspaceCustomUnit => "UpdateWorkspaceCustomUnit",
            Command::UpdateWorkspaceCustomUnitRate => "UpdateWorkspaceCustomUnitRate",
            Command::AddMembersToWorkspace => "AddMembersToWorkspace",
            Command::DeleteMembersFromWorkspace => "DeleteMembersFromWorkspace",
            Command::GetFullPolicy => "GetFullPolicy",
            Command::OpenWorkspaceReimburseView => "OpenWorkspaceReimburseView",
            Command::OpenWorkspaceMembersPage => "OpenWorkspaceMembersPage",
            Command::OpenWorkspaceInvitePage => "OpenWorkspaceInvitePage",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutating command together with its three projections of store state.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub command: Command,
    pub parameters: Map<String, Value>,
    pub optimistic_data: PatchSet,
    pub success_data: PatchSet,
    pub failure_data: PatchSet,
}

impl MutationRequest {
    pub fn new(command: Command, parameters: Map<String, Value>) -> Self {
        Self {
            command,
            parameters,
            optimistic_data: PatchSet::new(),
            success_data: PatchSet::new(),
            failure_data: PatchSet::new(),
        }
    }

    pub fn optimistic(mut self, patches: PatchSet) -> Self {
        self.optimistic_data = patches;
        self
    }

    pub fn success(mut self, patches: PatchSet) -> Self {
        self.success_data = patches;
        self
    }

    pub fn failure(mut self, patches: PatchSet) -> Self {
        self.failure_data = patches;
        self
    }
}

/// A read-only fetch; whatever the server returns lands in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub command: Command,
    pub parameters: Map<String, Value>,
}

impl ReadRequest {
    pub fn new(command: Command, parameters: Map<String, Value>) -> Self {
        Self {
            command,
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResponse {
    pub json_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "PatchSet::is_empty")]
    pub onyx_data: PatchSet,
    /// Raw command payload for reads that return more than store patches.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl RemoteResponse {
    pub const SUCCESS_CODE: i64 = 200;

    pub fn ok() -> Self {
        Self {
            json_code: Self::SUCCESS_CODE,
            message: None,
            onyx_data: PatchSet::new(),
            data: Value::Null,
        }
    }

    pub fn rejected(json_code: i64, message: impl Into<String>) -> Self {
        Self {
            json_code,
            message: Some(message.into()),
            onyx_data: PatchSet::new(),
            data: Value::Null,
        }
    }

    pub fn with_onyx_data(mut self, onyx_data: PatchSet) -> Self {
        self.onyx_data = onyx_data;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn is_success(&self) -> bool {
        self.json_code == Self::SUCCESS_CODE
    }
}

/// Patch set pushed by the server to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    pub onyx_data: PatchSet,
}
