//! Workspace (policy) actions.
//!
//! Every remote mutation here builds its optimistic, success and failure
//! projections up front and hands them to [`ApiClient::write`]; nothing waits
//! for the server. Preconditions are checked before any patch is built, so a
//! rejected call leaves the store untouched.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use shared::{
    domain::{PendingAction, PolicyId, PolicyRole, PolicyType, ReportStateNum, ReportStatusNum},
    keys::{EntityKey, SingleKey},
    protocol::{Command, MutationRequest, Patch, PatchSet, ReadRequest, RemoteResponse},
    records::{CustomUnit, CustomUnitRate, ErrorEntries, PolicyRecord, ReportStatusSnapshot},
};
use tracing::{info, warn};

use crate::{
    error::ActionError,
    ids::{generate_policy_id, ErrorKeyClock},
    messages,
    naming::{self, PublicDomains},
    navigation::{NavigationGate, Route},
    patches::{PolicyField, RecordPatch},
    workspace_chats::{build_optimistic_workspace_chats, WorkspaceChats},
    ApiClient, RequestHandle, WorkspaceContext,
};

pub const DEFAULT_OUTPUT_CURRENCY: &str = "USD";

pub struct CreatedWorkspace {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub chats: WorkspaceChats,
    pub request: RequestHandle,
}

fn parameters<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn require_policy_id(operation: &'static str, policy_id: &PolicyId) -> Result<(), ActionError> {
    if policy_id.is_empty() {
        warn!(operation, "workspace: invalid params, missing policy id");
        return Err(ActionError::MissingPolicyId { operation });
    }
    Ok(())
}

fn require_identifier(
    operation: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ActionError> {
    if value.is_empty() {
        warn!(operation, field, "workspace: invalid params, missing identifier");
        return Err(ActionError::MissingIdentifier { operation, field });
    }
    Ok(())
}

fn require_members<S: AsRef<str>>(
    operation: &'static str,
    logins: &[S],
) -> Result<(), ActionError> {
    if logins.is_empty() {
        warn!(operation, "workspace: invalid params, empty member list");
        return Err(ActionError::MissingMembers { operation });
    }
    Ok(())
}

fn prior_field(prior: &Map<String, Value>, name: &str) -> Value {
    prior.get(name).cloned().unwrap_or(Value::Null)
}

/// One value spanning every login, so a bulk change stays a single patch.
fn fan_out(logins: &[String], entry: &Value) -> Value {
    Value::Object(
        logins
            .iter()
            .map(|login| (login.clone(), entry.clone()))
            .collect(),
    )
}

fn custom_unit_value(unit: &CustomUnit) -> RecordPatch {
    RecordPatch::new()
        .field("customUnitID", unit.custom_unit_id.as_str())
        .field("name", unit.name.as_str())
        .field("attributes", unit.attributes.clone())
}

fn custom_unit_rate_value(rate: &CustomUnitRate) -> RecordPatch {
    RecordPatch::new()
        .field("customUnitRateID", rate.custom_unit_rate_id.as_str())
        .field("name", rate.name.as_str())
        .field("rate", json!(rate.rate))
        .field("currency", json!(rate.currency))
}

pub fn is_admin_of_free_policy(policies: &[PolicyRecord]) -> bool {
    policies.iter().any(|policy| {
        policy.policy_type == Some(PolicyType::Free) && policy.role == Some(PolicyRole::Admin)
    })
}

/// Keeps only the parts of a full policy payload the client stores.
///
/// Fields missing from the payload are left out rather than written as
/// `null`, so merging the result never erases what the store already has.
pub fn simplify_policy(policy: &Value, is_from_full_policy: bool) -> Value {
    let mut simplified = Map::new();
    simplified.insert(
        "isFromFullPolicy".to_string(),
        Value::Bool(is_from_full_policy),
    );
    for field in ["id", "name", "role", "type", "owner", "outputCurrency"] {
        if let Some(value) = policy.get(field).filter(|value| !value.is_null()) {
            simplified.insert(field.to_string(), value.clone());
        }
    }

    // Summaries carry the avatar at the top level, full policies under `value`.
    let avatar = policy
        .get("avatar")
        .and_then(Value::as_str)
        .filter(|avatar| !avatar.is_empty())
        .or_else(|| policy.pointer("/value/avatar").and_then(Value::as_str))
        .unwrap_or_default();
    simplified.insert("avatar".to_string(), Value::from(avatar));

    let custom_units = policy
        .pointer("/value/customUnits")
        .cloned()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}));
    simplified.insert("customUnits".to_string(), custom_units);

    Value::Object(simplified)
}

/// Maps every employee email to an empty member entry, once per email.
pub fn simplify_employee_list(employee_list: &Value) -> Value {
    let employees: Vec<&Value> = match employee_list {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    let mut members = Map::new();
    for email in employees.into_iter().filter_map(|employee| employee.get("email")) {
        match email {
            Value::String(email) => {
                members.insert(email.clone(), json!({}));
            }
            Value::Array(emails) => {
                for email in emails.iter().filter_map(Value::as_str) {
                    members.insert(email.to_string(), json!({}));
                }
            }
            _ => {}
        }
    }
    Value::Object(members)
}

/// Store patches for a `GetFullPolicy` payload; empty when the payload holds
/// no identifiable policy.
pub fn full_policy_patches(data: &Value) -> PatchSet {
    let Some(policy) = data.pointer("/policyList/0") else {
        return PatchSet::new();
    };
    let Some(policy_id) = policy
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
    else {
        return PatchSet::new();
    };

    let policy_id = PolicyId::from(policy_id);
    let employees = policy
        .pointer("/value/employeeList")
        .unwrap_or(&Value::Null);
    PatchSet::new()
        .with(Patch::merge(
            EntityKey::policy(&policy_id),
            simplify_policy(policy, true),
        ))
        .with(Patch::merge(
            EntityKey::policy_member_list(&policy_id),
            simplify_employee_list(employees),
        ))
}

pub struct WorkspaceActions {
    api: ApiClient,
    context: WorkspaceContext,
    navigation: Arc<NavigationGate>,
    error_keys: ErrorKeyClock,
    public_domains: PublicDomains,
}

impl WorkspaceActions {
    pub fn new(api: ApiClient, navigation: Arc<NavigationGate>) -> Self {
        let context = WorkspaceContext::new(Arc::clone(api.store()));
        Self {
            api,
            context,
            navigation,
            error_keys: ErrorKeyClock::new(),
            public_domains: PublicDomains::default(),
        }
    }

    pub fn with_public_domains(mut self, public_domains: PublicDomains) -> Self {
        self.public_domains = public_domains;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn context(&self) -> &WorkspaceContext {
        &self.context
    }

    pub fn navigation(&self) -> &Arc<NavigationGate> {
        &self.navigation
    }

    /// Current raw policy record; update projections restore from it.
    fn prior_policy(
        &self,
        operation: &'static str,
        policy_id: &PolicyId,
    ) -> Result<Map<String, Value>, ActionError> {
        require_policy_id(operation, policy_id)?;
        match self.context.policy_value(policy_id) {
            Some(Value::Object(prior)) => Ok(prior),
            Some(_) => Ok(Map::new()),
            None => {
                warn!(operation, policy_id = %policy_id, "workspace: unknown workspace");
                Err(ActionError::UnknownWorkspace {
                    operation,
                    policy_id: policy_id.to_string(),
                })
            }
        }
    }

    /// Name derived from `email`, or from the signed-in account when empty.
    pub fn generate_default_workspace_name(&self, email: &str) -> String {
        let email = if email.is_empty() {
            self.context.session_email()
        } else {
            email.to_string()
        };
        let existing = self.context.policy_names();
        naming::generate_default_workspace_name(
            &email,
            existing.iter().map(String::as_str),
            &self.public_domains,
        )
    }

    /// Creates a free workspace with its three default chats, then asks for
    /// navigation to it. Navigation happens whether or not the server agrees.
    pub fn create_workspace(&self, owner_email: &str, make_me_admin: bool) -> CreatedWorkspace {
        let policy_id = generate_policy_id();
        let policy_name = self.generate_default_workspace_name(owner_email);
        let session_email = self.context.session_email();
        let chats = build_optimistic_workspace_chats(&policy_id, &policy_name, &session_email);

        let policy_key = EntityKey::policy(&policy_id);
        let members_key = EntityKey::policy_member_list(&policy_id);

        let mut optimistic = PatchSet::new()
            .with(Patch::set(
                policy_key.clone(),
                json!({
                    "id": policy_id,
                    "type": PolicyType::Free,
                    "name": policy_name,
                    "role": PolicyRole::Admin,
                    "owner": session_email,
                    "outputCurrency": DEFAULT_OUTPUT_CURRENCY,
                    "pendingAction": PendingAction::Add,
                }),
            ))
            .with(Patch::set(
                members_key.clone(),
                json!({ session_email.as_str(): { "role": PolicyRole::Admin, "errors": {} } }),
            ));
        optimistic.extend(chats.optimistic_patches());

        let mut success = PatchSet::new().with(
            RecordPatch::new()
                .pending_action(None)
                .merge_into(policy_key.clone()),
        );
        success.extend(chats.success_patches());

        let mut failure = PatchSet::new()
            .with(Patch::remove(policy_key))
            .with(Patch::remove(members_key));
        failure.extend(chats.failure_patches());

        let request = MutationRequest::new(
            Command::CreateWorkspace,
            parameters([
                ("policyID", json!(policy_id)),
                ("announceChatReportID", json!(chats.announce.report_id)),
                ("adminsChatReportID", json!(chats.admins.report_id)),
                ("expenseChatReportID", json!(chats.expense.report_id)),
                ("ownerEmail", json!(owner_email)),
                ("makeMeAdmin", json!(make_me_admin)),
                ("policyName", json!(policy_name)),
                ("type", json!(PolicyType::Free)),
            ]),
        )
        .optimistic(optimistic)
        .success(success)
        .failure(failure);

        let request = self.api.write(request);
        info!(policy_id = %policy_id, name = %policy_name, "workspace: create submitted");
        self.navigation
            .request(Route::WorkspaceInitial(policy_id.clone()));

        CreatedWorkspace {
            policy_id,
            policy_name,
            chats,
            request,
        }
    }

    /// Marks the workspace deleted and closes its reports. The failure
    /// projection restores each report's captured state and status; the
    /// success projection is empty since the server pushes the result.
    pub fn delete_workspace(
        &self,
        policy_id: &PolicyId,
        reports: &[ReportStatusSnapshot],
    ) -> Result<RequestHandle, ActionError> {
        require_policy_id("delete_workspace", policy_id)?;
        let policy_key = EntityKey::policy(policy_id);

        let mut optimistic = PatchSet::new().with(
            RecordPatch::new()
                .pending_action(Some(PendingAction::Delete))
                .clear_errors()
                .merge_into(policy_key.clone()),
        );
        optimistic.extend(reports.iter().map(|report| {
            Patch::merge(
                EntityKey::report(report.report_id),
                json!({
                    "stateNum": ReportStateNum::Submitted,
                    "statusNum": ReportStatusNum::Closed,
                }),
            )
        }));

        let mut failure: PatchSet = reports
            .iter()
            .map(|report| {
                Patch::merge(
                    EntityKey::report(report.report_id),
                    json!({
                        "stateNum": report.state_num,
                        "statusNum": report.status_num,
                    }),
                )
            })
            .collect();
        failure.push(
            RecordPatch::new()
                .pending_action(None)
                .error(self.error_keys.next_key(), messages::DELETE_WORKSPACE_FAILED)
                .merge_into(policy_key),
        );

        let request = MutationRequest::new(
            Command::DeleteWorkspace,
            parameters([("policyID", json!(policy_id))]),
        )
        .optimistic(optimistic)
        .failure(failure);
        let handle = self.api.write(request);
        info!(policy_id = %policy_id, reports = reports.len(), "workspace: delete submitted");

        if self.context.last_accessed_workspace_policy_id().as_ref() == Some(policy_id) {
            self.update_last_accessed_workspace(None);
        }
        Ok(handle)
    }

    pub fn update_general_settings(
        &self,
        policy_id: &PolicyId,
        name: &str,
        currency: &str,
    ) -> Result<RequestHandle, ActionError> {
        let prior = self.prior_policy("update_general_settings", policy_id)?;
        let key = EntityKey::policy(policy_id);
        let field = PolicyField::GeneralSettings;

        let optimistic = RecordPatch::new()
            .pending_field(field, Some(PendingAction::Update))
            .clear_field_error(field)
            .field("name", name)
            .field("outputCurrency", currency)
            .merge_into(key.clone());
        let success = RecordPatch::new()
            .pending_field(field, None)
            .merge_into(key.clone());
        let failure = RecordPatch::new()
            .field("name", prior_field(&prior, "name"))
            .field("outputCurrency", prior_field(&prior, "outputCurrency"))
            .pending_field(field, None)
            .field_error(field, self.error_keys.next_key(), messages::GENERAL_SETTINGS_FAILED)
            .merge_into(key);

        let request = MutationRequest::new(
            Command::UpdateWorkspaceGeneralSettings,
            parameters([
                ("policyID", json!(policy_id)),
                ("workspaceName", json!(name)),
                ("currency", json!(currency)),
            ]),
        )
        .optimistic(PatchSet::from(vec![optimistic]))
        .success(PatchSet::from(vec![success]))
        .failure(PatchSet::from(vec![failure]));
        Ok(self.api.write(request))
    }

    pub fn update_workspace_avatar(
        &self,
        policy_id: &PolicyId,
        avatar_uri: &str,
    ) -> Result<RequestHandle, ActionError> {
        self.write_avatar(
            "update_workspace_avatar",
            Command::UpdateWorkspaceAvatar,
            policy_id,
            avatar_uri,
            messages::UPDATE_AVATAR_FAILED,
        )
    }

    pub fn delete_workspace_avatar(
        &self,
        policy_id: &PolicyId,
    ) -> Result<RequestHandle, ActionError> {
        self.write_avatar(
            "delete_workspace_avatar",
            Command::DeleteWorkspaceAvatar,
            policy_id,
            "",
            messages::DELETE_AVATAR_FAILED,
        )
    }

    fn write_avatar(
        &self,
        operation: &'static str,
        command: Command,
        policy_id: &PolicyId,
        avatar: &str,
        failure_message: &str,
    ) -> Result<RequestHandle, ActionError> {
        let prior = self.prior_policy(operation, policy_id)?;
        let key = EntityKey::policy(policy_id);
        let field = PolicyField::Avatar;

        let optimistic = RecordPatch::new()
            .field("avatar", avatar)
            .clear_field_error(field)
            .pending_field(field, Some(PendingAction::Update))
            .merge_into(key.clone());
        let success = RecordPatch::new()
            .pending_field(field, None)
            .merge_into(key.clone());
        let failure = RecordPatch::new()
            .field("avatar", prior_field(&prior, "avatar"))
            .pending_field(field, None)
            .field_error(field, self.error_keys.next_key(), failure_message)
            .merge_into(key);

        let mut params = parameters([("policyID", json!(policy_id))]);
        if command == Command::UpdateWorkspaceAvatar {
            params.insert("file".to_string(), json!(avatar));
        }
        let request = MutationRequest::new(command, params)
            .optimistic(PatchSet::from(vec![optimistic]))
            .success(PatchSet::from(vec![success]))
            .failure(PatchSet::from(vec![failure]));
        Ok(self.api.write(request))
    }

    pub fn update_workspace_custom_unit(
        &self,
        policy_id: &PolicyId,
        current: &CustomUnit,
        updated: &CustomUnit,
    ) -> Result<RequestHandle, ActionError> {
        const OPERATION: &str = "update_workspace_custom_unit";
        require_policy_id(OPERATION, policy_id)?;
        require_identifier(OPERATION, "customUnitID", &updated.custom_unit_id)?;
        let key = EntityKey::policy(policy_id);

        let optimistic = RecordPatch::new()
            .nested(
                "customUnits",
                RecordPatch::new().nested(
                    updated.custom_unit_id.as_str(),
                    custom_unit_value(updated)
                        .pending_action(Some(PendingAction::Update))
                        .clear_errors(),
                ),
            )
            .merge_into(key.clone());
        let success = RecordPatch::new()
            .nested(
                "customUnits",
                RecordPatch::new().nested(
                    updated.custom_unit_id.as_str(),
                    RecordPatch::new().pending_action(None).clear_errors(),
                ),
            )
            .merge_into(key.clone());
        let failure = RecordPatch::new()
            .nested(
                "customUnits",
                RecordPatch::new().nested(
                    current.custom_unit_id.as_str(),
                    custom_unit_value(current)
                        .pending_action(None)
                        .error(self.error_keys.next_key(), messages::CUSTOM_UNIT_FAILED),
                ),
            )
            .merge_into(key);

        let request = MutationRequest::new(
            Command::UpdateWorkspaceCustomUnit,
            parameters([
                ("policyID", json!(policy_id)),
                ("customUnit", json!(custom_unit_value(updated).into_value().to_string())),
            ]),
        )
        .optimistic(PatchSet::from(vec![optimistic]))
        .success(PatchSet::from(vec![success]))
        .failure(PatchSet::from(vec![failure]));
        Ok(self.api.write(request))
    }

    pub fn update_custom_unit_rate(
        &self,
        policy_id: &PolicyId,
        custom_unit_id: &str,
        current: &CustomUnitRate,
        updated: &CustomUnitRate,
    ) -> Result<RequestHandle, ActionError> {
        const OPERATION: &str = "update_custom_unit_rate";
        require_policy_id(OPERATION, policy_id)?;
        require_identifier(OPERATION, "customUnitID", custom_unit_id)?;
        require_identifier(OPERATION, "customUnitRateID", &updated.custom_unit_rate_id)?;
        let key = EntityKey::policy(policy_id);

        let in_rate = |rate_id: &str, rate: RecordPatch| {
            RecordPatch::new()
                .nested(
                    "customUnits",
                    RecordPatch::new().nested(
                        custom_unit_id,
                        RecordPatch::new()
                            .nested("rates", RecordPatch::new().nested(rate_id, rate)),
                    ),
                )
                .merge_into(key.clone())
        };

        let optimistic = in_rate(
            &updated.custom_unit_rate_id,
            custom_unit_rate_value(updated)
                .clear_errors()
                .pending_action(Some(PendingAction::Update)),
        );
        let success = in_rate(
            &updated.custom_unit_rate_id,
            RecordPatch::new().pending_action(None),
        );
        let failure = in_rate(
            &current.custom_unit_rate_id,
            custom_unit_rate_value(current)
                .pending_action(None)
                .error(self.error_keys.next_key(), messages::CUSTOM_UNIT_FAILED),
        );

        let request = MutationRequest::new(
            Command::UpdateWorkspaceCustomUnitRate,
            parameters([
                ("policyID", json!(policy_id)),
                ("customUnitID", json!(custom_unit_id)),
                (
                    "customUnitRate",
                    json!(custom_unit_rate_value(updated).into_value().to_string()),
                ),
            ]),
        )
        .optimistic(PatchSet::from(vec![optimistic]))
        .success(PatchSet::from(vec![success]))
        .failure(PatchSet::from(vec![failure]));
        Ok(self.api.write(request))
    }

    /// Invites every login in one request. Phone numbers are addressed
    /// through the SMS domain. A failed request leaves every invited member
    /// non-pending with the same error entry.
    pub fn add_members_to_workspace<S: AsRef<str>>(
        &self,
        member_logins: &[S],
        welcome_note: &str,
        policy_id: &PolicyId,
    ) -> Result<RequestHandle, ActionError> {
        const OPERATION: &str = "add_members_to_workspace";
        require_policy_id(OPERATION, policy_id)?;
        require_members(OPERATION, member_logins)?;

        let logins: Vec<String> = member_logins
            .iter()
            .map(|login| naming::add_sms_domain_if_phone_number(login.as_ref()))
            .collect();
        let key = EntityKey::policy_member_list(policy_id);
        let error_key = self.error_keys.next_key();

        let optimistic = Patch::merge(
            key.clone(),
            fan_out(&logins, &json!({ "pendingAction": PendingAction::Add })),
        );
        let success = Patch::merge(
            key.clone(),
            fan_out(&logins, &json!({ "pendingAction": null, "errors": null })),
        );
        let failure = Patch::merge(
            key,
            fan_out(
                &logins,
                &json!({
                    "pendingAction": null,
                    "errors": { error_key.as_str(): messages::ADD_MEMBER_FAILED },
                }),
            ),
        );

        let employees: Vec<Value> = logins.iter().map(|login| json!({ "email": login })).collect();
        let request = MutationRequest::new(
            Command::AddMembersToWorkspace,
            parameters([
                ("employees", json!(Value::Array(employees).to_string())),
                ("welcomeNote", json!(welcome_note)),
                ("policyID", json!(policy_id)),
            ]),
        )
        .optimistic(PatchSet::from(vec![optimistic]))
        .success(PatchSet::from(vec![success]))
        .failure(PatchSet::from(vec![failure]));
        let handle = self.api.write(request);
        info!(policy_id = %policy_id, members = logins.len(), "workspace: add members submitted");
        Ok(handle)
    }

    /// Removes members in one request. An empty list is a no-op, which is
    /// what an admin selecting only themselves ends up with.
    pub fn remove_members<S: AsRef<str>>(
        &self,
        member_logins: &[S],
        policy_id: &PolicyId,
    ) -> Result<Option<RequestHandle>, ActionError> {
        require_policy_id("remove_members", policy_id)?;
        if member_logins.is_empty() {
            return Ok(None);
        }

        let logins: Vec<String> = member_logins
            .iter()
            .map(|login| login.as_ref().to_string())
            .collect();
        let key = EntityKey::policy_member_list(policy_id);
        let error_key = self.error_keys.next_key();

        let optimistic = Patch::merge(
            key.clone(),
            fan_out(&logins, &json!({ "pendingAction": PendingAction::Delete })),
        );
        let failure = Patch::merge(
            key,
            fan_out(
                &logins,
                &json!({
                    "pendingAction": null,
                    "errors": { error_key.as_str(): messages::REMOVE_MEMBER_FAILED },
                }),
            ),
        );

        let request = MutationRequest::new(
            Command::DeleteMembersFromWorkspace,
            parameters([
                ("emailList", json!(logins.join(","))),
                ("policyID", json!(policy_id)),
            ]),
        )
        .optimistic(PatchSet::from(vec![optimistic]))
        .failure(PatchSet::from(vec![failure]));
        let handle = self.api.write(request);
        info!(
            policy_id = %policy_id,
            members = logins.len(),
            "workspace: remove members submitted"
        );
        Ok(Some(handle))
    }

    pub fn load_full_policy(&self, policy_id: &PolicyId) -> Result<RequestHandle, ActionError> {
        require_policy_id("load_full_policy", policy_id)?;
        let request = ReadRequest::new(
            Command::GetFullPolicy,
            parameters([("policyID", json!(policy_id))]),
        );
        Ok(self
            .api
            .read_with(request, |response: &RemoteResponse| {
                full_policy_patches(&response.data)
            }))
    }

    pub fn open_workspace_reimburse_view(
        &self,
        policy_id: &PolicyId,
    ) -> Result<RequestHandle, ActionError> {
        require_policy_id("open_workspace_reimburse_view", policy_id)?;
        Ok(self.api.read(ReadRequest::new(
            Command::OpenWorkspaceReimburseView,
            parameters([("policyID", json!(policy_id))]),
        )))
    }

    pub fn open_workspace_members_page<S: AsRef<str>>(
        &self,
        policy_id: &PolicyId,
        client_member_emails: &[S],
    ) -> Result<RequestHandle, ActionError> {
        self.open_member_page(
            "open_workspace_members_page",
            Command::OpenWorkspaceMembersPage,
            policy_id,
            client_member_emails,
        )
    }

    pub fn open_workspace_invite_page<S: AsRef<str>>(
        &self,
        policy_id: &PolicyId,
        client_member_emails: &[S],
    ) -> Result<RequestHandle, ActionError> {
        self.open_member_page(
            "open_workspace_invite_page",
            Command::OpenWorkspaceInvitePage,
            policy_id,
            client_member_emails,
        )
    }

    fn open_member_page<S: AsRef<str>>(
        &self,
        operation: &'static str,
        command: Command,
        policy_id: &PolicyId,
        client_member_emails: &[S],
    ) -> Result<RequestHandle, ActionError> {
        require_policy_id(operation, policy_id)?;
        require_members(operation, client_member_emails)?;
        let emails: Vec<&str> = client_member_emails
            .iter()
            .map(|email| email.as_ref())
            .collect();
        Ok(self.api.read(ReadRequest::new(
            command,
            parameters([
                ("policyID", json!(policy_id)),
                ("clientMemberEmails", json!(json!(emails).to_string())),
            ]),
        )))
    }

    pub fn update_last_accessed_workspace(&self, policy_id: Option<&PolicyId>) {
        let value = policy_id.map_or(Value::Null, |policy_id| json!(policy_id));
        self.api.store().set(
            EntityKey::single(SingleKey::LastAccessedWorkspacePolicyId),
            value,
        );
    }

    /// Replaces the workspace's errors wholesale.
    pub fn set_workspace_errors(
        &self,
        policy_id: &PolicyId,
        errors: &ErrorEntries,
    ) -> Result<(), ActionError> {
        self.prior_policy("set_workspace_errors", policy_id)?;
        let key = EntityKey::policy(policy_id);
        let patches = PatchSet::new()
            .with(RecordPatch::new().clear_errors().merge_into(key.clone()))
            .with(Patch::merge(key, json!({ "errors": errors })));
        self.api.store().apply(&patches);
        Ok(())
    }

    pub fn clear_custom_unit_errors(
        &self,
        policy_id: &PolicyId,
        custom_unit_id: &str,
        custom_unit_rate_id: &str,
    ) {
        let cleared = || RecordPatch::new().clear_errors().pending_action(None);
        let unit = cleared().nested(
            "rates",
            RecordPatch::new().nested(custom_unit_rate_id, cleared()),
        );
        self.api.store().apply(&PatchSet::from(vec![RecordPatch::new()
            .nested("customUnits", RecordPatch::new().nested(custom_unit_id, unit))
            .merge_into(EntityKey::policy(policy_id))]));
    }

    pub fn hide_workspace_alert_message(&self, policy_id: &PolicyId) -> Result<(), ActionError> {
        self.prior_policy("hide_workspace_alert_message", policy_id)?;
        self.api
            .store()
            .merge(EntityKey::policy(policy_id), json!({ "alertMessage": "" }));
        Ok(())
    }

    pub fn clear_delete_member_error(&self, policy_id: &PolicyId, member_login: &str) {
        self.api.store().merge(
            EntityKey::policy_member_list(policy_id),
            json!({ member_login: { "pendingAction": null, "errors": null } }),
        );
    }

    /// A member whose invite failed was never added; the entry goes away.
    pub fn clear_add_member_error(&self, policy_id: &PolicyId, member_login: &str) {
        self.api.store().merge(
            EntityKey::policy_member_list(policy_id),
            json!({ member_login: null }),
        );
    }

    pub fn clear_delete_workspace_error(&self, policy_id: &PolicyId) {
        self.api.store().apply(&PatchSet::from(vec![RecordPatch::new()
            .pending_action(None)
            .clear_errors()
            .merge_into(EntityKey::policy(policy_id))]));
    }

    pub fn clear_avatar_errors(&self, policy_id: &PolicyId) {
        self.api.store().apply(&PatchSet::from(vec![RecordPatch::new()
            .clear_field_error(PolicyField::Avatar)
            .pending_field(PolicyField::Avatar, None)
            .merge_into(EntityKey::policy(policy_id))]));
    }

    pub fn clear_workspace_general_settings_errors(&self, policy_id: &PolicyId) {
        self.api.store().apply(&PatchSet::from(vec![RecordPatch::new()
            .clear_field_error(PolicyField::GeneralSettings)
            .merge_into(EntityKey::policy(policy_id))]));
    }
}

#[cfg(test)]
#[path = "tests/workspace_tests.rs"]
mod tests;
