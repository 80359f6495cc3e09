//! Builders for the partial record values carried by MERGE patches.

use serde_json::{Map, Value};
use shared::{domain::PendingAction, keys::EntityKey, protocol::Patch};

/// Policy fields tracked with their own pending marker and error bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyField {
    Avatar,
    GeneralSettings,
}

impl PolicyField {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyField::Avatar => "avatar",
            PolicyField::GeneralSettings => "generalSettings",
        }
    }
}

fn pending_value(action: Option<PendingAction>) -> Value {
    action.map_or(Value::Null, |action| Value::from(action.as_str()))
}

/// Partial record value. Every setter overwrites what an earlier call put
/// under the same path; `None` and the `clear_*` calls write `null`, which a
/// MERGE turns into a deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    value: Map<String, Value>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.value.insert(name.into(), value.into());
        self
    }

    pub fn pending_action(self, action: Option<PendingAction>) -> Self {
        self.field("pendingAction", pending_value(action))
    }

    pub fn pending_field(mut self, field: PolicyField, action: Option<PendingAction>) -> Self {
        self.insert_nested("pendingFields", field.as_str(), pending_value(action));
        self
    }

    pub fn clear_field_error(mut self, field: PolicyField) -> Self {
        self.insert_nested("errorFields", field.as_str(), Value::Null);
        self
    }

    pub fn field_error(
        mut self,
        field: PolicyField,
        error_key: impl Into<String>,
        message: &str,
    ) -> Self {
        let mut entries = Map::new();
        entries.insert(error_key.into(), Value::from(message));
        self.insert_nested("errorFields", field.as_str(), Value::Object(entries));
        self
    }

    pub fn clear_errors(self) -> Self {
        self.field("errors", Value::Null)
    }

    pub fn error(mut self, error_key: impl Into<String>, message: &str) -> Self {
        self.insert_nested("errors", &error_key.into(), Value::from(message));
        self
    }

    /// Places `child` under `name`, e.g. `customUnits.{id}`.
    pub fn nested(self, name: impl Into<String>, child: RecordPatch) -> Self {
        self.field(name, child.into_value())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.value)
    }

    pub fn merge_into(self, key: EntityKey) -> Patch {
        Patch::merge(key, self.into_value())
    }

    /// Writes `parent.key`, replacing a non-object (e.g. a cleared `null`)
    /// under `parent`.
    fn insert_nested(&mut self, parent: &str, key: &str, value: Value) {
        let mut object = match self.value.remove(parent) {
            Some(Value::Object(object)) => object,
            _ => Map::new(),
        };
        object.insert(key.to_string(), value);
        self.value.insert(parent.to_string(), Value::Object(object));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::protocol::PatchMethod;

    use super::*;

    #[test]
    fn pending_and_error_fields_share_their_parent_objects() {
        let value = RecordPatch::new()
            .field("name", "Acme")
            .pending_field(PolicyField::GeneralSettings, Some(PendingAction::Update))
            .pending_field(PolicyField::Avatar, None)
            .clear_field_error(PolicyField::GeneralSettings)
            .into_value();

        assert_eq!(
            value,
            json!({
                "name": "Acme",
                "pendingFields": {"generalSettings": "update", "avatar": null},
                "errorFields": {"generalSettings": null},
            })
        );
    }

    #[test]
    fn errors_accumulate_under_distinct_keys() {
        let value = RecordPatch::new()
            .error("1", "first")
            .error("2", "second")
            .into_value();
        assert_eq!(value, json!({"errors": {"1": "first", "2": "second"}}));

        let cleared = RecordPatch::new().error("1", "first").clear_errors().into_value();
        assert_eq!(cleared, json!({"errors": null}));
    }

    #[test]
    fn nested_builders_produce_merge_patches() {
        let key = EntityKey::from(shared::keys::SingleKey::Session);
        let patch = RecordPatch::new()
            .nested(
                "customUnits",
                RecordPatch::new().nested(
                    "u1",
                    RecordPatch::new().pending_action(Some(PendingAction::Update)),
                ),
            )
            .merge_into(key.clone());

        assert_eq!(patch.method, PatchMethod::Merge);
        assert_eq!(patch.key, key);
        assert_eq!(
            patch.value,
            json!({"customUnits": {"u1": {"pendingAction": "update"}}})
        );
    }
}
