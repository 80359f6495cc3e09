use serde_json::{Map, Value};

/// Deep-merges `patch` into `target`.
///
/// Mapping values merge key by key; a `null` under a key removes that key;
/// any other value (arrays included) replaces what was there.
pub fn merge_value(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => merge_object(target, patch),
        (target, patch) => *target = without_nulls(patch.clone()),
    }
}

fn merge_object(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
            continue;
        }

        match target.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_value(existing, value);
            }
            Some(existing) => *existing = without_nulls(value.clone()),
            None => {
                target.insert(key.clone(), without_nulls(value.clone()));
            }
        }
    }
}

/// Drops `null` members from nested mappings; null leaves are never stored.
pub fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, without_nulls(value)))
                .collect(),
        ),
        other => other,
    }
}
