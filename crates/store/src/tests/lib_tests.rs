use super::*;
use serde_json::json;
use shared::{
    domain::{PolicyId, ReportId},
    keys::SingleKey,
    records::PolicyRecord,
};
use tokio_stream::StreamExt;

fn policy_key() -> EntityKey {
    EntityKey::policy(&PolicyId::new("0123456789ABCDEF"))
}

#[test]
fn set_replaces_the_whole_record() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": "A", "avatar": "a.png"}));
    store.set(policy_key(), json!({"name": "B"}));
    assert_eq!(store.get(&policy_key()), Some(json!({"name": "B"})));
}

#[test]
fn set_null_removes_the_record() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": "A"}));
    store.apply(&PatchSet::new().with(Patch::remove(policy_key())));
    assert_eq!(store.get(&policy_key()), None);
    assert!(store.is_empty());
}

#[test]
fn merge_onto_absent_record_creates_it() {
    let store = ReactiveStore::new();
    store.merge(policy_key(), json!({"pendingAction": "delete", "errors": null}));
    assert_eq!(store.get(&policy_key()), Some(json!({"pendingAction": "delete"})));
}

#[test]
fn merge_null_removes_the_record() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": "A"}));
    store.merge(policy_key(), Value::Null);
    assert!(!store.contains(&policy_key()));
}

#[test]
fn patches_in_one_set_apply_in_order() {
    let store = ReactiveStore::new();
    let key = policy_key();
    store.apply(&PatchSet::from(vec![
        Patch::set(key.clone(), json!({"name": "first"})),
        Patch::merge(key.clone(), json!({"name": "second", "avatar": "x"})),
        Patch::merge(key.clone(), json!({"avatar": null})),
    ]));
    assert_eq!(store.get(&key), Some(json!({"name": "second"})));
}

#[test]
fn reads_observe_writes_immediately() {
    let store = ReactiveStore::new();
    store.merge(policy_key(), json!({"name": "Acme's Workspace"}));
    let record: PolicyRecord = store
        .get_as(&policy_key())
        .expect("decode")
        .expect("record present");
    assert_eq!(record.name, "Acme's Workspace");
}

#[test]
fn get_as_reports_decode_failures_with_the_key() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": 12}));
    let err = store
        .get_as::<PolicyRecord>(&policy_key())
        .expect_err("name is not a string");
    assert!(err.to_string().contains("policy_0123456789ABCDEF"));
}

#[test]
fn collection_lists_only_its_members() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": "A"}));
    store.set(
        EntityKey::policy_member_list(&PolicyId::new("0123456789ABCDEF")),
        json!({"a@b.com": {}}),
    );
    store.set(EntityKey::report(ReportId(1)), json!({"reportID": 1}));
    store.set(EntityKey::single(SingleKey::Session), json!({"email": "a@b.com"}));

    let policies = store.collection(Collection::Policy);
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].0, policy_key());
    assert_eq!(store.collection(Collection::Report).len(), 1);
}

#[tokio::test]
async fn subscription_delivers_initial_value_then_changes() {
    let store = ReactiveStore::new();
    store.set(policy_key(), json!({"name": "A"}));

    let mut subscription = store.subscribe(policy_key());
    assert_eq!(subscription.initial(), &[(policy_key(), json!({"name": "A"}))]);

    store.set(EntityKey::report(ReportId(9)), json!({"reportID": 9}));
    store.merge(policy_key(), json!({"name": "B"}));

    let change = subscription.recv().await.expect("change");
    assert_eq!(change.key, policy_key());
    assert_eq!(change.value, Some(json!({"name": "B"})));
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn collection_subscription_reports_removals() {
    let store = ReactiveStore::new();
    let mut subscription = store.subscribe(Collection::Policy);
    assert!(subscription.initial().is_empty());

    store.set(policy_key(), json!({"name": "A"}));
    store.apply(&PatchSet::new().with(Patch::remove(policy_key())));

    let added = subscription.try_recv().expect("added");
    assert!(added.value.is_some());
    let removed = subscription.try_recv().expect("removed");
    assert_eq!(removed.value, None);
}

#[tokio::test]
async fn subscription_stream_filters_unrelated_keys() {
    let store = ReactiveStore::new();
    let stream = store.subscribe(Collection::Report).into_stream();
    let mut stream = Box::pin(stream);

    store.set(policy_key(), json!({"name": "A"}));
    store.set(EntityKey::report(ReportId(3)), json!({"reportID": 3}));

    let change = stream.next().await.expect("report change");
    assert_eq!(change.key, EntityKey::report(ReportId(3)));
}

#[tokio::test]
async fn lagged_subscribers_skip_ahead() {
    let store = ReactiveStore::with_change_buffer(2);
    let mut subscription = store.subscribe(policy_key());

    for index in 0..5 {
        store.merge(policy_key(), json!({ "revision": index }));
    }

    let change = subscription.recv().await.expect("latest changes survive");
    assert!(change.value.is_some());
}
