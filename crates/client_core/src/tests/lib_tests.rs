use super::*;
use crate::test_support::{GatedRemote, ScriptedRemote};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::json;
use shared::{
    keys::{EntityKey, SingleKey},
    protocol::Patch,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

fn session_key() -> EntityKey {
    EntityKey::single(SingleKey::Session)
}

fn instant_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::ZERO,
    }
}

fn params(name: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("name".to_string(), json!(name));
    params
}

fn rename_request(name: &str) -> MutationRequest {
    MutationRequest::new(Command::UpdateWorkspaceGeneralSettings, params(name))
        .optimistic(PatchSet::new().with(Patch::merge(
            session_key(),
            json!({"name": name, "pending": true}),
        )))
        .success(PatchSet::new().with(Patch::merge(session_key(), json!({"pending": null}))))
        .failure(PatchSet::new().with(Patch::merge(
            session_key(),
            json!({"pending": null, "failed": true}),
        )))
}

#[tokio::test]
async fn write_applies_optimistic_data_before_the_remote_answers() {
    let store = Arc::new(ReactiveStore::new());
    let remote = GatedRemote::new("name");
    let release = remote.gate("Acme").await;
    let api = ApiClient::new(Arc::clone(&store), remote);

    let handle = api.write(rename_request("Acme"));
    assert_eq!(
        store.get(&session_key()),
        Some(json!({"name": "Acme", "pending": true}))
    );
    assert!(!handle.is_finished());

    release.send(RemoteResponse::ok()).expect("request waiting");
    assert_eq!(handle.completion().await, RequestOutcome::Succeeded);
    assert_eq!(store.get(&session_key()), Some(json!({"name": "Acme"})));
}

#[tokio::test]
async fn rejected_write_applies_server_data_then_failure_data() {
    let store = Arc::new(ReactiveStore::new());
    let server_patch = PatchSet::new().with(Patch::merge(session_key(), json!({"failed": false})));
    let remote = ScriptedRemote::new([Ok(
        RemoteResponse::rejected(402, "over the limit").with_onyx_data(server_patch)
    )]);
    let api = ApiClient::new(Arc::clone(&store), remote);

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert_eq!(
        outcome,
        RequestOutcome::Failed(ApiError::new(ErrorCode::Validation, "over the limit"))
    );
    assert_eq!(
        store.get(&session_key()),
        Some(json!({"name": "Acme", "failed": true}))
    );
}

#[tokio::test]
async fn successful_write_applies_server_data_before_success_data() {
    let store = Arc::new(ReactiveStore::new());
    let server_patch =
        PatchSet::new().with(Patch::merge(session_key(), json!({"pending": "server"})));
    let remote = ScriptedRemote::new([Ok(RemoteResponse::ok().with_onyx_data(server_patch))]);
    let api = ApiClient::new(Arc::clone(&store), remote);

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert!(outcome.is_success());
    assert_eq!(store.get(&session_key()), Some(json!({"name": "Acme"})));
}

#[tokio::test]
async fn transport_failures_are_retried_until_an_answer_arrives() {
    let store = Arc::new(ReactiveStore::new());
    let flaky = || TransportError::Request {
        command: Command::UpdateWorkspaceGeneralSettings,
        message: "connection reset".to_string(),
    };
    let remote = ScriptedRemote::new([Err(flaky()), Err(flaky()), Ok(RemoteResponse::ok())]);
    let api = ApiClient::with_retry_policy(Arc::clone(&store), remote.clone(), instant_retry(3));

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert!(outcome.is_success());
    assert_eq!(remote.calls().await.len(), 3);
}

#[tokio::test]
async fn exhausted_retries_apply_the_failure_projection() {
    let store = Arc::new(ReactiveStore::new());
    let unavailable = || TransportError::Status {
        command: Command::UpdateWorkspaceGeneralSettings,
        status: 503,
    };
    let remote = ScriptedRemote::new([Err(unavailable()), Err(unavailable())]);
    let api = ApiClient::with_retry_policy(Arc::clone(&store), remote.clone(), instant_retry(2));

    let outcome = api.write(rename_request("Acme")).completion().await;

    match outcome {
        RequestOutcome::Failed(error) => assert_eq!(error.code, ErrorCode::Internal),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(remote.calls().await.len(), 2);
    assert_eq!(
        store.get(&session_key()),
        Some(json!({"name": "Acme", "failed": true}))
    );
}

#[tokio::test]
async fn non_retryable_errors_are_not_retried() {
    let store = Arc::new(ReactiveStore::new());
    let remote = ScriptedRemote::new([Err(TransportError::Unavailable)]);
    let api = ApiClient::with_retry_policy(Arc::clone(&store), remote.clone(), instant_retry(5));

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert!(!outcome.is_success());
    assert_eq!(remote.calls().await.len(), 1);
}

#[tokio::test]
async fn offline_client_reports_failure() {
    let store = Arc::new(ReactiveStore::new());
    let api = ApiClient::offline(Arc::clone(&store));

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert!(!outcome.is_success());
    assert_eq!(store.get(&session_key()).expect("record")["failed"], true);
}

#[tokio::test]
async fn reads_apply_server_data_only_on_success() {
    let store = Arc::new(ReactiveStore::new());
    let server_patch = PatchSet::new().with(Patch::set(session_key(), json!({"email": "a@b.com"})));
    let remote = ScriptedRemote::new([
        Ok(RemoteResponse::rejected(404, "missing").with_onyx_data(server_patch.clone())),
        Ok(RemoteResponse::ok().with_onyx_data(server_patch)),
    ]);
    let api = ApiClient::new(Arc::clone(&store), remote);

    let first = api
        .read(ReadRequest::new(Command::GetFullPolicy, Map::new()))
        .completion()
        .await;
    assert!(matches!(first, RequestOutcome::Failed(ref e) if e.code == ErrorCode::NotFound));
    assert!(store.is_empty());

    let second = api
        .read(ReadRequest::new(Command::GetFullPolicy, Map::new()))
        .completion()
        .await;
    assert!(second.is_success());
    assert_eq!(store.get(&session_key()), Some(json!({"email": "a@b.com"})));
}

#[tokio::test]
async fn read_with_projects_the_response_payload() {
    let store = Arc::new(ReactiveStore::new());
    let remote = ScriptedRemote::new([Ok(
        RemoteResponse::ok().with_data(json!({"email": "projected@b.com"}))
    )]);
    let api = ApiClient::new(Arc::clone(&store), remote);

    let handle = api.read_with(
        ReadRequest::new(Command::GetFullPolicy, Map::new()),
        |response| {
            PatchSet::new().with(Patch::set(
                EntityKey::single(SingleKey::Session),
                json!({"email": response.data["email"]}),
            ))
        },
    );
    assert_eq!(handle.command(), Command::GetFullPolicy);
    assert!(handle.completion().await.is_success());
    assert_eq!(
        store.get(&session_key()),
        Some(json!({"email": "projected@b.com"}))
    );
}

#[derive(Clone)]
struct CaptureState {
    tx: Arc<Mutex<Option<oneshot::Sender<(String, Value)>>>>,
}

async fn handle_command(
    State(state): State<CaptureState>,
    Path(command): Path<String>,
    Json(body): Json<Value>,
) -> Json<RemoteResponse> {
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send((command, body));
    }
    Json(RemoteResponse::ok().with_onyx_data(
        PatchSet::new().with(Patch::merge(session_key(), json!({"email": "server@b.com"}))),
    ))
}

async fn spawn_api_server() -> anyhow::Result<(String, oneshot::Receiver<(String, Value)>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = CaptureState {
        tx: Arc::new(Mutex::new(Some(tx))),
    };
    let app = Router::new()
        .route("/api/:command", post(handle_command))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), rx))
}

async fn spawn_unavailable_server() -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route(
        "/api/:command",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn http_remote_posts_parameters_to_the_command_endpoint() {
    let (base_url, request_rx) = spawn_api_server().await.expect("spawn server");
    let store = Arc::new(ReactiveStore::new());
    let remote = HttpRemoteApi::new(&format!("{base_url}/"), Duration::from_secs(5))
        .expect("http remote");
    let api = ApiClient::new(Arc::clone(&store), Arc::new(remote));

    let outcome = api.write(rename_request("Acme")).completion().await;

    assert!(outcome.is_success());
    let (command, body) = request_rx.await.expect("request");
    assert_eq!(command, "UpdateWorkspaceGeneralSettings");
    assert_eq!(body, json!({"name": "Acme"}));
    assert_eq!(
        store.get(&session_key()),
        Some(json!({"name": "Acme", "email": "server@b.com"}))
    );
}

#[tokio::test]
async fn http_error_statuses_become_retryable_transport_errors() {
    let base_url = spawn_unavailable_server().await.expect("spawn server");
    let remote = HttpRemoteApi::new(&base_url, Duration::from_secs(5)).expect("http remote");

    let err = remote
        .call(Command::GetFullPolicy, &Map::new())
        .await
        .expect_err("503 must fail");

    assert!(matches!(err, TransportError::Status { status: 503, .. }));
    assert!(err.is_retryable());
    assert_eq!(ApiError::from(err).code, ErrorCode::Internal);
}

#[test]
fn invalid_base_urls_are_rejected() {
    assert!(HttpRemoteApi::new("not a url", Duration::from_secs(1)).is_err());
}
