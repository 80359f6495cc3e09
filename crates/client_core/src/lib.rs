use std::{sync::Arc, time::Duration};

use serde_json::{Map, Value};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{Command, MutationRequest, PatchSet, ReadRequest, RemoteResponse},
};
use store::ReactiveStore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod messages;
pub mod naming;
pub mod navigation;
pub mod patches;
pub mod push;
pub mod remote;
pub mod workspace;
mod workspace_chats;

pub use context::WorkspaceContext;
pub use error::ActionError;
pub use navigation::{NavigationGate, NavigationSink, NoopNavigation, Route};
pub use remote::{HttpRemoteApi, MissingRemoteApi, RemoteApi, TransportError};
pub use workspace::{CreatedWorkspace, WorkspaceActions};
pub use workspace_chats::{build_optimistic_workspace_chats, OptimisticChat, WorkspaceChats};

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Succeeded,
    Failed(ApiError),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Succeeded)
    }
}

/// In-flight request. Dropping it does not cancel the request; callers that
/// need the outcome await [`RequestHandle::completion`].
pub struct RequestHandle {
    command: Command,
    task: JoinHandle<RequestOutcome>,
}

impl RequestHandle {
    pub fn command(&self) -> Command {
        self.command
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn completion(self) -> RequestOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => RequestOutcome::Failed(ApiError::new(
                ErrorCode::Internal,
                format!("request task for {} did not complete: {err}", self.command),
            )),
        }
    }
}

/// Submits commands to the remote and reconciles the store with the result.
///
/// `write` and `read` spawn onto the current Tokio runtime and must be called
/// from within one.
#[derive(Clone)]
pub struct ApiClient {
    store: Arc<ReactiveStore>,
    remote: Arc<dyn RemoteApi>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(store: Arc<ReactiveStore>, remote: Arc<dyn RemoteApi>) -> Self {
        Self::with_retry_policy(store, remote, RetryPolicy::default())
    }

    pub fn offline(store: Arc<ReactiveStore>) -> Self {
        Self::new(store, Arc::new(MissingRemoteApi))
    }

    pub fn with_retry_policy(
        store: Arc<ReactiveStore>,
        remote: Arc<dyn RemoteApi>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            remote,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<ReactiveStore> {
        &self.store
    }

    /// Applies the optimistic projection now, then reconciles in the
    /// background with either the success or the failure projection.
    pub fn write(&self, request: MutationRequest) -> RequestHandle {
        let MutationRequest {
            command,
            parameters,
            optimistic_data,
            success_data,
            failure_data,
        } = request;

        self.store.apply(&optimistic_data);
        info!(
            command = command.as_str(),
            optimistic = optimistic_data.len(),
            "api: write submitted"
        );

        let store = Arc::clone(&self.store);
        let remote = Arc::clone(&self.remote);
        let retry = self.retry;
        let task = tokio::spawn(async move {
            match send_with_retry(remote.as_ref(), command, &parameters, retry).await {
                Ok(response) if response.is_success() => {
                    store.apply(&response.onyx_data);
                    store.apply(&success_data);
                    info!(command = command.as_str(), "api: write confirmed");
                    RequestOutcome::Succeeded
                }
                Ok(response) => {
                    let error = ApiError::from_response(&response);
                    warn!(
                        command = command.as_str(),
                        json_code = response.json_code,
                        "api: write rejected: {}",
                        error.message
                    );
                    store.apply(&response.onyx_data);
                    store.apply(&failure_data);
                    RequestOutcome::Failed(error)
                }
                Err(err) => {
                    warn!(command = command.as_str(), "api: write failed: {err}");
                    store.apply(&failure_data);
                    RequestOutcome::Failed(err.into())
                }
            }
        });

        RequestHandle { command, task }
    }

    /// Fire-and-forget fetch; whatever the server returns lands in the store.
    pub fn read(&self, request: ReadRequest) -> RequestHandle {
        self.read_with(request, |_| PatchSet::new())
    }

    /// Like [`ApiClient::read`], but `project` may turn the response payload
    /// into extra patches applied after the server's own.
    pub fn read_with<F>(&self, request: ReadRequest, project: F) -> RequestHandle
    where
        F: FnOnce(&RemoteResponse) -> PatchSet + Send + 'static,
    {
        let ReadRequest {
            command,
            parameters,
        } = request;
        info!(command = command.as_str(), "api: read submitted");

        let store = Arc::clone(&self.store);
        let remote = Arc::clone(&self.remote);
        let retry = self.retry;
        let task = tokio::spawn(async move {
            match send_with_retry(remote.as_ref(), command, &parameters, retry).await {
                Ok(response) if response.is_success() => {
                    store.apply(&response.onyx_data);
                    store.apply(&project(&response));
                    RequestOutcome::Succeeded
                }
                Ok(response) => {
                    let error = ApiError::from_response(&response);
                    warn!(
                        command = command.as_str(),
                        json_code = response.json_code,
                        "api: read rejected: {}",
                        error.message
                    );
                    RequestOutcome::Failed(error)
                }
                Err(err) => {
                    warn!(command = command.as_str(), "api: read failed: {err}");
                    RequestOutcome::Failed(err.into())
                }
            }
        });

        RequestHandle { command, task }
    }
}

async fn send_with_retry(
    remote: &dyn RemoteApi,
    command: Command,
    parameters: &Map<String, Value>,
    retry: RetryPolicy,
) -> Result<RemoteResponse, TransportError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match remote.call(command, parameters).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    command = command.as_str(),
                    attempt,
                    max_attempts,
                    "api: transport error, retrying: {err}"
                );
                tokio::time::sleep(retry.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
