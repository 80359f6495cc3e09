//! Network collaborator that carries commands to the server.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{Command, RemoteResponse},
};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote transport is unavailable")]
    Unavailable,
    #[error("request for {command} failed: {message}")]
    Request { command: Command, message: String },
    #[error("server returned HTTP {status} for {command}")]
    Status { command: Command, status: u16 },
    #[error("invalid response for {command}: {message}")]
    Decode { command: Command, message: String },
}

impl TransportError {
    /// Network failures and overloaded servers are worth another attempt;
    /// a missing transport or an undecodable body is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Unavailable | TransportError::Decode { .. } => false,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(value: TransportError) -> Self {
        let code = match &value {
            TransportError::Status { status, .. } => ErrorCode::from_json_code(i64::from(*status)),
            _ => ErrorCode::Internal,
        };
        ApiError::new(code, value.to_string())
    }
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn call(
        &self,
        command: Command,
        parameters: &Map<String, Value>,
    ) -> std::result::Result<RemoteResponse, TransportError>;
}

/// Transport used when no server is configured: every call fails.
pub struct MissingRemoteApi;

#[async_trait]
impl RemoteApi for MissingRemoteApi {
    async fn call(
        &self,
        _command: Command,
        _parameters: &Map<String, Value>,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        Err(TransportError::Unavailable)
    }
}

/// JSON-over-HTTP transport: `POST {base_url}/api/{command}`.
pub struct HttpRemoteApi {
    http: Client,
    base_url: Url,
}

impl HttpRemoteApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid api base url '{base_url}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, command: Command) -> String {
        format!(
            "{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            command.as_str()
        )
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn call(
        &self,
        command: Command,
        parameters: &Map<String, Value>,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        let response = self
            .http
            .post(self.endpoint(command))
            .json(parameters)
            .send()
            .await
            .map_err(|err| TransportError::Request {
                command,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                command,
                status: status.as_u16(),
            });
        }

        response
            .json::<RemoteResponse>()
            .await
            .map_err(|err| TransportError::Decode {
                command,
                message: err.to_string(),
            })
    }
}
