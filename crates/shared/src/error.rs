use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::RemoteResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_json_code(json_code: i64) -> Self {
        match json_code {
            401 | 407 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 402 | 405 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error model for a response whose `jsonCode` is not a success.
    pub fn from_response(response: &RemoteResponse) -> Self {
        Self {
            code: ErrorCode::from_json_code(response.json_code),
            message: response
                .message
                .clone()
                .unwrap_or_else(|| format!("request failed with jsonCode {}", response.json_code)),
        }
    }
}
