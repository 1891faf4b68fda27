//! The response envelope every endpoint returns.

use afk_core::ErrorCode;
use serde::Serialize;

use crate::error::EngineError;

const TEMPORARY_FAILURE_MESSAGE: &str = "temporary failure, please retry";

/// Machine-readable rejection details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        let message = if err.is_internal() {
            TEMPORARY_FAILURE_MESSAGE.to_string()
        } else {
            err.to_string()
        };
        let (current, limit) = err.usage().unzip();
        Self {
            code: err.code(),
            message,
            retryable: err.is_retryable(),
            retry_after_seconds: err.retry_after_seconds(),
            current,
            limit,
        }
    }
}

/// `{ success, status, data | error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// HTTP status the response maps to.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            status: 200,
            data: Some(data),
            error: None,
        }
    }

    /// Builds a failure envelope. Internal failures are logged with their
    /// detail and reported generically.
    pub fn error(err: &EngineError) -> Self {
        if err.is_internal() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(code = %err.code(), error = %err, "request rejected");
        }
        Self {
            success: false,
            status: err.http_status(),
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    pub fn from_result(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(&err),
        }
    }
}
