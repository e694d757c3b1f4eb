use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MethodNotAllowed,
    FetchFailed,
    NotFound,
    AlreadySent,
    SendFailed,
    Internal,
}

impl ErrorCode {
    /// Client-safe text sent in place of the underlying cause.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorCode::MethodNotAllowed => "Method not allowed",
            ErrorCode::FetchFailed => "Error fetching contacts",
            ErrorCode::NotFound => "Contact not found",
            ErrorCode::AlreadySent => "Intro email already sent",
            ErrorCode::SendFailed => "Error sending email",
            ErrorCode::Internal => "Internal server error",
        }
    }
}

/// Error raised by a backend operation. `message` may carry internal
/// detail and is only ever logged.
#[derive(Debug, Clone, Error)]
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

    /// Text handed to clients. Only mail delivery failures carry their
    /// reason through; everything else collapses to the public message.
    pub fn client_message(&self) -> String {
        match self.code {
            ErrorCode::SendFailed if !self.message.is_empty() => {
                format!("{}: {}", self.code.public_message(), self.message)
            }
            code => code.public_message().to_string(),
        }
    }
}

/// `{"error": "..."}` as written by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<ErrorCode> for ErrorBody {
    fn from(code: ErrorCode) -> Self {
        Self::new(code.public_message())
    }
}

impl From<&ApiError> for ErrorBody {
    fn from(value: &ApiError) -> Self {
        Self::new(value.client_message())
    }
}
