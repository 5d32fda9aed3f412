use serde::{Deserialize, Serialize};
use thiserror::Error;

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
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 409 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationItem {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Items(Vec<ValidationItem>),
    Other(serde_json::Value),
}

/// Error body as returned by the backend: `{"detail": ...}` or `{"message": ...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn message(&self) -> Option<String> {
        let from_detail = match &self.detail {
            Some(ErrorDetail::Text(text)) => Some(text.trim().to_string()),
            Some(ErrorDetail::Items(items)) => Some(
                items
                    .iter()
                    .map(|item| item.msg.trim())
                    .filter(|msg| !msg.is_empty())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Some(ErrorDetail::Other(_)) | None => None,
        };
        from_detail
            .or_else(|| self.message.as_ref().map(|m| m.trim().to_string()))
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code:?} ({status}): {}", .message.as_deref().unwrap_or("no message"))]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: Option<String>,
}

impl ApiError {
    pub fn from_response(status: u16, raw_body: &str) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: ErrorBody::parse(raw_body).and_then(|body| body.message()),
        }
    }
}
