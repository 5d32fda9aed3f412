use shared::domain::{ComplaintStatus, UserId};
use thiserror::Error;

use crate::workflow::WorkflowAction;

pub const WRONG_CREDENTIALS_MESSAGE: &str = "Wrong email or password.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("description is required")]
    MissingDescription,
    #[error("a category must be selected")]
    MissingCategory,
    #[error("a location must be picked on the map")]
    MissingLocation,
    #[error("a reason is required to reject a complaint")]
    BlankRejectReason,
    #[error("worker {0} is not in the loaded roster")]
    UnknownWorker(UserId),
    #[error("worker {0} is not active")]
    InactiveWorker(UserId),
    #[error("select at least one photo first")]
    NoFilesSelected,
    #[error("complete your profile before creating a complaint")]
    ProfileIncomplete,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("nothing to update")]
    EmptyProfileUpdate,
    #[error("national id must be 11 digits")]
    InvalidNationalId,
    #[error("phone number must have at least {min} digits")]
    InvalidPhoneNumber { min: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("complaint is already {status}; {action} is no longer possible")]
    Terminal {
        status: ComplaintStatus,
        action: WorkflowAction,
    },
    #[error("{action} is not allowed while the complaint is {status}")]
    NotAllowed {
        status: ComplaintStatus,
        action: WorkflowAction,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("transition refused: {0}")]
    Transition(#[from] TransitionError),
    #[error("{WRONG_CREDENTIALS_MESSAGE}")]
    Auth,
    #[error("not authenticated: {}", .message.as_deref().unwrap_or("session is missing or expired"))]
    Unauthorized { message: Option<String> },
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session storage failure: {0:#}")]
    Storage(anyhow::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Dialog text: client-side reasons and server messages verbatim, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(err) => err.to_string(),
            ClientError::Transition(err) => err.to_string(),
            ClientError::Auth => WRONG_CREDENTIALS_MESSAGE.to_string(),
            ClientError::Unauthorized {
                message: Some(message),
            }
            | ClientError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_) | ClientError::Transition(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
