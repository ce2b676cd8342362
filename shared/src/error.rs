use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Coarse classification of a collaborator failure. Stores treat every
/// kind identically (full rollback); the kind exists for logging and for
/// the host to pick user-facing copy.
#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BackendErrorKind {
    #[error("Not authorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Conflicting write")]
    Conflict,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Service unavailable")]
    Unavailable,
}

/// An opaque failure from the backend service. The message is whatever
/// the transport produced; nothing in this workspace inspects it.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }
}
