use crate::domain::IncidentStatus;
use dispatch_geo::LocationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Client-side field checks failed; nothing was sent to the store.
    Validation,
    NotFound,
    /// Network or backend failure, message passed through.
    Store,
    InvalidTransition,
    /// A precondition on current state did not hold (e.g. resource not available).
    Conflict,
    /// A multi-write operation failed half way and could not be undone.
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct DispatchError {
    pub code: ErrorCode,
    pub message: String,
}

impl DispatchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Store, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Inconsistent, message)
    }

    pub fn invalid_transition(from: IncidentStatus, to: IncidentStatus) -> Self {
        Self::new(
            ErrorCode::InvalidTransition,
            format!("incident cannot move from {from} to {to}"),
        )
    }

    /// Prefixes the message with what the caller was doing, keeping the code.
    pub fn context(self, action: &str) -> Self {
        Self {
            code: self.code,
            message: format!("{action}: {}", self.message),
        }
    }
}

impl From<LocationError> for DispatchError {
    fn from(value: LocationError) -> Self {
        Self::validation(value.to_string())
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
