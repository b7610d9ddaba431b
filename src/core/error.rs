use std::{error::Error, fmt};

use serde::Serialize;

use crate::model::{
    load_more::{LoadMorePhase, Rejection},
    pagination::{overlay::OverlayError, LoadingFlag},
};

/// Failure reported by a content repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FetchError {
    /// The request did not reach the store or the connection broke
    Transport { message: String },
    /// The store refused the request
    Validation { message: String },
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FetchError::Validation {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport { message } => write!(f, "transport error: {message}"),
            FetchError::Validation { message } => write!(f, "request rejected: {message}"),
        }
    }
}

impl Error for FetchError {}

/// Error carried by an unsuccessful [`LoadMoreOutcome`](crate::core::resolver::LoadMoreOutcome)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Transport { message: String },
    Validation { message: String },
    /// The response arrived after a newer intent replaced the configuration
    Superseded { issued: u64, current: u64 },
}

impl ErrorKind {
    /// Whether retrying the same request can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transport { .. })
    }
}

impl From<FetchError> for ErrorKind {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Transport { message } => ErrorKind::Transport { message },
            FetchError::Validation { message } => ErrorKind::Validation { message },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport { message } => write!(f, "transport error: {message}"),
            ErrorKind::Validation { message } => write!(f, "request rejected: {message}"),
            ErrorKind::Superseded { issued, current } => write!(
                f,
                "response for generation {issued} discarded, feed is at generation {current}"
            ),
        }
    }
}

impl Error for ErrorKind {}

/// Reasons the manager refuses or aborts an intent
///
/// A refused intent leaves the previous snapshot in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// A subscriber tried to mutate the manager that is notifying it
    Reentrant { intent: &'static str },
    /// Setting this flag would make both loading flags true
    ConflictingLoadingState { requested: LoadingFlag },
    InitialLoadInFlight,
    LoadMoreRejected {
        phase: LoadMorePhase,
        reason: Rejection,
    },
    /// Recomputing the overlay failed; the transition was aborted
    Consistency(OverlayError),
    /// A fetch outside the load-more path failed
    Fetch(FetchError),
    InvalidConfig { reason: String },
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::Reentrant { intent } => {
                write!(f, "'{intent}' called from inside a subscriber notification")
            }
            ManagerError::ConflictingLoadingState { requested } => write!(
                f,
                "cannot set '{requested}' while the other loading flag is set"
            ),
            ManagerError::InitialLoadInFlight => write!(f, "an initial load is in flight"),
            ManagerError::LoadMoreRejected { phase, reason } => {
                write!(f, "load-more rejected in phase {phase}: {reason}")
            }
            ManagerError::Consistency(e) => write!(f, "transition aborted: {e}"),
            ManagerError::Fetch(e) => write!(f, "{e}"),
            ManagerError::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for ManagerError {}

impl From<OverlayError> for ManagerError {
    fn from(e: OverlayError) -> Self {
        ManagerError::Consistency(e)
    }
}
