//! Error taxonomy for the scheduling pipeline
//!
//! Infeasibility is not an error: it is a successful `RouteSchedule` with the
//! sentinel cost. Everything here is a genuine failure of the request.

use thiserror::Error;

/// Malformed or missing request fields, rejected before any computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("taskIds must not be empty")]
    EmptyTaskIds,
    #[error("too many tasks: {count} (maximum {max})")]
    TooManyTasks { count: usize, max: usize },
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),
    #[error("origin must be a real position, got (0, 0)")]
    NullOrigin,
    #[error("origin coordinates out of range: ({lat}, {lng})")]
    InvalidOrigin { lat: f64, lng: f64 },
    #[error("currentTime is required")]
    MissingCurrentTime,
    #[error("invalid clock time '{0}', expected HH:MM")]
    InvalidClock(String),
    #[error("task {task_id}: {reason}")]
    InvalidTask { task_id: String, reason: String },
}

/// Task store failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task store query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Travel-time service failures. Never retried here.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("travel-time request failed: {0}")]
    Request(String),
    #[error("travel-time request timed out")]
    Timeout,
    #[error("travel-time service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed travel-time payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::MalformedPayload(err.to_string())
        } else {
            ProviderError::Request(err.to_string())
        }
    }
}

/// Any failure of a scheduling request
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulingError {
    /// Error code sent to the client
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::Validation(_) => "INVALID_REQUEST",
            SchedulingError::Storage(_) => "STORAGE_ERROR",
            SchedulingError::Provider(_) => "PROVIDER_ERROR",
            SchedulingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller is at fault (4xx class) rather than a dependency
    pub fn is_client_error(&self) -> bool {
        matches!(self, SchedulingError::Validation(_))
    }
}
