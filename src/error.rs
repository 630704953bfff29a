//! Error types for athena-query.
//!
//! Every failure in the submit/poll/fetch lifecycle maps to one variant so
//! callers can react to it programmatically.

use std::time::Duration;

use thiserror::Error;

/// Main error type for query execution.
#[derive(Error, Debug)]
pub enum AthenaError {
    /// The request was rejected locally before reaching the service.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A call to the service failed (network, HTTP status, malformed body).
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// Execution the failed call referred to; absent for submissions.
        execution_id: Option<String>,
    },

    /// The execution reached the FAILED state.
    #[error("Query {execution_id} failed{}", fmt_reason(.reason))]
    ExecutionFailed {
        execution_id: String,
        reason: Option<String>,
    },

    /// The execution reached the CANCELLED state.
    #[error("Query {execution_id} was cancelled{}", fmt_reason(.reason))]
    ExecutionCancelled {
        execution_id: String,
        reason: Option<String>,
    },

    /// The service reported a state this client does not recognize.
    #[error("Query {execution_id} reported unknown state '{state}'")]
    UnknownState { execution_id: String, state: String },

    /// The poll policy's overall timeout elapsed before a terminal state.
    #[error("Timed out after {elapsed:?} waiting for query {execution_id}")]
    Timeout {
        execution_id: String,
        elapsed: Duration,
    },

    /// The poll policy's maximum number of status checks was reached.
    #[error("Gave up on query {execution_id} after {polls} status checks")]
    PollLimitExceeded { execution_id: String, polls: u32 },

    /// The caller cancelled the wait, or cancelled before anything was
    /// submitted (no execution id).
    #[error("{}", fmt_cancelled(.execution_id))]
    Cancelled { execution_id: Option<String> },

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

fn fmt_reason(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}

fn fmt_cancelled(execution_id: &Option<String>) -> String {
    match execution_id {
        Some(id) => format!("Stopped waiting for query {id}: cancelled by caller"),
        None => "Query not submitted: cancelled by caller".to_string(),
    }
}

impl AthenaError {
    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            execution_id: None,
        }
    }

    /// Records which execution a failed service call was about.
    ///
    /// Only transport errors are changed; every other variant already
    /// carries its execution id or has none.
    pub fn for_execution(self, id: impl Into<String>) -> Self {
        match self {
            Self::Transport {
                message,
                execution_id: None,
            } => Self::Transport {
                message,
                execution_id: Some(id.into()),
            },
            other => other,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Transport { .. } => "Transport Error",
            Self::ExecutionFailed { .. } => "Execution Failed",
            Self::ExecutionCancelled { .. } => "Execution Cancelled",
            Self::UnknownState { .. } => "Unknown State",
            Self::Timeout { .. } => "Timeout",
            Self::PollLimitExceeded { .. } => "Poll Limit Exceeded",
            Self::Cancelled { .. } => "Cancelled",
            Self::Config(_) => "Configuration Error",
        }
    }

    /// Returns the execution this error refers to, if any.
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { execution_id, .. }
            | Self::ExecutionCancelled { execution_id, .. }
            | Self::UnknownState { execution_id, .. }
            | Self::Timeout { execution_id, .. }
            | Self::PollLimitExceeded { execution_id, .. } => Some(execution_id),
            Self::Transport { execution_id, .. } | Self::Cancelled { execution_id } => {
                execution_id.as_deref()
            }
            Self::InvalidRequest(_) | Self::Config(_) => None,
        }
    }

    /// Returns true if the remote execution itself ended unsuccessfully.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed { .. } | Self::ExecutionCancelled { .. }
        )
    }
}

/// Result type alias using AthenaError.
pub type Result<T> = std::result::Result<T, AthenaError>;
