//! Types exchanged with the query-execution service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for one execution, returned by submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Wraps an identifier obtained from the service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// State of an execution as observed from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// Any state this client does not recognize, with the raw value.
    Unknown(String),
}

impl ExecutionState {
    /// Parses a wire state. Never fails; unrecognized values become `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the wire representation of the state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns true if no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    /// Diagnostic message the service attaches to a state change, if any.
    pub state_change_reason: Option<String>,
}

impl ExecutionStatus {
    /// Creates a status without a reason.
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            state_change_reason: None,
        }
    }

    /// Attaches a state-change reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.state_change_reason = Some(reason.into());
        self
    }
}

impl From<ExecutionState> for ExecutionStatus {
    fn from(state: ExecutionState) -> Self {
        Self::new(state)
    }
}

/// One cell of a result row, exactly as the service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Datum {
    #[serde(
        rename = "VarCharValue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub var_char_value: Option<String>,
}

/// One result row. Values are kept verbatim; no typing is applied.
///
/// For SELECT statements the service returns the column names as the first
/// row of the first page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Data", default)]
    pub data: Vec<Datum>,
}

impl ResultRow {
    /// Builds a row from cell values; `None` represents SQL NULL.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            data: values
                .into_iter()
                .map(|v| Datum {
                    var_char_value: v.map(Into::into),
                })
                .collect(),
        }
    }

    /// Returns the cell values in column order.
    pub fn values(&self) -> Vec<Option<&str>> {
        self.data
            .iter()
            .map(|d| d.var_char_value.as_deref())
            .collect()
    }
}

/// One page of results plus the token for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultPage {
    pub rows: Vec<ResultRow>,
    pub next_token: Option<String>,
}

/// Where and how the service should run a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryExecutionContext {
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

/// Where the service writes result files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultConfiguration {
    pub output_location: String,
}

/// Result reuse settings in wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultReuseByAgeConfiguration {
    pub enabled: bool,
    pub max_age_in_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultReuseConfiguration {
    pub result_reuse_by_age_configuration: ResultReuseByAgeConfiguration,
}

/// Payload for starting an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmissionPayload {
    pub query_string: String,
    pub query_execution_context: QueryExecutionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_configuration: Option<ResultConfiguration>,
    pub work_group: String,
    pub result_reuse_configuration: ResultReuseConfiguration,
}

impl SubmissionPayload {
    /// Returns the reuse settings as `(enabled, max_age_in_minutes)`.
    pub fn reuse(&self) -> (bool, u32) {
        let reuse = self
            .result_reuse_configuration
            .result_reuse_by_age_configuration;
        (reuse.enabled, reuse.max_age_in_minutes)
    }
}
