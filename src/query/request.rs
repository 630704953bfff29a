//! Query submission requests and their translation into wire payloads.

use serde::{Deserialize, Deserializer};

use crate::config::ServiceConfig;
use crate::error::{AthenaError, Result};
use crate::service::{
    QueryExecutionContext, ResultConfiguration, ResultReuseByAgeConfiguration,
    ResultReuseConfiguration, SubmissionPayload,
};

/// Asks the service to return a previous result for an identical query if it
/// is younger than `max_age_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ReusePolicy {
    #[serde(default)]
    pub enabled: bool,

    /// Non-numeric or missing values deserialize as 0.
    #[serde(
        default,
        alias = "maxAgeInMinutes",
        alias = "max_age_in_minutes",
        deserialize_with = "deserialize_minutes"
    )]
    pub max_age_minutes: u32,
}

impl ReusePolicy {
    /// Reuse results up to the given age.
    pub fn enabled(max_age_minutes: u32) -> Self {
        Self {
            enabled: true,
            max_age_minutes,
        }
    }

    /// Never reuse results.
    pub fn disabled() -> Self {
        Self::default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientMinutes {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn deserialize_minutes<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LenientMinutes::deserialize(deserializer)? {
        LenientMinutes::Int(n) => n.clamp(0, u32::MAX as i64) as u32,
        LenientMinutes::Float(f) => float_minutes(f),
        LenientMinutes::Text(s) => s.trim().parse::<f64>().map(float_minutes).unwrap_or(0),
        LenientMinutes::Other(_) => 0,
    })
}

fn float_minutes(f: f64) -> u32 {
    if f.is_finite() && f > 0.0 {
        f.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// A query to submit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub reuse: Option<ReusePolicy>,
}

impl QueryRequest {
    /// Creates a request without a reuse policy.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reuse: None,
        }
    }

    /// Sets the reuse policy.
    pub fn with_reuse(mut self, reuse: ReusePolicy) -> Self {
        self.reuse = Some(reuse);
        self
    }
}

impl From<&str> for QueryRequest {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for QueryRequest {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// Translates a [`QueryRequest`] into the service's submission payload.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequestBuilder<'a> {
    config: &'a ServiceConfig,
}

impl<'a> ExecutionRequestBuilder<'a> {
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self { config }
    }

    /// Builds the payload. Fails if the query text is blank.
    ///
    /// A request without a reuse policy is submitted with reuse disabled.
    pub fn build(&self, request: &QueryRequest) -> Result<SubmissionPayload> {
        if request.query.trim().is_empty() {
            return Err(AthenaError::invalid_request("query text is empty"));
        }

        let reuse = request.reuse.unwrap_or_default();

        Ok(SubmissionPayload {
            query_string: request.query.clone(),
            query_execution_context: QueryExecutionContext {
                database: self.config.database.clone(),
                catalog: self.config.catalog.clone(),
            },
            result_configuration: self.config.output_location.as_ref().map(|location| {
                ResultConfiguration {
                    output_location: location.clone(),
                }
            }),
            work_group: self.config.effective_workgroup().to_string(),
            result_reuse_configuration: ResultReuseConfiguration {
                result_reuse_by_age_configuration: ResultReuseByAgeConfiguration {
                    enabled: reuse.enabled,
                    max_age_in_minutes: reuse.max_age_minutes,
                },
            },
        })
    }
}
