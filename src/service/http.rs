//! HTTP implementation of the query-execution service.
//!
//! Speaks the Athena JSON 1.1 protocol: every operation is a `POST /` with an
//! `X-Amz-Target` header naming it. Requests are sent unsigned, so the
//! endpoint must be a signing proxy or an emulator that does not check
//! signatures.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::{
    ExecutionId, ExecutionState, ExecutionStatus, ResultPage, ResultRow, SubmissionPayload,
};
use super::QueryExecutionService;
use crate::config::ServiceConfig;
use crate::error::{AthenaError, Result};

/// Prefix of the `X-Amz-Target` header value.
const TARGET_PREFIX: &str = "AmazonAthena";

/// Content type of the JSON 1.1 protocol.
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Athena client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExecutionService {
    endpoint: Url,
    client: Client,
}

impl HttpExecutionService {
    /// Creates a new service client for the configured endpoint.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AthenaError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one operation and decodes its response body.
    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!("Athena {} request to {}", operation, self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AthenaError::transport(format!("{} timed out", operation))
                } else if e.is_connect() {
                    AthenaError::transport(format!(
                        "Failed to connect to {}: {}",
                        self.endpoint, e
                    ))
                } else {
                    AthenaError::transport(format!("{} request failed: {}", operation, e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AthenaError::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AthenaError::transport(format!("Failed to parse {} response: {}", operation, e))
        })
    }
}

#[async_trait]
impl QueryExecutionService for HttpExecutionService {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExecutionId> {
        let response: StartQueryExecutionResponse =
            self.call("StartQueryExecution", payload).await?;

        response
            .query_execution_id
            .map(ExecutionId::new)
            .ok_or_else(|| AthenaError::transport("StartQueryExecution returned no execution id"))
    }

    async fn get_status(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus> {
        let request = ExecutionIdRequest {
            query_execution_id: execution_id.as_str(),
        };
        let response: GetQueryExecutionResponse = self.call("GetQueryExecution", &request).await?;
        Ok(response.into_status())
    }

    async fn get_results(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let request = GetQueryResultsRequest {
            query_execution_id: execution_id.as_str(),
            next_token,
        };
        let response: GetQueryResultsResponse = self.call("GetQueryResults", &request).await?;

        Ok(ResultPage {
            rows: response.result_set.map(|s| s.rows).unwrap_or_default(),
            next_token: response.next_token,
        })
    }
}

/// Maps a non-success response to an error.
///
/// `InvalidRequestException` means the service rejected the query itself;
/// everything else is a failed service call.
fn parse_error(status: reqwest::StatusCode, body: &str) -> AthenaError {
    if let Ok(error) = serde_json::from_str::<AthenaErrorResponse>(body) {
        let kind = error
            .kind
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
            .unwrap_or("UnknownError");
        let message = error
            .message
            .or(error.message_upper)
            .unwrap_or_else(|| status.to_string());

        if kind == "InvalidRequestException" {
            return AthenaError::invalid_request(message);
        }
        return AthenaError::transport(format!("{} ({}): {}", kind, status, message));
    }

    AthenaError::transport(format!("Athena API error ({}): {}", status, body))
}

// Athena API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionIdRequest<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsRequest<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionResponse {
    query_execution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionResponse {
    query_execution: Option<QueryExecution>,
}

impl GetQueryExecutionResponse {
    fn into_status(self) -> ExecutionStatus {
        let status = self.query_execution.and_then(|e| e.status);
        match status {
            Some(status) => ExecutionStatus {
                state: ExecutionState::parse(status.state.as_deref().unwrap_or_default()),
                state_change_reason: status.state_change_reason,
            },
            None => ExecutionStatus::new(ExecutionState::Unknown(String::new())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: Option<QueryExecutionStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionStatus {
    state: Option<String>,
    state_change_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsResponse {
    result_set: Option<ResultSet>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct AthenaErrorResponse {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}
