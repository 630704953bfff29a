//! Query-execution service abstraction.
//!
//! Provides a trait-based interface for the three remote operations the
//! client depends on, so the HTTP transport and the test mock can be used
//! interchangeably.

mod http;
mod mock;
mod types;

pub use http::HttpExecutionService;
pub use mock::MockExecutionService;
pub use types::{
    Datum, ExecutionId, ExecutionState, ExecutionStatus, QueryExecutionContext,
    ResultConfiguration, ResultPage, ResultReuseByAgeConfiguration, ResultReuseConfiguration,
    ResultRow, SubmissionPayload,
};

use crate::config::ServiceConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates the HTTP-backed service for the given configuration.
///
/// This is the central factory function for service connections.
pub fn connect(config: &ServiceConfig) -> Result<Arc<dyn QueryExecutionService>> {
    let service = HttpExecutionService::new(config)?;
    Ok(Arc::new(service))
}

/// Trait defining the remote query-execution service.
///
/// Implementations must be safe to share between concurrently running
/// executions.
#[async_trait]
pub trait QueryExecutionService: Send + Sync {
    /// Starts an execution and returns its identifier.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExecutionId>;

    /// Reads the current state of an execution.
    async fn get_status(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus>;

    /// Reads one page of results; `next_token` is `None` for the first page.
    async fn get_results(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage>;
}
