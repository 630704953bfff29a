//! Query service facade.
//!
//! Composes request building, submission, polling and result retrieval into
//! the public entry points.

use std::sync::Arc;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{ErrorMode, ServiceConfig};
use crate::error::{AthenaError, Result};
use crate::query::{ExecutionPoller, ExecutionRequestBuilder, QueryRequest, ResultFetcher};
use crate::service::{self, ExecutionId, QueryExecutionService, ResultPage, ResultRow};

/// Entry point for running queries.
///
/// Cheap to clone; clones share the underlying service and may run queries
/// concurrently.
#[derive(Clone)]
pub struct QueryService {
    config: Arc<ServiceConfig>,
    service: Arc<dyn QueryExecutionService>,
    poller: ExecutionPoller,
    fetcher: ResultFetcher,
}

impl QueryService {
    /// Creates a service that talks to the configured HTTP endpoint.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let service = service::connect(&config)?;
        info!("Query service ready for {}", config.display_string());
        Ok(Self::with_service(config, service))
    }

    /// Creates a service on top of an existing transport.
    pub fn with_service(config: ServiceConfig, service: Arc<dyn QueryExecutionService>) -> Self {
        let poller = ExecutionPoller::new(Arc::clone(&service), config.poll_policy());
        let fetcher = ResultFetcher::new(Arc::clone(&service));
        Self {
            config: Arc::new(config),
            service,
            poller,
            fetcher,
        }
    }

    /// Returns the configuration this service was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Submits a query without waiting for it.
    pub async fn submit_query(&self, request: &QueryRequest) -> Result<ExecutionId> {
        let payload = ExecutionRequestBuilder::new(&self.config).build(request)?;
        let execution_id = self.service.submit(&payload).await?;
        debug!("Submitted query {}", execution_id);
        Ok(execution_id)
    }

    /// Submits a query, waits for it and returns the first page of rows.
    ///
    /// With [`ErrorMode::LogAndSwallow`] failures are logged and reported as
    /// `Ok(None)`; otherwise they are returned.
    pub async fn run_query(
        &self,
        request: impl Into<QueryRequest>,
    ) -> Result<Option<Vec<ResultRow>>> {
        self.run_query_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Self::run_query`], stopping early when `cancel` fires.
    pub async fn run_query_with_cancel(
        &self,
        request: impl Into<QueryRequest>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<ResultRow>>> {
        let request = request.into();
        let result = async {
            if cancel.is_cancelled() {
                debug!("Not submitting query: already cancelled");
                return Err(AthenaError::Cancelled { execution_id: None });
            }
            let execution_id = self.submit_query(&request).await?;
            self.await_query_with_cancel(&execution_id, cancel).await
        }
        .await;

        match (result, self.config.error_mode) {
            (Ok(rows), _) => Ok(Some(rows)),
            (Err(e), ErrorMode::LogAndSwallow) => {
                error!("Query failed: {}", e);
                Ok(None)
            }
            (Err(e), ErrorMode::Propagate) => Err(e),
        }
    }

    /// Waits for an existing execution and returns its first page of rows.
    pub async fn await_query(&self, execution_id: &ExecutionId) -> Result<Vec<ResultRow>> {
        self.await_query_with_cancel(execution_id, &CancellationToken::new())
            .await
    }

    /// Like [`Self::await_query`], stopping early when `cancel` fires.
    pub async fn await_query_with_cancel(
        &self,
        execution_id: &ExecutionId,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRow>> {
        self.poller.wait_for_success(execution_id, cancel).await?;
        self.fetcher.fetch(execution_id).await
    }

    /// Returns the first page of rows of a succeeded execution.
    pub async fn get_query_results(&self, execution_id: &ExecutionId) -> Result<Vec<ResultRow>> {
        self.fetcher.fetch(execution_id).await
    }

    /// Returns every row of a succeeded execution, following pagination.
    pub async fn get_all_query_results(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<ResultRow>> {
        self.fetcher.fetch_all(execution_id).await
    }

    /// Streams the result pages of a succeeded execution.
    pub fn stream_query_results(
        &self,
        execution_id: &ExecutionId,
    ) -> BoxStream<'static, Result<ResultPage>> {
        self.fetcher.stream_pages(execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ExecutionState, MockExecutionService};

    fn service_with(mock: &Arc<MockExecutionService>, mode: ErrorMode) -> QueryService {
        let config = ServiceConfig::new("us-east-1", "analytics").with_error_mode(mode);
        QueryService::with_service(config, mock.clone())
    }

    #[tokio::test]
    async fn test_run_query_returns_rows() {
        let rows = vec![ResultRow::new([Some("1")])];
        let mock = Arc::new(MockExecutionService::new().with_rows(rows.clone()));
        let service = service_with(&mock, ErrorMode::Propagate);

        let result = service.run_query("SELECT 1").await.unwrap();

        assert_eq!(result, Some(rows));
        assert_eq!(mock.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_run_query_swallows_in_legacy_mode() {
        let mock = Arc::new(MockExecutionService::new().with_states([ExecutionState::Failed]));
        let service = service_with(&mock, ErrorMode::LogAndSwallow);

        let result = service.run_query("SELECT 1").await.unwrap();

        assert_eq!(result, None);
        assert_eq!(mock.result_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_query_cancelled_before_submit() {
        let mock = Arc::new(MockExecutionService::new());
        let service = service_with(&mock, ErrorMode::Propagate);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .run_query_with_cancel("SELECT 1", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AthenaError::Cancelled { execution_id: None }));
        assert_eq!(mock.submit_calls(), 0);
        assert_eq!(mock.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_query_propagates_by_default() {
        let mock = Arc::new(MockExecutionService::new().failing_submit("throttled"));
        let service = service_with(&mock, ErrorMode::default());

        let err = service.run_query("SELECT 1").await.unwrap_err();

        assert_eq!(err.category(), "Transport Error");
        assert_eq!(mock.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_query_rejects_empty_query_without_submitting() {
        let mock = Arc::new(MockExecutionService::new());
        let service = service_with(&mock, ErrorMode::Propagate);

        let err = service.run_query("").await.unwrap_err();

        assert_eq!(err.category(), "Invalid Request");
        assert_eq!(mock.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_query_results_skips_polling() {
        let mock = Arc::new(MockExecutionService::new().with_rows(vec![ResultRow::new([
            Some("x"),
        ])]));
        let service = service_with(&mock, ErrorMode::Propagate);

        let rows = service
            .get_query_results(&ExecutionId::from("known-id"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(mock.status_calls(), 0);
        assert_eq!(mock.submit_calls(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = QueryService::new(ServiceConfig::new("", "analytics"));
        assert!(result.is_err());
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryService>();
    }
}
