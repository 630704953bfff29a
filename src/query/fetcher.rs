//! Result retrieval for succeeded executions.

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::{AthenaError, Result};
use crate::service::{ExecutionId, QueryExecutionService, ResultPage, ResultRow};

/// Reads result rows for an execution that has already succeeded.
#[derive(Clone)]
pub struct ResultFetcher {
    service: Arc<dyn QueryExecutionService>,
}

impl ResultFetcher {
    pub fn new(service: Arc<dyn QueryExecutionService>) -> Self {
        Self { service }
    }

    /// Returns the first page of rows only.
    ///
    /// Rows beyond the first page are not fetched; use [`Self::fetch_all`] when
    /// the full result set is needed.
    pub async fn fetch(&self, execution_id: &ExecutionId) -> Result<Vec<ResultRow>> {
        let page = self.fetch_page(execution_id, None).await?;
        if page.next_token.is_some() {
            debug!("Query {} has more result pages than returned", execution_id);
        }
        Ok(page.rows)
    }

    /// Returns one page; pass the previous page's token to continue.
    pub async fn fetch_page(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        self.service
            .get_results(execution_id, next_token)
            .await
            .map_err(|e| e.for_execution(execution_id.as_str()))
    }

    /// Streams every page, following continuation tokens until exhausted.
    pub fn stream_pages(&self, execution_id: &ExecutionId) -> BoxStream<'static, Result<ResultPage>> {
        let service = Arc::clone(&self.service);
        let execution_id = execution_id.clone();

        // `Some(token)` is the next request to make; `None` means done.
        stream::try_unfold(Some(None::<String>), move |cursor| {
            let service = Arc::clone(&service);
            let execution_id = execution_id.clone();
            async move {
                let Some(token) = cursor else {
                    return Ok(None);
                };
                let page = service
                    .get_results(&execution_id, token.as_deref())
                    .await
                    .map_err(|e| e.for_execution(execution_id.as_str()))?;
                let next = page.next_token.clone().map(Some);
                Ok::<_, AthenaError>(Some((page, next)))
            }
        })
        .boxed()
    }

    /// Returns the rows of every page, in order.
    pub async fn fetch_all(&self, execution_id: &ExecutionId) -> Result<Vec<ResultRow>> {
        let pages: Vec<ResultPage> = self.stream_pages(execution_id).try_collect().await?;
        debug!("Fetched {} result pages for query {}", pages.len(), execution_id);
        Ok(pages.into_iter().flat_map(|page| page.rows).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockExecutionService;

    fn row(value: &str) -> ResultRow {
        ResultRow::new([Some(value)])
    }

    #[tokio::test]
    async fn test_fetch_returns_first_page_only() {
        let mock = Arc::new(
            MockExecutionService::new().with_pages(vec![vec![row("a"), row("b")], vec![row("c")]]),
        );
        let fetcher = ResultFetcher::new(mock.clone());

        let rows = fetcher.fetch(&"exec-1".into()).await.unwrap();

        assert_eq!(rows, vec![row("a"), row("b")]);
        assert_eq!(mock.result_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_follows_tokens() {
        let mock = Arc::new(MockExecutionService::new().with_pages(vec![
            vec![row("a")],
            vec![row("b")],
            vec![row("c")],
        ]));
        let fetcher = ResultFetcher::new(mock.clone());

        let rows = fetcher.fetch_all(&"exec-1".into()).await.unwrap();

        assert_eq!(rows, vec![row("a"), row("b"), row("c")]);
        assert_eq!(
            mock.requested_tokens(),
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stream_pages_yields_each_page() {
        let mock = Arc::new(
            MockExecutionService::new().with_pages(vec![vec![row("a")], vec![row("b")]]),
        );
        let fetcher = ResultFetcher::new(mock);

        let pages: Vec<ResultPage> = fetcher
            .stream_pages(&"exec-1".into())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].next_token.as_deref(), Some("page-1"));
        assert_eq!(pages[1].next_token, None);
    }

    #[tokio::test]
    async fn test_fetch_propagates_error() {
        let mock = Arc::new(MockExecutionService::new().failing_results("access denied"));
        let fetcher = ResultFetcher::new(mock.clone());

        let err = fetcher.fetch(&"exec-1".into()).await.unwrap_err();

        assert_eq!(err.to_string(), "Transport error: access denied");
        assert_eq!(err.execution_id(), Some("exec-1"));
        assert_eq!(mock.result_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_error_names_execution() {
        let mock = Arc::new(MockExecutionService::new().failing_results("throttled"));
        let fetcher = ResultFetcher::new(mock);

        let err = fetcher.fetch_all(&"exec-9".into()).await.unwrap_err();

        assert_eq!(err.category(), "Transport Error");
        assert_eq!(err.execution_id(), Some("exec-9"));
    }
}
