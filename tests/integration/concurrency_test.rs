//! Concurrent executions sharing one service.

use std::sync::Arc;

use athena_query::service::MockExecutionService;
use athena_query::{QueryService, ResultRow, ServiceConfig};
use futures::future::join_all;

#[tokio::test]
async fn test_concurrent_run_query_each_submit_once() {
    let mock = Arc::new(MockExecutionService::new().with_rows(vec![ResultRow::new([Some("ok")])]));
    let service = QueryService::with_service(
        ServiceConfig::new("us-east-1", "analytics"),
        mock.clone(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.run_query(format!("SELECT {}", i)).await })
        })
        .collect();

    for result in join_all(handles).await {
        let rows = result.unwrap().unwrap().unwrap();
        assert_eq!(rows.len(), 1);
    }

    assert_eq!(mock.submit_calls(), 8);
    assert_eq!(mock.status_calls(), 8);
    assert_eq!(mock.result_calls(), 8);

    let mut queries: Vec<String> = mock
        .submitted_payloads()
        .into_iter()
        .map(|p| p.query_string)
        .collect();
    queries.sort();
    assert_eq!(queries.len(), 8);
    assert_eq!(queries[0], "SELECT 0");
}
