//! Submit/poll/fetch lifecycle tests against the mock service.

use std::sync::Arc;
use std::time::Duration;

use athena_query::service::MockExecutionService;
use athena_query::{
    AthenaError, ErrorMode, ExecutionId, ExecutionState, QueryRequest, QueryService, ResultRow,
    ReusePolicy, ServiceConfig,
};
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

fn config() -> ServiceConfig {
    ServiceConfig::new("us-east-1", "analytics").with_output_location("s3://results/")
}

fn service(mock: &Arc<MockExecutionService>) -> QueryService {
    QueryService::with_service(config(), mock.clone())
}

#[tokio::test(start_paused = true)]
async fn test_queued_running_running_succeeded() {
    let rows = vec![
        ResultRow::new([Some("id"), Some("name")]),
        ResultRow::new([Some("1"), None]),
    ];
    let mock = Arc::new(
        MockExecutionService::new()
            .with_states([
                ExecutionState::Queued,
                ExecutionState::Running,
                ExecutionState::Running,
                ExecutionState::Succeeded,
            ])
            .with_rows(rows.clone()),
    );

    let result = assert_ok!(service(&mock).run_query("SELECT id, name FROM users").await);

    assert_eq!(result, Some(rows));
    assert_eq!(mock.submit_calls(), 1);
    assert_eq!(mock.status_calls(), 4);
    assert_eq!(mock.result_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interval_follows_observed_state() {
    let mock = Arc::new(MockExecutionService::new().with_states([
        ExecutionState::Queued,
        ExecutionState::Running,
        ExecutionState::Queued,
        ExecutionState::Running,
        ExecutionState::Succeeded,
    ]));

    assert_ok!(service(&mock).run_query("SELECT 1").await);

    let times = mock.status_call_times();
    assert_eq!(times.len(), 5);
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let expected = [50, 10, 50, 10].map(Duration::from_millis);
    for (gap, expected) in gaps.iter().zip(expected) {
        // The timer wheel rounds deadlines up to the next millisecond.
        assert!(
            *gap >= expected && *gap <= expected + Duration::from_millis(1),
            "gap {:?}, expected {:?}",
            gap,
            expected
        );
    }
}

#[tokio::test]
async fn test_failed_on_first_check() {
    let mock = Arc::new(MockExecutionService::new().with_states([ExecutionState::Failed]));

    let err = assert_err!(service(&mock).run_query("SELECT broken").await);

    assert!(matches!(err, AthenaError::ExecutionFailed { .. }));
    assert_eq!(err.execution_id(), Some("exec-1"));
    assert_eq!(mock.status_calls(), 1);
    assert_eq!(mock.result_calls(), 0);
}

#[tokio::test]
async fn test_status_transport_error_names_execution() {
    let mock = Arc::new(MockExecutionService::new().failing_status("connection reset"));

    let err = assert_err!(
        service(&mock)
            .await_query(&ExecutionId::from("exec-42"))
            .await
    );

    assert_eq!(err.category(), "Transport Error");
    assert_eq!(err.execution_id(), Some("exec-42"));
    assert_eq!(mock.result_calls(), 0);
}

#[tokio::test]
async fn test_pre_cancelled_run_query_submits_nothing() {
    let mock = Arc::new(MockExecutionService::new());
    let cancel = athena_query::CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(service(&mock).run_query_with_cancel("SELECT 1", &cancel).await);

    assert_eq!(err.category(), "Cancelled");
    assert_eq!(err.execution_id(), None);
    assert_eq!(mock.submit_calls(), 0);
}

#[tokio::test]
async fn test_await_query_surfaces_cancelled_state() {
    let mock = Arc::new(MockExecutionService::new().with_states([ExecutionState::Cancelled]));

    let err = assert_err!(
        service(&mock)
            .await_query(&ExecutionId::from("resumed"))
            .await
    );

    assert!(matches!(err, AthenaError::ExecutionCancelled { .. }));
    assert_eq!(err.execution_id(), Some("resumed"));
    assert_eq!(mock.submit_calls(), 0);
}

#[tokio::test]
async fn test_terminal_failures_are_errors_even_when_swallowing() {
    for state in [ExecutionState::Failed, ExecutionState::Cancelled] {
        let mock = Arc::new(MockExecutionService::new().with_states([state]));
        let service = QueryService::with_service(
            config().with_error_mode(ErrorMode::LogAndSwallow),
            mock.clone(),
        );

        // Legacy run_query hides the failure, await_query never does.
        assert_eq!(assert_ok!(service.run_query("SELECT 1").await), None);
        assert_err!(service.await_query(&ExecutionId::from("exec-1")).await);
    }
}

#[tokio::test]
async fn test_reuse_policy_reaches_payload_unmodified() {
    let mock = Arc::new(MockExecutionService::new());
    let request = QueryRequest::new("SELECT 1").with_reuse(ReusePolicy::enabled(60));

    assert_ok!(service(&mock).run_query(request).await);

    let payloads = mock.submitted_payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].reuse(), (true, 60));
}

#[tokio::test]
async fn test_missing_reuse_policy_submits_disabled() {
    let mock = Arc::new(MockExecutionService::new());

    assert_ok!(service(&mock).run_query("SELECT 1").await);

    let payloads = mock.submitted_payloads();
    assert_eq!(payloads[0].reuse(), (false, 0));
    assert_eq!(payloads[0].query_execution_context.database, "analytics");
    assert_eq!(payloads[0].work_group, "primary");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_token_bounds_run_query() {
    let mock = Arc::new(MockExecutionService::new().with_states([ExecutionState::Running]));
    let service = service(&mock);
    let cancel = athena_query::CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let err = assert_err!(service.run_query_with_cancel("SELECT 1", &cancel).await);

    assert!(matches!(err, AthenaError::Cancelled { .. }));
    assert_eq!(mock.submit_calls(), 1);
    assert_eq!(mock.result_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_in_flight_status_check() {
    let mock = Arc::new(
        MockExecutionService::new()
            .with_states([ExecutionState::Succeeded])
            .with_status_latency(Duration::from_secs(60)),
    );
    let service = service(&mock);
    let cancel = athena_query::CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = assert_err!(
        service
            .await_query_with_cancel(&ExecutionId::from("slow"), &cancel)
            .await
    );

    assert!(matches!(err, AthenaError::Cancelled { .. }));
    assert_eq!(mock.result_calls(), 0);
}

#[tokio::test]
async fn test_get_all_query_results_follows_pages() {
    let mock = Arc::new(MockExecutionService::new().with_pages(vec![
        vec![ResultRow::new([Some("a")])],
        vec![ResultRow::new([Some("b")])],
    ]));
    let service = service(&mock);
    let id = ExecutionId::from("exec-1");

    let first_page = assert_ok!(service.get_query_results(&id).await);
    let all = assert_ok!(service.get_all_query_results(&id).await);

    assert_eq!(first_page.len(), 1);
    assert_eq!(all.len(), 2);
    assert_eq!(mock.result_calls(), 3);
}
