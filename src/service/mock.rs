//! Mock query-execution service for testing.
//!
//! Replays a scripted sequence of statuses and result pages and counts every
//! call, so tests can assert on how the client drives the service.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::types::{
    ExecutionId, ExecutionState, ExecutionStatus, ResultPage, ResultRow, SubmissionPayload,
};
use super::QueryExecutionService;
use crate::error::{AthenaError, Result};

/// A mock service that returns predefined statuses and rows.
///
/// Statuses are consumed in order; the last one repeats forever. Without a
/// script every execution succeeds on the first check.
#[derive(Debug, Default)]
pub struct MockExecutionService {
    execution_id: Option<String>,
    statuses: Mutex<VecDeque<ExecutionStatus>>,
    pages: Vec<Vec<ResultRow>>,
    status_latency: Option<Duration>,
    submit_error: Option<String>,
    status_error: Option<String>,
    results_error: Option<String>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    result_calls: AtomicUsize,
    submitted: Mutex<Vec<SubmissionPayload>>,
    status_times: Mutex<Vec<Instant>>,
    requested_tokens: Mutex<Vec<Option<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockExecutionService {
    /// Creates a mock whose executions succeed immediately with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this id from every submission instead of `exec-<n>`.
    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    /// Scripts the states reported by successive status checks.
    pub fn with_states(self, states: impl IntoIterator<Item = ExecutionState>) -> Self {
        self.with_statuses(states.into_iter().map(ExecutionStatus::new))
    }

    /// Scripts full statuses (state plus reason) for successive status checks.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ExecutionStatus>) -> Self {
        self.statuses = Mutex::new(statuses.into_iter().collect());
        self
    }

    /// Serves these rows as a single page.
    pub fn with_rows(self, rows: Vec<ResultRow>) -> Self {
        self.with_pages(vec![rows])
    }

    /// Serves these pages, linked by `page-<n>` continuation tokens.
    pub fn with_pages(mut self, pages: Vec<Vec<ResultRow>>) -> Self {
        self.pages = pages;
        self
    }

    /// Delays every status check by the given duration.
    pub fn with_status_latency(mut self, latency: Duration) -> Self {
        self.status_latency = Some(latency);
        self
    }

    /// Makes every submission fail with a transport error.
    pub fn failing_submit(mut self, msg: impl Into<String>) -> Self {
        self.submit_error = Some(msg.into());
        self
    }

    /// Makes every status check fail with a transport error.
    pub fn failing_status(mut self, msg: impl Into<String>) -> Self {
        self.status_error = Some(msg.into());
        self
    }

    /// Makes every result fetch fail with a transport error.
    pub fn failing_results(mut self, msg: impl Into<String>) -> Self {
        self.results_error = Some(msg.into());
        self
    }

    /// Number of `submit` calls so far.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_status` calls so far.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_results` calls so far.
    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    /// Payloads received by `submit`, in order.
    pub fn submitted_payloads(&self) -> Vec<SubmissionPayload> {
        lock(&self.submitted).clone()
    }

    /// Times at which each status check started, in order.
    pub fn status_call_times(&self) -> Vec<Instant> {
        lock(&self.status_times).clone()
    }

    /// Continuation tokens passed to `get_results`, in order.
    pub fn requested_tokens(&self) -> Vec<Option<String>> {
        lock(&self.requested_tokens).clone()
    }

    fn next_status(&self) -> ExecutionStatus {
        let mut statuses = lock(&self.statuses);
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_else(|| ExecutionState::Succeeded.into())
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| ExecutionState::Succeeded.into())
        }
    }

    fn page_index(token: Option<&str>) -> Option<usize> {
        match token {
            None => Some(0),
            Some(token) => token.strip_prefix("page-")?.parse().ok(),
        }
    }
}

#[async_trait]
impl QueryExecutionService for MockExecutionService {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ExecutionId> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.submitted).push(payload.clone());

        if let Some(msg) = &self.submit_error {
            return Err(AthenaError::transport(msg.clone()));
        }

        Ok(match &self.execution_id {
            Some(id) => ExecutionId::new(id.clone()),
            None => ExecutionId::new(format!("exec-{}", n)),
        })
    }

    async fn get_status(&self, _execution_id: &ExecutionId) -> Result<ExecutionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.status_times).push(Instant::now());

        if let Some(latency) = self.status_latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(msg) = &self.status_error {
            return Err(AthenaError::transport(msg.clone()));
        }

        Ok(self.next_status())
    }

    async fn get_results(
        &self,
        _execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requested_tokens).push(next_token.map(String::from));

        if let Some(msg) = &self.results_error {
            return Err(AthenaError::transport(msg.clone()));
        }

        if self.pages.is_empty() && next_token.is_none() {
            return Ok(ResultPage::default());
        }

        let index = Self::page_index(next_token)
            .filter(|i| *i < self.pages.len())
            .ok_or_else(|| AthenaError::transport("Invalid NextToken"))?;

        let next_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));

        Ok(ResultPage {
            rows: self.pages[index].clone(),
            next_token,
        })
    }
}
