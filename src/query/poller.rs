//! Execution polling.
//!
//! Drives an execution to a terminal state by checking its status at
//! state-dependent intervals, bounded by a [`PollPolicy`] and a caller-supplied
//! [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AthenaError, Result};
use crate::service::{ExecutionId, ExecutionState, ExecutionStatus, QueryExecutionService};

/// Timing and limits for waiting on one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after observing QUEUED.
    pub queued_interval: Duration,
    /// Wait after observing RUNNING.
    pub running_interval: Duration,
    /// Overall limit; `None` waits until a terminal state or cancellation.
    pub timeout: Option<Duration>,
    /// Maximum number of status checks; `None` is unlimited.
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            queued_interval: Duration::from_millis(50),
            running_interval: Duration::from_millis(10),
            timeout: None,
            max_polls: None,
        }
    }
}

impl PollPolicy {
    /// Sets the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of status checks.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Returns how long to wait before re-checking an execution in `state`.
    ///
    /// `None` means the state ends the loop.
    pub fn interval_for(&self, state: &ExecutionState) -> Option<Duration> {
        match state {
            ExecutionState::Queued => Some(self.queued_interval),
            ExecutionState::Running => Some(self.running_interval),
            _ => None,
        }
    }
}

/// Polls one execution until it succeeds or fails.
#[derive(Clone)]
pub struct ExecutionPoller {
    service: Arc<dyn QueryExecutionService>,
    policy: PollPolicy,
}

impl ExecutionPoller {
    pub fn new(service: Arc<dyn QueryExecutionService>, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Returns the policy this poller runs under.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Checks the status of an execution once.
    pub async fn poll(&self, execution_id: &ExecutionId) -> Result<ExecutionStatus> {
        self.service
            .get_status(execution_id)
            .await
            .map_err(|e| e.for_execution(execution_id.as_str()))
    }

    /// Waits until the execution reaches SUCCEEDED.
    ///
    /// Every other outcome is an error: FAILED, CANCELLED and unrecognized
    /// states end the loop immediately, as do transport errors, the policy's
    /// timeout and poll cap, and `cancel` firing.
    pub async fn wait_for_success(
        &self,
        execution_id: &ExecutionId,
        cancel: &CancellationToken,
    ) -> Result<ExecutionStatus> {
        let started = Instant::now();
        let deadline = self.policy.timeout.map(|timeout| started + timeout);
        let mut polls: u32 = 0;

        loop {
            if self.policy.max_polls.is_some_and(|max| polls >= max) {
                warn!("Giving up on query {} after {} checks", execution_id, polls);
                return Err(AthenaError::PollLimitExceeded {
                    execution_id: execution_id.to_string(),
                    polls,
                });
            }

            let status = tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(cancelled(execution_id)),
                _ = deadline_reached(deadline) => return Err(timed_out(execution_id, started)),
                status = self.poll(execution_id) => status?,
            };
            polls += 1;

            debug!("Query {} is {} (check {})", execution_id, status.state, polls);

            let Some(delay) = self.policy.interval_for(&status.state) else {
                return settle(execution_id, status, polls);
            };

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(cancelled(execution_id)),
                _ = deadline_reached(deadline) => return Err(timed_out(execution_id, started)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Turns a state that ends the loop into the caller's outcome.
fn settle(execution_id: &ExecutionId, status: ExecutionStatus, polls: u32) -> Result<ExecutionStatus> {
    let ExecutionStatus {
        state,
        state_change_reason,
    } = status;

    match state {
        ExecutionState::Succeeded => {
            info!("Query {} succeeded after {} checks", execution_id, polls);
            Ok(ExecutionStatus {
                state,
                state_change_reason,
            })
        }
        ExecutionState::Failed => {
            warn!("Query {} failed: {:?}", execution_id, state_change_reason);
            Err(AthenaError::ExecutionFailed {
                execution_id: execution_id.to_string(),
                reason: state_change_reason,
            })
        }
        ExecutionState::Cancelled => {
            warn!("Query {} was cancelled", execution_id);
            Err(AthenaError::ExecutionCancelled {
                execution_id: execution_id.to_string(),
                reason: state_change_reason,
            })
        }
        other => {
            warn!("Query {} reported unknown state '{}'", execution_id, other);
            Err(AthenaError::UnknownState {
                execution_id: execution_id.to_string(),
                state: other.as_str().to_string(),
            })
        }
    }
}

/// Resolves at the deadline, or never when there is none.
async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn cancelled(execution_id: &ExecutionId) -> AthenaError {
    debug!("Stopped waiting for query {}", execution_id);
    AthenaError::Cancelled {
        execution_id: Some(execution_id.to_string()),
    }
}

fn timed_out(execution_id: &ExecutionId, started: Instant) -> AthenaError {
    let elapsed = started.elapsed();
    warn!("Timed out after {:?} waiting for query {}", elapsed, execution_id);
    AthenaError::Timeout {
        execution_id: execution_id.to_string(),
        elapsed,
    }
}
