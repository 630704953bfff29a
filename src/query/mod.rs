//! Query execution lifecycle.
//!
//! Splits submission, polling and result retrieval into independently
//! testable pieces that [`crate::QueryService`] composes.

pub mod fetcher;
pub mod poller;
pub mod request;

pub use fetcher::ResultFetcher;
pub use poller::{ExecutionPoller, PollPolicy};
pub use request::{ExecutionRequestBuilder, QueryRequest, ReusePolicy};
