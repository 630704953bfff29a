//! athena-query - submit Athena queries, poll them to completion and fetch
//! their results.
//!
//! ```no_run
//! use athena_query::{QueryRequest, QueryService, ReusePolicy, ServiceConfig};
//!
//! # async fn run() -> athena_query::Result<()> {
//! let config = ServiceConfig::new("us-east-1", "analytics")
//!     .with_output_location("s3://my-results/athena/");
//! let service = QueryService::new(config)?;
//!
//! let request = QueryRequest::new("SELECT * FROM events LIMIT 10")
//!     .with_reuse(ReusePolicy::enabled(60));
//! if let Some(rows) = service.run_query(request).await? {
//!     for row in rows {
//!         println!("{:?}", row.values());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod service;

pub use client::QueryService;
pub use config::{ErrorMode, PollConfig, ServiceConfig};
pub use error::{AthenaError, Result};
pub use query::{PollPolicy, QueryRequest, ReusePolicy};
pub use service::{ExecutionId, ExecutionState, ExecutionStatus, ResultPage, ResultRow};
pub use tokio_util::sync::CancellationToken;
