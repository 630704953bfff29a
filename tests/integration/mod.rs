//! Integration tests for athena-query.
//!
//! These run against the in-process mock service; no AWS account is needed.

pub mod concurrency_test;
pub mod config_test;
pub mod lifecycle_test;
