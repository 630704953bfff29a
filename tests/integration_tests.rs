//! Integration tests for athena-query.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
