//! Raw SQL execution against the shared Postgres pool
//!
//! Rows are materialized into ordered JSON records; failures are reported
//! in-band as a single `{"error": ...}` record.

mod query_executor;

pub use query_executor::QueryExecutor;
