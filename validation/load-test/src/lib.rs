//! Load testing framework for the aggregation API.
//!
//! This crate provides tools to:
//! - Generate a reproducible, seeded update and query workload
//! - Dispatch it with unbounded in-flight concurrency and a single join
//! - Collect per-call outcomes, latencies and server memory samples
//! - Output results in multiple formats (console, JSON, CSV)

pub mod client;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod report;
pub mod runner;

pub use client::{AggregationClient, HttpAggregationClient};
pub use config::{TestConfig, ValueBounds};
pub use generator::{WorkloadGenerator, WorkloadStep};
pub use metrics::{CallKind, CallOutcome, CallRecord, MetricsCollector, TestResults};
pub use report::ResultsReport;
pub use runner::LoadRunner;
