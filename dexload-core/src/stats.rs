use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics for one completed scenario.
///
/// Latency fields are in milliseconds and cover successful requests only; they are all zero
/// when nothing succeeded. Failed requests show up in `error_rate_pct` and `errors`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub requests_per_second: f64,
    pub total_duration_s: f64,
    pub error_rate_pct: f64,
    /// Failed outcomes per error kind.
    pub errors: BTreeMap<ErrorKind, usize>,
}
