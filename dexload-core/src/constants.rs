use std::time::Duration;

/// Connect budget for a single request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Total budget for a single request, connect included.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle keep-alive for pooled connections.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// Settle time between two consecutive scenarios.
pub const DEFAULT_SCENARIO_PAUSE: Duration = Duration::from_secs(2);

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Below this many successful samples p99 falls back to the maximum latency.
pub const P99_MIN_SAMPLE: usize = 100;
