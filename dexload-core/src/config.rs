use crate::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEPALIVE, DEFAULT_TOTAL_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_PLAN: [(&str, usize, usize); 5] = [
    ("Warm-up test", 50, 10),
    ("Basic concurrent load", 100, 25),
    ("Medium load test", 250, 50),
    ("High concurrent load", 500, 100),
    ("Stress test", 1000, 200),
];

/// One load level: how many logical requests to issue and how many may be in flight at once.
///
/// `concurrency` is conceptually at most `request_count` but this is not enforced; a larger
/// value simply never fills its slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub label: String,
    pub request_count: NonZeroUsize,
    pub concurrency: NonZeroUsize,
}

impl ScenarioSpec {
    pub fn new(label: &str, request_count: NonZeroUsize, concurrency: NonZeroUsize) -> Self {
        Self {
            label: label.to_string(),
            request_count,
            concurrency,
        }
    }

    /// Returns `None` if either count is zero.
    pub fn try_new(label: &str, request_count: usize, concurrency: usize) -> Option<Self> {
        Some(Self::new(
            label,
            NonZeroUsize::new(request_count)?,
            NonZeroUsize::new(concurrency)?,
        ))
    }

    /// The fixed, ascending plan run by a bare `dexload` invocation.
    pub fn default_plan() -> Vec<ScenarioSpec> {
        DEFAULT_PLAN
            .iter()
            .filter_map(|(label, requests, concurrency)| {
                Self::try_new(label, *requests, *concurrency)
            })
            .collect()
    }

    pub fn pool_config(&self) -> ConnectionPoolConfig {
        ConnectionPoolConfig::for_concurrency(self.concurrency)
    }
}

impl fmt::Display for ScenarioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} requests, {} concurrent",
            self.label, self.request_count, self.concurrency
        )
    }
}

/// Connection pool sizing for one scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionPoolConfig {
    /// Connections open at once across every host.
    pub total_limit: usize,
    /// Idle connections kept per target host.
    pub per_target_limit: usize,
    pub keepalive: Duration,
}

impl ConnectionPoolConfig {
    pub fn for_concurrency(concurrency: NonZeroUsize) -> Self {
        Self {
            total_limit: concurrency.get().saturating_mul(2),
            per_target_limit: concurrency.get(),
            keepalive: DEFAULT_KEEPALIVE,
        }
    }
}

/// Per-request timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl fmt::Display for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connect={}, total={}",
            humantime::format_duration(self.connect_timeout),
            humantime::format_duration(self.total_timeout)
        )
    }
}

/// Body of `POST /quote`. Amounts are decimal strings in base units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub slippage: f64,
}

impl Default for QuotePayload {
    fn default() -> Self {
        Self {
            token_in: "ETH".to_string(),
            token_out: "USDC".to_string(),
            amount_in: "1000000000000000000".to_string(),
            slippage: 0.005,
        }
    }
}

/// Body of `POST /swap`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapPayload {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out_min: String,
    pub routes: Vec<serde_json::Value>,
    pub user_address: String,
    pub slippage: f64,
}

impl Default for SwapPayload {
    fn default() -> Self {
        Self {
            token_in: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string(),
            token_out: "0xA0b86a33E6417c8ade68E28af88e4c8b4c6b0c5a".to_string(),
            amount_in: "100000000000000000".to_string(),
            amount_out_min: "250000000".to_string(),
            routes: vec![],
            user_address: "0x742d35Cc6634C0532925a3b8D4C2C4e07C3D2b7e".to_string(),
            slippage: 0.5,
        }
    }
}
