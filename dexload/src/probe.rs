//! One-shot endpoint integration check.
//!
//! Every check issues a single request and passes on a 2xx status. Checks run one after
//! another against a plain client; nothing here goes through the scenario engine.
use crate::error::DexloadError;
use crate::pool::classify;
use crate::target::endpoint;
use dexload_core::RequestError;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;

const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const PORTFOLIO_ADDRESS: &str = "0x742d35Cc6634C0532925a3b8D5c9C4C5c8d5b8A8";
const ANALYTICS_USER: &str = "550e8400-e29b-41d4-a716-446655440000";
const PREVIEW_LEN: usize = 100;

#[derive(Clone, Debug)]
pub struct EndpointCheck {
    pub method: Method,
    /// Path and query, joined onto the base URL.
    pub path: String,
    pub description: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl EndpointCheck {
    pub fn get(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            description: description.into(),
            body: None,
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn post(path: impl Into<String>, description: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(path, description)
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The aggregator, arbitrage, portfolio, chain-abstraction and analytics surface.
pub fn default_checks() -> Vec<EndpointCheck> {
    vec![
        EndpointCheck::get("/health", "DEX Aggregator Health"),
        EndpointCheck::get("/api/arbitrage/health", "Arbitrage Health"),
        EndpointCheck::get("/api/arbitrage/opportunities", "Arbitrage Opportunities"),
        EndpointCheck::get("/api/arbitrage/prices?token=USDC", "Cross-chain Prices"),
        EndpointCheck::get("/api/arbitrage/anomalies?token=USDC", "Price Anomalies"),
        EndpointCheck::get("/api/arbitrage/monitoring", "Monitoring Status"),
        EndpointCheck::get("/api/portfolio/health", "Portfolio Health"),
        EndpointCheck::get(
            format!("/api/portfolio/summary?address={PORTFOLIO_ADDRESS}"),
            "Portfolio Summary",
        )
        .timeout(Duration::from_secs(30)),
        EndpointCheck::get(
            format!("/api/portfolio/balances?address={PORTFOLIO_ADDRESS}&chain_id=1"),
            "Portfolio Balances",
        ),
        EndpointCheck::get("/api/chain-abstraction/health", "Chain Abstraction Health"),
        EndpointCheck::get("/api/chain-abstraction/chains", "Supported Chains"),
        EndpointCheck::get("/api/chain-abstraction/tokens", "Supported Tokens"),
        EndpointCheck::post(
            "/api/chain-abstraction/quote",
            "Chain Abstraction Quote",
            json!({
                "from_chain_id": 1,
                "to_chain_id": 137,
                "from_token": "0xA0b86a33E6441b8e6C7Dd10b8e0b4a5e5c5e5c5e",
                "to_token": "0xB0b86a33E6441b8e6C7Dd10b8e0b4a5e5c5e5c5e",
                "amount": "1000000000000000000",
                "user_address": PORTFOLIO_ADDRESS,
            }),
        ),
        EndpointCheck::get("/api/analytics/health", "Analytics Health"),
        EndpointCheck::get(
            format!("/api/analytics/metrics/{ANALYTICS_USER}"),
            "User Performance Metrics",
        ),
        EndpointCheck::post(
            format!("/api/analytics/metrics/{ANALYTICS_USER}/update"),
            "Update Performance Metrics",
            json!({ "performance_data": "test" }),
        ),
        EndpointCheck::get("/api/analytics/comparison", "Performance Comparison"),
        EndpointCheck::get("/api/analytics/leaderboard", "Leaderboard"),
        EndpointCheck::get("/api/analytics/analytics/summary", "Analytics Summary"),
        EndpointCheck::get(
            format!("/api/analytics/metrics/{ANALYTICS_USER}?period=7d&include_history=true"),
            "Metrics History",
        ),
        EndpointCheck::get("/api/analytics/comparison?limit=10", "Top Comparison"),
        EndpointCheck::get("/api/analytics/leaderboard?period=30d", "Monthly Leaderboard"),
    ]
}

/// Top-level shape of a response body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyShape {
    Empty,
    Keys(Vec<String>),
    Array(usize),
    Text(String),
}

impl BodyShape {
    fn of(body: &str) -> Self {
        if body.is_empty() {
            return BodyShape::Empty;
        }
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => BodyShape::Keys(map.keys().cloned().collect()),
            Ok(Value::Array(items)) => BodyShape::Array(items.len()),
            _ => BodyShape::Text(body.chars().take(PREVIEW_LEN).collect()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProbeResponse {
    pub status: u16,
    pub body_len: usize,
    pub shape: BodyShape,
}

#[derive(Clone, Debug)]
pub struct CheckResult {
    pub check: EndpointCheck,
    pub outcome: Result<ProbeResponse, RequestError>,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(res) if (200..300).contains(&res.status))
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Testing: {}", self.check.description)?;
        writeln!(f, "   {} {}", self.check.method, self.check.path)?;
        match &self.outcome {
            Ok(res) if self.passed() => {
                write!(f, "   OK: Status {} ({} chars", res.status, res.body_len)?;
                match &res.shape {
                    BodyShape::Empty => write!(f, ")"),
                    BodyShape::Keys(keys) => write!(f, ", keys: {})", keys.join(", ")),
                    BodyShape::Array(len) => write!(f, ", array of {len})"),
                    BodyShape::Text(preview) => write!(f, ", preview: {preview})"),
                }
            }
            Ok(res) => write!(f, "   FAILED: Status {}", res.status),
            Err(err) => write!(f, "   FAILED: {err}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProbeSummary {
    pub results: Vec<CheckResult>,
}

impl ProbeSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.results.len()
    }
}

impl fmt::Display for ProbeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "{result}")?;
        }
        let total = self.results.len();
        let passed = self.passed();
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "Successful: {passed}/{total}")?;
        write!(f, "Failed: {}/{total}", total - passed)
    }
}

/// Run `checks` in order against `base`.
#[instrument(skip_all, fields(base = %base))]
pub async fn run_checks(
    base: &Url,
    checks: Vec<EndpointCheck>,
) -> Result<ProbeSummary, DexloadError> {
    let client = Client::builder().build()?;

    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        let url = endpoint(base, &check.path)?;
        let outcome = probe(&client, url, &check).await;
        match &outcome {
            Ok(res) => debug!("{} -> {}", check.path, res.status),
            Err(err) => warn!("{} failed: {err}", check.path),
        }
        results.push(CheckResult { check, outcome });
    }

    Ok(ProbeSummary { results })
}

async fn probe(
    client: &Client,
    url: Url,
    check: &EndpointCheck,
) -> Result<ProbeResponse, RequestError> {
    let mut request = client
        .request(check.method.clone(), url)
        .timeout(check.timeout);
    if let Some(body) = &check.body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(classify)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(classify)?;

    Ok(ProbeResponse {
        status,
        body_len: body.chars().count(),
        shape: BodyShape::of(&body),
    })
}
