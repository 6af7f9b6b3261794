use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// Added to every handled request.
    pub delay: Duration,
}

/// Request accounting shared by every handler.
#[derive(Default)]
pub struct MockState {
    config: MockConfig,
    total: AtomicU64,
    in_flight: AtomicU64,
    peak: AtomicU64,
    limiters: Mutex<HashMap<u32, Arc<DefaultDirectRateLimiter>>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of requests seen in flight at once.
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn reset_peak(&self) {
        self.peak.store(self.in_flight(), Ordering::SeqCst);
    }

    fn enter(&self) -> InFlight<'_> {
        counter!("mock_service.requests").increment(1);
        self.total.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlight(self)
    }

    async fn pause(&self) {
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }

    fn limiter(&self, max_tps: u32) -> Result<Arc<DefaultDirectRateLimiter>, MockError> {
        let tps = NonZeroU32::new(max_tps).ok_or(MockError::InvalidLimit(max_tps))?;
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        let limiter = limiters
            .entry(max_tps)
            .or_insert_with(|| Arc::new(RateLimiter::direct(Quota::per_second(tps))));
        Ok(limiter.clone())
    }
}

struct InFlight<'a>(&'a MockState);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Error)]
pub enum MockError {
    #[error("Rate limit of {0} TPS exceeded")]
    OverLimit(u32),

    #[error("Invalid rate limit: {0}")]
    InvalidLimit(u32),

    #[error("Unknown status code: {0}")]
    UnknownStatus(u16),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = match self {
            MockError::OverLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
            MockError::InvalidLimit(_) | MockError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/quote", post(quote))
        .route("/swap", post(swap))
        .route(
            "/api/:subsystem/:resource",
            get(subsystem).post(subsystem_action),
        )
        .route(
            "/api/:subsystem/:resource/*item",
            get(subsystem_item).post(subsystem_item_action),
        )
        .route("/ws", get(stream))
        .route("/status/:code", get(status).post(status))
        .route("/malformed", get(malformed).post(malformed))
        .route("/limited/:max_tps/quote", post(limited_quote))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `addr` until the process exits.
pub async fn serve(addr: SocketAddr, state: Arc<MockState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await
}

/// Serve on an ephemeral loopback port in the background.
pub async fn spawn(config: MockConfig) -> std::io::Result<(SocketAddr, Arc<MockState>)> {
    let state = Arc::new(MockState::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("Mock service stopped: {err}");
        }
    });
    debug!("Mock service listening on {addr}");

    Ok((addr, state))
}

#[debug_handler]
async fn health(State(state): State<Arc<MockState>>) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    token_in: String,
    token_out: String,
    amount_in: String,
}

#[debug_handler]
async fn quote(
    State(state): State<Arc<MockState>>,
    Json(req): Json<QuoteRequest>,
) -> Json<Value> {
    let _guard = state.enter();
    let started = Instant::now();
    state.pause().await;
    Json(quote_body(&req, started))
}

#[debug_handler]
async fn limited_quote(
    State(state): State<Arc<MockState>>,
    Path(max_tps): Path<u32>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<Value>, MockError> {
    let _guard = state.enter();
    let started = Instant::now();
    state
        .limiter(max_tps)?
        .check()
        .map_err(|_| MockError::OverLimit(max_tps))?;
    state.pause().await;
    Ok(Json(quote_body(&req, started)))
}

fn quote_body(req: &QuoteRequest, started: Instant) -> Value {
    json!({
        "tokenIn": req.token_in,
        "tokenOut": req.token_out,
        "amountIn": req.amount_in,
        "amountOut": "3012450000",
        "routes": [
            { "dex": "uniswap_v3", "percentage": 60 },
            { "dex": "curve", "percentage": 40 },
        ],
        "priceImpact": 0.12,
        "gasEstimate": "180000",
        "responseTime": started.elapsed().as_secs_f64() * 1_000.,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest {
    amount_out_min: String,
    user_address: String,
}

#[debug_handler]
async fn swap(State(state): State<Arc<MockState>>, Json(req): Json<SwapRequest>) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;

    let tx_hash: String = rand::random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    Json(json!({
        "tx_hash": format!("0x{tx_hash}"),
        "amount_out": req.amount_out_min,
        "gas_used": 152_340,
        "user_address": req.user_address,
    }))
}

#[debug_handler]
async fn subsystem(
    State(state): State<Arc<MockState>>,
    Path((subsystem, resource)): Path<(String, String)>,
) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;

    let body = match resource.as_str() {
        "health" => json!({ "status": "healthy", "service": subsystem }),
        "chains" => json!({
            "chains": [
                { "chain_id": 1, "name": "ethereum" },
                { "chain_id": 137, "name": "polygon" },
                { "chain_id": 42161, "name": "arbitrum" },
            ]
        }),
        _ => json!({ "service": subsystem, "resource": resource, "data": [] }),
    };
    Json(body)
}

#[debug_handler]
async fn subsystem_action(
    State(state): State<Arc<MockState>>,
    Path((subsystem, resource)): Path<(String, String)>,
    Json(req): Json<Value>,
) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;
    Json(json!({
        "service": subsystem,
        "resource": resource,
        "request": req,
        "estimated_time_seconds": 120,
    }))
}

#[debug_handler]
async fn subsystem_item(
    State(state): State<Arc<MockState>>,
    Path((subsystem, resource, item)): Path<(String, String, String)>,
) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;
    Json(json!({ "service": subsystem, "resource": resource, "item": item, "data": {} }))
}

#[debug_handler]
async fn subsystem_item_action(
    State(state): State<Arc<MockState>>,
    Path((subsystem, resource, item)): Path<(String, String, String)>,
    Json(req): Json<Value>,
) -> Json<Value> {
    let _guard = state.enter();
    state.pause().await;
    Json(json!({
        "service": subsystem,
        "resource": resource,
        "item": item,
        "request": req,
        "updated": true,
    }))
}

#[debug_handler]
async fn status(
    State(state): State<Arc<MockState>>,
    Path(code): Path<u16>,
) -> Result<(StatusCode, Json<Value>), MockError> {
    let _guard = state.enter();
    state.pause().await;
    let status = StatusCode::from_u16(code).map_err(|_| MockError::UnknownStatus(code))?;
    Ok((status, Json(json!({ "status": code }))))
}

#[debug_handler]
async fn malformed(State(state): State<Arc<MockState>>) -> &'static str {
    let _guard = state.enter();
    state.pause().await;
    "<html><body>upstream returned garbage</body></html>"
}

#[derive(Deserialize)]
struct Subscription {
    #[serde(default)]
    event_types: Vec<String>,
}

async fn stream(State(state): State<Arc<MockState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| subscription(socket, state))
}

/// Acknowledge each subscription, then publish one event per subscribed type.
async fn subscription(mut socket: WebSocket, state: Arc<MockState>) {
    let _guard = state.enter();

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            continue;
        };

        let frames = match serde_json::from_str::<Subscription>(&text) {
            Ok(sub) => {
                let ack = json!({ "type": "subscribed", "event_types": sub.event_types });
                if socket.send(Message::Text(ack.to_string())).await.is_err() {
                    return;
                }
                state.pause().await;
                sub.event_types
                    .iter()
                    .map(|event_type| event(event_type).to_string())
                    .collect()
            }
            Err(err) => vec![json!({ "type": "error", "message": err.to_string() }).to_string()],
        };

        for frame in frames {
            if socket.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
    }
}

fn event(event_type: &str) -> Value {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    json!({
        "event_type": event_type,
        "trade_id": format!("trade-{timestamp}"),
        "timestamp": timestamp,
    })
}
