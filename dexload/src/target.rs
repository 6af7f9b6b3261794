//! The request kinds a scenario can drive.
//!
//! A [`Target`] performs exactly one logical request per call. Failures are returned as
//! [`RequestError`]s, never raised, and a 2xx response whose body does not parse still counts
//! as a success with the raw text captured.
use crate::error::DexloadError;
use crate::pool::ConnectionPool;
use dexload_core::{QuotePayload, RequestError, ResponseMetadata, SwapPayload};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;

pub trait Target: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn call(
        &self,
        pool: &ConnectionPool,
    ) -> impl Future<Output = Result<ResponseMetadata, RequestError>> + Send;
}

/// Join `path` onto `base` regardless of trailing or leading slashes.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, DexloadError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

/// WebSocket counterpart of [`endpoint`]: `http` becomes `ws`, `https` becomes `wss`.
pub fn ws_endpoint(base: &Url, path: &str) -> Result<Url, DexloadError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(DexloadError::Scheme(other.to_string())),
    };
    let mut url = endpoint(base, path)?;
    url.set_scheme(scheme)
        .map_err(|_| DexloadError::Scheme(base.scheme().to_string()))?;
    Ok(url)
}

/// `POST /quote`
pub struct QuoteTarget {
    url: Url,
    payload: QuotePayload,
}

impl QuoteTarget {
    pub fn new(base: &Url, payload: QuotePayload) -> Result<Self, DexloadError> {
        Ok(Self {
            url: endpoint(base, "quote")?,
            payload,
        })
    }

    /// Quote against an arbitrary path, e.g. a rate-limited or failing variant of the endpoint.
    pub fn with_path(base: &Url, path: &str, payload: QuotePayload) -> Result<Self, DexloadError> {
        Ok(Self {
            url: endpoint(base, path)?,
            payload,
        })
    }
}

impl Target for QuoteTarget {
    fn name(&self) -> &'static str {
        "quote"
    }

    async fn call(&self, pool: &ConnectionPool) -> Result<ResponseMetadata, RequestError> {
        let request = pool.client().post(self.url.clone()).json(&self.payload);
        let response = pool.send(request).await?;
        Ok(quote_metadata(&response.body))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    #[serde(default)]
    routes: Vec<Value>,
    amount_out: Option<Value>,
    response_time: Option<f64>,
}

pub(crate) fn quote_metadata(body: &str) -> ResponseMetadata {
    match serde_json::from_str::<QuoteResponse>(body) {
        Ok(quote) => ResponseMetadata::Quote {
            routes_count: quote.routes.len(),
            amount_out: quote.amount_out.as_ref().map(value_to_string),
            server_response_time: quote.response_time.unwrap_or(0.),
        },
        Err(err) => {
            trace!("Unparseable quote body: {err}");
            ResponseMetadata::raw(body)
        }
    }
}

/// `POST /swap`
pub struct SwapTarget {
    url: Url,
    payload: SwapPayload,
}

impl SwapTarget {
    pub fn new(base: &Url, payload: SwapPayload) -> Result<Self, DexloadError> {
        Ok(Self {
            url: endpoint(base, "swap")?,
            payload,
        })
    }
}

impl Target for SwapTarget {
    fn name(&self) -> &'static str {
        "swap"
    }

    async fn call(&self, pool: &ConnectionPool) -> Result<ResponseMetadata, RequestError> {
        let request = pool.client().post(self.url.clone()).json(&self.payload);
        let response = pool.send(request).await?;
        Ok(swap_metadata(&response.body))
    }
}

#[derive(Deserialize)]
struct SwapResponse {
    tx_hash: Option<String>,
    amount_out: Option<Value>,
    gas_used: Option<u64>,
}

pub(crate) fn swap_metadata(body: &str) -> ResponseMetadata {
    match serde_json::from_str::<SwapResponse>(body) {
        Ok(swap) => ResponseMetadata::Swap {
            tx_hash: swap.tx_hash,
            amount_out: swap.amount_out.as_ref().map(value_to_string),
            gas_used: swap.gas_used,
        },
        Err(err) => {
            trace!("Unparseable swap body: {err}");
            ResponseMetadata::raw(body)
        }
    }
}

/// `GET /health` or any `/api/<subsystem>/health`.
pub struct HealthTarget {
    url: Url,
}

impl HealthTarget {
    pub fn new(base: &Url, path: &str) -> Result<Self, DexloadError> {
        Ok(Self {
            url: endpoint(base, path)?,
        })
    }
}

impl Target for HealthTarget {
    fn name(&self) -> &'static str {
        "health"
    }

    async fn call(&self, pool: &ConnectionPool) -> Result<ResponseMetadata, RequestError> {
        let request = pool.client().get(self.url.clone());
        let response = pool.send(request).await?;
        Ok(health_metadata(&response.body))
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: Option<String>,
}

pub(crate) fn health_metadata(body: &str) -> ResponseMetadata {
    match serde_json::from_str::<HealthResponse>(body) {
        Ok(health) => ResponseMetadata::Health {
            status: health.status,
        },
        Err(_) => ResponseMetadata::raw(body),
    }
}

/// Subscribe over WebSocket and wait for the first event frame.
pub struct StreamTarget {
    url: Url,
    event_types: Vec<String>,
}

impl StreamTarget {
    pub fn new(url: Url, event_types: &[&str]) -> Self {
        Self {
            url,
            event_types: event_types.iter().map(|e| e.to_string()).collect(),
        }
    }

    async fn exchange(&self, pool: &ConnectionPool) -> Result<ResponseMetadata, RequestError> {
        let connect_timeout = pool.dispatch().connect_timeout;
        let (mut stream, _) = timeout(connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| RequestError::timeout("websocket connect timed out"))?
            .map_err(|err| RequestError::transport(err.to_string()))?;

        let subscribe = serde_json::json!({
            "action": "subscribe",
            "event_types": self.event_types,
        });
        stream
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(|err| RequestError::transport(err.to_string()))?;

        while let Some(frame) = stream.next().await {
            match frame.map_err(|err| RequestError::transport(err.to_string()))? {
                Message::Text(text) => match serde_json::from_str::<EventFrame>(&text) {
                    Ok(EventFrame {
                        event_type: Some(event_type),
                    }) => {
                        let _ = stream.close(None).await;
                        return Ok(ResponseMetadata::Event { event_type });
                    }
                    // Subscription acknowledgements carry no event type.
                    Ok(_) => trace!("Skipping frame: {text}"),
                    Err(_) => {
                        let _ = stream.close(None).await;
                        return Ok(ResponseMetadata::raw(&text));
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        Err(RequestError::transport("stream closed before any event"))
    }
}

#[derive(Deserialize)]
struct EventFrame {
    event_type: Option<String>,
}

impl Target for StreamTarget {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn call(&self, pool: &ConnectionPool) -> Result<ResponseMetadata, RequestError> {
        let _lease = pool.lease().await?;
        let total_timeout = pool.dispatch().total_timeout;
        timeout(total_timeout, self.exchange(pool))
            .await
            .map_err(|_| RequestError::timeout("no event within the total timeout"))?
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
