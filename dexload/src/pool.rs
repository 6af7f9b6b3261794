//! Per-scenario connection pool.
//!
//! A pool is built when a scenario starts and closed when it ends, so the connection reuse of
//! one load level never leaks into the next. Idle reuse, keep-alive and cleanup of closed
//! connections are left to the HTTP client; the total connection cap is a semaphore that every
//! call takes a lease from.
use crate::error::DexloadError;
use dexload_core::{ConnectionPoolConfig, DispatchConfig, ErrorKind, RequestError};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub struct ConnectionPool {
    client: Client,
    config: ConnectionPoolConfig,
    dispatch: DispatchConfig,
    connections: Arc<Semaphore>,
}

impl ConnectionPool {
    pub fn new(config: ConnectionPoolConfig, dispatch: DispatchConfig) -> Result<Self, DexloadError> {
        if config.total_limit > Semaphore::MAX_PERMITS {
            return Err(DexloadError::PoolTooLarge {
                limit: config.total_limit,
                max: Semaphore::MAX_PERMITS,
            });
        }

        let client = Client::builder()
            .pool_max_idle_per_host(config.per_target_limit)
            .pool_idle_timeout(config.keepalive)
            .tcp_keepalive(config.keepalive)
            .connect_timeout(dispatch.connect_timeout)
            .timeout(dispatch.total_timeout)
            .build()?;

        debug!(
            "Connection pool opened (total={}, per_target={}, keepalive={})",
            config.total_limit,
            config.per_target_limit,
            humantime::format_duration(config.keepalive)
        );

        Ok(Self {
            client,
            connections: Arc::new(Semaphore::new(config.total_limit)),
            config,
            dispatch,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &ConnectionPoolConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &DispatchConfig {
        &self.dispatch
    }

    pub fn available_connections(&self) -> usize {
        self.connections.available_permits()
    }

    /// Reserve one of the pool's connections for the lifetime of the returned lease.
    pub async fn lease(&self) -> Result<ConnectionLease, RequestError> {
        self.connections
            .clone()
            .acquire_owned()
            .await
            .map(ConnectionLease)
            .map_err(|_| RequestError::new(ErrorKind::Interrupt, "connection pool closed"))
    }

    /// Send a request through the pool and read the whole body.
    ///
    /// Non-2xx statuses come back as `ProtocolStatus` errors without the body being read. A 2xx
    /// body that cannot be decoded is handed back empty; the call still succeeded.
    pub async fn send(&self, request: RequestBuilder) -> Result<PooledResponse, RequestError> {
        let _lease = self.lease().await?;

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            trace!("Request failed with {status}");
            return Err(RequestError::status(status.as_u16()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) if err.is_decode() => {
                debug!("Undecodable {status} body: {err}");
                String::new()
            }
            Err(err) => return Err(classify(err)),
        };

        Ok(PooledResponse { status, body })
    }

    /// Tear the pool down. Later leases fail; idle connections go when the pool is dropped.
    pub fn close(&self) {
        self.connections.close();
        debug!("Connection pool closed");
    }
}

pub struct ConnectionLease(#[allow(unused)] OwnedSemaphorePermit);

#[derive(Debug)]
pub struct PooledResponse {
    pub status: StatusCode,
    pub body: String,
}

pub(crate) fn classify(err: reqwest::Error) -> RequestError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_decode() {
        ErrorKind::ProtocolPayload
    } else {
        ErrorKind::Transport
    };
    RequestError::new(kind, err.to_string())
}
