use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const RAW_PREVIEW_CHARS: usize = 200;

/// Why a single logical request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Connection refused, reset, or otherwise broken.
    Transport,
    /// Connect or total budget exceeded.
    Timeout,
    /// Non-2xx status.
    ProtocolStatus,
    /// Response body could not be decoded.
    ProtocolPayload,
    /// Operator cancellation.
    Interrupt,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolStatus => "status",
            ErrorKind::ProtocolPayload => "payload",
            ErrorKind::Interrupt => "interrupt",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn status(code: u16) -> Self {
        Self::new(ErrorKind::ProtocolStatus, format!("HTTP {code}"))
    }
}

/// Fields pulled out of a successful response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResponseMetadata {
    Quote {
        routes_count: usize,
        amount_out: Option<String>,
        server_response_time: f64,
    },
    Swap {
        tx_hash: Option<String>,
        amount_out: Option<String>,
        gas_used: Option<u64>,
    },
    Health {
        status: Option<String>,
    },
    Event {
        event_type: String,
    },
    /// The status was a success but the body was not what we expected.
    Raw {
        text: String,
    },
}

impl ResponseMetadata {
    pub fn raw(body: &str) -> Self {
        ResponseMetadata::Raw {
            text: body.chars().take(RAW_PREVIEW_CHARS).collect(),
        }
    }
}

/// Result of one logical request. Produced once by the dispatcher and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    /// Zero-based submission index.
    pub request_id: usize,
    /// From the start of the attempt (after slot acquisition) to response or failure.
    pub latency: Duration,
    pub result: Result<ResponseMetadata, RequestError>,
}

impl RequestOutcome {
    pub fn success(request_id: usize, latency: Duration, metadata: ResponseMetadata) -> Self {
        Self {
            request_id,
            latency,
            result: Ok(metadata),
        }
    }

    pub fn failure(request_id: usize, latency: Duration, error: RequestError) -> Self {
        Self {
            request_id,
            latency,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1_000.
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.result.as_ref().err()
    }

    pub fn metadata(&self) -> Option<&ResponseMetadata> {
        self.result.as_ref().ok()
    }
}
