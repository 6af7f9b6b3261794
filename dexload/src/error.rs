use thiserror::Error;

#[derive(Debug, Error)]
pub enum DexloadError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid target URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("No WebSocket scheme for base URL scheme `{0}`")]
    Scheme(String),

    #[error("Connection limit {limit} exceeds the maximum of {max}")]
    PoolTooLarge { limit: usize, max: usize },
}
