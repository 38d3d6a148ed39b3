//! Client error types

use autobahn_transport::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("connection error: {0}")]
    Connection(#[from] TransportError),

    /// A single-reply endpoint closed before replying
    #[error("{endpoint} closed without a reply")]
    NoMessage { endpoint: String },

    #[error("invalid case count: {payload:?}")]
    ParseCount { payload: String },

    #[error("invalid case info: {0}")]
    ParseInfo(#[from] serde_json::Error),
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl(e.to_string())
    }
}
