//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A complete data message. The opcode is kept so an echo goes back as the
/// same kind of frame it arrived as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
}

impl Message {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Message::Text(text) => text.len(),
            Message::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload as text; binary payloads are decoded lossily.
    pub fn to_text_lossy(&self) -> String {
        match self {
            Message::Text(text) => text.clone(),
            Message::Binary(data) => String::from_utf8_lossy(data).into_owned(),
        }
    }

    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) => data,
        }
    }
}

/// Per-session limits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Largest message (and frame) accepted; `None` keeps the library default.
    pub max_message_size: Option<usize>,
}

impl SessionConfig {
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            max_message_size: Some(max_message_size),
        }
    }
}

/// An open duplex channel to one endpoint.
///
/// Owners call [`Session::close`] on every exit path. Dropping a session
/// without closing it releases the socket without a closing handshake.
#[async_trait]
pub trait Session: Send {
    /// Wait for the next data message.
    ///
    /// A peer close surfaces as [`TransportError::Closed`](crate::TransportError::Closed).
    async fn recv(&mut self) -> Result<Message>;

    /// Send one complete message and flush it.
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Finish the closing handshake. A peer that already closed is not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open a session to `url`, performing exactly one handshake.
    async fn open(&self, url: &str, config: &SessionConfig) -> Result<Self::Session>;
}
