//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The peer ended the session. `code` is absent when the close frame
    /// carried no status.
    #[error("connection closed by peer (code {code:?}) {reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("message too large: {0}")]
    Capacity(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the session ended because the peer closed it.
    pub fn is_remote_close(&self) -> bool {
        matches!(self, TransportError::Closed { .. })
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed {
                code: None,
                reason: String::new(),
            },
            WsError::Capacity(e) => TransportError::Capacity(e.to_string()),
            WsError::Protocol(e) => TransportError::Protocol(e.to_string()),
            WsError::Io(e) => TransportError::Io(e),
            WsError::Url(e) => TransportError::InvalidUrl(e.to_string()),
            other => TransportError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_is_remote_close() {
        let closed = TransportError::Closed {
            code: Some(1000),
            reason: String::new(),
        };
        assert!(closed.is_remote_close());
        assert!(!TransportError::Protocol("bad frame".into()).is_remote_close());
        assert!(!TransportError::Capacity("too big".into()).is_remote_close());
        assert!(!TransportError::ConnectionFailed("refused".into()).is_remote_close());
    }

    #[cfg(feature = "websocket")]
    #[test]
    fn test_tungstenite_error_mapping() {
        use tokio_tungstenite::tungstenite::error::ProtocolError;
        use tokio_tungstenite::tungstenite::Error as WsError;

        assert!(TransportError::from(WsError::ConnectionClosed).is_remote_close());
        assert!(TransportError::from(WsError::AlreadyClosed).is_remote_close());

        let reset = TransportError::from(WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake,
        ));
        assert!(matches!(reset, TransportError::Protocol(_)));
    }
}
