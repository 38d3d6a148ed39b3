//! WebSocket transport implementation

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        error::ProtocolError, protocol::Message as WsMessage, protocol::WebSocketConfig,
        Error as WsError,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Message, Session, SessionConfig};

/// Opens WebSocket sessions with `TCP_NODELAY` set
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }

    fn ws_config(config: &SessionConfig) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        if let Some(max) = config.max_message_size {
            ws_config.max_message_size = Some(max);
            ws_config.max_frame_size = Some(max);
        }
        ws_config
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Session = WebSocketSession;

    async fn open(&self, url: &str, config: &SessionConfig) -> Result<WebSocketSession> {
        debug!("Connecting to WebSocket: {}", url);

        let (stream, response) =
            connect_async_with_config(url, Some(Self::ws_config(config)), true)
                .await
                .map_err(|e| match e {
                    WsError::Url(e) => TransportError::InvalidUrl(e.to_string()),
                    e => TransportError::ConnectionFailed(e.to_string()),
                })?;

        debug!("WebSocket connected, response: {:?}", response.status());

        Ok(WebSocketSession {
            stream,
            url: url.to_string(),
            closed_by_peer: false,
        })
    }
}

/// A single client connection
pub struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
    /// Set once the peer's close frame (or the end of the stream) was read;
    /// tungstenite has queued the close reply by then
    closed_by_peer: bool,
}

/// Errors that only say the closing handshake already happened
fn is_already_closed(e: &WsError) -> bool {
    matches!(
        e,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}

#[async_trait]
impl Session for WebSocketSession {
    async fn recv(&mut self) -> Result<Message> {
        while let Some(result) = self.stream.next().await {
            match result? {
                WsMessage::Text(text) => {
                    trace!("Received text message ({} bytes)", text.len());
                    return Ok(Message::Text(text));
                }
                WsMessage::Binary(data) => {
                    trace!("Received binary message ({} bytes)", data.len());
                    return Ok(Message::Binary(Bytes::from(data)));
                }
                // Pong is handled automatically by tungstenite
                WsMessage::Ping(_) => trace!("Received ping"),
                WsMessage::Pong(_) => trace!("Received pong"),
                WsMessage::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    debug!("WebSocket closed by peer: {} {:?} {}", self.url, code, reason);
                    self.closed_by_peer = true;
                    return Err(TransportError::Closed { code, reason });
                }
                WsMessage::Frame(_) => {
                    // Raw frame, never produced while reading
                }
            }
        }

        // Stream ends once the closing handshake has completed
        self.closed_by_peer = true;
        Err(TransportError::Closed {
            code: None,
            reason: String::new(),
        })
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        let frame = match message {
            Message::Text(text) => WsMessage::Text(text),
            Message::Binary(data) => WsMessage::Binary(data.to_vec()),
        };

        self.stream.send(frame).await.map_err(|e| match TransportError::from(e) {
            closed @ TransportError::Closed { .. } => closed,
            other => TransportError::SendFailed(other.to_string()),
        })
    }

    async fn close(&mut self) -> Result<()> {
        let result = if self.closed_by_peer {
            // Only the queued close reply is left to write
            self.stream.flush().await
        } else {
            self.stream.close(None).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if is_already_closed(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_config_applies_ceiling_to_messages_and_frames() {
        let config = WebSocketConnector::ws_config(&SessionConfig::with_max_message_size(16 << 20));
        assert_eq!(config.max_message_size, Some(16 << 20));
        assert_eq!(config.max_frame_size, Some(16 << 20));
    }

    #[test]
    fn test_ws_config_default_keeps_library_limits() {
        let config = WebSocketConnector::ws_config(&SessionConfig::default());
        let library = WebSocketConfig::default();
        assert_eq!(config.max_message_size, library.max_message_size);
        assert_eq!(config.max_frame_size, library.max_frame_size);
    }

    #[test]
    fn test_already_closed_errors() {
        assert!(is_already_closed(&WsError::ConnectionClosed));
        assert!(is_already_closed(&WsError::AlreadyClosed));
        assert!(is_already_closed(&WsError::Protocol(
            ProtocolError::SendAfterClosing
        )));
        assert!(!is_already_closed(&WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake
        )));
    }

    #[tokio::test]
    async fn test_open_invalid_url() {
        let result = WebSocketConnector::new()
            .open("not a url", &SessionConfig::default())
            .await;
        assert!(result.is_err());
    }
}
