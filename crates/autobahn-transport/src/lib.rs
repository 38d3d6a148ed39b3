//! Autobahn Transport Layer
//!
//! One WebSocket connection per [`Session`]. A session yields complete data
//! messages, sends them back unchanged and is closed explicitly by its owner.
//! Control frames (ping/pong) are answered underneath and never surface.
//!
//! - [`Connector`] opens sessions against a URL
//! - [`Session`] is the duplex message channel
//! - [`TransportError::is_remote_close`] tells a normal peer close apart from
//!   everything else

pub mod error;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Connector, Message, Session, SessionConfig};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketSession};
