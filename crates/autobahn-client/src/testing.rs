//! In-memory sessions for unit tests

use async_trait::async_trait;
use autobahn_transport::{Connector, Message, Session, SessionConfig, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) fn closed(code: u16) -> TransportError {
    TransportError::Closed {
        code: Some(code),
        reason: String::new(),
    }
}

/// What a mock session saw from its owner
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    pub sent: Vec<Message>,
    pub closes: usize,
}

/// Replays scripted `recv` results; once exhausted it reports a normal close
pub(crate) struct MockSession {
    incoming: VecDeque<Result<Message, TransportError>>,
    send_error: Option<TransportError>,
    log: Arc<Mutex<SessionLog>>,
}

impl MockSession {
    pub fn new(incoming: Vec<Result<Message, TransportError>>) -> Self {
        Self {
            incoming: incoming.into(),
            send_error: None,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    /// Fail the next send
    pub fn failing_send(mut self, error: TransportError) -> Self {
        self.send_error = Some(error);
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        self.log.clone()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn recv(&mut self) -> Result<Message, TransportError> {
        self.incoming.pop_front().unwrap_or_else(|| Err(closed(1000)))
    }

    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if let Some(e) = self.send_error.take() {
            return Err(e);
        }
        self.log.lock().sent.push(message);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

/// Hands out queued sessions in order and records every open
#[derive(Default)]
pub(crate) struct MockConnector {
    sessions: Mutex<VecDeque<MockSession>>,
    opened: Mutex<Vec<(String, SessionConfig)>>,
}

impl MockConnector {
    pub fn new(sessions: Vec<MockSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<(String, SessionConfig)> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn open(&self, url: &str, config: &SessionConfig) -> Result<MockSession, TransportError> {
        self.opened.lock().push((url.to_string(), config.clone()));
        self.sessions
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::ConnectionFailed("connection refused".to_string()))
    }
}
