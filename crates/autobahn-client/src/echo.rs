//! Echo relay for a single case

use autobahn_transport::{Session, TransportError};
use std::time::{Duration, Instant};

/// Summary of a case that ended with the peer closing the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Messages received and sent back
    pub messages: u64,
    pub elapsed: Duration,
}

/// Send every received message straight back until the peer closes.
///
/// A peer close, seen on either receive or send, ends the relay successfully.
/// Any other transport error is returned as-is.
pub async fn relay<S>(session: &mut S) -> Result<CaseOutcome, TransportError>
where
    S: Session + ?Sized,
{
    let started = Instant::now();
    let mut messages = 0u64;

    loop {
        let message = match session.recv().await {
            Ok(message) => message,
            Err(e) if e.is_remote_close() => break,
            Err(e) => return Err(e),
        };

        match session.send(message).await {
            Ok(()) => messages += 1,
            Err(e) if e.is_remote_close() => break,
            Err(e) => return Err(e),
        }
    }

    Ok(CaseOutcome {
        messages,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed, MockSession};
    use autobahn_transport::Message;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_relay_echoes_in_order() {
        let inbound = vec![
            Message::Text("one".into()),
            Message::Binary(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])),
            Message::Text(String::new()),
            Message::Binary(Bytes::new()),
            Message::Text("ünïcödé".into()),
        ];
        let mut session = MockSession::new(inbound.iter().cloned().map(Ok).collect());
        let log = session.log();

        let outcome = relay(&mut session).await.expect("relay failed");

        assert_eq!(outcome.messages, 5);
        assert_eq!(log.lock().sent, inbound);
    }

    #[tokio::test]
    async fn test_relay_immediate_close() {
        let mut session = MockSession::new(vec![Err(closed(1000))]);
        let log = session.log();

        let outcome = relay(&mut session).await.expect("relay failed");

        assert_eq!(outcome.messages, 0);
        assert!(log.lock().sent.is_empty());
    }

    #[tokio::test]
    async fn test_relay_any_close_code_is_success() {
        let mut session = MockSession::new(vec![Ok(Message::Text("a".into())), Err(closed(1002))]);
        assert_eq!(relay(&mut session).await.unwrap().messages, 1);
    }

    #[tokio::test]
    async fn test_relay_protocol_error_propagates() {
        let mut session = MockSession::new(vec![
            Ok(Message::Text("a".into())),
            Err(TransportError::Protocol("reserved bits are non-zero".into())),
            Ok(Message::Text("never read".into())),
        ]);
        let log = session.log();

        let err = relay(&mut session).await.unwrap_err();

        assert!(matches!(err, TransportError::Protocol(_)));
        assert_eq!(log.lock().sent, vec![Message::Text("a".into())]);
    }

    #[tokio::test]
    async fn test_relay_capacity_error_propagates() {
        let mut session = MockSession::new(vec![Err(TransportError::Capacity("too long".into()))]);
        assert!(matches!(
            relay(&mut session).await,
            Err(TransportError::Capacity(_))
        ));
    }

    #[tokio::test]
    async fn test_relay_close_during_send_is_success() {
        let mut session =
            MockSession::new(vec![Ok(Message::Text("a".into()))]).failing_send(closed(1000));
        let outcome = relay(&mut session).await.expect("relay failed");
        assert_eq!(outcome.messages, 0);
    }

    #[tokio::test]
    async fn test_relay_send_failure_propagates() {
        let mut session = MockSession::new(vec![Ok(Message::Text("a".into()))])
            .failing_send(TransportError::SendFailed("broken pipe".into()));
        assert!(matches!(
            relay(&mut session).await,
            Err(TransportError::SendFailed(_))
        ));
    }
}
