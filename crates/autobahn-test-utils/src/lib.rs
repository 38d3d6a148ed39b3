//! Test helpers for the Autobahn client
//!
//! [`TestServer`] stands in for the Autobahn fuzzing server: it answers the
//! four client endpoints from a [`ServerScript`] and records what the client
//! did, so tests can assert on request order, echoes and report triggers.
//! The server task and its open connections are aborted when the handle is
//! dropped.

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};
use url::Url;

pub use tokio_tungstenite::tungstenite::Message as WsMessage;

/// How long a case waits for each echo before giving up
pub const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

/// A frame header with all three reserved bits set and no extension negotiated
const CORRUPT_FRAME: [u8; 2] = [0xF1, 0x00];

// ============================================================================
// Scripts
// ============================================================================

/// How a scripted case ends after its messages were echoed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseEnding {
    /// Close frame with status 1000
    CloseNormal,
    /// Close frame with the given status
    CloseWith(u16),
    /// Drop the TCP connection without a closing handshake
    Abort,
    /// Write a frame with reserved bits set, then drop the connection
    Corrupt,
}

/// One server-driven case
#[derive(Debug, Clone)]
pub struct CaseScript {
    pub id: String,
    pub messages: Vec<WsMessage>,
    pub ending: CaseEnding,
}

impl CaseScript {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            messages: Vec::new(),
            ending: CaseEnding::CloseNormal,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.messages.push(WsMessage::Text(text.to_string()));
        self
    }

    pub fn binary(mut self, data: Vec<u8>) -> Self {
        self.messages.push(WsMessage::Binary(data));
        self
    }

    pub fn ending(mut self, ending: CaseEnding) -> Self {
        self.ending = ending;
        self
    }
}

/// Everything the server answers with. Case `n` is `cases[n - 1]`.
#[derive(Debug, Clone, Default)]
pub struct ServerScript {
    pub cases: Vec<CaseScript>,
    /// Replaces the `/getCaseCount` reply
    pub case_count_payload: Option<String>,
    /// Replaces the `/getCaseInfo` reply for a case
    pub case_info_payloads: HashMap<u32, String>,
}

impl ServerScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case(mut self, case: CaseScript) -> Self {
        self.cases.push(case);
        self
    }

    pub fn case_count_payload(mut self, payload: &str) -> Self {
        self.case_count_payload = Some(payload.to_string());
        self
    }

    pub fn case_info_payload(mut self, case: u32, payload: &str) -> Self {
        self.case_info_payloads.insert(case, payload.to_string());
        self
    }

    fn case_script(&self, case: u32) -> Option<&CaseScript> {
        let index = usize::try_from(case).ok()?.checked_sub(1)?;
        self.cases.get(index)
    }
}

// ============================================================================
// Records
// ============================================================================

/// What happened during one `/runCase` session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRun {
    pub case: u32,
    pub agent: Option<String>,
    /// Messages received back, in order
    pub echoes: Vec<WsMessage>,
    /// Every scripted message came back identical and in order
    pub echoed_verbatim: bool,
}

#[derive(Debug, Default)]
struct Records {
    requests: Vec<String>,
    case_runs: Vec<CaseRun>,
    report_agents: Vec<Option<String>>,
}

// ============================================================================
// Test Server - RAII wrapper with proper cleanup
// ============================================================================

/// An in-process fuzzing server double that stops on drop
pub struct TestServer {
    port: u16,
    handle: Option<tokio::task::JoinHandle<()>>,
    records: Arc<Mutex<Records>>,
}

impl TestServer {
    /// Bind an ephemeral port on loopback and start serving `script`
    pub async fn start(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let port = listener.local_addr().expect("test server address").port();
        let records = Arc::new(Mutex::new(Records::default()));
        let script = Arc::new(script);

        let handle = tokio::spawn({
            let records = records.clone();
            async move {
                // Dropped with the accept task, which aborts every open connection
                let mut connections = JoinSet::new();
                loop {
                    tokio::select! {
                        accepted = listener.accept() => {
                            let Ok((stream, _)) = accepted else { break };
                            let records = records.clone();
                            let script = script.clone();
                            connections.spawn(async move {
                                if let Err(e) = serve_connection(stream, &script, &records).await {
                                    debug!("Test server connection ended: {}", e);
                                }
                            });
                        }
                        Some(_) = connections.join_next(), if !connections.is_empty() => {}
                    }
                }
            }
        });

        Self {
            port,
            handle: Some(handle),
            records,
        }
    }

    /// Base WebSocket URL for this server
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path and query of every handshake, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.records.lock().requests.clone()
    }

    /// Number of handshakes made to `path`
    pub fn request_count(&self, path: &str) -> usize {
        self.records
            .lock()
            .requests
            .iter()
            .filter(|r| r.split('?').next() == Some(path))
            .count()
    }

    /// Completed `/runCase` sessions, in order
    pub fn case_runs(&self) -> Vec<CaseRun> {
        self.records.lock().case_runs.clone()
    }

    /// Agents that triggered `/updateReports`
    pub fn report_agents(&self) -> Vec<Option<String>> {
        self.records.lock().report_agents.clone()
    }

    /// Stop the server explicitly (also happens on drop)
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Connection handling
// ============================================================================

type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

async fn serve_connection(
    stream: TcpStream,
    script: &ServerScript,
    records: &Mutex<Records>,
) -> ServerResult<()> {
    let mut target = String::new();
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_default();
            // Must happen before the response reaches the client
            record_request(records, &target);
            Ok(resp)
        },
    )
    .await?;

    let parsed = parse_target(&target)?;
    let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
    let case = query.get("case").and_then(|c| c.parse::<u32>().ok());
    let agent = query.get("agent").cloned();

    match parsed.path() {
        "/getCaseCount" => {
            let payload = script
                .case_count_payload
                .clone()
                .unwrap_or_else(|| script.cases.len().to_string());
            ws.send(WsMessage::Text(payload)).await?;
            close_normal(&mut ws).await
        }
        "/getCaseInfo" => {
            let payload = case.and_then(|n| {
                script.case_info_payloads.get(&n).cloned().or_else(|| {
                    script.case_script(n).map(|c| {
                        serde_json::json!({
                            "id": c.id,
                            "description": format!("Scripted case {}", c.id),
                        })
                        .to_string()
                    })
                })
            });
            if let Some(payload) = payload {
                ws.send(WsMessage::Text(payload)).await?;
            }
            close_normal(&mut ws).await
        }
        "/runCase" => {
            let Some((n, case_script)) = case.and_then(|n| script.case_script(n).map(|c| (n, c)))
            else {
                return close_normal(&mut ws).await;
            };
            run_case(ws, n, agent, case_script, records).await
        }
        "/updateReports" => {
            drain(&mut ws).await;
            Ok(())
        }
        other => {
            warn!("Test server got unknown path {}", other);
            ws.close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "unknown path".into(),
            }))
            .await?;
            Ok(())
        }
    }
}

fn parse_target(target: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("ws://127.0.0.1{}", target))
}

fn record_request(records: &Mutex<Records>, target: &str) {
    let mut records = records.lock();
    records.requests.push(target.to_string());

    if let Ok(url) = parse_target(target) {
        if url.path() == "/updateReports" {
            let agent = url
                .query_pairs()
                .find(|(k, _)| k == "agent")
                .map(|(_, v)| v.into_owned());
            records.report_agents.push(agent);
        }
    }
}

async fn run_case(
    mut ws: WebSocketStream<TcpStream>,
    case: u32,
    agent: Option<String>,
    script: &CaseScript,
    records: &Mutex<Records>,
) -> ServerResult<()> {
    let mut echoes = Vec::with_capacity(script.messages.len());

    for message in &script.messages {
        ws.send(message.clone()).await?;
        match tokio::time::timeout(ECHO_TIMEOUT, next_data(&mut ws)).await {
            Ok(Some(echo)) => echoes.push(echo),
            _ => break,
        }
    }

    let echoed_verbatim = echoes == script.messages;
    records.lock().case_runs.push(CaseRun {
        case,
        agent,
        echoes,
        echoed_verbatim,
    });

    match script.ending {
        CaseEnding::CloseNormal => close_normal(&mut ws).await,
        CaseEnding::CloseWith(code) => {
            ws.close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "scripted close".into(),
            }))
            .await?;
            drain(&mut ws).await;
            Ok(())
        }
        CaseEnding::Abort => Ok(()),
        CaseEnding::Corrupt => {
            let tcp = ws.get_mut();
            tcp.write_all(&CORRUPT_FRAME).await?;
            tcp.flush().await?;
            // Give the client a moment to read the frame before the socket goes away
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        }
    }
}

async fn next_data(ws: &mut WebSocketStream<TcpStream>) -> Option<WsMessage> {
    while let Some(Ok(message)) = ws.next().await {
        match message {
            WsMessage::Text(_) | WsMessage::Binary(_) => return Some(message),
            WsMessage::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn close_normal(ws: &mut WebSocketStream<TcpStream>) -> ServerResult<()> {
    ws.close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }))
    .await?;
    drain(ws).await;
    Ok(())
}

/// Read until the peer finishes the closing handshake or goes away
async fn drain(ws: &mut WebSocketStream<TcpStream>) {
    while let Ok(Some(Ok(_))) = tokio::time::timeout(ECHO_TIMEOUT, ws.next()).await {}
}
