//! Fuzzing-server operations
//!
//! Every operation opens its own session, does one thing and closes it
//! again. [`CaseServer`] is the seam the suite driver runs against;
//! [`AutobahnServer`] implements it over a [`Connector`].

use async_trait::async_trait;
use autobahn_transport::{Connector, Message, Session, SessionConfig, WebSocketConnector};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::echo::{self, CaseOutcome};
use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};

/// Case metadata as served by `/getCaseInfo`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseInfo {
    /// Human-readable case identifier, e.g. `"1.1.1"`
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The remote side of a suite run
#[async_trait]
pub trait CaseServer: Send + Sync {
    /// Total number of cases the server will run
    async fn case_count(&self) -> Result<u32>;

    /// Metadata for one case, fetched fresh on every call
    async fn case_info(&self, case: u32) -> Result<CaseInfo>;

    /// Run one case, echoing until the server closes the session
    async fn run_case(&self, case: u32) -> Result<CaseOutcome>;

    /// Ask the server to write its report for this agent
    async fn update_reports(&self) -> Result<()>;
}

/// [`CaseServer`] backed by real sessions
pub struct AutobahnServer<C = WebSocketConnector> {
    config: ClientConfig,
    connector: C,
}

impl AutobahnServer<WebSocketConnector> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, WebSocketConnector::new())
    }
}

impl<C: Connector> AutobahnServer<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, endpoint: Endpoint<'_>) -> Url {
        endpoint.url(self.config.base_url())
    }

    async fn open(&self, url: &Url, config: &SessionConfig) -> Result<C::Session> {
        Ok(self.connector.open(url.as_str(), config).await?)
    }

    /// Open `endpoint`, take its single reply and close
    async fn fetch_one(&self, endpoint: Endpoint<'_>) -> Result<Message> {
        let url = self.url(endpoint);
        let mut session = self.open(&url, &SessionConfig::default()).await?;
        let reply = session.recv().await;
        finish(&mut session, &url).await;

        match reply {
            Ok(message) => Ok(message),
            Err(e) if e.is_remote_close() => Err(ClientError::NoMessage {
                endpoint: url.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<C: Connector> CaseServer for AutobahnServer<C> {
    async fn case_count(&self) -> Result<u32> {
        let payload = self.fetch_one(Endpoint::CaseCount).await?.to_text_lossy();
        let count = parse_case_count(&payload)?;
        info!("Case count={}", count);
        Ok(count)
    }

    async fn case_info(&self, case: u32) -> Result<CaseInfo> {
        let reply = self.fetch_one(Endpoint::CaseInfo { case }).await?;
        Ok(serde_json::from_slice(reply.as_bytes())?)
    }

    async fn run_case(&self, case: u32) -> Result<CaseOutcome> {
        let url = self.url(Endpoint::RunCase {
            case,
            agent: self.config.agent(),
        });
        let session_config = SessionConfig::with_max_message_size(self.config.max_message_size());
        let mut session = self.open(&url, &session_config).await?;

        let outcome = echo::relay(&mut session).await;
        finish(&mut session, &url).await;

        Ok(outcome?)
    }

    async fn update_reports(&self) -> Result<()> {
        let url = self.url(Endpoint::UpdateReports {
            agent: self.config.agent(),
        });
        // The server writes the report as soon as the handshake completes
        let mut session = self.open(&url, &SessionConfig::default()).await?;
        finish(&mut session, &url).await;
        Ok(())
    }
}

fn parse_case_count(payload: &str) -> Result<u32> {
    payload
        .trim()
        .parse()
        .map_err(|_| ClientError::ParseCount {
            payload: payload.to_string(),
        })
}

/// Close a session whose useful work is over. Close failures change nothing
/// for the caller and are only logged.
async fn finish<S: Session>(session: &mut S, url: &Url) {
    if let Err(e) = session.close().await {
        warn!("Error closing session {}: {}", url, e);
    }
}
