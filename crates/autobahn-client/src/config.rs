//! Client configuration

use url::Url;

use crate::error::{ClientError, Result};

/// Identifies this client to the fuzzing server; reports are filed under it.
pub const AGENT: &str = "tokio-tungstenite";

/// Largest message accepted during a case.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Settings shared by every session of a suite run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    agent: String,
    max_message_size: usize,
}

impl ClientConfig {
    /// Parse `url` and use the default agent and message ceiling
    pub fn new(url: &str) -> Result<Self> {
        Self::builder(url).build()
    }

    pub fn builder(url: &str) -> ClientConfigBuilder {
        ClientConfigBuilder::new(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    url: String,
    agent: String,
    max_message_size: usize,
}

impl ClientConfigBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            agent: AGENT.to_string(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Set the agent identity
    pub fn agent(mut self, agent: &str) -> Self {
        self.agent = agent.to_string();
        self
    }

    /// Set the per-case message ceiling in bytes
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let base_url = Url::parse(&self.url)?;
        if !matches!(base_url.scheme(), "ws" | "wss") {
            return Err(ClientError::InvalidUrl(format!(
                "{}: scheme must be ws or wss",
                self.url
            )));
        }
        if self.agent.is_empty() {
            return Err(ClientError::InvalidConfig(
                "agent must not be empty".to_string(),
            ));
        }

        Ok(ClientConfig {
            base_url,
            agent: self.agent,
            max_message_size: self.max_message_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("ws://127.0.0.1:9001").unwrap();
        assert_eq!(config.agent(), "tokio-tungstenite");
        assert_eq!(config.max_message_size(), 16 * 1024 * 1024);
        assert_eq!(config.base_url().as_str(), "ws://127.0.0.1:9001/");
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder("wss://fuzzing.example:9001")
            .agent("my-agent")
            .max_message_size(1024)
            .build()
            .unwrap();
        assert_eq!(config.agent(), "my-agent");
        assert_eq!(config.max_message_size(), 1024);
    }

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let err = ClientConfig::new("http://127.0.0.1:9001").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        assert!(matches!(
            ClientConfig::new("127.0.0.1:9001 nope"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_empty_agent() {
        assert!(matches!(
            ClientConfig::builder("ws://h:1").agent("").build(),
            Err(ClientError::InvalidConfig(_))
        ));
    }
}
