//! Autobahn Client Library
//!
//! Drives the Autobahn fuzzing server's client test suite. The server picks
//! the cases and judges them; this crate only moves bytes: one WebSocket
//! session per case, every message echoed back verbatim until the server
//! closes, then a final request asking the server to write its report.
//!
//! # Example
//!
//! ```ignore
//! use autobahn_client::{AutobahnServer, CaseSelection, ClientConfig, Suite};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new("ws://127.0.0.1:9001")?;
//!     let report = Suite::new(AutobahnServer::new(config), CaseSelection::All)
//!         .run()
//!         .await?;
//!
//!     println!("{} case(s) raised", report.exceptions.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod echo;
pub mod endpoint;
pub mod error;
pub mod server;
pub mod suite;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, ClientConfigBuilder, AGENT, MAX_MESSAGE_SIZE};
pub use echo::CaseOutcome;
pub use endpoint::Endpoint;
pub use error::{ClientError, Result};
pub use server::{AutobahnServer, CaseInfo, CaseServer};
pub use suite::{CaseFailure, CaseSelection, Suite, SuiteReport};

