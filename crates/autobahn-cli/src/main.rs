//! Autobahn client - runs the fuzzing server's client test suite
//!
//! Usage:
//!   autobahn-client ws://127.0.0.1:9001
//!   autobahn-client ws://127.0.0.1:9001 12 13   # debug two cases

use anyhow::{Context, Result};
use autobahn_client::{AutobahnServer, CaseSelection, ClientConfig, Suite};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Extra verbosity for the WebSocket layers when debugging single cases
const TRANSPORT_DEBUG_DIRECTIVES: [&str; 3] = [
    "autobahn_transport=trace",
    "tokio_tungstenite=debug",
    "tungstenite=debug",
];

#[derive(Parser, Debug)]
#[command(name = "autobahn-client")]
#[command(version, about = "Autobahn client for tokio-tungstenite")]
struct Cli {
    /// WebSocket URL for server
    url: String,

    /// Run individual test cases with debug logging (optional)
    debug_cases: Vec<u32>,
}

fn transport_debug_directives() -> Vec<Directive> {
    TRANSPORT_DEBUG_DIRECTIVES
        .iter()
        .map(|d| d.parse().expect("static log directive"))
        .collect()
}

fn log_filter(debug: bool) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if debug {
        for directive in transport_debug_directives() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let selection = CaseSelection::from_debug_cases(cli.debug_cases);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(selection.is_debug()))
        .init();

    let config = ClientConfig::new(&cli.url).context("Invalid server URL")?;
    let server = AutobahnServer::new(config);
    info!("Running Autobahn client suite against {}", server.config().base_url());

    let report = Suite::new(server, selection)
        .run()
        .await
        .context("Suite aborted")?;

    info!(
        "Ran {} test case(s) in {:.2}s",
        report.attempted,
        report.elapsed.as_secs_f64()
    );

    Ok(ExitCode::from(report.exit_code()))
}
