//! Logging setup and span helpers.
//!
//! Logs go to stderr so that `--json` command output on stdout stays
//! machine readable.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// JSON structured logs, one object per line.
    Json,
    /// Human readable logs.
    #[default]
    Pretty,
}

/// Initialize the logging subsystem.
///
/// Safe to call more than once; later calls are no-ops. `RUST_LOG`
/// controls the filter (default `info`).
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().compact().with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Span covering one reconciliation sweep.
#[must_use]
pub fn sweep_span(community: &str) -> Span {
    tracing::info_span!("sweep", community = community)
}

/// Span covering one inbound member event.
#[must_use]
pub fn ingress_span(event: &str, community: &str, member: &str) -> Span {
    tracing::info_span!("ingress", event = event, community = community, member = member)
}
