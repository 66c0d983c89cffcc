//! Diagnostic tracing for the engine and the wizard CLI.
//!
//! Two records exist side by side. Tracing events (session started, timer
//! armed, command refused) go to stderr for whoever is debugging a run and
//! carry no guarantees. Decisions live in the session's audit log, which the
//! wizard exports as JSON; filtering tracing never drops an audit record.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber once per process.
///
/// `RUST_LOG` picks the filter; without it only warnings such as refused
/// driver commands are shown.
///
/// ```bash
/// RUST_LOG=reasoner::controller=debug reasoner run --catalog catalog.json
/// ```
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
