//! Logging setup for the CLI.
//!
//! All log output goes to stderr; stdout is reserved for command
//! output (the formats catalog, JSON reports).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// The level is INFO, or DEBUG when `verbose` is set; an explicit
/// `RUST_LOG` value overrides both. With `json_logs` each event is
/// written as one JSON object per line for log collectors.
pub fn init(verbose: bool, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let base = fmt::layer().with_writer(std::io::stderr);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(base.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(base.with_target(false).with_ansi(true))
            .init();
    }
}
