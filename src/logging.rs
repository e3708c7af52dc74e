//! Tracing subscriber set-up for the command-line tool.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the binary's job.

use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG`, events at `warn` and above are shown, or at `info`
/// and above when `verbose` is set.
pub fn init_tracing(verbose: bool) -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("cannot install the tracing subscriber: {0}")]
    Subscriber(String),
}
