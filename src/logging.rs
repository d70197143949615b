//! Tracing subscriber setup for the binaries.
//!
//! Library code only emits `tracing` events; binaries call [`init`] once.
//! Output always goes to stderr because the RPC bridge owns stdout.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::types::settings::LoggingSettings;

/// Targets of this crate's library and binaries (`bookmarks-rpc` logs as `bookmarks_rpc`).
pub const LOG_TARGETS: &[&str] = &["realtime_bookmarks", "bookmarks_rpc"];

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(settings: &LoggingSettings) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, settings.level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(settings)));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}
