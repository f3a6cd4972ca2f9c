//! Tracing subscriber installation
//!
//! Library code only emits `tracing` events. A binary or test harness calls
//! [`init_tracing`] once to print them.

use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset or invalid.
///
/// Returns `false` when a global subscriber was already installed; calling
/// it again is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    init_tracing_with_format(default_filter, LogFormat::Text)
}

/// Same as [`init_tracing`] with an explicit output format.
pub fn init_tracing_with_format(default_filter: &str, format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
