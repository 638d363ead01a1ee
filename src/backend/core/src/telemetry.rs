//! Logging setup.
//!
//! JSON output for production, pretty output for local runs, filtered through
//! the standard `RUST_LOG`-style directives.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the tracing subscriber.
///
/// # Errors
///
/// Returns an error if the level filter cannot be parsed or a global
/// subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)?;

    if config.json_logging {
        let fmt_layer = fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
