//! Logging setup for the binary.
//!
//! Logs go to stderr so the rendered output on stdout stays clean.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::CliConfig;

/// Initialize logging; `RUST_LOG` takes precedence over the configured filter
pub fn init_logging(config: &CliConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);

        tracing::subscriber::set_global_default(registry.with(json_layer))
            .context("Failed to set global default subscriber")?;
    } else {
        let fmt_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing::subscriber::set_global_default(registry.with(fmt_layer))
            .context("Failed to set global default subscriber")?;
    }

    info!(
        log_format = if config.log_json { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}
