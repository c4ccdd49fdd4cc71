//! Structured logging setup using tracing.
//!
//! Builds one subscriber for the whole process. It is installed as the
//! global default for startup and shutdown records, and the same
//! [`Dispatch`] is handed to the request pipeline.

use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Build the subscriber and install it as the global default.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns an error if the filter directive cannot be parsed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Dispatch> {
    let dispatch = build_dispatch(config)?;

    if let Err(e) = tracing::dispatcher::set_global_default(dispatch.clone()) {
        eprintln!("Global logger already installed: {e}");
    }

    tracing::info!(
        filter = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(dispatch)
}

/// Build the subscriber without installing it.
pub fn build_dispatch(config: &LoggingConfig) -> anyhow::Result<Dispatch> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow::anyhow!("Failed to create log filter {:?}: {e}", config.level))?;

    let json_layer = (config.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .flatten_event(true)
    });

    let pretty_layer =
        (config.format == LogFormat::Pretty).then(|| fmt::layer().pretty().with_target(true));

    let subscriber = tracing_subscriber::registry()
        .with(json_layer)
        .with(pretty_layer)
        .with(filter_layer);

    Ok(Dispatch::new(subscriber))
}
