//! Structured logging bootstrap.
//!
//! Installs a `tracing-subscriber` fmt layer behind an `EnvFilter`. With
//! `json_logs` set, each line is a JSON object carrying the span fields
//! (`height`, `winner`, `peer_ip`, `reason`, ...) so log shippers can index
//! them.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    if !config.console_output {
        return tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()));
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        network = %config.network,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}

/// Log a round-scoped event with the standard `height` field.
#[macro_export]
macro_rules! log_round_event {
    ($level:ident, $msg:expr, $height:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            height = $height,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-related event with the standard `peer_ip` field.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $msg:expr, $peer_ip:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            peer_ip = %$peer_ip,
            $($($field)*,)?
            $msg
        )
    };
}
