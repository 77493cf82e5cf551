use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: String,
    /// Optional log file (appended). Stderr output is always on.
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_file: None,
        }
    }
}

/// Keeps the log file handle alive for the process lifetime.
pub struct TelemetryGuard {
    _log_file: Option<Arc<std::fs::File>>,
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    let (file_layer, file_handle) = match &config.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let file = Arc::new(file);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::clone(&file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new(&config.log_level));
                (Some(layer), Some(file))
            }
            Err(e) => {
                eprintln!("bchat-telemetry: failed to open log file {}: {e}", path.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    TelemetryGuard {
        _log_file: file_handle,
    }
}
