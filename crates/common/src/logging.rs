//! Logging initialisation
//!
//! Console output goes through a `fmt` layer filtered by `EnvFilter`.
//! `RUST_LOG` wins when set; otherwise the configured level applies, and
//! `verbose` forces `debug`. With `to_file` enabled a second JSON layer
//! appends to the configured log file.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;
use crate::error::Result;

/// Build the filter for the given level, honouring `RUST_LOG`.
pub fn env_filter(level: &str, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Calling it twice is harmless; the
/// second call leaves the first subscriber in place.
pub fn init(config: &LogConfig, verbose: bool) -> Result<()> {
    let file_layer = if config.to_file {
        if let Some(parent) = config.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file_path)?;
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(&config.level, verbose))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();

    Ok(())
}
