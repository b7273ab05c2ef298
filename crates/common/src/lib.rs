//! Plumbline Common Library
//!
//! Configuration, error taxonomy, the HTTP data model and logging setup
//! shared by the Plumbline client, runner and CLI.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{CaptureConfig, HarnessConfig, LogConfig, ReportConfig};
pub use error::{Error, Result};
pub use types::*;

/// Plumbline version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Value sent as the `User-Agent` header
pub fn user_agent() -> String {
    format!("plumbline/{VERSION}")
}
