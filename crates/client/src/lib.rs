//! Plumbline HTTP client
//!
//! - [`HttpClient`]: reqwest wrapper with base URL, timeout, auth headers and logging
//! - [`Transport`]: the request capability everything else is generic over
//! - [`PlaceholderClient`]: per-resource CRUD helpers
//! - [`HealthProbe`]: standalone upstream health check

pub mod health;
pub mod http;
pub mod resources;
pub mod transport;

pub use health::{HealthProbe, HealthReport, HealthStatus};
pub use http::HttpClient;
pub use resources::{ClientHealth, ClientHealthStatus, PlaceholderClient};
pub use transport::Transport;
