//! Per-scenario world

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cucumber::World;
use plumbline_client::{HttpClient, PlaceholderClient};
use plumbline_common::{ApiError, ApiResponse, Error, HarnessConfig};
use plumbline_e2e::{ExecutionContext, ScenarioPlan};
use tracing::{error, info, warn};

/// Outcome of a concurrent request fan-out
#[derive(Debug, Clone, Default)]
pub struct ConcurrentRun {
    /// Per request: the status code, or the failure message
    pub results: Vec<std::result::Result<u16, String>>,
    pub elapsed_ms: u64,
}

impl ConcurrentRun {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(status) if (200..300).contains(status)))
            .count()
    }
}

/// Cucumber world for API scenarios. A fresh one is built for every
/// scenario attempt, retries included.
#[derive(World)]
#[world(init = Self::new)]
pub struct ApiWorld {
    pub config: Arc<HarnessConfig>,
    client: PlaceholderClient<HttpClient>,
    pub ctx: ExecutionContext,
    pub plan: Option<ScenarioPlan>,
    pub started: Option<Instant>,
    pub concurrent: Option<ConcurrentRun>,
}

impl fmt::Debug for ApiWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiWorld")
            .field("base_url", &self.client.base_url())
            .field("timeout_ms", &self.http().timeout())
            .field("authenticated", &self.http().has_auth_token())
            .field("last_status", &self.ctx.last_response().map(|r| r.status))
            .field("last_error", &self.ctx.last_error().map(|e| e.message.as_str()))
            .field("test_data", &self.ctx.test_data_keys())
            .field("plan", &self.plan)
            .finish()
    }
}

impl ApiWorld {
    fn new() -> Self {
        match super::state() {
            Some(suite) => Self::with_config(suite.config.clone(), suite.client.clone()),
            None => Self::with_config(Arc::new(HarnessConfig::default()), reqwest::Client::new()),
        }
    }

    pub fn with_config(config: Arc<HarnessConfig>, pool: reqwest::Client) -> Self {
        let http = HttpClient::from_config(pool, &config);
        Self {
            client: PlaceholderClient::new(Arc::new(http)),
            ctx: ExecutionContext::new(&config.base_url, config.timeout_ms),
            config,
            plan: None,
            started: None,
            concurrent: None,
        }
    }

    /// Resource client handle that can be held across an await while the
    /// world is borrowed mutably.
    pub fn api(&self) -> PlaceholderClient<HttpClient> {
        self.client.clone()
    }

    pub fn http(&self) -> &HttpClient {
        self.client.transport()
    }

    /// Run an action bounded by the step timeout. Failures are stored as
    /// the last error before being returned.
    async fn bounded<F>(&mut self, step: &str, call: F) -> std::result::Result<ApiResponse, Error>
    where
        F: Future<Output = std::result::Result<ApiResponse, ApiError>>,
    {
        let limit = self.config.step_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(limit), call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                self.ctx.set_last_error(err.clone());
                Err(err.into())
            }
            Err(_) => {
                self.ctx.set_last_error(ApiError::timeout(limit));
                Err(Error::ScenarioTimeout {
                    step: step.to_string(),
                    timeout_ms: limit,
                })
            }
        }
    }

    /// Perform an action step. A failed call fails the step.
    pub async fn record<F>(&mut self, step: &str, call: F) -> std::result::Result<(), Error>
    where
        F: Future<Output = std::result::Result<ApiResponse, ApiError>>,
    {
        info!("👣 {}", step);
        match self.bounded(step, call).await {
            Ok(response) => {
                info!("✅ {} completed", step);
                self.ctx.set_last_response(response);
                Ok(())
            }
            Err(err) => {
                error!("❌ {} failed: {}", step, err);
                Err(err)
            }
        }
    }

    /// Perform an action step whose failure is expected to be asserted on
    /// later. The error is stored and the step passes.
    pub async fn attempt<F>(&mut self, step: &str, call: F) -> std::result::Result<(), Error>
    where
        F: Future<Output = std::result::Result<ApiResponse, ApiError>>,
    {
        info!("👣 {} (attempt)", step);
        match self.bounded(step, call).await {
            Ok(response) => self.ctx.set_last_response(response),
            Err(err) => warn!("⚠️ {} failed: {}", step, err),
        }
        Ok(())
    }
}
