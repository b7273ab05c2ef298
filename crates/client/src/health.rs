//! Upstream health probe
//!
//! Checks a fixed set of endpoints for status, content type and shape,
//! retrying each one a bounded number of times, and writes a JSON report
//! plus a three-line status file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use plumbline_common::{json_type, ApiResponse, HttpMethod, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::transport::Transport;

pub const REPORT_FILE: &str = "health-check.json";
pub const STATUS_FILE: &str = "health-status.txt";
pub const CONNECTIVITY_FAILED: &str = "Basic connectivity failed";

/// Shape an endpoint must return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Array { min_length: usize },
    Object { has_id: bool },
}

/// One probed endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    pub path: &'static str,
    pub status: u16,
    pub expect: Expectation,
}

const fn array(path: &'static str, min_length: usize) -> EndpointSpec {
    EndpointSpec {
        path,
        status: 200,
        expect: Expectation::Array { min_length },
    }
}

const fn object(path: &'static str) -> EndpointSpec {
    EndpointSpec {
        path,
        status: 200,
        expect: Expectation::Object { has_id: true },
    }
}

/// Endpoints checked by every probe run
pub const ENDPOINTS: [EndpointSpec; 8] = [
    array("/posts", 100),
    object("/posts/1"),
    array("/users", 10),
    object("/users/1"),
    array("/comments", 500),
    array("/albums", 100),
    array("/photos", 5000),
    array("/todos", 200),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Healthy,
    Unhealthy,
}

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✅",
            HealthStatus::Degraded => "⚠️",
            HealthStatus::Unhealthy => "❌",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A named check with its expected and observed values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub expected: Value,
    pub actual: Value,
}

impl Check {
    fn new(name: &str, passed: bool, expected: impl Into<Value>, actual: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResult {
    pub endpoint: String,
    pub status: EndpointStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub response_time: u64,
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checks: Vec<Check>,
}

impl EndpointResult {
    pub fn is_healthy(&self) -> bool {
        self.status == EndpointStatus::Healthy
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub health_percentage: u32,
}

/// Complete probe report, serialised to `health-check.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub base_url: String,
    pub status: HealthStatus,
    /// Milliseconds
    pub duration: u64,
    pub summary: HealthSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<EndpointResult>,
}

impl HealthReport {
    /// 0 only when every endpoint is healthy
    pub fn exit_code(&self) -> i32 {
        if self.status == HealthStatus::Healthy {
            0
        } else {
            1
        }
    }

    /// Contents of the status file
    pub fn status_text(&self) -> String {
        format!(
            "{}\n{}\n{}%",
            self.status,
            self.timestamp.to_rfc3339(),
            self.summary.health_percentage
        )
    }

    /// Write `health-check.json` and `health-status.txt` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let report_path = dir.join(REPORT_FILE);
        std::fs::write(&report_path, serde_json::to_string_pretty(self)?)?;
        let status_path = dir.join(STATUS_FILE);
        std::fs::write(&status_path, self.status_text())?;
        info!("📊 Health report written to {}", report_path.display());
        Ok((report_path, status_path))
    }
}

/// Runs the endpoint checks over any transport
pub struct HealthProbe<T: Transport> {
    transport: Arc<T>,
    retries: usize,
    retry_delay: Duration,
}

impl<T: Transport> HealthProbe<T> {
    pub fn new(transport: Arc<T>, retries: usize) -> Self {
        Self {
            transport,
            retries: retries.max(1),
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Run the full probe.
    pub async fn run(&self) -> HealthReport {
        let start = Instant::now();
        let base_url = self.transport.base_url().to_string();
        info!("🏥 Health check against {} ({} retries)", base_url, self.retries);

        if let Err(e) = self.transport.request(HttpMethod::Get, "/posts/1", None).await {
            warn!("❌ {}: {}", CONNECTIVITY_FAILED, e);
            return HealthReport {
                timestamp: Utc::now(),
                base_url,
                status: HealthStatus::Unhealthy,
                duration: start.elapsed().as_millis() as u64,
                summary: HealthSummary::default(),
                error: Some(CONNECTIVITY_FAILED.to_string()),
                results: Vec::new(),
            };
        }
        info!("✅ Basic connectivity OK");

        let mut results = Vec::with_capacity(ENDPOINTS.len());
        for endpoint in &ENDPOINTS {
            results.push(self.check_with_retries(endpoint).await);
        }

        let healthy = results.iter().filter(|r| r.is_healthy()).count();
        let total = results.len();
        let unhealthy = total - healthy;
        let status = if unhealthy == 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            timestamp: Utc::now(),
            base_url,
            status,
            duration: start.elapsed().as_millis() as u64,
            summary: HealthSummary {
                total,
                healthy,
                unhealthy,
                health_percentage: percentage(healthy, total),
            },
            error: None,
            results,
        }
    }

    async fn check_with_retries(&self, endpoint: &EndpointSpec) -> EndpointResult {
        let mut attempt = 1;
        loop {
            info!("🔍 Checking {} (attempt {}/{})", endpoint.path, attempt, self.retries);
            let mut result = self.check(endpoint).await;
            result.attempts = attempt;

            if result.is_healthy() {
                info!("  ✅ Healthy ({}ms)", result.response_time);
                return result;
            }
            warn!("  ⚠️ Unhealthy ({}ms)", result.response_time);
            if attempt >= self.retries {
                return result;
            }
            attempt += 1;
            sleep(self.retry_delay).await;
        }
    }

    /// Check one endpoint once.
    pub async fn check(&self, endpoint: &EndpointSpec) -> EndpointResult {
        let start = Instant::now();
        let outcome = self
            .transport
            .request(HttpMethod::Get, endpoint.path, None)
            .await;
        let response_time = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(resp) => evaluate(endpoint, &resp, response_time),
            Err(e) => EndpointResult {
                endpoint: endpoint.path.to_string(),
                status: EndpointStatus::Unhealthy,
                http_status: e.status,
                response_time,
                attempts: 1,
                error: Some(e.message.clone()),
                checks: vec![Check::new(
                    "connectivity",
                    false,
                    "successful request",
                    e.message,
                )],
            },
        }
    }
}

/// Apply an endpoint's expectations to a captured response.
pub fn evaluate(endpoint: &EndpointSpec, resp: &ApiResponse, response_time: u64) -> EndpointResult {
    let mut checks = vec![Check::new(
        "status_code",
        resp.status == endpoint.status,
        endpoint.status,
        resp.status,
    )];

    let content_type = resp.content_type().unwrap_or_default();
    checks.push(Check::new(
        "content_type",
        content_type.contains("application/json"),
        "application/json",
        content_type,
    ));

    match endpoint.expect {
        Expectation::Array { min_length } => match resp.data.as_array() {
            Some(items) => {
                checks.push(Check::new("is_array", true, "array", "array"));
                checks.push(Check::new(
                    "min_length",
                    items.len() >= min_length,
                    format!(">= {min_length}"),
                    items.len(),
                ));
            }
            None => checks.push(Check::new("is_array", false, "array", json_type(&resp.data))),
        },
        Expectation::Object { has_id } => match resp.data.as_object() {
            Some(obj) => {
                checks.push(Check::new("is_object", true, "object", "object"));
                if has_id {
                    let present = obj.get("id").map(|id| !id.is_null()).unwrap_or(false);
                    checks.push(Check::new(
                        "has_id",
                        present,
                        "id field present",
                        if present { "id field present" } else { "id field missing" },
                    ));
                }
            }
            None => checks.push(Check::new("is_object", false, "object", json_type(&resp.data))),
        },
    }

    let status = if checks.iter().all(|c| c.passed) {
        EndpointStatus::Healthy
    } else {
        EndpointStatus::Unhealthy
    };

    EndpointResult {
        endpoint: endpoint.path.to_string(),
        status,
        http_status: Some(resp.status),
        response_time,
        attempts: 1,
        error: None,
        checks,
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use plumbline_common::ApiError;
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves canned bodies; paths listed in `broken` always fail.
    struct FakeUpstream {
        broken: Vec<&'static str>,
        down: bool,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl FakeUpstream {
        fn new() -> Self {
            Self {
                broken: Vec::new(),
                down: false,
                hits: Mutex::new(HashMap::new()),
            }
        }

        fn hits(&self, path: &str) -> usize {
            self.hits.lock().get(path).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Transport for FakeUpstream {
        async fn request(
            &self,
            _method: HttpMethod,
            path: &str,
            _body: Option<&Value>,
        ) -> std::result::Result<ApiResponse, ApiError> {
            *self.hits.lock().entry(path.to_string()).or_default() += 1;
            if self.down {
                return Err(ApiError::transport("connect ECONNREFUSED"));
            }
            if self.broken.iter().any(|b| *b == path) {
                return Err(ApiError::from_status(503, "Service Unavailable", Value::Null));
            }
            let data = match ENDPOINTS.iter().find(|e| e.path == path).map(|e| e.expect) {
                Some(Expectation::Array { min_length }) => {
                    Value::Array((1..=min_length).map(|id| json!({ "id": id })).collect())
                }
                _ => json!({"id": 1}),
            };
            Ok(ApiResponse::new(200, "OK", data)
                .with_header("content-type", "application/json; charset=utf-8"))
        }

        fn base_url(&self) -> &str {
            "http://fake"
        }
    }

    fn probe(upstream: Arc<FakeUpstream>, retries: usize) -> HealthProbe<FakeUpstream> {
        HealthProbe::new(upstream, retries).with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_all_endpoints_healthy() {
        let report = probe(Arc::new(FakeUpstream::new()), 3).run().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.summary.total, 8);
        assert_eq!(report.summary.health_percentage, 100);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_failing_endpoint_is_retried_then_degraded() {
        let mut upstream = FakeUpstream::new();
        upstream.broken.push("/photos");
        let upstream = Arc::new(upstream);

        let report = probe(upstream.clone(), 3).run().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.summary.unhealthy, 1);
        assert_eq!(report.summary.health_percentage, 88);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(upstream.hits("/photos"), 3);

        let photos = report.results.iter().find(|r| r.endpoint == "/photos").unwrap();
        assert_eq!(photos.attempts, 3);
        assert_eq!(photos.http_status, Some(503));
        assert_eq!(photos.failed_checks().next().unwrap().name, "connectivity");
    }

    #[tokio::test]
    async fn test_connectivity_failure_short_circuits() {
        let mut upstream = FakeUpstream::new();
        upstream.down = true;
        let upstream = Arc::new(upstream);

        let report = probe(upstream.clone(), 3).run().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.error.as_deref(), Some(CONNECTIVITY_FAILED));
        assert!(report.results.is_empty());
        assert_eq!(upstream.hits("/posts"), 0);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_evaluate_short_array() {
        let resp = ApiResponse::new(200, "OK", json!([{"id": 1}]))
            .with_header("content-type", "application/json");
        let result = evaluate(&ENDPOINTS[0], &resp, 5);
        assert!(!result.is_healthy());
        let failed: Vec<_> = result.failed_checks().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["min_length"]);
    }

    #[test]
    fn test_evaluate_wrong_content_type_and_shape() {
        let resp = ApiResponse::new(200, "OK", json!("<html>"))
            .with_header("content-type", "text/html");
        let result = evaluate(&ENDPOINTS[1], &resp, 5);
        let failed: Vec<_> = result.failed_checks().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["content_type", "is_object"]);
    }

    #[test]
    fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = HealthReport {
            timestamp: Utc::now(),
            base_url: "http://fake".into(),
            status: HealthStatus::Degraded,
            duration: 12,
            summary: HealthSummary {
                total: 8,
                healthy: 7,
                unhealthy: 1,
                health_percentage: 88,
            },
            error: None,
            results: Vec::new(),
        };
        let (json_path, status_path) = report.write(dir.path()).unwrap();

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(saved["status"], "degraded");
        assert_eq!(saved["summary"]["healthPercentage"], 88);

        let status = std::fs::read_to_string(status_path).unwrap();
        let lines: Vec<_> = status.lines().collect();
        assert_eq!(lines[0], "degraded");
        assert_eq!(lines[2], "88%");
    }
}
