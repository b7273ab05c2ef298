//! Harness configuration
//!
//! Everything is read once from the process environment into a
//! [`HarnessConfig`] and passed explicitly to each component. Tests build
//! configurations through [`HarnessConfig::from_lookup`] with a map instead
//! of mutating the real environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_REPORT_TITLE: &str = "JSONPlaceholder API Tests";

/// Lowest request timeout accepted by [`HarnessConfig::validate`]
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
    pub to_file: bool,
    pub file_path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file_path: PathBuf::from("logs/test.log"),
        }
    }
}

/// Report generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub generate_html: bool,
    pub generate_json: bool,
    pub title: String,
    pub theme: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            generate_html: true,
            generate_json: true,
            title: DEFAULT_REPORT_TITLE.to_string(),
            theme: "bootstrap".to_string(),
        }
    }
}

/// Optional capture toggles. Parsed and logged, not acted upon by the
/// HTTP harness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub screenshots: bool,
    pub videos: bool,
    pub traces: bool,
}

/// Full harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Upper bound for a single step in milliseconds
    pub step_timeout_ms: u64,
    pub environment: String,
    pub log: LogConfig,
    pub parallel: usize,
    pub retry_count: usize,
    /// Tag expression applied when no profile or flag overrides it
    pub tags: Option<String>,
    pub report: ReportConfig,
    pub performance_timeout_ms: u64,
    pub concurrent_requests: usize,
    pub load_test_duration_secs: u64,
    pub capture: CaptureConfig,
    /// `CI` is set
    pub ci: bool,
    /// `GITHUB_ACTIONS` is set
    pub github_actions: bool,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub test_user_id: u64,
    pub test_post_id: u64,
    pub test_comment_id: u64,
    pub health_check_timeout_ms: u64,
    pub health_check_retries: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            step_timeout_ms: 60_000,
            environment: "test".to_string(),
            log: LogConfig::default(),
            parallel: 2,
            retry_count: 1,
            tags: None,
            report: ReportConfig::default(),
            performance_timeout_ms: 5000,
            concurrent_requests: 5,
            load_test_duration_secs: 30,
            capture: CaptureConfig::default(),
            ci: false,
            github_actions: false,
            api_key: None,
            auth_token: None,
            test_user_id: 1,
            test_post_id: 1,
            test_comment_id: 1,
            health_check_timeout_ms: 10_000,
            health_check_retries: 3,
        }
    }
}

impl HarnessConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Ok(Self {
            base_url: get("BASE_URL").unwrap_or(defaults.base_url),
            timeout_ms: number(&lookup, "TIMEOUT", defaults.timeout_ms)?,
            step_timeout_ms: number(&lookup, "STEP_TIMEOUT", defaults.step_timeout_ms)?,
            environment: get("APP_ENV").unwrap_or(defaults.environment),
            log: LogConfig {
                level: get("LOG_LEVEL").unwrap_or(defaults.log.level),
                to_file: flag(&lookup, "LOG_TO_FILE"),
                file_path: get("LOG_FILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.log.file_path),
            },
            parallel: number(&lookup, "PARALLEL", defaults.parallel)?,
            retry_count: number(&lookup, "RETRY_COUNT", defaults.retry_count)?,
            tags: get("TAGS"),
            report: ReportConfig {
                generate_html: !is_false(&lookup, "GENERATE_HTML_REPORT"),
                generate_json: !is_false(&lookup, "GENERATE_JSON_REPORT"),
                title: get("REPORT_TITLE").unwrap_or(defaults.report.title),
                theme: get("REPORT_THEME").unwrap_or(defaults.report.theme),
            },
            performance_timeout_ms: number(
                &lookup,
                "PERFORMANCE_TIMEOUT",
                defaults.performance_timeout_ms,
            )?,
            concurrent_requests: number(
                &lookup,
                "CONCURRENT_REQUESTS",
                defaults.concurrent_requests,
            )?,
            load_test_duration_secs: number(
                &lookup,
                "LOAD_TEST_DURATION",
                defaults.load_test_duration_secs,
            )?,
            capture: CaptureConfig {
                screenshots: flag(&lookup, "ENABLE_SCREENSHOTS"),
                videos: flag(&lookup, "ENABLE_VIDEOS"),
                traces: flag(&lookup, "ENABLE_TRACES"),
            },
            ci: get("CI").is_some(),
            github_actions: get("GITHUB_ACTIONS").is_some(),
            api_key: get("API_KEY"),
            auth_token: get("AUTH_TOKEN"),
            test_user_id: number(&lookup, "TEST_USER_ID", defaults.test_user_id)?,
            test_post_id: number(&lookup, "TEST_POST_ID", defaults.test_post_id)?,
            test_comment_id: number(&lookup, "TEST_COMMENT_ID", defaults.test_comment_id)?,
            health_check_timeout_ms: number(
                &lookup,
                "HEALTH_CHECK_TIMEOUT",
                defaults.health_check_timeout_ms,
            )?,
            health_check_retries: number(
                &lookup,
                "HEALTH_CHECK_RETRIES",
                defaults.health_check_retries,
            )?,
        })
    }

    /// Check startup invariants. Any failure is fatal for the run.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("BASE_URL is required".into()));
        }
        if self.timeout_ms < MIN_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "TIMEOUT must be at least {MIN_TIMEOUT_MS}ms, got {}",
                self.timeout_ms
            )));
        }
        if self.parallel < 1 {
            return Err(Error::InvalidConfig("PARALLEL must be at least 1".into()));
        }
        if self.health_check_retries < 1 {
            return Err(Error::InvalidConfig(
                "HEALTH_CHECK_RETRIES must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Running under a CI system
    pub fn is_ci(&self) -> bool {
        self.ci || self.github_actions
    }

    /// Log the effective configuration at info level.
    pub fn log_summary(&self) {
        info!("🔧 Test configuration:");
        info!("   Environment: {}", self.environment);
        info!("   Base URL: {}", self.base_url);
        info!("   Timeout: {}ms (step {}ms)", self.timeout_ms, self.step_timeout_ms);
        info!("   Log level: {}", self.log.level);
        info!("   Parallel: {}", self.parallel);
        info!("   Retries: {}", self.retry_count);
        info!("   Tags: {}", self.tags.as_deref().unwrap_or("(none)"));
        info!("   CI: {}", self.is_ci());
        if self.capture.screenshots || self.capture.videos || self.capture.traces {
            info!(
                "   Capture: screenshots={} videos={} traces={}",
                self.capture.screenshots, self.capture.videos, self.capture.traces
            );
        }
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).as_deref() == Some("true")
}

fn is_false<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).as_deref() == Some("false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<HarnessConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HarnessConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.parallel, 2);
        assert!(config.tags.is_none());
        assert!(config.report.generate_html);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BASE_URL", "http://localhost:3000"),
            ("TIMEOUT", "5000"),
            ("PARALLEL", "4"),
            ("TAGS", "@smoke"),
            ("LOG_TO_FILE", "true"),
            ("GENERATE_HTML_REPORT", "false"),
            ("GENERATE_JSON_REPORT", "no"),
            ("AUTH_TOKEN", "abc"),
        ])
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.parallel, 4);
        assert_eq!(config.tags.as_deref(), Some("@smoke"));
        assert!(config.log.to_file);
        assert!(!config.report.generate_html);
        assert!(config.report.generate_json);
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_booleans_only_accept_true() {
        let config = config_from(&[("LOG_TO_FILE", "1"), ("ENABLE_TRACES", "TRUE")]).unwrap();
        assert!(!config.log.to_file);
        assert!(!config.capture.traces);
    }

    #[test]
    fn test_unparseable_number_is_config_error() {
        let err = config_from(&[("TIMEOUT", "soon")]).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("TIMEOUT"));
    }

    #[test]
    fn test_validate_rejects_short_timeout() {
        let config = config_from(&[("TIMEOUT", "999")]).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_parallel_and_retries() {
        let config = config_from(&[("PARALLEL", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("HEALTH_CHECK_RETRIES", "0")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_base_url() {
        let config = HarnessConfig {
            base_url: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ci_detection() {
        assert!(!config_from(&[]).unwrap().is_ci());
        assert!(config_from(&[("CI", "true")]).unwrap().is_ci());
        assert!(config_from(&[("GITHUB_ACTIONS", "true")]).unwrap().is_ci());
    }
}
