//! Per-scenario execution context
//!
//! Holds the last captured response and error, arbitrary test data and
//! named timers. One context belongs to exactly one scenario run.

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Instant;

use plumbline_common::{json_type, ApiError, ApiResponse, Error, Result};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Mutable state for one scenario
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    base_url: String,
    timeout_ms: u64,
    last_response: Option<ApiResponse>,
    last_error: Option<ApiError>,
    test_data: HashMap<String, Value>,
    timers: HashMap<String, Instant>,
}

impl ExecutionContext {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let ctx = Self {
            base_url: base_url.into(),
            timeout_ms,
            last_response: None,
            last_error: None,
            test_data: HashMap::new(),
            timers: HashMap::new(),
        };
        debug!(base_url = %ctx.base_url, timeout_ms, "🌍 Context initialized");
        ctx
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    // Test data

    pub fn set_test_data(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!(value = %value, "💾 Set test data: {}", key);
        self.test_data.insert(key, value);
    }

    pub fn get_test_data(&self, key: &str) -> Option<&Value> {
        let value = self.test_data.get(key);
        debug!(value = ?value, "📖 Get test data: {}", key);
        value
    }

    pub fn clear_test_data(&mut self) {
        self.test_data.clear();
        debug!("🧹 Cleared all test data");
    }

    /// Keys currently set, sorted
    pub fn test_data_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.test_data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    // Responses

    /// Store a response. A previously stored error is left in place.
    pub fn set_last_response(&mut self, response: ApiResponse) {
        debug!(status = response.status, status_text = %response.status_text, "📥 Set last response");
        self.last_response = Some(response);
    }

    /// Store an error. A previously stored response is left in place.
    pub fn set_last_error(&mut self, err: ApiError) {
        debug!(message = %err.message, status = ?err.status, "❌ Set last error");
        self.last_error = Some(err);
    }

    pub fn last_response(&self) -> Option<&ApiResponse> {
        self.last_response.as_ref()
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// The last response, or an assertion failure when none was captured.
    pub fn require_response(&self) -> Result<&ApiResponse> {
        self.last_response
            .as_ref()
            .ok_or_else(|| Error::Assertion("No response available".into()))
    }

    // Timers

    pub fn start_timer(&mut self, label: &str) {
        self.timers.insert(label.to_string(), Instant::now());
    }

    /// Stop a timer and return the elapsed milliseconds. The duration is
    /// also stored as `duration_<label>`.
    pub fn end_timer(&mut self, label: &str) -> Result<u64> {
        let started = self
            .timers
            .remove(label)
            .ok_or_else(|| Error::TimerNotStarted(label.to_string()))?;
        let elapsed = started.elapsed().as_millis() as u64;
        self.set_test_data(format!("duration_{label}"), Value::from(elapsed));
        info!("⏱️ {} took {}ms", label, elapsed);
        Ok(elapsed)
    }

    pub fn has_timer(&self, label: &str) -> bool {
        self.timers.contains_key(label)
    }

    // Assertions

    pub fn assert_equal<T>(&self, actual: &T, expected: &T, message: Option<&str>) -> Result<()>
    where
        T: PartialEq + Debug + ?Sized,
    {
        let passed = actual == expected;
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Expected {expected:?}, but got {actual:?}"));
        check(passed, message, expected, actual)
    }

    pub fn assert_not_null(&self, value: Option<&Value>, message: Option<&str>) -> Result<()> {
        let passed = value.map(|v| !v.is_null()).unwrap_or(false);
        let message = message.unwrap_or("Value should not be null or undefined");
        check(passed, message.to_string(), &"not null", &value)
    }

    pub fn assert_array(&self, value: &Value, message: Option<&str>) -> Result<()> {
        let message = message.unwrap_or("Value should be an array");
        check(value.is_array(), message.to_string(), &"array", &json_type(value))
    }

    pub fn assert_array_length(&self, value: &Value, expected: usize, message: Option<&str>) -> Result<()> {
        let len = array_len(self, value)?;
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Array should have length {expected}, but has {len}"));
        check(len == expected, message, &expected, &len)
    }

    pub fn assert_array_not_empty(&self, value: &Value, message: Option<&str>) -> Result<()> {
        let len = array_len(self, value)?;
        let message = message.unwrap_or("Array should not be empty");
        check(len > 0, message.to_string(), &"> 0", &len)
    }

    /// Compare the last response status to `expected`.
    pub fn assert_status_code(&self, expected: u16) -> Result<()> {
        let actual = self.last_response.as_ref().map(|r| r.status);
        let passed = actual == Some(expected);
        if !passed {
            error!(expected, actual = ?actual, "❌ FAIL: Status code should be {}", expected);
            return Err(Error::Assertion(format!(
                "Expected status {expected}, but got {}",
                actual.map(|s| s.to_string()).unwrap_or_else(|| "no response".into())
            )));
        }
        info!("✅ PASS: Status code should be {}", expected);
        Ok(())
    }

    /// Check that the status of the last response, or of the last error
    /// when no response was captured, is in the given hundreds class.
    pub fn assert_status_class(&self, class: u16) -> Result<()> {
        let actual = self
            .last_response
            .as_ref()
            .map(|r| r.status)
            .or_else(|| self.last_error.as_ref().and_then(|e| e.status));
        let passed = actual.map(|s| s / 100 == class).unwrap_or(false);
        check(
            passed,
            format!("Status code should be {class}xx, but got {actual:?}"),
            &format!("{class}xx"),
            &actual,
        )
    }

    pub fn assert_content_type(&self, expected: &str) -> Result<()> {
        let response = self.require_response()?;
        let actual = response.content_type().unwrap_or_default();
        check(
            actual.contains(expected),
            format!("Content type should contain '{expected}', but was '{actual}'"),
            &expected,
            &actual,
        )
    }

    // Diagnostics

    pub fn log_current_context(&self) {
        info!(
            base_url = %self.base_url,
            timeout_ms = self.timeout_ms,
            last_response_status = ?self.last_response.as_ref().map(|r| r.status),
            last_error_message = ?self.last_error.as_ref().map(|e| e.message.as_str()),
            test_data_keys = ?self.test_data_keys(),
            "📋 Current test context"
        );
    }

    pub fn log_last_response(&self) {
        match &self.last_response {
            Some(resp) => {
                let keys: Option<Vec<&String>> = resp.data.as_object().map(|o| o.keys().collect());
                info!(
                    status = resp.status,
                    status_text = %resp.status_text,
                    headers = ?resp.headers,
                    data_type = json_type(&resp.data),
                    data_keys = ?keys,
                    "📥 Last response"
                );
            }
            None => warn!("📥 No response available"),
        }
    }

    pub fn log_last_error(&self) {
        match &self.last_error {
            Some(err) => error!(
                message = %err.message,
                status = ?err.status,
                status_text = ?err.status_text,
                data = ?err.data,
                "❌ Last error"
            ),
            None => info!("✅ No error available"),
        }
    }

    /// Reset scenario state. Base URL and timeout are kept.
    pub fn cleanup(&mut self) {
        debug!("🧹 Cleaning up scenario data");
        self.last_response = None;
        self.last_error = None;
        self.timers.clear();
        self.clear_test_data();
    }
}

fn check<E, A>(passed: bool, message: String, expected: &E, actual: &A) -> Result<()>
where
    E: Debug + ?Sized,
    A: Debug + ?Sized,
{
    if passed {
        info!("✅ PASS: {}", message);
        Ok(())
    } else {
        error!(expected = ?expected, actual = ?actual, "❌ FAIL: {}", message);
        Err(Error::Assertion(message))
    }
}

fn array_len(ctx: &ExecutionContext, value: &Value) -> Result<usize> {
    ctx.assert_array(value, None)?;
    Ok(value.as_array().map(Vec::len).unwrap_or_default())
}
