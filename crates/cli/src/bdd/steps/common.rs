//! Context, test data and generic response steps

use std::time::Duration;

use cucumber::{given, then, when};
use plumbline_common::Error;
use serde_json::{json, Value};
use tracing::info;

use super::{ensure, parse_value, StepResult};
use crate::bdd::ApiWorld;

fn data_of(world: &ApiWorld) -> Result<&Value, Error> {
    Ok(&world.ctx.require_response()?.data)
}

// Setup

#[given(expr = "I wait for {int} seconds")]
async fn wait_seconds(_world: &mut ApiWorld, seconds: u64) -> StepResult {
    info!("⏳ Waiting for {} seconds", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    Ok(())
}

#[given(expr = "I wait for {int} milliseconds")]
async fn wait_millis(_world: &mut ApiWorld, millis: u64) -> StepResult {
    info!("⏳ Waiting for {} milliseconds", millis);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(())
}

#[given(expr = "the environment is {string}")]
async fn environment_is(world: &mut ApiWorld, environment: String) -> StepResult {
    ensure(
        world.config.environment == environment,
        format!(
            "Expected environment {environment}, running in {}",
            world.config.environment
        ),
    )
}

#[given(expr = "the base URL is {string}")]
async fn base_url_is(world: &mut ApiWorld, base_url: String) -> StepResult {
    world.ctx.assert_equal(
        world.ctx.base_url(),
        base_url.as_str(),
        Some(&format!("Base URL should be {base_url}")),
    )
}

// Test data

#[given(expr = "I clear all test data")]
async fn clear_test_data(world: &mut ApiWorld) -> StepResult {
    world.ctx.clear_test_data();
    info!("🧹 Cleared all test data");
    Ok(())
}

#[given(expr = "I set test data {string} to {string}")]
async fn set_test_data(world: &mut ApiWorld, key: String, value: String) -> StepResult {
    info!("💾 Set test data {} to {}", key, value);
    world.ctx.set_test_data(key, parse_value(&value));
    Ok(())
}

#[when(expr = "I retrieve test data {string}")]
async fn retrieve_test_data(world: &mut ApiWorld, key: String) -> StepResult {
    let value = world.ctx.get_test_data(&key).cloned().unwrap_or(Value::Null);
    info!("📖 Retrieved test data {}: {}", key, value);
    world.ctx.set_test_data("retrievedValue", value);
    Ok(())
}

#[when(expr = "I start timer {string}")]
async fn start_timer(world: &mut ApiWorld, label: String) -> StepResult {
    world.ctx.start_timer(&label);
    Ok(())
}

#[when(expr = "I stop timer {string}")]
async fn stop_timer(world: &mut ApiWorld, label: String) -> StepResult {
    let ms = world.ctx.end_timer(&label)?;
    info!("⏱️ Timer {} stopped at {}ms", label, ms);
    Ok(())
}

#[then(expr = "the test data {string} should equal {string}")]
async fn test_data_equals(world: &mut ApiWorld, key: String, expected: String) -> StepResult {
    let actual = world.ctx.get_test_data(&key);
    let expected = parse_value(&expected);
    world.ctx.assert_equal(
        &actual,
        &Some(&expected),
        Some(&format!("Test data {key} should equal {expected}")),
    )
}

#[then(expr = "the test data {string} should not be null")]
async fn test_data_not_null(world: &mut ApiWorld, key: String) -> StepResult {
    world.ctx.assert_not_null(
        world.ctx.get_test_data(&key),
        Some(&format!("Test data {key} should not be null")),
    )
}

#[then(expr = "the test data {string} should be an array")]
async fn test_data_is_array(world: &mut ApiWorld, key: String) -> StepResult {
    let value = world.ctx.get_test_data(&key).unwrap_or(&Value::Null);
    world
        .ctx
        .assert_array(value, Some(&format!("Test data {key} should be an array")))
}

#[then(expr = "the test data {string} should have length {int}")]
async fn test_data_length(world: &mut ApiWorld, key: String, length: usize) -> StepResult {
    let value = world.ctx.get_test_data(&key).unwrap_or(&Value::Null);
    world.ctx.assert_array_length(
        value,
        length,
        Some(&format!("Test data {key} should have length {length}")),
    )
}

#[then(expr = "the test data {string} should not exist")]
async fn test_data_absent(world: &mut ApiWorld, key: String) -> StepResult {
    ensure(
        world.ctx.get_test_data(&key).is_none(),
        format!("Test data {key} should not exist"),
    )
}

// Diagnostics

#[when(expr = "I log the current context")]
async fn log_context(world: &mut ApiWorld) -> StepResult {
    world.ctx.log_current_context();
    Ok(())
}

#[when(expr = "I log the last response")]
async fn log_response(world: &mut ApiWorld) -> StepResult {
    world.ctx.log_last_response();
    Ok(())
}

#[when(expr = "I log the last error")]
async fn log_error(world: &mut ApiWorld) -> StepResult {
    world.ctx.log_last_error();
    Ok(())
}

#[when(expr = "I log a message {string}")]
async fn log_message(_world: &mut ApiWorld, message: String) -> StepResult {
    info!("📝 {}", message);
    Ok(())
}

#[then(expr = "I should see the current test context")]
async fn see_context(world: &mut ApiWorld) -> StepResult {
    world.ctx.log_current_context();
    Ok(())
}

#[then(expr = "I should see the response headers")]
async fn see_headers(world: &mut ApiWorld) -> StepResult {
    let headers = world.ctx.last_response().map(|r| &r.headers);
    info!(headers = ?headers, "📨 Response headers");
    Ok(())
}

#[then(expr = "I should see the request details")]
async fn see_request(world: &mut ApiWorld) -> StepResult {
    let last = world
        .ctx
        .last_response()
        .map(|r| json!({"status": r.status, "statusText": r.status_text}));
    info!(
        base_url = %world.ctx.base_url(),
        timeout_ms = world.http().timeout(),
        last_response = ?last,
        "🔎 Request details"
    );
    Ok(())
}

// Response status

#[then(expr = "the response should not be null")]
async fn response_not_null(world: &mut ApiWorld) -> StepResult {
    ensure(world.ctx.last_response().is_some(), "Response should not be null")
}

#[then(expr = "the response data should not be null")]
async fn response_data_not_null(world: &mut ApiWorld) -> StepResult {
    world.ctx.assert_not_null(
        world.ctx.last_response().map(|r| &r.data),
        Some("Response data should not be null"),
    )
}

#[then(expr = "the response should have status code {int}")]
async fn status_code(world: &mut ApiWorld, status: u16) -> StepResult {
    world.ctx.assert_status_code(status)
}

#[then(expr = "the response should be successful")]
async fn successful(world: &mut ApiWorld) -> StepResult {
    world.ctx.assert_status_class(2)
}

#[then(expr = "the response should be a client error")]
async fn client_error(world: &mut ApiWorld) -> StepResult {
    world.ctx.assert_status_class(4)
}

#[then(expr = "the response should be a server error")]
async fn server_error(world: &mut ApiWorld) -> StepResult {
    world.ctx.assert_status_class(5)
}

#[then(expr = "the response content type should be {string}")]
async fn content_type(world: &mut ApiWorld, expected: String) -> StepResult {
    world.ctx.assert_content_type(&expected)
}

#[then(expr = "the response should be JSON")]
async fn is_json(world: &mut ApiWorld) -> StepResult {
    world.ctx.assert_content_type("application/json")
}

#[then(expr = "the response header {string} should be present")]
async fn header_present(world: &mut ApiWorld, name: String) -> StepResult {
    let response = world.ctx.require_response()?;
    ensure(
        response.header(&name).is_some(),
        format!("Response header {name} should be present"),
    )
}

// Errors

#[then(expr = "an error should have occurred")]
async fn error_occurred(world: &mut ApiWorld) -> StepResult {
    ensure(world.ctx.last_error().is_some(), "An error should have occurred")
}

#[then(expr = "no error should have occurred")]
async fn no_error(world: &mut ApiWorld) -> StepResult {
    match world.ctx.last_error() {
        Some(err) => ensure(false, format!("Expected no error, but got: {}", err.message)),
        None => ensure(true, "No error occurred"),
    }
}

#[then(expr = "the error message should contain {string}")]
async fn error_message_contains(world: &mut ApiWorld, text: String) -> StepResult {
    let message = world.ctx.last_error().map(|e| e.message.as_str());
    ensure(
        message.map(|m| m.contains(&text)).unwrap_or(false),
        format!("Error message should contain \"{text}\", got {message:?}"),
    )
}

#[then(expr = "the error status should be {int}")]
async fn error_status(world: &mut ApiWorld, status: u16) -> StepResult {
    let actual = world
        .ctx
        .last_error()
        .ok_or_else(|| Error::Assertion("Error should exist".into()))?
        .status;
    world.ctx.assert_equal(
        &actual,
        &Some(status),
        Some(&format!("Error status should be {status}")),
    )
}

#[then(expr = "the error kind should be {string}")]
async fn error_kind(world: &mut ApiWorld, kind: String) -> StepResult {
    let actual = world.ctx.last_error().map(|e| e.kind.to_string());
    world.ctx.assert_equal(
        &actual,
        &Some(kind.clone()),
        Some(&format!("Error kind should be {kind}")),
    )
}

// Timing

#[then(expr = "the response time should be less than {int} milliseconds")]
async fn response_time_less_than(world: &mut ApiWorld, max_ms: u64) -> StepResult {
    match world.ctx.get_test_data("responseTime").and_then(Value::as_u64) {
        Some(ms) => ensure(ms < max_ms, format!("Response time {ms}ms should be under {max_ms}ms")),
        None => {
            info!("⏱️ No response time measured, limit {}ms not checked", max_ms);
            Ok(())
        }
    }
}

// Response data shape

#[then(expr = "the response data should be an array")]
async fn data_is_array(world: &mut ApiWorld) -> StepResult {
    let data = data_of(world)?;
    world
        .ctx
        .assert_array(data, Some("Response data should be an array"))
}

#[then(expr = "the response data should not be empty")]
async fn data_not_empty(world: &mut ApiWorld) -> StepResult {
    let data = data_of(world)?;
    if data.is_array() {
        world
            .ctx
            .assert_array_not_empty(data, Some("Response array should not be empty"))
    } else {
        world
            .ctx
            .assert_not_null(Some(data), Some("Response data should not be empty"))
    }
}

#[then(expr = "the response data should have {int} items")]
async fn data_has_items(world: &mut ApiWorld, count: usize) -> StepResult {
    let data = data_of(world)?;
    world.ctx.assert_array_length(
        data,
        count,
        Some(&format!("Response should have {count} items")),
    )
}

#[then(expr = "the response data should have at least {int} items")]
async fn data_has_at_least(world: &mut ApiWorld, count: usize) -> StepResult {
    let data = data_of(world)?;
    world.ctx.assert_array(data, None)?;
    let len = data.as_array().map(Vec::len).unwrap_or_default();
    ensure(
        len >= count,
        format!("Response should have at least {count} items, has {len}"),
    )
}

#[then(expr = "the response data should contain property {string}")]
async fn data_has_property(world: &mut ApiWorld, property: String) -> StepResult {
    let data = data_of(world)?;
    ensure(
        data.get(&property).is_some(),
        format!("Response data should contain property {property}"),
    )
}

#[then(expr = "the response data property {string} should equal {string}")]
async fn data_property_equals(world: &mut ApiWorld, property: String, expected: String) -> StepResult {
    let actual = data_of(world)?.get(&property);
    let expected = parse_value(&expected);
    world.ctx.assert_equal(
        &actual,
        &Some(&expected),
        Some(&format!("Property {property} should equal {expected}")),
    )
}

#[then(expr = "I skip this step")]
async fn skip_step(_world: &mut ApiWorld) -> StepResult {
    info!("⏭️ Skipping step as requested");
    Ok(())
}
