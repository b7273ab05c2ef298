//! Request steps and resource-specific assertions

use std::time::{Duration, Instant};

use cucumber::gherkin::Step;
use cucumber::{then, when};
use futures::future::join_all;
use plumbline_common::{ApiError, Error, HttpMethod, Post, PostDraft, Resource};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ensure, is_valid_email, StepResult};
use crate::bdd::world::ConcurrentRun;
use crate::bdd::ApiWorld;

/// Timer used by the response-time step
const REQUEST_TIMER: &str = "api_request";

fn parse_method(raw: &str) -> Result<HttpMethod, Error> {
    raw.parse().map_err(Error::Assertion)
}

fn parse_resource(raw: &str) -> Result<Resource, Error> {
    raw.parse().map_err(Error::Assertion)
}

fn doc_body(step: &Step) -> Result<Value, Error> {
    let raw = step
        .docstring
        .as_deref()
        .ok_or_else(|| Error::Assertion("step needs a JSON doc string body".into()))?;
    Ok(serde_json::from_str(raw)?)
}

// Generic requests

#[when(expr = "I send a {word} request to {string}")]
async fn send_request(world: &mut ApiWorld, verb: String, path: String) -> StepResult {
    let method = parse_method(&verb)?;
    let api = world.api();
    world
        .record(&format!("{method} {path}"), api.request(method, &path, None))
        .await
}

#[when(expr = "I send a {word} request to {string} with body:")]
async fn send_request_with_body(world: &mut ApiWorld, verb: String, path: String, step: &Step) -> StepResult {
    let method = parse_method(&verb)?;
    let body = doc_body(step)?;
    world.ctx.set_test_data("requestBody", body.clone());
    let api = world.api();
    world
        .record(&format!("{method} {path}"), api.request(method, &path, Some(&body)))
        .await
}

#[when(expr = "I attempt a {word} request to {string}")]
async fn attempt_request(world: &mut ApiWorld, verb: String, path: String) -> StepResult {
    let method = parse_method(&verb)?;
    let api = world.api();
    world
        .attempt(&format!("{method} {path}"), api.request(method, &path, None))
        .await
}

#[when(expr = "I attempt a {word} request to {string} with body:")]
async fn attempt_request_with_body(world: &mut ApiWorld, verb: String, path: String, step: &Step) -> StepResult {
    let method = parse_method(&verb)?;
    let body = doc_body(step)?;
    let api = world.api();
    world
        .attempt(&format!("{method} {path}"), api.request(method, &path, Some(&body)))
        .await
}

// Resource reads

#[when(expr = "I get all {word}")]
async fn get_all(world: &mut ApiWorld, name: String) -> StepResult {
    let resource = parse_resource(&name)?;
    let api = world.api();
    world.record(&format!("Get all {resource}"), api.list(resource)).await
}

#[when(expr = "I get {word} with id {int}")]
async fn get_one(world: &mut ApiWorld, name: String, id: u64) -> StepResult {
    let resource = parse_resource(&format!("{name}s"))?;
    world.ctx.set_test_data(format!("{name}Id"), json!(id));
    let api = world.api();
    world
        .record(&format!("Get {name} {id}"), api.get(resource, id))
        .await
}

#[when(expr = "I get comments for post {int}")]
async fn get_post_comments(world: &mut ApiWorld, id: u64) -> StepResult {
    let api = world.api();
    world
        .record(&format!("Get comments for post {id}"), api.get_post_comments(id))
        .await
}

#[when(expr = "I get {word} for user {int}")]
async fn get_user_children(world: &mut ApiWorld, name: String, id: u64) -> StepResult {
    let api = world.api();
    let step = format!("Get {name} for user {id}");
    match parse_resource(&name)? {
        Resource::Posts => world.record(&step, api.get_user_posts(id)).await,
        Resource::Albums => world.record(&step, api.get_user_albums(id)).await,
        Resource::Todos => world.record(&step, api.get_user_todos(id)).await,
        other => Err(Error::Assertion(format!("users have no nested {other}"))),
    }
}

#[when(expr = "I get photos for album {int}")]
async fn get_album_photos(world: &mut ApiWorld, id: u64) -> StepResult {
    let api = world.api();
    world
        .record(&format!("Get photos for album {id}"), api.get_album_photos(id))
        .await
}

#[when(expr = "I filter posts by userId {int}")]
async fn filter_posts(world: &mut ApiWorld, user_id: u64) -> StepResult {
    let api = world.api();
    let user = user_id.to_string();
    world.ctx.set_test_data("filterUserId", json!(user_id));
    world
        .record(
            &format!("Get posts for userId {user_id}"),
            api.get_posts_with_query(&[("userId", user.as_str())]),
        )
        .await
}

// Post writes

#[when(expr = "I create a new post with title {string} and body {string}")]
async fn create_post(world: &mut ApiWorld, title: String, body: String) -> StepResult {
    let payload = serde_json::to_value(PostDraft {
        id: None,
        title: Some(title.clone()),
        body: Some(body),
        user_id: Some(world.config.test_user_id),
    })?;
    world.ctx.set_test_data("requestBody", payload.clone());
    let api = world.api();
    world
        .record(&format!("Create post '{title}'"), api.create_post(&payload))
        .await?;
    if let Some(created) = world.ctx.last_response().map(|r| r.data.clone()) {
        world.ctx.set_test_data("createdPost", created);
    }
    Ok(())
}

#[when(expr = "I update post {int} with title {string}")]
async fn update_post(world: &mut ApiWorld, id: u64, title: String) -> StepResult {
    let payload = serde_json::to_value(PostDraft {
        id: Some(id),
        title: Some(title),
        body: Some(format!("Updated body for post {id}")),
        user_id: Some(world.config.test_user_id),
    })?;
    world.ctx.set_test_data("requestBody", payload.clone());
    let api = world.api();
    world
        .record(&format!("Update post {id}"), api.update_post(id, &payload))
        .await
}

#[when(expr = "I patch post {int} with title {string}")]
async fn patch_post(world: &mut ApiWorld, id: u64, title: String) -> StepResult {
    let payload = serde_json::to_value(PostDraft {
        title: Some(title),
        ..Default::default()
    })?;
    world.ctx.set_test_data("requestBody", payload.clone());
    let api = world.api();
    world
        .record(&format!("Patch post {id}"), api.patch_post(id, &payload))
        .await
}

#[when(expr = "I delete post {int}")]
async fn delete_post(world: &mut ApiWorld, id: u64) -> StepResult {
    let api = world.api();
    world.record(&format!("Delete post {id}"), api.delete_post(id)).await
}

// Performance

#[when(expr = "I measure response time for GET {string}")]
async fn measure_response_time(world: &mut ApiWorld, path: String) -> StepResult {
    let api = world.api();
    world.ctx.start_timer(REQUEST_TIMER);
    let result = world
        .record(&format!("GET {path}"), api.request(HttpMethod::Get, &path, None))
        .await;
    let elapsed = world.ctx.end_timer(REQUEST_TIMER)?;
    result?;
    info!("⏱️ GET {} completed in {}ms", path, elapsed);
    world.ctx.set_test_data("responseTime", json!(elapsed));
    Ok(())
}

async fn fan_out(world: &mut ApiWorld, count: usize, path: String) -> StepResult {
    if count == 0 {
        return Err(Error::Assertion(
            "concurrent request count must be at least 1".into(),
        ));
    }
    let api = world.api();
    let limit = world.config.step_timeout_ms;
    info!("🚀 Sending {} concurrent GET requests to {}", count, path);

    let start = Instant::now();
    let calls = (0..count).map(|_| api.request(HttpMethod::Get, &path, None));
    let outcomes = match tokio::time::timeout(Duration::from_millis(limit), join_all(calls)).await {
        Ok(outcomes) => outcomes,
        Err(_) => {
            world.ctx.set_last_error(ApiError::timeout(limit));
            return Err(Error::ScenarioTimeout {
                step: format!("{count} concurrent GET {path}"),
                timeout_ms: limit,
            });
        }
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let mut results = Vec::with_capacity(count);
    for outcome in outcomes {
        match outcome {
            Ok(response) => {
                results.push(Ok(response.status));
                world.ctx.set_last_response(response);
            }
            Err(err) => {
                warn!("⚠️ Concurrent request failed: {}", err);
                results.push(Err(err.message.clone()));
                world.ctx.set_last_error(err);
            }
        }
    }

    let run = ConcurrentRun { results, elapsed_ms };
    info!(
        "📊 {}/{} concurrent requests succeeded in {}ms",
        run.succeeded(),
        count,
        elapsed_ms
    );
    world.ctx.set_test_data("concurrentDuration", json!(elapsed_ms));
    world.concurrent = Some(run);
    Ok(())
}

#[when(expr = "I send {int} concurrent GET requests to {string}")]
async fn concurrent_requests(world: &mut ApiWorld, count: usize, path: String) -> StepResult {
    fan_out(world, count, path).await
}

#[when(expr = "I send concurrent GET requests to {string}")]
async fn concurrent_requests_default(world: &mut ApiWorld, path: String) -> StepResult {
    let count = world.config.concurrent_requests;
    fan_out(world, count, path).await
}

// Client settings

#[when(expr = "I authenticate with token {string}")]
async fn authenticate(world: &mut ApiWorld, token: String) -> StepResult {
    world.http().set_auth_token(token);
    info!("🔐 Auth token set");
    Ok(())
}

#[when(expr = "I clear the authentication")]
async fn clear_authentication(world: &mut ApiWorld) -> StepResult {
    world.http().remove_auth_token();
    info!("🔓 Auth token removed");
    Ok(())
}

#[when(expr = "I set the request timeout to {int} milliseconds")]
async fn set_request_timeout(world: &mut ApiWorld, timeout_ms: u64) -> StepResult {
    world.http().set_timeout(timeout_ms);
    info!("⏱️ Request timeout set to {}ms", timeout_ms);
    Ok(())
}

// Resource assertions

#[then(expr = "the response should contain {int} posts")]
async fn response_contains_posts(world: &mut ApiWorld, count: usize) -> StepResult {
    let data = &world.ctx.require_response()?.data;
    world
        .ctx
        .assert_array(data, Some("Response data should be an array of posts"))?;
    world
        .ctx
        .assert_array_length(data, count, Some(&format!("Should contain {count} posts")))
}

#[then(expr = "the post should have title {string}")]
async fn post_has_title(world: &mut ApiWorld, title: String) -> StepResult {
    let actual = world.ctx.require_response()?.data.get("title").cloned();
    world.ctx.assert_equal(
        &actual,
        &Some(json!(title)),
        Some(&format!("Post title should be \"{title}\"")),
    )
}

#[then(expr = "the post should have userId {int}")]
async fn post_has_user_id(world: &mut ApiWorld, user_id: u64) -> StepResult {
    let actual = world.ctx.require_response()?.data.get("userId").cloned();
    world.ctx.assert_equal(
        &actual,
        &Some(json!(user_id)),
        Some(&format!("Post userId should be {user_id}")),
    )
}

#[then(expr = "the post should have a valid structure")]
async fn post_structure(world: &mut ApiWorld) -> StepResult {
    let response = world.ctx.require_response()?;
    for field in ["id", "title", "body", "userId"] {
        world.ctx.assert_not_null(
            response.data.get(field),
            Some(&format!("Post should have a {field}")),
        )?;
    }
    match response.json::<Post>() {
        Ok(post) => ensure(true, format!("Post {} has a valid structure", post.id)),
        Err(e) => ensure(false, format!("Post should have a valid structure: {e}")),
    }
}

#[then(expr = "the user should have a valid structure")]
async fn user_structure(world: &mut ApiWorld) -> StepResult {
    let user = &world.ctx.require_response()?.data;
    for field in ["id", "name", "username", "email"] {
        world
            .ctx
            .assert_not_null(user.get(field), Some(&format!("User should have a {field}")))?;
    }
    let email = user["email"].as_str().unwrap_or_default();
    ensure(is_valid_email(email), format!("User email should be valid: {email}"))
}

#[then(expr = "each comment should have a valid structure")]
async fn comment_structure(world: &mut ApiWorld) -> StepResult {
    let comments = &world.ctx.require_response()?.data;
    world
        .ctx
        .assert_array(comments, Some("Response should be an array of comments"))?;
    for comment in comments.as_array().into_iter().flatten() {
        for field in ["id", "name", "email", "body", "postId"] {
            world
                .ctx
                .assert_not_null(comment.get(field), Some(&format!("Comment should have a {field}")))?;
        }
        let email = comment["email"].as_str().unwrap_or_default();
        if !is_valid_email(email) {
            return ensure(
                false,
                format!("Invalid email format in comment {}: {email}", comment["id"]),
            );
        }
    }
    ensure(true, "All comments have valid structure")
}

#[then(expr = "the created post should match the request")]
async fn created_post_echoes(world: &mut ApiWorld) -> StepResult {
    let sent = world
        .ctx
        .get_test_data("requestBody")
        .cloned()
        .ok_or_else(|| Error::Assertion("no request body was sent".into()))?;
    let created = &world.ctx.require_response()?.data;
    for (key, expected) in sent.as_object().into_iter().flatten() {
        world.ctx.assert_equal(
            &created.get(key),
            &Some(expected),
            Some(&format!("Created post {key} should echo the request")),
        )?;
    }
    world
        .ctx
        .assert_not_null(created.get("id"), Some("Created post should have an id"))
}

#[then(expr = "every item should have property {string} equal to {string}")]
async fn every_item_property(world: &mut ApiWorld, property: String, expected: String) -> StepResult {
    let expected = super::parse_value(&expected);
    let items = &world.ctx.require_response()?.data;
    world.ctx.assert_array_not_empty(items, None)?;
    let mismatched = items
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| item.get(&property) != Some(&expected))
        .count();
    ensure(
        mismatched == 0,
        format!("Every item should have {property} = {expected} ({mismatched} differ)"),
    )
}

#[then(expr = "the response time should be under {int} milliseconds")]
async fn response_time_under(world: &mut ApiWorld, max_ms: u64) -> StepResult {
    let measured = world.ctx.get_test_data("responseTime");
    world
        .ctx
        .assert_not_null(measured, Some("Response time should be measured"))?;
    let ms = measured.and_then(Value::as_u64).unwrap_or(u64::MAX);
    ensure(
        ms < max_ms,
        format!("Response time {ms}ms should be under {max_ms}ms"),
    )
}

#[then(expr = "all concurrent requests should succeed")]
async fn all_concurrent_succeed(world: &mut ApiWorld) -> StepResult {
    let run = world
        .concurrent
        .as_ref()
        .ok_or_else(|| Error::Assertion("no concurrent requests were sent".into()))?;
    ensure(
        run.succeeded() == run.results.len(),
        format!("{}/{} concurrent requests succeeded", run.succeeded(), run.results.len()),
    )
}

#[then(expr = "at least {int} concurrent requests should succeed")]
async fn some_concurrent_succeed(world: &mut ApiWorld, minimum: usize) -> StepResult {
    let run = world
        .concurrent
        .as_ref()
        .ok_or_else(|| Error::Assertion("no concurrent requests were sent".into()))?;
    ensure(
        run.succeeded() >= minimum,
        format!("At least {minimum} concurrent requests should succeed, {} did", run.succeeded()),
    )
}

#[then(expr = "the concurrent requests should finish within {int} milliseconds")]
async fn concurrent_within(world: &mut ApiWorld, max_ms: u64) -> StepResult {
    let run = world
        .concurrent
        .as_ref()
        .ok_or_else(|| Error::Assertion("no concurrent requests were sent".into()))?;
    ensure(
        run.elapsed_ms <= max_ms,
        format!("Concurrent requests took {}ms, limit {max_ms}ms", run.elapsed_ms),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plumbline_common::{ApiResponse, HarnessConfig};

    use super::*;

    fn offline_world() -> ApiWorld {
        let config = HarnessConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 1_000,
            test_user_id: 7,
            ..Default::default()
        };
        ApiWorld::with_config(Arc::new(config), reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_create_post_sends_draft_payload() {
        let mut w = offline_world();
        assert!(create_post(&mut w, "foo".into(), "bar".into()).await.is_err());
        assert_eq!(
            w.ctx.get_test_data("requestBody"),
            Some(&json!({"title": "foo", "body": "bar", "userId": 7}))
        );
    }

    #[tokio::test]
    async fn test_update_and_patch_payloads() {
        let mut w = offline_world();
        assert!(update_post(&mut w, 3, "new".into()).await.is_err());
        assert_eq!(
            w.ctx.get_test_data("requestBody"),
            Some(&json!({"id": 3, "title": "new", "body": "Updated body for post 3", "userId": 7}))
        );

        assert!(patch_post(&mut w, 3, "only".into()).await.is_err());
        assert_eq!(w.ctx.get_test_data("requestBody"), Some(&json!({"title": "only"})));
    }

    #[tokio::test]
    async fn test_post_structure_decodes_record() {
        let mut w = offline_world();
        w.ctx.set_last_response(ApiResponse::new(
            200,
            "OK",
            json!({"id": 1, "title": "t", "body": "b", "userId": 1}),
        ));
        assert!(post_structure(&mut w).await.is_ok());

        w.ctx.set_last_response(ApiResponse::new(
            200,
            "OK",
            json!({"id": "1", "title": "t", "body": "b", "userId": 1}),
        ));
        assert!(matches!(post_structure(&mut w).await, Err(Error::Assertion(_))));
    }

    #[tokio::test]
    async fn test_zero_concurrent_requests_rejected() {
        let mut w = offline_world();
        let result = concurrent_requests(&mut w, 0, "/posts".into()).await;
        assert!(matches!(result, Err(Error::Assertion(_))));
        assert!(w.concurrent.is_none());
        assert!(all_concurrent_succeed(&mut w).await.is_err());
    }
}
