//! Before/after scenario hooks

use std::time::Instant;

use cucumber::event::ScenarioFinished;
use cucumber::gherkin::{Feature, Rule, Scenario};
use futures::future::{FutureExt, LocalBoxFuture};
use plumbline_e2e::lifecycle::{ScenarioOutcome, ScenarioPlan, PERFORMANCE_TIMER};
use serde_json::json;
use tracing::{info, warn};

use super::{effective_tags, ApiWorld};

pub fn before<'a>(
    feature: &'a Feature,
    rule: Option<&'a Rule>,
    scenario: &'a Scenario,
    world: &'a mut ApiWorld,
) -> LocalBoxFuture<'a, ()> {
    async move {
        let tags = effective_tags(feature, rule, scenario);
        begin_scenario(world, &scenario.name, &tags);
    }
    .boxed_local()
}

pub fn after<'a>(
    _feature: &'a Feature,
    _rule: Option<&'a Rule>,
    scenario: &'a Scenario,
    finished: &'a ScenarioFinished,
    world: Option<&'a mut ApiWorld>,
) -> LocalBoxFuture<'a, ()> {
    async move {
        let outcome = outcome_of(finished);
        match world {
            Some(world) => finish_scenario(world, &scenario.name, outcome),
            None => outcome.log(&scenario.name, Default::default()),
        }
    }
    .boxed_local()
}

fn outcome_of(finished: &ScenarioFinished) -> ScenarioOutcome {
    match finished {
        ScenarioFinished::StepPassed => ScenarioOutcome::Passed,
        ScenarioFinished::StepSkipped => ScenarioOutcome::Skipped,
        ScenarioFinished::StepFailed(_, _, err) => ScenarioOutcome::Failed(err.to_string()),
        ScenarioFinished::BeforeHookFailed(_) => {
            ScenarioOutcome::Failed("before hook panicked".to_string())
        }
    }
}

/// Apply the tag plan to a freshly built world.
pub fn begin_scenario(world: &mut ApiWorld, name: &str, tags: &[String]) {
    let plan = ScenarioPlan::from_tags(tags, &world.config);
    plan.log(name, &world.config);

    world.ctx.set_test_data("scenarioName", json!(name));
    world.ctx.set_test_data(
        "scenarioTags",
        json!(tags.iter().map(|t| format!("@{t}")).collect::<Vec<_>>()),
    );
    world.started = Some(Instant::now());
    world.http().set_timeout(plan.timeout_ms);
    if plan.start_performance_timer {
        world.ctx.start_timer(PERFORMANCE_TIMER);
    }
    world.plan = Some(plan);
}

/// Log the outcome and reset the world's scenario state.
pub fn finish_scenario(world: &mut ApiWorld, name: &str, outcome: ScenarioOutcome) {
    let elapsed = world.started.map(|s| s.elapsed()).unwrap_or_default();
    outcome.log(name, elapsed);

    if outcome.is_failure() {
        world.ctx.log_last_response();
        world.ctx.log_last_error();
    }

    let timed = world
        .plan
        .as_ref()
        .map(|p| p.start_performance_timer)
        .unwrap_or(false);
    if timed {
        match world.ctx.end_timer(PERFORMANCE_TIMER) {
            Ok(ms) => info!("📊 Performance: {} took {}ms", name, ms),
            Err(e) => warn!("⚠️ {}", e),
        }
    }

    world.http().set_timeout(world.config.timeout_ms);
    world.ctx.cleanup();
    world.concurrent = None;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plumbline_common::{ApiError, ApiResponse, HarnessConfig};

    use super::*;

    fn world() -> ApiWorld {
        let config = HarnessConfig {
            timeout_ms: 30_000,
            performance_timeout_ms: 5_000,
            ..Default::default()
        };
        ApiWorld::with_config(Arc::new(config), reqwest::Client::new())
    }

    #[test]
    fn test_begin_applies_plan() {
        let mut w = world();
        begin_scenario(&mut w, "Get a post", &["smoke".to_string(), "performance".to_string()]);

        assert_eq!(w.http().timeout(), 5_000);
        assert!(w.ctx.has_timer(PERFORMANCE_TIMER));
        assert_eq!(w.ctx.get_test_data("scenarioName"), Some(&json!("Get a post")));
        assert_eq!(
            w.ctx.get_test_data("scenarioTags"),
            Some(&json!(["@smoke", "@performance"]))
        );
    }

    #[test]
    fn test_slow_doubles_timeout() {
        let mut w = world();
        begin_scenario(&mut w, "Big list", &["slow".to_string()]);
        assert_eq!(w.http().timeout(), 60_000);
    }

    #[test]
    fn test_finish_resets_state() {
        let mut w = world();
        begin_scenario(&mut w, "Timed", &["performance".to_string()]);
        w.ctx.set_last_response(ApiResponse::new(200, "OK", json!([])));
        w.ctx.set_last_error(ApiError::transport("Network Error"));

        finish_scenario(&mut w, "Timed", ScenarioOutcome::Failed("boom".into()));

        assert_eq!(w.http().timeout(), 30_000);
        assert!(w.ctx.last_response().is_none());
        assert!(w.ctx.last_error().is_none());
        assert!(w.ctx.get_test_data("scenarioName").is_none());
        assert!(!w.ctx.has_timer(PERFORMANCE_TIMER));
    }
}
