//! Cucumber suite: world, step definitions and lifecycle hooks
//!
//! ```text
//! run command ──install──► SuiteState (config + connection pool)
//!                               │ read by
//!                               ▼
//! cucumber ──► ApiWorld::new() per scenario attempt
//!                  │
//!   before hook ───┤ tag plan, timeout, timers
//!   steps ─────────┤ PlaceholderClient → ExecutionContext
//!   after hook ────┘ outcome log, dumps, cleanup
//!                  │
//!                  ▼
//!        JSON log ──► ReportGenerator
//! ```

pub mod hooks;
pub mod steps;
pub mod world;

use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use cucumber::cli;
use cucumber::gherkin::tagexpr::TagOperation;
use cucumber::gherkin::{Feature, Rule, Scenario};
use cucumber::tag::Ext as _;
use cucumber::writer::{self, Coloring, Verbosity};
use cucumber::{World as _, WriterExt as _};
use plumbline_common::{Error, HarnessConfig, Result};
use plumbline_e2e::lifecycle::ScenarioPlan;
use plumbline_e2e::profile::RETRY_TAG_FILTER;
use plumbline_e2e::ResolvedRun;
use tracing::info;

pub use world::ApiWorld;

/// Process-wide state shared by every world of a run
#[derive(Debug, Clone)]
pub struct SuiteState {
    pub config: Arc<HarnessConfig>,
    /// Connection pool shared by the per-world HTTP clients
    pub client: reqwest::Client,
}

impl SuiteState {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }
}

static SUITE: OnceLock<SuiteState> = OnceLock::new();

/// Install the suite state. Only the first call succeeds.
pub fn install(state: SuiteState) -> Result<()> {
    SUITE
        .set(state)
        .map_err(|_| Error::InvalidConfig("suite state already installed".into()))
}

pub fn state() -> Option<&'static SuiteState> {
    SUITE.get()
}

/// Feature, rule and scenario tags of one scenario, without `@`
pub fn effective_tags(feature: &Feature, rule: Option<&Rule>, scenario: &Scenario) -> Vec<String> {
    feature
        .tags
        .iter()
        .chain(rule.iter().flat_map(|r| r.tags.iter()))
        .chain(scenario.tags.iter())
        .map(|t| t.trim_start_matches('@').to_string())
        .collect()
}

pub fn parse_tag_expression(expr: &str) -> Result<TagOperation> {
    expr.parse::<TagOperation>()
        .map_err(|e| Error::InvalidConfig(format!("invalid tag expression '{expr}': {e}")))
}

fn verbosity(run: &ResolvedRun) -> Verbosity {
    if run.verbose {
        Verbosity::ShowWorldAndDocString
    } else if run.world_dumps {
        Verbosity::ShowWorld
    } else {
        Verbosity::Default
    }
}

/// Run every scenario under `features` that passes the tag expression
/// and the lifecycle plan, writing the JSON log to `run.json_log`.
pub async fn run_features(features: &Path, run: &ResolvedRun, config: Arc<HarnessConfig>) -> Result<()> {
    let filter = run.tags.as_deref().map(parse_tag_expression).transpose()?;
    let retry_filter = parse_tag_expression(RETRY_TAG_FILTER)?;

    if let Some(parent) = run.json_log.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = std::fs::File::create(&run.json_log)?;

    let mut cucumber = ApiWorld::cucumber()
        .before(hooks::before)
        .after(hooks::after)
        .with_writer(
            writer::Basic::raw(io::stdout(), Coloring::Auto, verbosity(run))
                .summarized()
                .tee::<ApiWorld, _>(writer::Json::for_tee(json))
                .normalized(),
        )
        .max_concurrent_scenarios(run.parallel)
        .retries(run.retries)
        .retry_filter(retry_filter);
    if run.fail_fast {
        cucumber = cucumber.fail_fast();
    }

    info!(
        "🥒 Running features in {} (parallel {}, retries {})",
        features.display(),
        run.parallel,
        run.retries
    );

    // Options come from the plumbline CLI; cucumber must not parse argv.
    cucumber
        .with_cli(cli::Opts::<_, _, _, cli::Empty>::default())
        .filter_run(features.to_path_buf(), move |feature, rule, scenario| {
            let tags = effective_tags(feature, rule, scenario);
            if let Some(op) = &filter {
                if !op.eval(tags.iter()) {
                    return false;
                }
            }
            match ScenarioPlan::from_tags(&tags, &config).skip {
                Some(reason) => {
                    info!("⏭️ Skipping scenario: {} ({})", scenario.name, reason);
                    false
                }
                None => true,
            }
        })
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum::{Json, Router};
    use cucumber::tag::Ext as _;
    use plumbline_e2e::{ProfileSet, ReportGenerator, RunOverrides};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const MANUAL_FEATURE: &str = r#"Feature: Manual gate

  Scenario: Read a post
    When I send a GET request to "/posts/1"
    Then the response should have status code 200
    And the post should have a valid structure

  @manual
  Scenario: Checked by hand
    When I send a GET request to "/posts/1"
    Then the response should be successful
"#;

    fn ci_filter() -> TagOperation {
        let config = HarnessConfig::default();
        let run = ProfileSet::builtin()
            .get("ci")
            .unwrap()
            .resolve(&config, &RunOverrides::default());
        parse_tag_expression(run.tags.as_deref().unwrap()).unwrap()
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn run_for(dir: &Path, name: &str) -> ResolvedRun {
        ResolvedRun {
            profile: name.to_string(),
            tags: None,
            parallel: 1,
            retries: 0,
            fail_fast: false,
            json_log: dir.join(format!("{name}.json")),
            html: None,
            junit: None,
            verbose: false,
            world_dumps: false,
        }
    }

    async fn spawn_fixture() -> String {
        let app = Router::new().route(
            "/posts/1",
            get(|| async { Json(json!({"id": 1, "title": "t", "body": "b", "userId": 1})) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn scenario_names(log: &Path, config: &HarnessConfig) -> Vec<String> {
        let generator = ReportGenerator::load(log, config).unwrap();
        generator
            .features()
            .iter()
            .flat_map(|f| f.elements.iter().map(|e| e.name.clone()))
            .collect()
    }

    #[test]
    fn test_parse_tag_expression() {
        assert!(parse_tag_expression("@smoke and not @slow").is_ok());
        assert!(parse_tag_expression(RETRY_TAG_FILTER).is_ok());

        let err = parse_tag_expression("@smoke and and").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_ci_profile_filter_excludes_skip_and_manual() {
        let op = ci_filter();
        assert!(op.eval(tags(&["posts"]).iter()));
        assert!(op.eval(Vec::<String>::new().iter()));
        assert!(!op.eval(tags(&["posts", "manual"]).iter()));
        assert!(!op.eval(tags(&["skip"]).iter()));
        assert!(!op.eval(tags(&["skip", "manual"]).iter()));
    }

    #[test]
    fn test_verbosity_follows_profile() {
        let config = HarnessConfig::default();
        let set = ProfileSet::builtin();
        let resolve = |name: &str| set.get(name).unwrap().resolve(&config, &RunOverrides::default());

        assert!(matches!(verbosity(&resolve("default")), Verbosity::Default));
        assert!(matches!(
            verbosity(&resolve("verbose")),
            Verbosity::ShowWorldAndDocString
        ));
        assert!(matches!(verbosity(&resolve("debug")), Verbosity::ShowWorld));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_features_gates_manual_scenarios_on_ci() {
        let base_url = spawn_fixture().await;
        let dir = TempDir::new().unwrap();
        let features = dir.path().join("features");
        std::fs::create_dir_all(&features).unwrap();
        std::fs::write(features.join("manual.feature"), MANUAL_FEATURE).unwrap();

        let local = HarnessConfig {
            base_url,
            ..Default::default()
        };
        install(SuiteState::new(local.clone())).unwrap();

        let run = run_for(dir.path(), "local");
        run_features(&features, &run, Arc::new(local.clone()))
            .await
            .unwrap();
        let names = scenario_names(&run.json_log, &local);
        assert_eq!(names, vec!["Read a post", "Checked by hand"]);
        let stats = *ReportGenerator::load(&run.json_log, &local).unwrap().stats();
        assert_eq!(stats.scenarios.passed, 2);
        assert!(stats.all_passed());

        let ci = HarnessConfig {
            ci: true,
            ..local
        };
        let run = run_for(dir.path(), "ci");
        run_features(&features, &run, Arc::new(ci.clone())).await.unwrap();
        assert_eq!(scenario_names(&run.json_log, &ci), vec!["Read a post"]);
        assert!(ReportGenerator::load(&run.json_log, &ci).unwrap().stats().all_passed());
    }
}
