//! Run Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use plumbline_client::{HttpClient, PlaceholderClient};
use plumbline_common::HarnessConfig;
use plumbline_e2e::{ProfileSet, ReportGenerator, RunOverrides};
use tracing::{info, warn};

use crate::bdd::{self, SuiteState};
use crate::output::{print_error, print_info, print_run_summary, print_success, print_warning};

#[derive(Args)]
pub struct RunArgs {
    /// Run profile (default, smoke, ci, verbose, debug, allure)
    #[arg(long, default_value = "default")]
    pub profile: String,

    /// Directory holding the .feature files
    #[arg(long, default_value = "features")]
    pub features: PathBuf,

    /// Tag expression, e.g. "@smoke and not @slow"
    #[arg(long)]
    pub tags: Option<String>,

    /// Maximum concurrent scenarios
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Retries for failed scenarios
    #[arg(long)]
    pub retries: Option<usize>,

    /// Stop scheduling scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// YAML file with extra or overriding profiles
    #[arg(long)]
    pub profiles: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, config: HarnessConfig, verbose: bool) -> Result<i32> {
    config.validate()?;
    config.log_summary();

    let profiles = match &args.profiles {
        Some(path) => ProfileSet::with_file(path)?,
        None => ProfileSet::builtin(),
    };
    let overrides = RunOverrides {
        tags: args.tags,
        parallel: args.parallel,
        retries: args.retries,
        fail_fast: args.fail_fast,
    };
    let mut run = profiles.get(&args.profile)?.resolve(&config, &overrides);
    run.verbose |= verbose;

    info!(
        profile = %run.profile,
        tags = ?run.tags,
        parallel = run.parallel,
        retries = run.retries,
        fail_fast = run.fail_fast,
        "🧪 Resolved run profile"
    );

    let suite = SuiteState::new(config);
    pre_run_health_check(&suite).await;
    let config = suite.config.clone();
    bdd::install(suite)?;

    if !args.features.is_dir() {
        print_warning(&format!("Features directory not found: {}", args.features.display()));
    }

    bdd::run_features(&args.features, &run, config.clone()).await?;
    info!("🏁 Test run complete");

    let generator = match ReportGenerator::load(&run.json_log, &config) {
        Ok(generator) => generator,
        Err(e) => {
            print_error(&format!("Could not read results: {e}"));
            return Ok(1);
        }
    };
    print_run_summary(generator.stats());

    if config.report.generate_json {
        print_info(&format!("JSON results: {}", run.json_log.display()));
    }
    if let Some(path) = &run.html {
        generator.write_html(path)?;
        print_success(&format!("HTML report: {}", path.display()));
    }
    if let Some(path) = &run.junit {
        generator.write_junit(path)?;
        print_success(&format!("JUnit report: {}", path.display()));
    }

    if generator.stats().all_passed() {
        print_success("All scenarios passed");
        Ok(0)
    } else {
        print_error(&format!(
            "{} scenario(s) failed",
            generator.stats().scenarios.failed
        ));
        Ok(1)
    }
}

/// Probe the upstream once. A failure is only a warning.
async fn pre_run_health_check(suite: &SuiteState) {
    let http = HttpClient::from_config(suite.client.clone(), &suite.config);
    http.set_timeout(suite.config.health_check_timeout_ms);
    let health = PlaceholderClient::new(std::sync::Arc::new(http))
        .health_check()
        .await;

    if health.is_healthy() {
        info!("✅ API health check passed ({}ms)", health.response_time_ms);
    } else {
        warn!(
            "⚠️ API health check failed: {}",
            health.error.as_deref().unwrap_or("unknown error")
        );
    }
}
