//! Health Command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use plumbline_client::{HealthProbe, HttpClient};
use plumbline_common::HarnessConfig;

use crate::output::{print_health_report, print_success};

#[derive(Args)]
pub struct HealthArgs {
    /// Base URL to probe (defaults to BASE_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Directory for health-check.json and health-status.txt
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

pub async fn execute(args: HealthArgs, config: &HarnessConfig) -> Result<i32> {
    let base_url = args.url.unwrap_or_else(|| config.base_url.clone());

    let mut http = HttpClient::new(base_url, config.health_check_timeout_ms);
    if let Some(key) = &config.api_key {
        http = http.with_api_key(key);
    }

    let report = HealthProbe::new(Arc::new(http), config.health_check_retries)
        .run()
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_health_report(&report);
    }

    let (report_path, status_path) = report.write(&args.output_dir)?;
    if !args.json {
        print_success(&format!(
            "Health report written to {} and {}",
            report_path.display(),
            status_path.display()
        ));
    }

    Ok(report.exit_code())
}
