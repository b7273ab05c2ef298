//! Plumbline CLI - Main Entry Point
//!
//! Runs the BDD API suite and its supporting tools: report generation,
//! the upstream health check and artifact cleanup.

use clap::{Parser, Subcommand};

mod bdd;
mod commands;
mod output;

use commands::{clean, health, report, run};
use plumbline_common::{logging, HarnessConfig};

/// Exit code for invalid configuration
const EXIT_CONFIG: i32 = 2;

/// Plumbline - behaviour-driven API test harness
#[derive(Parser)]
#[command(name = "plumbline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the feature suite
    Run(run::RunArgs),

    /// Generate reports from a cucumber JSON log
    Report(report::ReportArgs),

    /// Check upstream API health
    Health(health::HealthArgs),

    /// Remove generated artifacts
    Clean(clean::CleanArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = logging::init(&config.log, cli.verbose) {
        output::print_warning(&format!("Logging not initialised: {e}"));
    }

    let result = match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.verbose).await,
        Commands::Report(args) => report::execute(args, &config),
        Commands::Health(args) => health::execute(args, &config).await,
        Commands::Clean(args) => clean::execute(args),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<plumbline_common::Error>() {
        Some(e) if e.is_fatal() => EXIT_CONFIG,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_config_errors() {
        let err = anyhow::Error::new(plumbline_common::Error::InvalidConfig("bad".into()));
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);

        let err = anyhow::Error::new(plumbline_common::Error::Report("missing".into()));
        assert_eq!(exit_code_for(&err), 1);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "plumbline", "--verbose", "run", "--profile", "smoke", "--tags", "@posts", "--parallel", "4",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.profile, "smoke");
                assert_eq!(args.tags.as_deref(), Some("@posts"));
                assert_eq!(args.parallel, Some(4));
            }
            _ => panic!("expected run"),
        }
    }
}
