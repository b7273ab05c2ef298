//! Report Command

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use plumbline_common::HarnessConfig;
use plumbline_e2e::report::Theme;
use plumbline_e2e::ReportGenerator;

use crate::output::{print_info, print_run_summary, print_success};

#[derive(Args)]
pub struct ReportArgs {
    /// Cucumber JSON log to read
    #[arg(long, default_value = "reports/cucumber-report.json")]
    pub input: PathBuf,

    /// HTML report to write
    #[arg(long, default_value = "reports/cucumber-report.html")]
    pub output: PathBuf,

    /// HTML theme (bootstrap, hierarchy, foundation, simple)
    #[arg(long, env = "REPORT_THEME")]
    pub theme: Option<String>,

    /// Report title
    #[arg(long, env = "REPORT_TITLE")]
    pub title: Option<String>,

    /// Open the HTML report in a browser
    #[arg(long)]
    pub open: bool,

    /// Also write JUnit XML, CSV and summary JSON next to the HTML report
    #[arg(long, env = "GENERATE_MULTIPLE_REPORTS")]
    pub multiple: bool,
}

pub fn execute(args: ReportArgs, config: &HarnessConfig) -> Result<i32> {
    print_info(&format!("Reading {}", args.input.display()));

    let mut generator = ReportGenerator::load(&args.input, config)?;
    if let Some(theme) = &args.theme {
        generator = generator.with_theme(theme.parse::<Theme>()?);
    }
    if let Some(title) = args.title {
        generator = generator.with_title(title);
    }

    let written = generator.generate(&args.output, args.multiple)?;
    print_run_summary(generator.stats());
    for path in written.paths() {
        print_success(&format!("Generated {}", path.display()));
    }

    if args.open {
        open_in_browser(&args.output)?;
    }
    Ok(0)
}

fn open_in_browser(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .arg("/C")
            .arg("start")
            .arg(path)
            .spawn()?;
    }

    print_success("Opened report in browser");
    Ok(())
}
