//! Report generation from the cucumber JSON log
//!
//! ```text
//! cucumber-report.json ──parse──► [Feature] ──► RunStats
//!                                     │
//!             ┌───────────────┬───────┴───────┬───────────────┐
//!             ▼               ▼               ▼               ▼
//!   cucumber-report.html  junit-report.xml  results.csv  summary.json
//! ```

pub mod csv;
pub mod html;
pub mod junit;
pub mod model;
pub mod stats;
pub mod summary;

use std::path::{Path, PathBuf};

use plumbline_common::{HarnessConfig, Result};
use tracing::info;

pub use html::{HtmlOptions, Theme};
pub use model::{Feature, StepStatus};
pub use stats::{format_duration, scenario_status, RunStats, ScenarioStatus};
pub use summary::Summary;

pub const JUNIT_FILE: &str = "junit-report.xml";
pub const CSV_FILE: &str = "results.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Escape text for HTML and XML bodies and attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Files written by one [`ReportGenerator::generate`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedReports {
    pub html: Option<PathBuf>,
    pub junit: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl GeneratedReports {
    pub fn paths(&self) -> Vec<&Path> {
        [&self.html, &self.junit, &self.csv, &self.summary]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect()
    }
}

/// Turns a parsed JSON log into report files
pub struct ReportGenerator {
    features: Vec<Feature>,
    stats: RunStats,
    title: String,
    theme: Theme,
    environment: String,
    base_url: String,
}

impl ReportGenerator {
    /// Load the JSON log. A missing file is an error.
    pub fn load(input: &Path, config: &HarnessConfig) -> Result<Self> {
        let features = model::load(input)?;
        Ok(Self::from_features(features, config))
    }

    pub fn from_features(features: Vec<Feature>, config: &HarnessConfig) -> Self {
        let stats = RunStats::calculate(&features);
        Self {
            features,
            stats,
            title: config.report.title.clone(),
            theme: config.report.theme.parse().unwrap_or_default(),
            environment: config.environment.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    fn metadata(&self) -> Vec<(String, String)> {
        let s = &self.stats.scenarios;
        vec![
            ("Test Environment".into(), self.environment.clone()),
            ("Base URL".into(), self.base_url.clone()),
            (
                "Platform".into(),
                format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            ),
            ("Plumbline Version".into(), plumbline_common::VERSION.into()),
            (
                "Executed".into(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("Features".into(), self.stats.features.to_string()),
            (
                "Scenarios".into(),
                format!("{} ({} passed, {} failed)", s.total, s.passed, s.failed),
            ),
            ("Success Rate".into(), format!("{}%", self.stats.success_rate)),
            ("Duration".into(), format_duration(self.stats.duration)),
        ]
    }

    pub fn render_html(&self) -> String {
        html::render(
            &self.features,
            &self.stats,
            &HtmlOptions {
                title: self.title.clone(),
                theme: self.theme,
                metadata: self.metadata(),
            },
        )
    }

    pub fn render_junit(&self) -> String {
        junit::render(&self.features, &self.stats, &self.title)
    }

    pub fn render_csv(&self) -> String {
        csv::render(&self.features)
    }

    pub fn summary(&self) -> Summary {
        Summary::new(self.stats, &self.environment, &self.base_url)
    }

    pub fn write_html(&self, path: &Path) -> Result<PathBuf> {
        write(path, &self.render_html())
    }

    pub fn write_junit(&self, path: &Path) -> Result<PathBuf> {
        write(path, &self.render_junit())
    }

    /// Write the HTML report to `html_path` and, with `multiple`, JUnit,
    /// CSV and summary files next to it.
    pub fn generate(&self, html_path: &Path, multiple: bool) -> Result<GeneratedReports> {
        let mut written = GeneratedReports {
            html: Some(self.write_html(html_path)?),
            ..Default::default()
        };
        if multiple {
            let dir = html_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            written.junit = Some(self.write_junit(&dir.join(JUNIT_FILE))?);
            written.csv = Some(write(&dir.join(CSV_FILE), &self.render_csv())?);
            written.summary = Some(write(
                &dir.join(SUMMARY_FILE),
                &serde_json::to_string_pretty(&self.summary())?,
            )?);
        }
        Ok(written)
    }
}

fn write(path: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    info!("📄 Report written: {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"[{"name": "Posts", "elements": [
        {"id": "a", "name": "one", "line": 1, "steps": [{"name": "s", "result": {"status": "passed", "duration": 1000000}}]},
        {"id": "b", "name": "two", "line": 2, "steps": [{"name": "s", "result": {"status": "failed", "duration": 1000000, "error_message": "nope"}}]}
    ]}]"#;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_generate_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cucumber-report.json");
        std::fs::write(&input, LOG).unwrap();

        let generator = ReportGenerator::load(&input, &HarnessConfig::default())
            .unwrap()
            .with_title("My API Tests");
        assert_eq!(generator.stats().scenarios.failed, 1);
        assert_eq!(generator.stats().success_rate, 50);

        let html_path = dir.path().join("out/cucumber-report.html");
        let written = generator.generate(&html_path, true).unwrap();
        assert_eq!(written.paths().len(), 4);
        assert!(std::fs::read_to_string(&html_path).unwrap().contains("My API Tests"));

        let summary: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("out").join(SUMMARY_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["scenarios"]["failed"], 1);
        assert!(dir.path().join("out").join(CSV_FILE).exists());
    }

    #[test]
    fn test_html_only_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            ReportGenerator::from_features(model::parse(LOG).unwrap(), &HarnessConfig::default());
        let written = generator
            .generate(&dir.path().join("report.html"), false)
            .unwrap();
        assert!(written.html.is_some());
        assert!(written.junit.is_none());
        assert!(!dir.path().join(JUNIT_FILE).exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReportGenerator::load(&dir.path().join("nope.json"), &HarnessConfig::default());
        assert!(result.is_err());
    }
}
