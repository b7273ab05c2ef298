//! Run profiles
//!
//! A profile bundles tag filter, concurrency, retries, fail-fast and the
//! outputs produced for a run. Built-ins can be overridden or extended by
//! a YAML file mapping profile names to fields.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plumbline_common::{Error, HarnessConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Scenarios matching this expression may be retried
pub const RETRY_TAG_FILTER: &str = "not @no-retry";

pub const HTML_REPORT: &str = "cucumber-report.html";
pub const JUNIT_REPORT: &str = "junit-report.xml";

/// A named run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunProfile {
    #[serde(skip)]
    pub name: String,
    /// Tag expression; `None` runs everything
    pub tags: Option<String>,
    /// `None` uses the configured `PARALLEL`
    pub parallel: Option<usize>,
    /// `None` uses the configured `RETRY_COUNT`
    pub retries: Option<usize>,
    pub fail_fast: bool,
    /// Where the cucumber JSON log is written
    pub json_log: PathBuf,
    pub html: bool,
    pub junit: bool,
    /// Print steps and doc strings as they run
    pub verbose: bool,
    /// Dump the world state of failed scenarios
    pub world_dumps: bool,
}

impl Default for RunProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            tags: None,
            parallel: None,
            retries: None,
            fail_fast: true,
            json_log: PathBuf::from("reports/cucumber-report.json"),
            html: true,
            junit: false,
            verbose: false,
            world_dumps: false,
        }
    }
}

impl RunProfile {
    fn serial(name: &str, json_log: &str) -> Self {
        Self {
            name: name.to_string(),
            parallel: Some(1),
            retries: Some(0),
            fail_fast: false,
            json_log: PathBuf::from(json_log),
            html: false,
            ..Default::default()
        }
    }

    /// Directory derived reports are written to
    pub fn output_dir(&self) -> PathBuf {
        self.json_log
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn html_path(&self) -> Option<PathBuf> {
        self.html.then(|| self.output_dir().join(HTML_REPORT))
    }

    pub fn junit_path(&self) -> Option<PathBuf> {
        self.junit.then(|| self.output_dir().join(JUNIT_REPORT))
    }

    /// Combine with configuration and command-line overrides. Flags win
    /// over the profile, the profile wins over configuration.
    pub fn resolve(&self, config: &HarnessConfig, overrides: &RunOverrides) -> ResolvedRun {
        ResolvedRun {
            profile: self.name.clone(),
            tags: overrides
                .tags
                .clone()
                .or_else(|| self.tags.clone())
                .or_else(|| config.tags.clone()),
            parallel: overrides
                .parallel
                .or(self.parallel)
                .unwrap_or(config.parallel)
                .max(1),
            retries: overrides
                .retries
                .or(self.retries)
                .unwrap_or(config.retry_count),
            fail_fast: overrides.fail_fast || self.fail_fast,
            json_log: self.json_log.clone(),
            html: self.html_path().filter(|_| config.report.generate_html),
            junit: self.junit_path(),
            verbose: self.verbose,
            world_dumps: self.world_dumps,
        }
    }
}

/// Command-line overrides for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub tags: Option<String>,
    pub parallel: Option<usize>,
    pub retries: Option<usize>,
    pub fail_fast: bool,
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRun {
    pub profile: String,
    pub tags: Option<String>,
    pub parallel: usize,
    pub retries: usize,
    pub fail_fast: bool,
    pub json_log: PathBuf,
    pub html: Option<PathBuf>,
    pub junit: Option<PathBuf>,
    pub verbose: bool,
    pub world_dumps: bool,
}

/// Known profiles by name
#[derive(Debug, Clone)]
pub struct ProfileSet {
    profiles: BTreeMap<String, RunProfile>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileSet {
    pub fn builtin() -> Self {
        let smoke = RunProfile {
            tags: Some("@smoke".to_string()),
            fail_fast: true,
            html: true,
            ..RunProfile::serial("smoke", "reports/smoke-report.json")
        };
        let ci = RunProfile {
            name: "ci".to_string(),
            tags: Some("(not @skip) and (not @manual)".to_string()),
            parallel: Some(3),
            retries: Some(2),
            fail_fast: false,
            json_log: PathBuf::from("reports/ci-report.json"),
            html: true,
            junit: true,
            ..Default::default()
        };
        let verbose = RunProfile {
            verbose: true,
            ..RunProfile::serial("verbose", "reports/verbose-report.json")
        };
        let debug = RunProfile {
            world_dumps: true,
            ..RunProfile::serial("debug", "reports/debug-report.json")
        };
        let allure = RunProfile {
            junit: true,
            ..RunProfile::serial("allure", "reports/allure-results/cucumber.json")
        };

        let profiles = [RunProfile::default(), smoke, ci, verbose, debug, allure]
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self { profiles }
    }

    /// Built-ins plus the profiles in a YAML file, which override
    /// built-ins of the same name.
    pub fn with_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut set = Self::builtin();
        set.merge_yaml(&content)?;
        info!("📋 Loaded profiles from {}", path.display());
        Ok(set)
    }

    /// Merge profiles from YAML text.
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<()> {
        let parsed: BTreeMap<String, RunProfile> = serde_yaml::from_str(yaml)?;
        for (name, mut profile) in parsed {
            profile.name = name.clone();
            self.profiles.insert(name, profile);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&RunProfile> {
        self.profiles.get(name).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "unknown profile '{name}' (available: {})",
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}
