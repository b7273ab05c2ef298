//! Scenario lifecycle planning
//!
//! Tags decide per-scenario timeouts, timers and whether a scenario runs
//! at all. The plan is computed from the tag list and configuration alone
//! so the runner hooks stay thin.

use std::time::Duration;

use plumbline_common::HarnessConfig;
use tracing::{error, info, warn};

/// Tag names understood by the planner, without the leading `@`
pub mod tags {
    pub const SMOKE: &str = "smoke";
    pub const PERFORMANCE: &str = "performance";
    pub const SLOW: &str = "slow";
    pub const SKIP: &str = "skip";
    pub const MANUAL: &str = "manual";
    pub const VALIDATION: &str = "validation";
    pub const RETRY: &str = "retry";
    pub const CLEANUP: &str = "cleanup";
    pub const NO_RETRY: &str = "no-retry";
}

/// Timer started for `@performance` scenarios
pub const PERFORMANCE_TIMER: &str = "performance";

/// Why a scenario will not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tagged `@skip`
    Tagged,
    /// Tagged `@manual` while running under CI
    ManualInCi,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Tagged => write!(f, "tagged @skip"),
            SkipReason::ManualInCi => write!(f, "manual scenario in CI"),
        }
    }
}

/// What the hooks do for one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan {
    /// Request timeout applied to the client for this scenario
    pub timeout_ms: u64,
    pub start_performance_timer: bool,
    pub skip: Option<SkipReason>,
    /// Informational tags seen (`validation`, `retry`, `cleanup`)
    pub notes: Vec<&'static str>,
}

impl ScenarioPlan {
    /// Build a plan from a scenario's effective tags (feature and rule tags
    /// included). Tags may be given with or without the leading `@`.
    pub fn from_tags<I, S>(tags: I, config: &HarnessConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim_start_matches('@').to_string())
            .collect();
        let has = |name: &str| names.iter().any(|t| t == name);

        let mut plan = ScenarioPlan {
            timeout_ms: config.timeout_ms,
            start_performance_timer: false,
            skip: None,
            notes: Vec::new(),
        };

        if has(tags::SMOKE) {
            plan.timeout_ms = config.performance_timeout_ms;
        }
        if has(tags::PERFORMANCE) {
            plan.start_performance_timer = true;
        }
        if has(tags::SLOW) {
            plan.timeout_ms = config.timeout_ms.saturating_mul(2);
        }
        if has(tags::SKIP) {
            plan.skip = Some(SkipReason::Tagged);
        } else if has(tags::MANUAL) && config.is_ci() {
            plan.skip = Some(SkipReason::ManualInCi);
        }
        for note in [tags::VALIDATION, tags::RETRY, tags::CLEANUP] {
            if has(note) {
                plan.notes.push(note);
            }
        }
        plan
    }

    pub fn should_run(&self) -> bool {
        self.skip.is_none()
    }

    /// Log what the plan changes
    pub fn log(&self, scenario: &str, config: &HarnessConfig) {
        info!("🚀 Starting scenario: {}", scenario);
        if self.timeout_ms != config.timeout_ms {
            info!("⏱️ Timeout set to {}ms", self.timeout_ms);
        }
        if self.start_performance_timer {
            info!("📊 Performance timer started");
        }
        for note in &self.notes {
            match *note {
                tags::VALIDATION => info!("🔍 Validation scenario"),
                tags::RETRY => info!("🔁 Retry-tolerant scenario"),
                tags::CLEANUP => info!("🧹 Scenario performs cleanup"),
                other => info!("🏷️ {}", other),
            }
        }
    }
}

/// Whether a scenario with these tags should be scheduled at all
pub fn should_run<I, S>(tags: I, config: &HarnessConfig) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ScenarioPlan::from_tags(tags, config).should_run()
}

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Passed,
    Failed(String),
    Skipped,
}

impl ScenarioOutcome {
    pub fn emoji(&self) -> &'static str {
        match self {
            ScenarioOutcome::Passed => "✅",
            ScenarioOutcome::Failed(_) => "❌",
            ScenarioOutcome::Skipped => "⏭️",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioOutcome::Passed => "PASSED",
            ScenarioOutcome::Failed(_) => "FAILED",
            ScenarioOutcome::Skipped => "SKIPPED",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ScenarioOutcome::Failed(_))
    }

    /// Log the outcome line for a finished scenario.
    pub fn log(&self, scenario: &str, elapsed: Duration) {
        let ms = elapsed.as_millis();
        match self {
            ScenarioOutcome::Passed => {
                info!("{} Scenario {}: {} ({}ms)", self.emoji(), self.label(), scenario, ms)
            }
            ScenarioOutcome::Failed(message) => {
                error!("{} Scenario {}: {} ({}ms)", self.emoji(), self.label(), scenario, ms);
                error!("💥 Error: {}", message);
            }
            ScenarioOutcome::Skipped => {
                warn!("{} Scenario {}: {} ({}ms)", self.emoji(), self.label(), scenario, ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HarnessConfig {
        HarnessConfig {
            timeout_ms: 30_000,
            performance_timeout_ms: 5000,
            ..Default::default()
        }
    }

    #[test]
    fn test_untagged_plan_uses_defaults() {
        let plan = ScenarioPlan::from_tags(Vec::<String>::new(), &config());
        assert_eq!(plan.timeout_ms, 30_000);
        assert!(plan.should_run());
        assert!(!plan.start_performance_timer);
        assert!(plan.notes.is_empty());
    }

    #[test]
    fn test_smoke_uses_performance_timeout() {
        let plan = ScenarioPlan::from_tags(["@smoke"], &config());
        assert_eq!(plan.timeout_ms, 5000);
    }

    #[test]
    fn test_slow_wins_over_smoke() {
        let plan = ScenarioPlan::from_tags(["smoke", "slow"], &config());
        assert_eq!(plan.timeout_ms, 60_000);
    }

    #[test]
    fn test_performance_starts_timer() {
        let plan = ScenarioPlan::from_tags(["@performance", "@validation"], &config());
        assert!(plan.start_performance_timer);
        assert_eq!(plan.notes, vec![tags::VALIDATION]);
    }

    #[test]
    fn test_skip_never_runs() {
        assert!(!should_run(["@skip"], &config()));
    }

    #[test]
    fn test_manual_depends_on_ci() {
        assert!(should_run(["@manual"], &config()));

        let ci = HarnessConfig {
            ci: true,
            ..config()
        };
        assert_eq!(
            ScenarioPlan::from_tags(["@manual"], &ci).skip,
            Some(SkipReason::ManualInCi)
        );

        let actions = HarnessConfig {
            github_actions: true,
            ..config()
        };
        assert!(!should_run(["manual"], &actions));
    }

    #[test]
    fn test_outcome_emoji() {
        assert_eq!(ScenarioOutcome::Passed.emoji(), "✅");
        assert_eq!(ScenarioOutcome::Failed("x".into()).emoji(), "❌");
        assert_eq!(ScenarioOutcome::Skipped.emoji(), "⏭️");
        assert!(ScenarioOutcome::Failed("x".into()).is_failure());
    }
}
