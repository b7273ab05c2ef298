//! Run statistics

use serde::{Deserialize, Serialize};

use super::model::{Element, Feature};

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "PASSED",
            ScenarioStatus::Failed => "FAILED",
            ScenarioStatus::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed beats skipped beats passed.
pub fn scenario_status(element: &Element) -> ScenarioStatus {
    let mut incomplete = false;
    for result in element.results() {
        if result.status.is_failure() {
            return ScenarioStatus::Failed;
        }
        incomplete |= result.status.is_incomplete();
    }
    if incomplete {
        ScenarioStatus::Skipped
    } else {
        ScenarioStatus::Passed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub features: usize,
    pub scenarios: ScenarioCounts,
    /// Percent of scenarios passed, rounded
    pub success_rate: u32,
    /// Sum of step durations, in nanoseconds
    pub duration: u64,
}

impl RunStats {
    pub fn calculate(features: &[Feature]) -> Self {
        let mut stats = RunStats {
            features: features.len(),
            ..Default::default()
        };
        for element in features.iter().flat_map(|f| &f.elements) {
            stats.scenarios.total += 1;
            stats.duration += element.duration_ns();
            match scenario_status(element) {
                ScenarioStatus::Passed => stats.scenarios.passed += 1,
                ScenarioStatus::Failed => stats.scenarios.failed += 1,
                ScenarioStatus::Skipped => stats.scenarios.skipped += 1,
            }
        }
        stats.success_rate = success_rate(stats.scenarios.passed, stats.scenarios.total);
        stats
    }

    pub fn all_passed(&self) -> bool {
        self.scenarios.failed == 0
    }
}

/// round(passed / total * 100), 0 when there is nothing to count
pub fn success_rate(passed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u32
}

/// Human-readable duration from nanoseconds
pub fn format_duration(nanos: u64) -> String {
    let ms = nanos as f64 / 1_000_000.0;
    if ms < 1000.0 {
        return format!("{}ms", ms.round());
    }
    let secs = ms / 1000.0;
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    format!("{:.1}m", secs / 60.0)
}
