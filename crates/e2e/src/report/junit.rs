//! JUnit XML report

use super::escape;
use super::model::Feature;
use super::stats::{scenario_status, RunStats, ScenarioStatus};

fn seconds(nanos: u64) -> String {
    format!("{:.3}", nanos as f64 / 1_000_000_000.0)
}

/// One `testsuite` per feature, one `testcase` per scenario. Times are
/// in seconds.
pub fn render(features: &[Feature], stats: &RunStats, suite_name: &str) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{}\">\n",
        escape(suite_name),
        stats.scenarios.total,
        stats.scenarios.failed,
        stats.scenarios.skipped,
        seconds(stats.duration)
    ));

    for feature in features {
        let failures = feature
            .elements
            .iter()
            .filter(|e| scenario_status(e) == ScenarioStatus::Failed)
            .count();
        let time: u64 = feature.elements.iter().map(|e| e.duration_ns()).sum();
        out.push_str(&format!(
            "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" time=\"{}\">\n",
            escape(&feature.name),
            feature.elements.len(),
            failures,
            seconds(time)
        ));

        for element in &feature.elements {
            let open = format!(
                "    <testcase classname=\"{}\" name=\"{}\" time=\"{}\"",
                escape(&feature.name),
                escape(&element.name),
                seconds(element.duration_ns())
            );
            match scenario_status(element) {
                ScenarioStatus::Passed => out.push_str(&format!("{open}/>\n")),
                ScenarioStatus::Skipped => {
                    out.push_str(&format!("{open}>\n      <skipped/>\n    </testcase>\n"))
                }
                ScenarioStatus::Failed => {
                    let message = element.first_error().unwrap_or("Scenario failed");
                    out.push_str(&format!(
                        "{open}>\n      <failure message=\"Scenario failed\">{}</failure>\n    </testcase>\n",
                        escape(message)
                    ));
                }
            }
        }
        out.push_str("  </testsuite>\n");
    }

    out.push_str("</testsuites>\n");
    out
}
