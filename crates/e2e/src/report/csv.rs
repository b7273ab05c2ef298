//! CSV results, one row per scenario

use super::model::Feature;
use super::stats::scenario_status;

pub const HEADER: &str = "Feature,Scenario,Status,Duration,Error";

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render the CSV. Duration is in milliseconds.
pub fn render(features: &[Feature]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for feature in features {
        for element in &feature.elements {
            let ms = element.duration_ns() as f64 / 1_000_000.0;
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                quote(&feature.name),
                quote(&element.name),
                quote(scenario_status(element).as_str()),
                ms,
                quote(element.first_error().unwrap_or_default())
            ));
        }
    }
    out
}
