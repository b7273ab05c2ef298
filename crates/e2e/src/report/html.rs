//! Self-contained HTML report

use std::str::FromStr;

use plumbline_common::Error;

use super::model::{Feature, StepStatus};
use super::stats::{format_duration, scenario_status, RunStats, ScenarioStatus};
use super::escape;

/// Visual theme of the HTML report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Bootstrap,
    Hierarchy,
    Foundation,
    Simple,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Bootstrap => "bootstrap",
            Theme::Hierarchy => "hierarchy",
            Theme::Foundation => "foundation",
            Theme::Simple => "simple",
        }
    }

    fn css(&self) -> &'static str {
        match self {
            Theme::Bootstrap => {
                "body{font-family:-apple-system,'Segoe UI',Roboto,sans-serif;background:#f8f9fa;color:#212529}\
                 header{background:#0d6efd;color:#fff}\
                 .feature{background:#fff;border:1px solid #dee2e6;border-radius:.375rem}"
            }
            Theme::Hierarchy => {
                "body{font-family:Georgia,serif;background:#fdfdfd;color:#222}\
                 header{background:#343a40;color:#fff}\
                 .feature{border-left:6px solid #6c757d;padding-left:1rem}\
                 .scenario{margin-left:1.5rem}"
            }
            Theme::Foundation => {
                "body{font-family:'Helvetica Neue',Helvetica,Arial,sans-serif;background:#fefefe;color:#0a0a0a}\
                 header{background:#1779ba;color:#fefefe}\
                 .feature{background:#fff;border:1px solid #cacaca}"
            }
            Theme::Simple => {
                "body{font-family:monospace;background:#fff;color:#000}\
                 header{border-bottom:2px solid #000}"
            }
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bootstrap" => Ok(Theme::Bootstrap),
            "hierarchy" => Ok(Theme::Hierarchy),
            "foundation" => Ok(Theme::Foundation),
            "simple" => Ok(Theme::Simple),
            other => Err(Error::InvalidConfig(format!(
                "unknown report theme '{other}' (expected bootstrap, hierarchy, foundation or simple)"
            ))),
        }
    }
}

/// Title, theme and metadata rows for the page header
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub title: String,
    pub theme: Theme,
    pub metadata: Vec<(String, String)>,
}

const BASE_CSS: &str = "\
*{box-sizing:border-box}body{margin:0}\
header{padding:1.5rem 2rem}header h1{margin:0 0 .5rem}\
main{padding:1rem 2rem}\
.meta{border-collapse:collapse;margin-bottom:1.5rem}.meta td{padding:.2rem .8rem .2rem 0}\
.feature{margin:1rem 0;padding:1rem}\
.scenario{margin:.75rem 0}.scenario h3{margin:.25rem 0;font-size:1rem}\
table.steps{width:100%;border-collapse:collapse}table.steps td{padding:.2rem .5rem;border-top:1px solid #eee}\
.passed{color:#198754}.failed{color:#dc3545}.skipped{color:#b58105}\
pre.error{background:#fff5f5;color:#842029;padding:.5rem;white-space:pre-wrap}";

/// Render the full page.
pub fn render(features: &[Feature], stats: &RunStats, options: &HtmlOptions) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(&options.title)));
    out.push_str(&format!(
        "<style>{}{}</style>\n</head>\n<body class=\"theme-{}\">\n",
        BASE_CSS,
        options.theme.css(),
        options.theme.as_str()
    ));

    out.push_str(&format!(
        "<header><h1>{}</h1><div>{} scenarios: <span class=\"passed\">{} passed</span>, \
         <span class=\"failed\">{} failed</span>, <span class=\"skipped\">{} skipped</span> \
         ({}%) in {}</div></header>\n<main>\n",
        escape(&options.title),
        stats.scenarios.total,
        stats.scenarios.passed,
        stats.scenarios.failed,
        stats.scenarios.skipped,
        stats.success_rate,
        format_duration(stats.duration)
    ));

    out.push_str("<table class=\"meta\">\n");
    for (key, value) in &options.metadata {
        out.push_str(&format!(
            "<tr><td><strong>{}</strong></td><td>{}</td></tr>\n",
            escape(key),
            escape(value)
        ));
    }
    out.push_str("</table>\n");

    for feature in features {
        out.push_str(&format!(
            "<section class=\"feature\">\n<h2>{}</h2>\n",
            escape(&feature.name)
        ));
        for element in &feature.elements {
            let status = scenario_status(element);
            out.push_str(&format!(
                "<div class=\"scenario {}\">\n<h3>{} {}: {} <small>({})</small></h3>\n",
                status_class(status),
                status_icon(status),
                escape(&element.keyword),
                escape(&element.name),
                format_duration(element.duration_ns())
            ));
            out.push_str("<table class=\"steps\">\n");
            for step in &element.steps {
                let step_status = step
                    .result
                    .as_ref()
                    .map(|r| r.status)
                    .unwrap_or(StepStatus::Skipped);
                out.push_str(&format!(
                    "<tr><td class=\"{}\">{}</td><td>{}{}</td></tr>\n",
                    step_status.as_str(),
                    step_status.as_str(),
                    escape(&step.keyword),
                    escape(&step.name)
                ));
            }
            out.push_str("</table>\n");
            if let Some(err) = element.first_error() {
                out.push_str(&format!("<pre class=\"error\">{}</pre>\n", escape(err)));
            }
            out.push_str("</div>\n");
        }
        out.push_str("</section>\n");
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

fn status_class(status: ScenarioStatus) -> &'static str {
    match status {
        ScenarioStatus::Passed => "passed",
        ScenarioStatus::Failed => "failed",
        ScenarioStatus::Skipped => "skipped",
    }
}

fn status_icon(status: ScenarioStatus) -> &'static str {
    match status {
        ScenarioStatus::Passed => "✅",
        ScenarioStatus::Failed => "❌",
        ScenarioStatus::Skipped => "⏭️",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::parse;

    #[test]
    fn test_theme_parse() {
        assert_eq!("Hierarchy".parse::<Theme>().unwrap(), Theme::Hierarchy);
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn test_render_escapes_and_lists_scenarios() {
        let features = parse(
            r#"[{"name": "Posts <api>", "elements": [
                {"id": "a", "keyword": "Scenario", "name": "Create & echo", "line": 3,
                 "steps": [{"keyword": "When ", "name": "I do it", "line": 4,
                            "result": {"status": "failed", "duration": 10, "error_message": "x < y"}}]}
            ]}]"#,
        )
        .unwrap();
        let stats = RunStats::calculate(&features);
        let html = render(
            &features,
            &stats,
            &HtmlOptions {
                title: "API Tests".into(),
                theme: Theme::Simple,
                metadata: vec![("Base URL".into(), "http://x".into())],
            },
        );
        assert!(html.contains("<title>API Tests</title>"));
        assert!(html.contains("Posts &lt;api&gt;"));
        assert!(html.contains("Create &amp; echo"));
        assert!(html.contains("x &lt; y"));
        assert!(html.contains("theme-simple"));
        assert!(html.contains("http://x"));
    }
}
