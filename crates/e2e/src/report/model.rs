//! The cucumber JSON log, as much of it as the reports read

use std::path::Path;

use plumbline_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Step or hook status. Parsed case-insensitively; anything unknown is
/// kept as [`StepStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Undefined,
    Pending,
    Ambiguous,
    Unknown,
}

impl From<String> for StepStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "passed" => StepStatus::Passed,
            "failed" => StepStatus::Failed,
            "skipped" => StepStatus::Skipped,
            "undefined" => StepStatus::Undefined,
            "pending" => StepStatus::Pending,
            "ambiguous" => StepStatus::Ambiguous,
            _ => StepStatus::Unknown,
        }
    }
}

impl From<StepStatus> for String {
    fn from(s: StepStatus) -> Self {
        s.as_str().to_string()
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Undefined => "undefined",
            StepStatus::Pending => "pending",
            StepStatus::Ambiguous => "ambiguous",
            StepStatus::Unknown => "unknown",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::Ambiguous)
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            StepStatus::Skipped | StepStatus::Undefined | StepStatus::Pending
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: StepStatus,
    /// Nanoseconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub result: Option<RunResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub result: RunResult,
}

/// One scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub before: Vec<Hook>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub after: Vec<Hook>,
}

impl Element {
    /// Results of hooks and steps in execution order
    pub fn results(&self) -> impl Iterator<Item = &RunResult> {
        self.before
            .iter()
            .map(|h| &h.result)
            .chain(self.steps.iter().filter_map(|s| s.result.as_ref()))
            .chain(self.after.iter().map(|h| &h.result))
    }

    /// Total of step and hook durations, in nanoseconds
    pub fn duration_ns(&self) -> u64 {
        self.results().map(|r| r.duration).sum()
    }

    /// First error message recorded for the scenario
    pub fn first_error(&self) -> Option<&str> {
        self.results().find_map(|r| r.error_message.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Parse a JSON log. Retried scenarios appear once, with the last attempt.
pub fn parse(json: &str) -> Result<Vec<Feature>> {
    let mut features: Vec<Feature> = serde_json::from_str(json)?;
    for feature in &mut features {
        let mut kept: Vec<Element> = Vec::with_capacity(feature.elements.len());
        for element in feature.elements.drain(..) {
            match kept
                .iter_mut()
                .find(|e| e.id == element.id && e.line == element.line)
            {
                Some(existing) => *existing = element,
                None => kept.push(element),
            }
        }
        feature.elements = kept;
    }
    Ok(features)
}

/// Read and parse a JSON log from disk.
pub fn load(path: &Path) -> Result<Vec<Feature>> {
    if !path.exists() {
        return Err(Error::Report(format!(
            "JSON report not found: {}",
            path.display()
        )));
    }
    parse(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"[
      {
        "uri": "features/posts.feature",
        "name": "Posts",
        "tags": [{"name": "@posts", "line": 1}],
        "elements": [
          {
            "id": "posts;get-a-post",
            "keyword": "Scenario",
            "name": "Get a post",
            "line": 5,
            "steps": [
              {"keyword": "When ", "name": "I get post with id 1", "line": 6,
               "result": {"status": "passed", "duration": 1500000}},
              {"keyword": "Then ", "name": "the response status should be 200", "line": 7,
               "result": {"status": "Failed", "duration": 500000, "error_message": "boom"}}
            ]
          },
          {
            "id": "posts;get-a-post",
            "name": "Get a post",
            "line": 5,
            "steps": [
              {"name": "I get post with id 1", "result": {"status": "passed", "duration": 10}}
            ]
          }
        ]
      }
    ]"#;

    #[test]
    fn test_parse_keeps_last_retry() {
        let features = parse(LOG).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].elements.len(), 1);
        assert_eq!(features[0].elements[0].steps.len(), 1);
    }

    #[test]
    fn test_status_is_case_insensitive() {
        let features: Vec<Feature> = serde_json::from_str(LOG).unwrap();
        let element = &features[0].elements[0];
        assert_eq!(
            element.steps[1].result.as_ref().unwrap().status,
            StepStatus::Failed
        );
        assert_eq!(element.duration_ns(), 2_000_000);
        assert_eq!(element.first_error(), Some("boom"));
    }

    #[test]
    fn test_unknown_status() {
        let result: RunResult = serde_json::from_str(r#"{"status": "weird"}"#).unwrap();
        assert_eq!(result.status, StepStatus::Unknown);
        assert_eq!(result.duration, 0);
    }

    #[test]
    fn test_missing_file_is_report_error() {
        let err = load(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(matches!(err, Error::Report(_)));
    }
}
