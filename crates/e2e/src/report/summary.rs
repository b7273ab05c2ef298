//! Summary JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::RunStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub base_url: String,
    #[serde(flatten)]
    pub stats: RunStats,
}

impl Summary {
    pub fn new(stats: RunStats, environment: &str, base_url: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            environment: environment.to_string(),
            base_url: base_url.to_string(),
            stats,
        }
    }
}
