//! Machine-readable summary document (`summary.json`, dashboard payload).

use crate::config::CiContext;
use crate::model::{RunStatus, TestStatus};
use crate::report::summary::RunSummary;
use crate::report::text::{format_duration, full_name};
use crate::store::RunStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for the summary document.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDocument {
    /// Schema version for compatibility detection
    pub schema_version: u32,

    pub generated_at: DateTime<Utc>,

    pub status: RunStatus,

    pub results: ResultsSection,

    /// Total of known test durations in milliseconds
    pub duration_ms: u64,

    /// Rendered form of `duration_ms`
    pub duration: String,

    pub failures: Vec<FailureEntry>,

    /// Failures left out of `failures` (list is capped)
    #[serde(default)]
    pub failures_omitted: usize,

    pub slowest: Vec<SlowestEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<CiContext>,

    /// Values other pipes published during this run
    #[serde(default)]
    pub store: RunStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsSection {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub name: String,
    pub suite: String,
    pub title: String,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowestEntry {
    pub name: String,
    pub duration_ms: u64,
    pub duration: String,
}

impl SummaryDocument {
    pub fn build(summary: &RunSummary<'_>, ci: Option<&CiContext>, store: RunStore) -> Self {
        let failures = summary
            .failures
            .iter()
            .map(|r| FailureEntry {
                name: full_name(r),
                suite: r.suite.clone(),
                title: r.title.clone(),
                status: r.status,
                run_time: r.run_time,
                message: r.message.clone(),
                stack: r.stack.clone(),
                artifacts: r.artifacts.clone(),
            })
            .collect();

        let slowest = summary
            .slowest
            .iter()
            .map(|r| {
                let ms = r.run_time.unwrap_or(0);
                SlowestEntry {
                    name: full_name(r),
                    duration_ms: ms,
                    duration: format_duration(ms),
                }
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            status: summary.status,
            results: ResultsSection {
                total: summary.total,
                passed: summary.passed,
                failed: summary.failed,
                skipped: summary.skipped,
                pending: summary.pending,
            },
            duration_ms: summary.duration_ms,
            duration: summary.duration(),
            failures,
            failures_omitted: summary.failures_omitted,
            slowest,
            ci: ci.filter(|c| **c != CiContext::default()).cloned(),
            store,
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestUpdate;
    use crate::reconcile::Reconciler;
    use crate::report::summary::derive;

    #[test]
    fn test_document_serialization() {
        let mut r = Reconciler::new();
        r.merge(
            TestUpdate::new("Auth", "logs in")
                .with_status(TestStatus::Failed)
                .with_run_time(1500)
                .with_message("expected 200"),
        )
        .unwrap();
        r.merge(TestUpdate::new("Auth", "logs out").with_status(TestStatus::Passed))
            .unwrap();

        let summary = derive(r.records(), None);
        let store = RunStore {
            run_url: Some("https://dash/r/1".into()),
            ..RunStore::default()
        };
        let doc = SummaryDocument::build(&summary, Some(&CiContext::default()), store);
        let v = serde_json::to_value(&doc).unwrap();

        assert_eq!(v["schema_version"], 1);
        assert_eq!(v["status"], "failed");
        assert_eq!(v["results"]["total"], 2);
        assert_eq!(v["results"]["failed"], 1);
        assert_eq!(v["duration"], "1s");
        assert_eq!(v["failures"][0]["name"], "Auth › logs in");
        assert_eq!(v["failures"][0]["message"], "expected 200");
        assert!(v["failures"][0].get("stack").is_none());
        assert_eq!(v["slowest"][0]["duration_ms"], 1500);
        assert!(v.get("ci").is_none(), "empty CI context is omitted");
        assert_eq!(v["store"]["run_url"], "https://dash/r/1");
    }

    #[test]
    fn test_document_round_trips() {
        let summary = derive(std::iter::empty(), Some(RunStatus::Finished));
        let doc = SummaryDocument::build(&summary, None, RunStore::default());
        let json = doc.to_pretty_json().unwrap();
        let back: SummaryDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, RunStatus::Finished);
        assert_eq!(back.results.total, 0);
    }
}
