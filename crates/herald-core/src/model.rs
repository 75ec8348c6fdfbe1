use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serde helpers for loosely-typed runner payloads.
mod serde_lenient {
    use serde::{Deserialize, Deserializer};

    /// Accept integer or fractional milliseconds (fraction truncated), or null.
    pub fn deserialize_run_time<'de, D>(d: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<serde_json::Value> = Option::deserialize(d)?;
        match opt {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Number(num)) => {
                if let Some(n) = num.as_u64() {
                    return Ok(Some(n));
                }
                match num.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => Ok(Some(f.trunc() as u64)),
                    _ => Err(serde::de::Error::custom(format!(
                        "run_time must be a non-negative number, got: {num}"
                    ))),
                }
            }
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| Some(f.trunc() as u64))
                .ok_or_else(|| serde::de::Error::custom(format!("invalid run_time: {s:?}"))),
            Some(other) => Err(serde::de::Error::custom(format!(
                "run_time must be number or null, got: {other}"
            ))),
        }
    }

    /// Accept a missing/null list and drop null or empty entries.
    pub fn deserialize_artifacts<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<Vec<Option<String>>> = Option::deserialize(d)?;
        Ok(opt
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter(|a| !a.trim().is_empty())
            .collect())
    }
}

/// Status of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    /// Seen but no verdict reported yet.
    #[default]
    Pending,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall verdict of a run, as reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
    Finished,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One partial test update as emitted by the runner.
///
/// Every field is optional: runners report a test several times as more is
/// known (start, result, uploaded artifacts). `None` means "not reported in
/// this update", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestUpdate {
    /// Suite title or spec file path.
    #[serde(default, alias = "file")]
    pub suite: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub status: Option<TestStatus>,

    /// Duration in milliseconds.
    #[serde(
        default,
        deserialize_with = "serde_lenient::deserialize_run_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Artifact URIs (screenshots, logs, traces).
    #[serde(default, deserialize_with = "serde_lenient::deserialize_artifacts")]
    pub artifacts: Vec<String>,

    /// Opaque runner metadata, deep-merged across updates.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl TestUpdate {
    pub fn new(suite: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            suite: Some(suite.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_run_time(mut self, ms: u64) -> Self {
        self.run_time = Some(ms);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_artifact(mut self, uri: impl Into<String>) -> Self {
        self.artifacts.push(uri.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// The reconciled state of one test within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub suite: String,
    pub title: String,
    pub status: TestStatus,
    /// Duration in milliseconds; `None` until a runner reports it.
    pub run_time: Option<u64>,
    pub message: Option<String>,
    pub stack: Option<String>,
    /// Unique artifact URIs in first-seen order.
    pub artifacts: Vec<String>,
    pub meta: Map<String, Value>,
}

impl TestRecord {
    /// Empty record for a freshly seen identity.
    pub(crate) fn blank(suite: String, title: String) -> Self {
        Self {
            suite,
            title,
            status: TestStatus::default(),
            run_time: None,
            message: None,
            stack: None,
            artifacts: Vec::new(),
            meta: Map::new(),
        }
    }
}

/// Payload of the runner's `finish_run` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Runner verdict; derived from the records when absent.
    #[serde(default)]
    pub status: Option<RunStatus>,

    /// Final batch of updates folded in before the summary is derived.
    #[serde(default)]
    pub tests: Vec<TestUpdate>,
}

impl RunParams {
    pub fn with_status(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            tests: Vec::new(),
        }
    }

    pub fn with_tests(mut self, tests: Vec<TestUpdate>) -> Self {
        self.tests = tests;
        self
    }
}
