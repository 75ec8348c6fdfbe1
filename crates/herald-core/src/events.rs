//! Runner event stream: one JSON object per line, tagged by `event`.
//!
//! ```text
//! {"event":"prepare_run"}
//! {"event":"add_test","test":{"suite":"auth","title":"logs in","status":"passed"}}
//! {"event":"finish_run","params":{"status":"passed"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{RunParams, TestUpdate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunnerEvent {
    PrepareRun,
    AddTest {
        test: TestUpdate,
    },
    FinishRun {
        #[serde(default)]
        params: RunParams,
    },
}

impl RunnerEvent {
    /// Event name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PrepareRun => "prepare_run",
            Self::AddTest { .. } => "add_test",
            Self::FinishRun { .. } => "finish_run",
        }
    }

    /// Parse one line of the stream. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunStatus, TestStatus};

    #[test]
    fn parses_all_event_kinds() {
        let e = RunnerEvent::parse_line(r#"{"event":"prepare_run"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(e, RunnerEvent::PrepareRun);

        let e = RunnerEvent::parse_line(
            r#"{"event":"add_test","test":{"file":"a.spec","title":"t","status":"failed","run_time":3.7}}"#,
        )
        .unwrap()
        .unwrap();
        match e {
            RunnerEvent::AddTest { test } => {
                assert_eq!(test.suite.as_deref(), Some("a.spec"));
                assert_eq!(test.status, Some(TestStatus::Failed));
                assert_eq!(test.run_time, Some(3));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let e = RunnerEvent::parse_line(
            r#"{"event":"finish_run","params":{"status":"finished","tests":[{"title":"late"}]}}"#,
        )
        .unwrap()
        .unwrap();
        match e {
            RunnerEvent::FinishRun { params } => {
                assert_eq!(params.status, Some(RunStatus::Finished));
                assert_eq!(params.tests.len(), 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn finish_run_params_are_optional() {
        let e = RunnerEvent::parse_line(r#"{"event":"finish_run"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            e,
            RunnerEvent::FinishRun {
                params: RunParams::default()
            }
        );
        assert_eq!(e.kind(), "finish_run");
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(RunnerEvent::parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn unknown_event_is_an_error() {
        assert!(RunnerEvent::parse_line(r#"{"event":"teardown"}"#).is_err());
        assert!(RunnerEvent::parse_line("not json").is_err());
    }
}
