//! Rendering helpers shared by the report formats.

use crate::model::{RunStatus, TestRecord, TestStatus};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

/// Separator between suite and title in rendered test names.
pub const NAME_SEPARATOR: &str = " › ";

lazy_static! {
    /// ANSI CSI/OSC escape sequences (colors, cursor movement, hyperlinks).
    static ref ANSI: Regex = Regex::new(
        r"[\x1B\x{9B}][\[\]()#;?]*(?:(?:(?:[a-zA-Z\d]*(?:;[-a-zA-Z\d/#&.:=?%@~_]*)*)?\x07)|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PR-TZcf-ntqry=><~]))"
    )
    .unwrap();
}

/// Human-readable duration truncated to whole seconds; under a second is `"0s"`.
pub fn format_duration(ms: u64) -> String {
    humantime::format_duration(Duration::from_secs(ms / 1000)).to_string()
}

/// `"suite › title"`, or the bare title for suite-less tests.
pub fn full_name(record: &TestRecord) -> String {
    if record.suite.is_empty() {
        record.title.clone()
    } else {
        format!("{}{}{}", record.suite, NAME_SEPARATOR, record.title)
    }
}

pub fn test_emoji(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "🟢",
        TestStatus::Failed => "🔴",
        TestStatus::Skipped => "🟡",
        TestStatus::Pending => "⚪",
    }
}

pub fn run_emoji(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Passed => "🟢",
        RunStatus::Failed => "🔴",
        RunStatus::Finished => "🏁",
    }
}

pub fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// Single-line, printable-ASCII form of a failure message.
pub fn sanitize_message(s: &str) -> String {
    strip_ansi(s)
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Link label for an artifact URI.
pub fn artifact_label(uri: &str) -> String {
    if uri.ends_with(".png") {
        return "Screenshot".to_string();
    }
    let path = uri.split(|c: char| c == '?' || c == '#').next().unwrap_or(uri);
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(uri)
        .to_string()
}
