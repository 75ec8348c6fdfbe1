//! Run summary derived from the reconciled record set.
//!
//! Derivation is pure: the summary borrows the records and is recomputed for
//! every report, never stored or mutated on its own.

use crate::model::{RunStatus, TestRecord, TestStatus};
use crate::report::text::format_duration;
use serde::Serialize;

/// Failures listed in a report before the rest are summarized as omitted.
pub const MAX_FAILURES: usize = 20;

/// Entries in the slowest-tests list.
pub const MAX_SLOWEST: usize = 5;

/// Caps for the ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub failures: usize,
    pub slowest: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            failures: MAX_FAILURES,
            slowest: MAX_SLOWEST,
        }
    }
}

/// Aggregate view of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    /// Runner verdict, or derived from the counts when the runner gave none.
    pub status: RunStatus,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Seen but never given a verdict.
    pub pending: usize,

    /// Sum of known durations; unknown durations count as zero.
    pub duration_ms: u64,

    /// Failed records in encounter order, capped.
    pub failures: Vec<&'a TestRecord>,

    /// Failed records left out of `failures`.
    pub failures_omitted: usize,

    /// Records with a known duration, slowest first, capped.
    pub slowest: Vec<&'a TestRecord>,
}

impl RunSummary<'_> {
    /// Rendered total duration, e.g. `"1h 2m 3s"`.
    pub fn duration(&self) -> String {
        format_duration(self.duration_ms)
    }

    /// Failed count including the omitted tail.
    pub fn failures_total(&self) -> usize {
        self.failures.len() + self.failures_omitted
    }
}

/// Derive with the default caps (20 failures, 5 slowest).
pub fn derive<'a, I>(records: I, status: Option<RunStatus>) -> RunSummary<'a>
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    derive_with_limits(records, status, SummaryLimits::default())
}

pub fn derive_with_limits<'a, I>(
    records: I,
    status: Option<RunStatus>,
    limits: SummaryLimits,
) -> RunSummary<'a>
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    let records: Vec<&'a TestRecord> = records.into_iter().collect();

    let count = |s: TestStatus| records.iter().filter(|r| r.status == s).count();
    let passed = count(TestStatus::Passed);
    let failed = count(TestStatus::Failed);
    let skipped = count(TestStatus::Skipped);
    let pending = count(TestStatus::Pending);

    let duration_ms = records
        .iter()
        .map(|r| r.run_time.unwrap_or(0))
        .fold(0u64, u64::saturating_add);

    let failures: Vec<&TestRecord> = records
        .iter()
        .copied()
        .filter(|r| r.status == TestStatus::Failed)
        .take(limits.failures)
        .collect();
    let failures_omitted = failed - failures.len();

    // Stable sort: ties keep encounter order.
    let mut slowest: Vec<&TestRecord> = records
        .iter()
        .copied()
        .filter(|r| r.run_time.is_some())
        .collect();
    slowest.sort_by(|a, b| b.run_time.cmp(&a.run_time));
    slowest.truncate(limits.slowest);

    let status = status.unwrap_or(if failed > 0 {
        RunStatus::Failed
    } else {
        RunStatus::Passed
    });

    RunSummary {
        status,
        total: records.len(),
        passed,
        failed,
        skipped,
        pending,
        duration_ms,
        failures,
        failures_omitted,
        slowest,
    }
}
