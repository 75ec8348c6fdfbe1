use crate::model::{TestRecord, TestStatus};
use crate::report::summary::RunSummary;
use crate::report::text::{format_duration, full_name, run_emoji, sanitize_message};

/// One line per test, then failures, slowest tests and a totals footer.
pub fn render_console<'a>(
    records: impl IntoIterator<Item = &'a TestRecord>,
    summary: &RunSummary<'_>,
) -> String {
    let mut out = String::new();
    for r in records {
        let duration = r
            .run_time
            .map(|d| format!("({})", format_duration(d)))
            .unwrap_or_default();
        let icon = match r.status {
            TestStatus::Passed => "✅",
            TestStatus::Failed => "❌",
            TestStatus::Skipped => "⏭️ ",
            TestStatus::Pending => "⏳",
        };
        out.push_str(&format!("{} {:<40} {}\n", icon, full_name(r), duration));
        if r.status == TestStatus::Failed {
            if let Some(msg) = r.message.as_deref().map(sanitize_message) {
                if !msg.is_empty() {
                    out.push_str(&format!("      → {}\n", msg));
                }
            }
        }
    }

    if summary.failures_omitted > 0 {
        out.push_str(&format!(
            "\n{} more failures not shown individually\n",
            summary.failures_omitted
        ));
    }

    if !summary.slowest.is_empty() {
        out.push_str("\nSlowest tests:\n");
        for r in &summary.slowest {
            out.push_str(&format!(
                "  • {} ({})\n",
                full_name(r),
                format_duration(r.run_time.unwrap_or(0))
            ));
        }
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out.push_str(&format!(
        "{} {}: {} passed, {} failed, {} skipped, {} pending in {}\n",
        run_emoji(summary.status),
        summary.status.as_str().to_uppercase(),
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.pending,
        summary.duration()
    ));
    out
}
