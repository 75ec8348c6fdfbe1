use crate::model::{TestRecord, TestStatus};
use crate::report::text::strip_ansi;
use indexmap::IndexMap;

/// Render records as a JUnit XML document, one `<testsuite>` per suite in first-seen order.
pub fn render_junit<'a>(name: &str, records: impl IntoIterator<Item = &'a TestRecord>) -> String {
    let mut suites: IndexMap<&str, Vec<&TestRecord>> = IndexMap::new();
    for r in records {
        suites.entry(r.suite.as_str()).or_default().push(r);
    }

    let all: Vec<&TestRecord> = suites.values().flatten().copied().collect();
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuites name="{}" {}>"#,
        escape(name),
        counts_attrs(&all)
    ));
    xml.push('\n');

    for (suite, tests) in &suites {
        xml.push_str(&format!(
            r#"  <testsuite name="{}" {}>"#,
            escape(suite),
            counts_attrs(tests)
        ));
        xml.push('\n');
        for r in tests {
            push_testcase(&mut xml, r);
        }
        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

fn push_testcase(xml: &mut String, r: &TestRecord) {
    xml.push_str(&format!(
        r#"    <testcase name="{}" classname="{}" time="{}">"#,
        escape(&r.title),
        escape(&r.suite),
        seconds(r.run_time.unwrap_or(0))
    ));
    match r.status {
        TestStatus::Passed => {}
        TestStatus::Failed => {
            let message = r.message.as_deref().map(strip_ansi).unwrap_or_default();
            match r.stack.as_deref() {
                Some(stack) => xml.push_str(&format!(
                    r#"<failure message="{}">{}</failure>"#,
                    escape(message.trim()),
                    escape(strip_ansi(stack).trim())
                )),
                None => xml.push_str(&format!(
                    r#"<failure message="{}"/>"#,
                    escape(message.trim())
                )),
            }
        }
        TestStatus::Skipped | TestStatus::Pending => xml.push_str("<skipped/>"),
    }
    if !r.artifacts.is_empty() {
        xml.push_str("<system-out>");
        for a in &r.artifacts {
            xml.push_str(&format!("[[ATTACHMENT|{}]]\n", escape(a)));
        }
        xml.push_str("</system-out>");
    }
    xml.push_str("</testcase>\n");
}

fn counts_attrs(tests: &[&TestRecord]) -> String {
    let failures = tests
        .iter()
        .filter(|r| r.status == TestStatus::Failed)
        .count();
    let skipped = tests
        .iter()
        .filter(|r| matches!(r.status, TestStatus::Skipped | TestStatus::Pending))
        .count();
    let time: u64 = tests.iter().map(|r| r.run_time.unwrap_or(0)).sum();
    format!(
        r#"tests="{}" failures="{}" skipped="{}" time="{}""#,
        tests.len(),
        failures,
        skipped,
        seconds(time)
    )
}

fn seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestUpdate;
    use crate::reconcile::Reconciler;

    #[test]
    fn test_junit_groups_by_suite() {
        let mut r = Reconciler::new();
        r.merge_all(vec![
            TestUpdate::new("Auth", "logs in")
                .with_status(TestStatus::Passed)
                .with_run_time(1250),
            TestUpdate::new("Cart", "adds <item>")
                .with_status(TestStatus::Failed)
                .with_message("\u{1b}[31mexpected \"1\"\u{1b}[39m")
                .with_stack("at cart.js:3")
                .with_artifact("https://cdn/shot.png"),
            TestUpdate::new("Auth", "logs out").with_status(TestStatus::Skipped),
        ]);

        let xml = render_junit("e2e", r.records());
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<testsuites name="e2e" tests="3" failures="1" skipped="1" time="1.250">"#
        ));
        assert!(xml.contains(r#"<testsuite name="Auth" tests="2" failures="0" skipped="1""#));
        assert!(xml.contains(r#"name="adds &lt;item&gt;""#));
        assert!(xml.contains(
            r#"<failure message="expected &quot;1&quot;">at cart.js:3</failure>"#
        ));
        assert!(xml.contains("[[ATTACHMENT|https://cdn/shot.png]]"));
        assert!(xml.find("Auth").unwrap() < xml.find("Cart").unwrap());
    }

    #[test]
    fn test_seconds_formatting() {
        assert_eq!(seconds(0), "0.000");
        assert_eq!(seconds(61_005), "61.005");
    }
}
