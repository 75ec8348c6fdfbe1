//! Folding partial test updates into one record per test identity.
//!
//! Identity is the normalized `suite + title` pair and nothing else: arrival
//! order and position never participate in matching. Conflicting non-null
//! values resolve by arrival order (the later update wins).

use crate::error::ReconcileError;
use crate::model::{TestRecord, TestUpdate};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Canonical identity key: both components trimmed and lower-cased.
///
/// The suite is length-prefixed so no character inside either component
/// can shift the boundary between them.
pub fn identity_key(suite: &str, title: &str) -> String {
    let suite = suite.trim().to_lowercase();
    format!("{}:{}{}", suite.len(), suite, title.trim().to_lowercase())
}

/// Per-pipe set of reconciled test records, iterated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    records: IndexMap<String, TestRecord>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one update, creating the record on first sighting.
    ///
    /// A missing suite is the empty suite; a missing or blank title rejects
    /// the update without touching existing records.
    pub fn merge(&mut self, update: TestUpdate) -> Result<&TestRecord, ReconcileError> {
        let title = match update.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                return Err(ReconcileError::MissingTitle {
                    suite: update.suite,
                })
            }
        };
        let suite = update
            .suite
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let key = identity_key(&suite, &title);
        let record = self
            .records
            .entry(key)
            .or_insert_with(|| TestRecord::blank(suite, title));
        apply(record, update);
        Ok(record)
    }

    /// Merge every update in order, returning the rejected ones.
    pub fn merge_all(
        &mut self,
        updates: impl IntoIterator<Item = TestUpdate>,
    ) -> Vec<ReconcileError> {
        updates
            .into_iter()
            .filter_map(|u| self.merge(u).err())
            .collect()
    }

    pub fn get(&self, suite: &str, title: &str) -> Option<&TestRecord> {
        self.records.get(&identity_key(suite, title))
    }

    /// Records in first-seen order.
    pub fn records(&self) -> impl Iterator<Item = &TestRecord> + '_ {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Overwrite only with present values. Identity fields keep their first-seen spelling.
fn apply(record: &mut TestRecord, update: TestUpdate) {
    let TestUpdate {
        status,
        run_time,
        message,
        stack,
        artifacts,
        meta,
        ..
    } = update;

    if let Some(status) = status {
        record.status = status;
    }
    if run_time.is_some() {
        record.run_time = run_time;
    }
    if message.is_some() {
        record.message = message;
    }
    if stack.is_some() {
        record.stack = stack;
    }
    for uri in artifacts {
        if !record.artifacts.contains(&uri) {
            record.artifacts.push(uri);
        }
    }
    merge_meta(&mut record.meta, meta);
}

/// Recursive merge: nulls are ignored, objects merge key by key, anything else replaces.
fn merge_meta(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match value {
            Value::Null => {}
            Value::Object(inner) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_meta(existing, inner),
                _ => {
                    let mut fresh = Map::new();
                    merge_meta(&mut fresh, inner);
                    target.insert(key, Value::Object(fresh));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;
    use serde_json::json;

    fn login() -> TestUpdate {
        TestUpdate::new("Auth", "logs in")
    }

    #[test]
    fn identity_ignores_case_and_outer_whitespace() {
        assert_eq!(
            identity_key("  Auth ", "Logs In"),
            identity_key("auth", "  logs in\t")
        );
        assert_ne!(identity_key("auth", "logs in"), identity_key("auth", "logs  in"));
        assert_ne!(identity_key("a", "bc"), identity_key("ab", "c"));
    }

    #[test]
    fn control_chars_inside_components_keep_identities_apart() {
        assert_ne!(
            identity_key("a\u{1f}b", "c"),
            identity_key("a", "b\u{1f}c")
        );
        assert_ne!(identity_key("1:a", "b"), identity_key("1", "a:b"));

        let mut r = Reconciler::new();
        r.merge(TestUpdate::new("a\u{1f}b", "c")).unwrap();
        r.merge(TestUpdate::new("a", "b\u{1f}c")).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("a", "b\u{1f}c").unwrap().suite, "a");
    }

    #[test]
    fn first_sighting_creates_record() {
        let mut r = Reconciler::new();
        let rec = r.merge(login().with_status(TestStatus::Passed)).unwrap();
        assert_eq!(rec.suite, "Auth");
        assert_eq!(rec.title, "logs in");
        assert_eq!(rec.status, TestStatus::Passed);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn later_updates_merge_in_place() {
        let mut r = Reconciler::new();
        r.merge(login().with_status(TestStatus::Failed).with_message("boom"))
            .unwrap();
        r.merge(TestUpdate::new(" auth", "LOGS IN ").with_run_time(40))
            .unwrap();

        assert_eq!(r.len(), 1);
        let rec = r.get("Auth", "logs in").unwrap();
        assert_eq!(rec.status, TestStatus::Failed);
        assert_eq!(rec.message.as_deref(), Some("boom"));
        assert_eq!(rec.run_time, Some(40));
        assert_eq!(rec.suite, "Auth", "first-seen spelling kept");
    }

    #[test]
    fn absent_fields_never_clear_known_values() {
        let mut r = Reconciler::new();
        r.merge(
            login()
                .with_status(TestStatus::Failed)
                .with_stack("at x")
                .with_meta("browser", json!("chrome")),
        )
        .unwrap();
        r.merge(login()).unwrap();

        let rec = r.get("auth", "logs in").unwrap();
        assert_eq!(rec.status, TestStatus::Failed);
        assert_eq!(rec.stack.as_deref(), Some("at x"));
        assert_eq!(rec.meta["browser"], json!("chrome"));
    }

    #[test]
    fn non_null_overwrite_is_last_write_wins() {
        let mut r = Reconciler::new();
        r.merge(login().with_status(TestStatus::Failed)).unwrap();
        r.merge(login().with_status(TestStatus::Passed)).unwrap();
        assert_eq!(r.get("auth", "logs in").unwrap().status, TestStatus::Passed);
    }

    #[test]
    fn merge_is_idempotent() {
        let update = login()
            .with_status(TestStatus::Failed)
            .with_run_time(12)
            .with_artifact("s3://a.png")
            .with_meta("retries", json!({"count": 1}));

        let mut once = Reconciler::new();
        once.merge(update.clone()).unwrap();

        let mut twice = Reconciler::new();
        twice.merge(update.clone()).unwrap();
        twice.merge(update).unwrap();

        assert_eq!(
            once.records().collect::<Vec<_>>(),
            twice.records().collect::<Vec<_>>()
        );
    }

    #[test]
    fn non_conflicting_partials_are_order_independent() {
        let a = login()
            .with_status(TestStatus::Failed)
            .with_artifact("one.png")
            .with_meta("env", json!({"os": "linux"}));
        let b = login()
            .with_run_time(300)
            .with_message("assertion failed")
            .with_artifact("two.log")
            .with_artifact("one.png")
            .with_meta("env", json!({"arch": "x64"}));

        let mut ab = Reconciler::new();
        ab.merge(a.clone()).unwrap();
        ab.merge(b.clone()).unwrap();

        let mut ba = Reconciler::new();
        ba.merge(b).unwrap();
        ba.merge(a).unwrap();

        let x = ab.get("auth", "logs in").unwrap();
        let y = ba.get("auth", "logs in").unwrap();
        assert_eq!(x.status, y.status);
        assert_eq!(x.run_time, y.run_time);
        assert_eq!(x.message, y.message);
        assert_eq!(x.meta, y.meta);

        let mut xa = x.artifacts.clone();
        let mut ya = y.artifacts.clone();
        xa.sort();
        ya.sort();
        assert_eq!(xa, ya);
        assert_eq!(xa.len(), 2);
    }

    #[test]
    fn artifacts_append_unique_in_order() {
        let mut r = Reconciler::new();
        r.merge(login().with_artifact("a").with_artifact("b")).unwrap();
        r.merge(login().with_artifact("b").with_artifact("c").with_artifact("a"))
            .unwrap();
        assert_eq!(r.get("auth", "logs in").unwrap().artifacts, vec!["a", "b", "c"]);
    }

    #[test]
    fn meta_merges_recursively_ignoring_nulls() {
        let mut r = Reconciler::new();
        r.merge(login().with_meta("ci", json!({"job": "e2e", "shard": {"index": 1}})))
            .unwrap();
        r.merge(login().with_meta("ci", json!({"job": null, "shard": {"total": 4}})))
            .unwrap();
        r.merge(login().with_meta("tag", json!(null))).unwrap();

        let meta = &r.get("auth", "logs in").unwrap().meta;
        assert_eq!(
            meta["ci"],
            json!({"job": "e2e", "shard": {"index": 1, "total": 4}})
        );
        assert!(!meta.contains_key("tag"));
    }

    #[test]
    fn missing_title_is_rejected() {
        let mut r = Reconciler::new();
        let err = r
            .merge(TestUpdate {
                suite: Some("Auth".into()),
                title: Some("   ".into()),
                ..TestUpdate::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MissingTitle {
                suite: Some("Auth".into())
            }
        );
        assert!(r.is_empty());
    }

    #[test]
    fn missing_suite_is_empty_component() {
        let mut r = Reconciler::new();
        r.merge(TestUpdate {
            title: Some("orphan".into()),
            ..TestUpdate::default()
        })
        .unwrap();
        r.merge(TestUpdate::new("", "Orphan").with_status(TestStatus::Skipped))
            .unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.get("", "orphan").unwrap().status, TestStatus::Skipped);
    }

    #[test]
    fn iteration_keeps_first_seen_order() {
        let mut r = Reconciler::new();
        let errors = r.merge_all(vec![
            TestUpdate::new("s", "c"),
            TestUpdate::new("s", "a"),
            TestUpdate::default(),
            TestUpdate::new("s", "b"),
            TestUpdate::new("S", "C").with_status(TestStatus::Passed),
        ]);
        assert_eq!(errors.len(), 1);
        let titles: Vec<_> = r.records().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }
}
