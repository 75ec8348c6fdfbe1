//! Cross-pipe scratch space for values one sink produces and another reads.
//!
//! Field ownership:
//!
//! | Field | Written by | Read by |
//! |-------|------------|---------|
//! | `run_url`, `run_id` | `DashboardPipe` | `SlackPipe`, `JsonReportPipe` |
//! | `slack_ts` | `SlackPipe` | `JsonReportPipe` |
//!
//! Readers only see what pipes registered earlier have written: `finish_run`
//! is dispatched one pipe at a time in registration order.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Values shared between pipes during a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStore {
    /// Link to the run on an external dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_url: Option<String>,

    /// Dashboard-side run identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Timestamp of the delivered Slack message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_ts: Option<String>,
}

/// Cloneable handle to the run's [`RunStore`]. Created empty before any pipe.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<RunStore>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> RunStore {
        self.read().clone()
    }

    pub fn run_url(&self) -> Option<String> {
        self.read().run_url.clone()
    }

    pub fn run_id(&self) -> Option<String> {
        self.read().run_id.clone()
    }

    pub fn slack_ts(&self) -> Option<String> {
        self.read().slack_ts.clone()
    }

    pub fn set_run(&self, url: Option<String>, id: Option<String>) {
        let mut g = self.write();
        if url.is_some() {
            g.run_url = url;
        }
        if id.is_some() {
            g.run_id = id;
        }
    }

    pub fn set_slack_ts(&self, ts: impl Into<String>) {
        self.write().slack_ts = Some(ts.into());
    }

    // A panicking pipe must not take the store down with it.
    fn read(&self) -> RwLockReadGuard<'_, RunStore> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunStore> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
