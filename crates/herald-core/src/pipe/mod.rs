//! Reporting sinks ("pipes") and their shared lifecycle contract.
//!
//! Every pipe is constructed from the [`HeraldConfig`] and the run's
//! [`SharedStore`]. A pipe whose required settings are absent is disabled at
//! construction and stays inert: all lifecycle calls return immediately.
//!
//! | Pipe | Enabled by | Store |
//! |------|------------|-------|
//! | [`DashboardPipe`] | `dashboard.url` | writes `run_url`, `run_id` |
//! | [`SlackPipe`] | `slack.token` + `slack.channel` | reads `run_url`, writes `slack_ts` |
//! | [`JunitPipe`] | `junit.path` | - |
//! | [`JsonReportPipe`] | `json.path` | reads all |
//! | [`ConsolePipe`] | `console` | - |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::warn;

use crate::config::HeraldConfig;
use crate::error::{PipeError, PipeResult};
use crate::model::{RunParams, TestUpdate};
use crate::reconcile::Reconciler;
use crate::store::SharedStore;

pub mod console;
pub mod dashboard;
pub mod json;
pub mod junit;
pub mod slack;

pub use console::ConsolePipe;
pub use dashboard::DashboardPipe;
pub use json::JsonReportPipe;
pub use junit::JunitPipe;
pub use slack::SlackPipe;

const USER_AGENT_VALUE: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// A reporting sink driven through `prepare_run → add_test* → finish_run`.
///
/// Implementations keep a private [`Reconciler`]; nothing mutable is shared
/// between pipes except the [`SharedStore`]. Errors returned here are logged
/// by the dispatcher and never reach sibling pipes.
#[async_trait]
pub trait Pipe: Send {
    /// Human-readable sink name for diagnostics.
    fn name(&self) -> &str;

    /// Fixed at construction.
    fn is_enabled(&self) -> bool;

    /// Optional setup such as acquiring a client handle.
    async fn prepare_run(&mut self) -> PipeResult<()>;

    /// Fold one partial update into this pipe's records.
    fn add_test(&mut self, update: TestUpdate);

    /// Fold the final batch, derive the summary and deliver the report.
    async fn finish_run(&mut self, params: &RunParams) -> PipeResult<()>;
}

/// All known pipes in dispatch order. Disabled ones are included so
/// diagnostics can list them.
///
/// The dashboard runs before Slack so its run link is in the store when
/// the chat message is rendered.
pub fn build_pipes(config: &HeraldConfig, store: &SharedStore) -> Vec<Box<dyn Pipe>> {
    vec![
        Box::new(DashboardPipe::new(config, store.clone())),
        Box::new(SlackPipe::new(config, store.clone())),
        Box::new(JunitPipe::new(config)),
        Box::new(JsonReportPipe::new(config, store.clone())),
        Box::new(ConsolePipe::new(config)),
    ]
}

/// Merge one update, logging and dropping it when it has no identity.
pub(crate) fn record_update(tests: &mut Reconciler, sink: &str, update: TestUpdate) {
    if let Err(e) = tests.merge(update) {
        warn!(pipe = %sink, error = %e, "dropping test update");
    }
}

/// Fold the optional final batch from `finish_run`.
pub(crate) fn record_final_batch(tests: &mut Reconciler, sink: &str, params: &RunParams) {
    for update in &params.tests {
        record_update(tests, sink, update.clone());
    }
}

pub(crate) fn http_client(timeout: Duration) -> PipeResult<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()
        .map_err(|e| PipeError::Config {
            message: format!("failed to create HTTP client: {}", e),
        })
}
