//! Test-run reconciliation and pipe dispatch.
//!
//! A test runner emits a stream of lifecycle events (run start, partial test
//! updates, run finish). The [`Dispatcher`] relays each event to every
//! registered [`Pipe`]; every pipe folds the updates into its own
//! [`Reconciler`], derives a [`RunSummary`] when the run finishes, and delivers
//! a sink-specific report.
//!
//! # Quick Start
//!
//! ```no_run
//! use herald_core::{build_pipes, Dispatcher, HeraldConfig, RunnerEvent, SharedStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = HeraldConfig::default().with_console(true);
//! let store = SharedStore::new();
//! let mut dispatcher = Dispatcher::with_config(build_pipes(&config, &store), &config);
//!
//! let line = r#"{"event":"add_test","test":{"suite":"auth","title":"logs in","status":"passed","run_time":120}}"#;
//! let event: RunnerEvent = serde_json::from_str(line)?;
//! dispatcher.handle(event).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod model;
pub mod pipe;
pub mod reconcile;
pub mod report;
pub mod store;

pub use config::{
    CiContext, DashboardConfig, HeraldConfig, JsonConfig, JunitConfig, SlackConfig,
};
pub use dispatcher::{Dispatcher, PipeInfo, RunPhase};
pub use error::{DispatchError, PipeError, PipeResult, ReconcileError};
pub use events::RunnerEvent;
pub use model::{RunParams, RunStatus, TestRecord, TestStatus, TestUpdate};
pub use pipe::{build_pipes, Pipe};
pub use reconcile::{identity_key, Reconciler};
pub use report::summary::{derive, derive_with_limits, RunSummary, SummaryLimits};
pub use store::{RunStore, SharedStore};
