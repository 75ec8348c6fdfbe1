//! Fan-out of runner lifecycle events to the registered pipes.
//!
//! Each lifecycle call reaches every enabled pipe exactly once, in
//! registration order. Errors and panics raised by one pipe are logged and
//! never reach its siblings or the caller; the only error surfaced here is
//! lifecycle misuse ([`DispatchError`]).

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::HeraldConfig;
use crate::error::{DispatchError, PipeError};
use crate::events::RunnerEvent;
use crate::model::{RunParams, TestUpdate};
use crate::pipe::Pipe;

const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Prepared,
    Finished,
}

/// Diagnostic view of one registered pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipeInfo {
    pub name: String,
    pub enabled: bool,
}

pub struct Dispatcher {
    pipes: Vec<Box<dyn Pipe>>,
    phase: RunPhase,
    delivery_timeout: Duration,
}

impl Dispatcher {
    pub fn new(pipes: Vec<Box<dyn Pipe>>) -> Self {
        Self {
            pipes,
            phase: RunPhase::Idle,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_config(pipes: Vec<Box<dyn Pipe>>, config: &HeraldConfig) -> Self {
        Self::new(pipes).with_delivery_timeout(config.delivery_timeout())
    }

    /// Upper bound for each pipe's `finish_run`.
    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    /// Append a pipe; it runs after every pipe registered before it.
    pub fn register(&mut self, pipe: Box<dyn Pipe>) {
        self.pipes.push(pipe);
    }

    pub fn pipes(&self) -> Vec<PipeInfo> {
        self.pipes
            .iter()
            .map(|p| PipeInfo {
                name: p.name().to_string(),
                enabled: p.is_enabled(),
            })
            .collect()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub async fn handle(&mut self, event: RunnerEvent) -> Result<(), DispatchError> {
        match event {
            RunnerEvent::PrepareRun => self.prepare_run().await,
            RunnerEvent::AddTest { test } => self.add_test(test),
            RunnerEvent::FinishRun { params } => self.finish_run(&params).await,
        }
    }

    pub async fn prepare_run(&mut self) -> Result<(), DispatchError> {
        match self.phase {
            RunPhase::Idle => {}
            RunPhase::Prepared => return Err(DispatchError::AlreadyPrepared),
            RunPhase::Finished => {
                return Err(DispatchError::AlreadyFinished {
                    call: "prepare_run",
                })
            }
        }
        self.phase = RunPhase::Prepared;

        for pipe in self.pipes.iter_mut().filter(|p| p.is_enabled()) {
            let name = pipe.name().to_string();
            match AssertUnwindSafe(pipe.prepare_run()).catch_unwind().await {
                Ok(Ok(())) => debug!(pipe = %name, "prepared"),
                Ok(Err(e)) => warn!(pipe = %name, error = %e, "prepare_run failed"),
                Err(panic) => warn!(
                    pipe = %name,
                    panic = %panic_message(panic.as_ref()),
                    "prepare_run panicked"
                ),
            }
        }
        Ok(())
    }

    /// Relay one update. Allowed before `prepare_run`; runners may skip it.
    pub fn add_test(&mut self, update: TestUpdate) -> Result<(), DispatchError> {
        if self.phase == RunPhase::Finished {
            return Err(DispatchError::AlreadyFinished { call: "add_test" });
        }

        for pipe in self.pipes.iter_mut().filter(|p| p.is_enabled()) {
            let copy = update.clone();
            if let Err(panic) =
                std::panic::catch_unwind(AssertUnwindSafe(|| pipe.add_test(copy)))
            {
                warn!(
                    pipe = %pipe.name(),
                    panic = %panic_message(panic.as_ref()),
                    "add_test panicked"
                );
            }
        }
        Ok(())
    }

    /// Deliver to each pipe in turn, so a pipe sees store values written by
    /// the pipes before it.
    pub async fn finish_run(&mut self, params: &RunParams) -> Result<(), DispatchError> {
        if self.phase == RunPhase::Finished {
            return Err(DispatchError::AlreadyFinished { call: "finish_run" });
        }
        self.phase = RunPhase::Finished;

        let limit = self.delivery_timeout;
        let mut delivered = 0usize;
        let mut failed = 0usize;
        for pipe in self.pipes.iter_mut().filter(|p| p.is_enabled()) {
            let name = pipe.name().to_string();
            let call = AssertUnwindSafe(pipe.finish_run(params)).catch_unwind();
            match timeout(limit, call).await {
                Ok(Ok(Ok(()))) => {
                    delivered += 1;
                    debug!(pipe = %name, "finished");
                }
                Ok(Ok(Err(e))) => {
                    failed += 1;
                    warn!(pipe = %name, error = %e, "finish_run failed");
                }
                Ok(Err(panic)) => {
                    failed += 1;
                    warn!(
                        pipe = %name,
                        panic = %panic_message(panic.as_ref()),
                        "finish_run panicked"
                    );
                }
                Err(_) => {
                    failed += 1;
                    let e = PipeError::timeout(name.as_str(), limit);
                    warn!(pipe = %name, error = %e, "finish_run timed out");
                }
            }
        }
        info!(delivered, failed, "run finished");
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
