use async_trait::async_trait;

use super::{record_final_batch, record_update, Pipe};
use crate::config::HeraldConfig;
use crate::error::PipeResult;
use crate::model::{RunParams, TestUpdate};
use crate::reconcile::Reconciler;
use crate::report::console::render_console;
use crate::report::summary::derive;

const NAME: &str = "Console Reporter";

/// Prints the run summary to stderr.
pub struct ConsolePipe {
    enabled: bool,
    tests: Reconciler,
}

impl ConsolePipe {
    pub fn new(config: &HeraldConfig) -> Self {
        Self {
            enabled: config.console,
            tests: Reconciler::new(),
        }
    }
}

#[async_trait]
impl Pipe for ConsolePipe {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn prepare_run(&mut self) -> PipeResult<()> {
        Ok(())
    }

    fn add_test(&mut self, update: TestUpdate) {
        if !self.enabled {
            return;
        }
        record_update(&mut self.tests, NAME, update);
    }

    async fn finish_run(&mut self, params: &RunParams) -> PipeResult<()> {
        if !self.enabled {
            return Ok(());
        }
        record_final_batch(&mut self.tests, NAME, params);
        let summary = derive(self.tests.records(), params.status);
        eprint!("\n{}", render_console(self.tests.records(), &summary));
        Ok(())
    }
}
