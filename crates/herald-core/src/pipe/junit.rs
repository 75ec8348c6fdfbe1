use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{record_final_batch, record_update, Pipe};
use crate::config::HeraldConfig;
use crate::error::PipeResult;
use crate::model::{RunParams, TestUpdate};
use crate::reconcile::Reconciler;
use crate::report::junit::render_junit;

const NAME: &str = "JUnit Reporter";

/// Writes a JUnit XML file for CI test-report viewers.
pub struct JunitPipe {
    path: Option<PathBuf>,
    suite_name: String,
    tests: Reconciler,
}

impl JunitPipe {
    pub fn new(config: &HeraldConfig) -> Self {
        let path = config.junit.path.clone();
        debug!(pipe = NAME, path = ?path, "junit pipe constructed");
        Self {
            path,
            suite_name: config
                .ci
                .job
                .clone()
                .unwrap_or_else(|| "herald".to_string()),
            tests: Reconciler::new(),
        }
    }
}

#[async_trait]
impl Pipe for JunitPipe {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    async fn prepare_run(&mut self) -> PipeResult<()> {
        Ok(())
    }

    fn add_test(&mut self, update: TestUpdate) {
        if self.path.is_none() {
            return;
        }
        record_update(&mut self.tests, NAME, update);
    }

    async fn finish_run(&mut self, params: &RunParams) -> PipeResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        record_final_batch(&mut self.tests, NAME, params);

        let xml = render_junit(&self.suite_name, self.tests.records());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, xml).await?;
        info!(pipe = NAME, path = %path.display(), tests = self.tests.len(), "junit report written");
        Ok(())
    }
}
