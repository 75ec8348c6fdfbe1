use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{record_final_batch, record_update, Pipe};
use crate::config::{CiContext, HeraldConfig};
use crate::error::PipeResult;
use crate::model::{RunParams, TestUpdate};
use crate::reconcile::Reconciler;
use crate::report::json::SummaryDocument;
use crate::report::summary::derive;
use crate::store::SharedStore;

const NAME: &str = "JSON Reporter";

/// Writes the summary document to disk. Registered after the network sinks
/// so the store snapshot includes their published values.
pub struct JsonReportPipe {
    path: Option<PathBuf>,
    ci: CiContext,
    store: SharedStore,
    tests: Reconciler,
}

impl JsonReportPipe {
    pub fn new(config: &HeraldConfig, store: SharedStore) -> Self {
        let path = config.json.path.clone();
        debug!(pipe = NAME, path = ?path, "json pipe constructed");
        Self {
            path,
            ci: config.ci.clone(),
            store,
            tests: Reconciler::new(),
        }
    }
}

#[async_trait]
impl Pipe for JsonReportPipe {
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

        let json = {
            let summary = derive(self.tests.records(), params.status);
            SummaryDocument::build(&summary, Some(&self.ci), self.store.snapshot())
                .to_pretty_json()?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, json).await?;
        info!(pipe = NAME, path = %path.display(), "summary written");
        Ok(())
    }
}
