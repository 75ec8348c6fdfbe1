//! Dashboard webhook: POSTs the JSON summary document and publishes the
//! returned run link to the store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, info};

use super::{http_client, record_final_batch, record_update, Pipe};
use crate::config::{CiContext, HeraldConfig};
use crate::error::{PipeError, PipeResult};
use crate::model::{RunParams, TestUpdate};
use crate::reconcile::Reconciler;
use crate::report::json::SummaryDocument;
use crate::report::summary::derive;
use crate::store::SharedStore;

const NAME: &str = "Dashboard Reporter";

/// Optional acknowledgement body: `{"url": "...", "id": 42}`.
#[derive(Debug, Default, Deserialize)]
struct RunAck {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

impl RunAck {
    fn id_string(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub struct DashboardPipe {
    enabled: bool,
    url: String,
    token: Option<String>,
    ci: CiContext,
    timeout: Duration,
    store: SharedStore,
    tests: Reconciler,
    client: Option<reqwest::Client>,
}

impl DashboardPipe {
    pub fn new(config: &HeraldConfig, store: SharedStore) -> Self {
        let url = config.dashboard.url.clone().unwrap_or_default();
        let enabled = !url.is_empty();
        debug!(pipe = NAME, url = %url, enabled, "dashboard pipe constructed");

        Self {
            enabled,
            url,
            token: config.dashboard.token.clone(),
            ci: config.ci.clone(),
            timeout: config.delivery_timeout(),
            store,
            tests: Reconciler::new(),
            client: None,
        }
    }

    pub fn records(&self) -> &Reconciler {
        &self.tests
    }

    fn client(&mut self) -> PipeResult<reqwest::Client> {
        if let Some(c) = &self.client {
            return Ok(c.clone());
        }
        let c = http_client(self.timeout)?;
        self.client = Some(c.clone());
        Ok(c)
    }
}

#[async_trait]
impl Pipe for DashboardPipe {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn prepare_run(&mut self) -> PipeResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.client()?;
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

        let doc = {
            let summary = derive(self.tests.records(), params.status);
            SummaryDocument::build(&summary, Some(&self.ci), self.store.snapshot())
        };
        let client = self.client()?;

        let mut request = client.post(&self.url).json(&doc);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        debug!(pipe = NAME, url = %self.url, "posting run summary");
        let response = request.send().await.map_err(|e| PipeError::Delivery {
            sink: NAME.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(PipeError::Rejected {
                sink: NAME.to_string(),
                status: status.as_u16().to_string(),
                message,
            });
        }

        // An empty or non-JSON body is a valid acknowledgement without a link.
        let body = response.text().await.unwrap_or_default();
        let ack: RunAck = serde_json::from_str(&body).unwrap_or_default();
        let id = ack.id_string();
        if ack.url.is_some() || id.is_some() {
            self.store.set_run(ack.url.clone(), id.clone());
        }
        info!(
            pipe = NAME,
            run_url = ack.url.as_deref().unwrap_or("-"),
            run_id = id.as_deref().unwrap_or("-"),
            "run summary delivered"
        );
        Ok(())
    }
}
