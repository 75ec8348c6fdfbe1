//! Slack chat notifier.
//!
//! Posts one markdown message per run via `chat.postMessage` and publishes
//! the message timestamp to the store as `slack_ts`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, info};

use super::{http_client, record_final_batch, record_update, Pipe};
use crate::config::{CiContext, HeraldConfig};
use crate::error::{PipeError, PipeResult};
use crate::model::{RunParams, TestStatus, TestUpdate};
use crate::reconcile::Reconciler;
use crate::report::summary::{derive, RunSummary};
use crate::report::text::{
    artifact_label, format_duration, full_name, run_emoji, sanitize_message, strip_ansi,
    test_emoji,
};
use crate::store::{RunStore, SharedStore};

const NAME: &str = "Slack Reporter";

/// Settings that shape the rendered message beyond the summary itself.
#[derive(Debug, Clone, Default)]
pub struct MessageContext<'a> {
    pub ci: Option<&'a CiContext>,
    pub store: RunStore,
    pub private_artifacts: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackPipe {
    enabled: bool,
    token: String,
    channel: String,
    api_url: String,
    ci: CiContext,
    private_artifacts: bool,
    timeout: Duration,
    store: SharedStore,
    tests: Reconciler,
    client: Option<reqwest::Client>,
}

impl SlackPipe {
    pub fn new(config: &HeraldConfig, store: SharedStore) -> Self {
        let (token, channel) = match (&config.slack.token, &config.slack.channel) {
            (Some(t), Some(c)) => (t.clone(), c.clone()),
            _ => (String::new(), String::new()),
        };
        let enabled = !token.is_empty() && !channel.is_empty();
        debug!(
            pipe = NAME,
            token = if token.is_empty() { "*no token*" } else { "TOKEN" },
            channel = %channel,
            enabled,
            "slack pipe constructed"
        );

        Self {
            enabled,
            token,
            channel,
            api_url: config.slack.api_url.trim_end_matches('/').to_string(),
            ci: config.ci.clone(),
            private_artifacts: config.private_artifacts,
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

    async fn post_message(&mut self, text: String) -> PipeResult<()> {
        let client = self.client()?;
        let url = format!("{}/chat.postMessage", self.api_url);
        let body = serde_json::json!({
            "channel": self.channel,
            "text": text,
            "mrkdwn": true,
        });
        debug!(pipe = NAME, url = %url, "sending message to Slack");

        let response = client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipeError::Delivery {
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

        let parsed: PostMessageResponse =
            response.json().await.map_err(|e| PipeError::Delivery {
                sink: NAME.to_string(),
                message: format!("unreadable response: {}", e),
            })?;
        if !parsed.ok {
            return Err(PipeError::Rejected {
                sink: NAME.to_string(),
                status: "ok=false".to_string(),
                message: parsed.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let ts = parsed.ts.unwrap_or_default();
        self.store.set_slack_ts(ts.clone());
        info!(pipe = NAME, channel = %self.channel, ts = %ts, "report sent to channel");
        Ok(())
    }
}

#[async_trait]
impl Pipe for SlackPipe {
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

        let text = {
            let summary = derive(self.tests.records(), params.status);
            let ctx = MessageContext {
                ci: Some(&self.ci),
                store: self.store.snapshot(),
                private_artifacts: self.private_artifacts,
            };
            render_message(&summary, &ctx)
        };
        self.post_message(text).await
    }
}

/// Slack mrkdwn body for a run.
pub fn render_message(summary: &RunSummary<'_>, ctx: &MessageContext<'_>) -> String {
    let job = ctx
        .ci
        .and_then(|c| c.job.as_deref())
        .unwrap_or("Test Run");
    let mut body = format!(
        "*{} {}*\n",
        run_emoji(summary.status),
        format!("{} {}", job, summary.status).to_uppercase()
    );

    body.push_str(&format!("*Tests:* ✔️  *{}* tests run\n", summary.total));
    body.push_str("*Summary:* ");
    if summary.failed > 0 {
        body.push_str(&format!(
            "{} *{}* failed; ",
            test_emoji(TestStatus::Failed),
            summary.failed
        ));
    }
    body.push_str(&format!(
        "{} *{}* passed; {} *{}* skipped\n",
        test_emoji(TestStatus::Passed),
        summary.passed,
        test_emoji(TestStatus::Skipped),
        summary.skipped
    ));
    body.push_str(&format!("*Duration:* 🕐  *{}*\n", summary.duration()));

    if let Some(url) = &ctx.store.run_url {
        let label = ctx
            .store
            .run_id
            .as_deref()
            .map(|id| format!("Run #{}", id))
            .unwrap_or_else(|| "Run".to_string());
        body.push_str(&format!("*Dashboard Report:* 📊 <{}|{}>\n", url, label));
    }
    if let Some(ci) = ctx.ci {
        if let Some(url) = ci.job_url() {
            body.push_str(&format!("*Job:* 🗂️  <{}|{}>\n", url, ci.job_key()));
        }
        if let Some(os) = &ci.runner_os {
            body.push_str(&format!(
                "*Operating System:* 🖥️ `{}` {}\n",
                os,
                ci.runner_arch.as_deref().unwrap_or_default()
            ));
        }
    }

    if !summary.failures.is_empty() {
        let failures: Vec<String> = summary
            .failures
            .iter()
            .map(|t| render_failure(t, ctx.private_artifacts))
            .collect();
        body.push_str(&format!(
            "\n*🟥 Failures ({})*\n{}",
            summary.failures_total(),
            failures.join("\n")
        ));
        if summary.failures_omitted > 0 {
            body.push_str(&format!(
                "\n> Notice\n> Only first {} failures shown, {} more omitted\n",
                summary.failures.len(),
                summary.failures_omitted
            ));
        }
    }

    if !summary.slowest.is_empty() {
        body.push_str("\n*🐢 Slowest Tests*\n");
        let lines: Vec<String> = summary
            .slowest
            .iter()
            .map(|t| {
                format!(
                    "• {} ({})",
                    full_name(t),
                    format_duration(t.run_time.unwrap_or(0))
                )
            })
            .collect();
        body.push_str(&lines.join("\n"));
    }

    body
}

fn render_failure(t: &crate::model::TestRecord, private_artifacts: bool) -> String {
    let mut text = format!("*{} {}*\n", test_emoji(TestStatus::Failed), full_name(t));
    if let Some(message) = t.message.as_deref().map(sanitize_message) {
        if !message.is_empty() {
            text.push_str(&format!("> {}\n", message));
        }
    }
    if let Some(stack) = t.stack.as_deref() {
        let stack = strip_ansi(stack);
        let stack = stack.trim();
        if !stack.is_empty() {
            text.push_str(&format!("```{}```\n", stack));
        }
    }
    if !private_artifacts {
        for a in &t.artifacts {
            text.push_str(&format!("<{}|{}>\n", a, artifact_label(a)));
        }
    }
    text.push_str("\n---\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;

    fn failing(i: usize) -> TestUpdate {
        TestUpdate::new("Checkout", format!("case {i}"))
            .with_status(TestStatus::Failed)
            .with_run_time(i as u64 * 10)
    }

    #[test]
    fn disabled_without_credentials() {
        let pipe = SlackPipe::new(&HeraldConfig::default(), SharedStore::new());
        assert!(!pipe.is_enabled());
        assert_eq!(pipe.name(), "Slack Reporter");
    }

    #[tokio::test]
    async fn disabled_pipe_ignores_every_call() {
        let store = SharedStore::new();
        let mut pipe = SlackPipe::new(&HeraldConfig::default(), store.clone());
        pipe.prepare_run().await.unwrap();
        pipe.add_test(failing(1));
        pipe.finish_run(&RunParams::with_status(RunStatus::Failed).with_tests(vec![failing(2)]))
            .await
            .unwrap();
        assert!(pipe.records().is_empty());
        assert!(store.slack_ts().is_none());
    }

    #[test]
    fn message_headline_and_counts() {
        let mut r = Reconciler::new();
        r.merge_all(vec![
            TestUpdate::new("Auth", "logs in")
                .with_status(TestStatus::Passed)
                .with_run_time(1_000),
            TestUpdate::new("Auth", "signs up")
                .with_status(TestStatus::Skipped),
        ]);
        let summary = derive(r.records(), Some(RunStatus::Passed));
        let ci = CiContext {
            workflow: Some("CI".into()),
            job: Some("e2e".into()),
            repository: Some("acme/web".into()),
            run_id: Some("99".into()),
            runner_os: Some("Linux".into()),
            runner_arch: Some("X64".into()),
            ..CiContext::default()
        };
        let ctx = MessageContext {
            ci: Some(&ci),
            store: RunStore {
                run_url: Some("https://dash.example/runs/7".into()),
                run_id: Some("7".into()),
                slack_ts: None,
            },
            private_artifacts: false,
        };
        let body = render_message(&summary, &ctx);

        assert!(body.starts_with("*🟢 E2E PASSED*\n"));
        assert!(body.contains("*Tests:* ✔️  *2* tests run"));
        assert!(body.contains("*Summary:* 🟢 *1* passed; 🟡 *1* skipped"));
        assert!(!body.contains("failed;"));
        assert!(body.contains("*Duration:* 🕐  *1s*"));
        assert!(body.contains("<https://dash.example/runs/7|Run #7>"));
        assert!(body.contains("<https://github.com/acme/web/actions/runs/99|CI / e2e>"));
        assert!(body.contains("*Operating System:* 🖥️ `Linux` X64"));
        assert!(body.contains("*🐢 Slowest Tests*\n• Auth › logs in (1s)"));
        assert!(!body.contains("Failures"));
    }

    #[test]
    fn failure_section_truncates_with_notice() {
        let mut r = Reconciler::new();
        r.merge_all((0..25).map(failing));
        let summary = derive(r.records(), None);
        let body = render_message(&summary, &MessageContext::default());

        assert!(body.starts_with("*🔴 TEST RUN FAILED*"));
        assert!(body.contains("*🟥 Failures (25)*"));
        assert_eq!(body.matches("\n---\n").count(), 20);
        assert!(body.contains("Only first 20 failures shown, 5 more omitted"));
        assert!(body.contains("*🔴 Checkout › case 19*"));
        assert!(!body.contains("*🔴 Checkout › case 20*"));
    }

    #[test]
    fn failure_details_are_sanitized() {
        let mut r = Reconciler::new();
        r.merge(
            TestUpdate::new("Cart", "adds item")
                .with_status(TestStatus::Failed)
                .with_message("\u{1b}[31mexpected 2\u{1b}[39m\nreceived 3")
                .with_stack("\u{1b}[90mat cart.js:12\u{1b}[39m\n")
                .with_artifact("https://cdn/run/shot.png")
                .with_artifact("https://cdn/run/trace.zip"),
        )
        .unwrap();
        let summary = derive(r.records(), None);

        let body = render_message(&summary, &MessageContext::default());
        assert!(body.contains("> expected 2received 3\n"));
        assert!(body.contains("```at cart.js:12```"));
        assert!(body.contains("<https://cdn/run/shot.png|Screenshot>"));
        assert!(body.contains("<https://cdn/run/trace.zip|trace.zip>"));

        let private = MessageContext {
            private_artifacts: true,
            ..MessageContext::default()
        };
        let body = render_message(&summary, &private);
        assert!(!body.contains("Screenshot"));
        assert!(!body.contains("trace.zip"));
    }
}
