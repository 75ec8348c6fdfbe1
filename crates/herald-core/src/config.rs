//! Reporter configuration, built once at startup and handed to every pipe.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `HERALD_SLACK_TOKEN` | Slack bot token |
//! | `HERALD_SLACK_CHANNEL` | Slack channel id or name |
//! | `HERALD_SLACK_API_URL` | Slack Web API base (default: `https://slack.com/api`) |
//! | `HERALD_DASHBOARD_URL` | Dashboard endpoint receiving the JSON summary |
//! | `HERALD_DASHBOARD_TOKEN` | Bearer token for the dashboard |
//! | `HERALD_JUNIT_PATH` | Write a JUnit XML report here |
//! | `HERALD_JSON_PATH` | Write a JSON summary here |
//! | `HERALD_CONSOLE` | Print a summary to stderr |
//! | `HERALD_PRIVATE_ARTIFACTS` | Hide artifact links in chat messages |
//! | `HERALD_DELIVERY_TIMEOUT` | Per-sink delivery timeout in seconds (default: 30) |
//!
//! CI context is read from the GitHub Actions variables (`GITHUB_WORKFLOW`,
//! `GITHUB_JOB`, `GITHUB_SERVER_URL`, `GITHUB_REPOSITORY`, `GITHUB_RUN_ID`,
//! `RUNNER_OS`, `RUNNER_ARCH`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Slack chat notifier settings. Both token and channel are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: None,
            channel: None,
            api_url: default_slack_api_url(),
        }
    }
}

/// Dashboard webhook settings. Enabled when `url` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunitConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Read-only CI environment context. Opaque to reconciliation logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiContext {
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub runner_os: Option<String>,
    #[serde(default)]
    pub runner_arch: Option<String>,
}

impl CiContext {
    pub fn from_env() -> Self {
        Self {
            workflow: env_opt("GITHUB_WORKFLOW"),
            job: env_opt("GITHUB_JOB"),
            server_url: env_opt("GITHUB_SERVER_URL"),
            repository: env_opt("GITHUB_REPOSITORY"),
            run_id: env_opt("GITHUB_RUN_ID"),
            runner_os: env_opt("RUNNER_OS"),
            runner_arch: env_opt("RUNNER_ARCH"),
        }
    }

    /// `"<workflow> / <job>"`, used as the job link label.
    pub fn job_key(&self) -> String {
        format!(
            "{} / {}",
            self.workflow.as_deref().unwrap_or_default(),
            self.job.as_deref().unwrap_or_default()
        )
    }

    /// Link to the CI run, when a workflow is known.
    pub fn job_url(&self) -> Option<String> {
        self.workflow.as_ref()?;
        Some(format!(
            "{}/{}/actions/runs/{}",
            self.server_url
                .as_deref()
                .unwrap_or("https://github.com")
                .trim_end_matches('/'),
            self.repository.as_deref().unwrap_or_default(),
            self.run_id.as_deref().unwrap_or_default()
        ))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub junit: JunitConfig,

    #[serde(default)]
    pub json: JsonConfig,

    #[serde(default)]
    pub console: bool,

    #[serde(default)]
    pub ci: CiContext,

    /// Upper bound for one sink's `finish_run`, in seconds.
    #[serde(default = "default_timeout")]
    pub delivery_timeout_secs: u64,

    /// Hide artifact links in chat messages.
    #[serde(default)]
    pub private_artifacts: bool,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig::default(),
            dashboard: DashboardConfig::default(),
            junit: JunitConfig::default(),
            json: JsonConfig::default(),
            console: false,
            ci: CiContext::default(),
            delivery_timeout_secs: default_timeout(),
            private_artifacts: false,
        }
    }
}

impl HeraldConfig {
    /// Create config from environment variables (see module docs).
    pub fn from_env() -> Self {
        Self {
            slack: SlackConfig {
                token: env_opt("HERALD_SLACK_TOKEN"),
                channel: env_opt("HERALD_SLACK_CHANNEL"),
                api_url: env_opt("HERALD_SLACK_API_URL").unwrap_or_else(default_slack_api_url),
            },
            dashboard: DashboardConfig {
                url: env_opt("HERALD_DASHBOARD_URL"),
                token: env_opt("HERALD_DASHBOARD_TOKEN"),
            },
            junit: JunitConfig {
                path: env_opt("HERALD_JUNIT_PATH").map(PathBuf::from),
            },
            json: JsonConfig {
                path: env_opt("HERALD_JSON_PATH").map(PathBuf::from),
            },
            console: env_flag("HERALD_CONSOLE"),
            ci: CiContext::from_env(),
            delivery_timeout_secs: std::env::var("HERALD_DELIVERY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            private_artifacts: env_flag("HERALD_PRIVATE_ARTIFACTS"),
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }

    pub fn with_slack(mut self, token: impl Into<String>, channel: impl Into<String>) -> Self {
        self.slack.token = Some(token.into());
        self.slack.channel = Some(channel.into());
        self
    }

    pub fn with_slack_api_url(mut self, url: impl Into<String>) -> Self {
        self.slack.api_url = url.into();
        self
    }

    pub fn with_dashboard(mut self, url: impl Into<String>, token: Option<String>) -> Self {
        self.dashboard.url = Some(url.into());
        self.dashboard.token = token;
        self
    }

    pub fn with_junit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.junit.path = Some(path.into());
        self
    }

    pub fn with_json_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.json.path = Some(path.into());
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub fn with_ci(mut self, ci: CiContext) -> Self {
        self.ci = ci;
        self
    }

    pub fn with_delivery_timeout_secs(mut self, secs: u64) -> Self {
        self.delivery_timeout_secs = secs;
        self
    }

    pub fn with_private_artifacts(mut self, private: bool) -> Self {
        self.private_artifacts = private;
        self
    }
}
