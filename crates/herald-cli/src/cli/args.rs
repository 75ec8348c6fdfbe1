use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use herald_core::HeraldConfig;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Fan out test-runner events to Slack, dashboards, JUnit and JSON reports"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a runner event stream (JSON Lines) through every enabled pipe
    Run(RunArgs),
    /// List the pipes and whether the current configuration enables them
    Pipes(PipesArgs),
    Version,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Event stream file; reads stdin when omitted or "-"
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    #[command(flatten)]
    pub sinks: SinkArgs,
}

#[derive(Args, Debug)]
pub struct PipesArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub sinks: SinkArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Sink settings. Each flag overrides its `HERALD_*` environment variable.
#[derive(Args, Debug, Default)]
pub struct SinkArgs {
    #[arg(long)]
    pub slack_token: Option<String>,

    #[arg(long)]
    pub slack_channel: Option<String>,

    #[arg(long, value_name = "URL")]
    pub slack_api_url: Option<String>,

    #[arg(long, value_name = "URL")]
    pub dashboard_url: Option<String>,

    #[arg(long)]
    pub dashboard_token: Option<String>,

    #[arg(long, value_name = "FILE")]
    pub junit: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Print a summary to stderr
    #[arg(long)]
    pub console: bool,

    /// Hide artifact links in chat messages
    #[arg(long)]
    pub private_artifacts: bool,

    /// Per-sink delivery timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub delivery_timeout: Option<u64>,
}

impl SinkArgs {
    /// Apply the flags on top of an environment-derived config.
    pub fn apply(self, mut config: HeraldConfig) -> HeraldConfig {
        if let Some(token) = self.slack_token {
            config.slack.token = Some(token);
        }
        if let Some(channel) = self.slack_channel {
            config.slack.channel = Some(channel);
        }
        if let Some(url) = self.slack_api_url {
            config.slack.api_url = url;
        }
        if let Some(url) = self.dashboard_url {
            config.dashboard.url = Some(url);
        }
        if let Some(token) = self.dashboard_token {
            config.dashboard.token = Some(token);
        }
        if let Some(path) = self.junit {
            config.junit.path = Some(path);
        }
        if let Some(path) = self.json {
            config.json.path = Some(path);
        }
        if self.console {
            config.console = true;
        }
        if self.private_artifacts {
            config.private_artifacts = true;
        }
        if let Some(secs) = self.delivery_timeout {
            config.delivery_timeout_secs = secs;
        }
        config
    }

    pub fn into_config(self) -> HeraldConfig {
        self.apply(HeraldConfig::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let base = HeraldConfig::default().with_slack("env-token", "#env");
        let args = SinkArgs {
            slack_channel: Some("#flag".into()),
            junit: Some(PathBuf::from("out/junit.xml")),
            delivery_timeout: Some(5),
            ..SinkArgs::default()
        };
        let config = args.apply(base);
        assert_eq!(config.slack.token.as_deref(), Some("env-token"));
        assert_eq!(config.slack.channel.as_deref(), Some("#flag"));
        assert_eq!(config.junit.path, Some(PathBuf::from("out/junit.xml")));
        assert_eq!(config.delivery_timeout_secs, 5);
        assert!(!config.console);
    }

    #[test]
    fn parses_run_command() {
        let cli = Cli::try_parse_from([
            "herald",
            "--log-json",
            "run",
            "--events",
            "events.jsonl",
            "--console",
        ])
        .unwrap();
        assert!(cli.log_json);
        match cli.cmd {
            Command::Run(args) => {
                assert_eq!(args.events, Some(PathBuf::from("events.jsonl")));
                assert!(args.sinks.console);
            }
            _ => panic!("expected run"),
        }
    }
}
