use std::path::Path;

use anyhow::Context;
use herald_core::{build_pipes, Dispatcher, RunParams, RunPhase, RunnerEvent, SharedStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::args::RunArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let config = args.sinks.into_config();
    let store = SharedStore::new();
    let mut dispatcher = Dispatcher::with_config(build_pipes(&config, &store), &config);

    let enabled: Vec<String> = dispatcher
        .pipes()
        .into_iter()
        .filter(|p| p.enabled)
        .map(|p| p.name)
        .collect();
    if enabled.is_empty() {
        warn!("no pipes enabled; events will be consumed without reporting");
    } else {
        info!(pipes = %enabled.join(", "), "dispatching run");
    }

    let mut lines = open_events(args.events.as_deref()).await?.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read event stream")?
    {
        line_no += 1;
        let Some(event) = RunnerEvent::parse_line(&line)
            .with_context(|| format!("malformed event on line {line_no}"))?
        else {
            continue;
        };
        debug!(line = line_no, event = event.kind(), "event received");
        dispatcher
            .handle(event)
            .await
            .with_context(|| format!("unexpected event on line {line_no}"))?;
    }

    if dispatcher.phase() != RunPhase::Finished {
        warn!("event stream ended without finish_run; finishing with derived status");
        dispatcher.finish_run(&RunParams::default()).await?;
    }
    Ok(EXIT_SUCCESS)
}

async fn open_events(path: Option<&Path>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) if p.as_os_str() == "-" => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("failed to open event stream {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}
