use herald_core::{build_pipes, Dispatcher, SharedStore};

use crate::cli::args::{OutputFormat, PipesArgs};
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: PipesArgs) -> anyhow::Result<i32> {
    let config = args.sinks.into_config();
    let dispatcher = Dispatcher::new(build_pipes(&config, &SharedStore::new()));
    let pipes = dispatcher.pipes();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pipes)?),
        OutputFormat::Text => {
            for p in &pipes {
                let state = if p.enabled { "enabled" } else { "disabled" };
                println!("{:<20} {}", p.name, state);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
