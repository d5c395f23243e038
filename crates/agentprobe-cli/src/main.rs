//! Agentprobe CLI entry point

use agentprobe_cli::{init_tracing, list, run, Cli, CliConfig, CliResult, Commands};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match dispatch().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    init_tracing(&config);

    match cli.command {
        Commands::Run(args) => run(&config, &args).await.map(|_| ()),
        Commands::List(args) => {
            println!("{}", list(&args)?);
            Ok(())
        }
    }
}
