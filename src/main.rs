use std::path::PathBuf;

use anyhow::Result;
use sugar_packager::cli::{parse_from, run, Command};
use sugar_packager::report;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match parse_from(std::env::args_os(), &cwd) {
        Ok(Command::Print(text)) => {
            print!("{text}");
            return Ok(());
        }
        Ok(Command::Run(config)) => config,
        Err(err) => std::process::exit(report::fail(&err)),
    };

    report::init_tracing(config.verbosity)?;
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    match run(config).await {
        Ok(outcome) => {
            tracing::info!(package = %outcome.package.display(), uploaded = outcome.upload.is_some(), "CLI completed successfully");
            Ok(())
        }
        Err(err) => std::process::exit(report::fail(&err)),
    }
}
