//! faultline binary entrypoint.

use std::io;

use clap::Parser;
use faultline::cli::{Cli, Commands};
use faultline::{commands, init_logging, LogConfig, ServiceConfig};
use faultline_alerts::Transports;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Ingest { config, input } => {
            let config = match config {
                Some(path) => ServiceConfig::from_file(path)?,
                None => ServiceConfig::default(),
            };
            init_logging(&config.log)?;
            commands::ingest(&config, Transports::standard(), &input, &mut stdout).await?;
        }

        Commands::CheckConfig { config } => {
            init_logging(&LogConfig::default())?;
            commands::check_config(&config, &mut stdout)?;
        }

        Commands::Fingerprint {
            error_type,
            message,
            endpoint,
            stack_trace_file,
        } => {
            commands::print_fingerprint(
                error_type,
                &message,
                endpoint.as_deref(),
                stack_trace_file.as_deref(),
                &mut stdout,
            )?;
        }
    }

    Ok(())
}
