mod cli;
mod config;
pub(crate) mod dump;
mod error;
pub(crate) mod git;
pub(crate) mod history;
mod logging;
pub(crate) mod render;
pub(crate) mod time_utils;

pub(crate) use error::{AppError, AppResult};

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::setup_logger(cli.verbosity.tracing_level_filter(), cli.ansi());

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
