mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 初始化日志系统
    chainpost::logger::init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            if !cli::run(args).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List { workspace } => cli::list(workspace)?,
        Commands::History { limit } => cli::history(limit)?,
    }
    Ok(ExitCode::SUCCESS)
}
