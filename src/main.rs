mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    prload::logger::init_logger();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run(args)) => cli::run(args).await?,
        Some(Commands::Plan(args)) => cli::plan(args)?,
        None => cli::run(RunArgs::default()).await?,
    }
    Ok(())
}
