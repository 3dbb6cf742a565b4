use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use prload::config::{ConfigLoader, ConfigOverrides, LoadConfig, Stage};
use prload::runner::{LoadExecutor, RampSchedule, RunReporter};
use prload::scenario::ReviewWorkload;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 执行压测
    Run(RunArgs),
    /// 打印阶段计划，不发送请求
    Plan(ProfileArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// 配置文件路径，缺省时自动查找 prload.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 阶段，格式 DURATION:TARGET（如 30s:10），可重复；给出时替换配置中的全部阶段
    #[arg(short, long = "stage", value_name = "DURATION:TARGET")]
    pub stages: Vec<Stage>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// 目标服务根地址，覆盖配置文件与 PRLOAD_BASE_URL
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// 把汇总以 JSON 写入该文件
    #[arg(long, value_name = "FILE")]
    pub summary_export: Option<PathBuf>,

    /// 关闭彩色输出
    #[arg(long)]
    pub no_color: bool,
}

fn resolve_config(profile: &ProfileArgs, base_url: Option<String>) -> Result<LoadConfig> {
    let overrides = ConfigOverrides {
        base_url,
        stages: profile.stages.clone(),
    };
    ConfigLoader::resolve(profile.config.as_deref(), &overrides).context("invalid configuration")
}

pub fn plan(args: ProfileArgs) -> Result<()> {
    let config = resolve_config(&args, None)?;
    RunReporter::default().print_plan(&RampSchedule::from_config(&config));
    Ok(())
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args.profile, args.base_url.clone())?;
    let reporter = RunReporter::new(!args.no_color);

    let workload = ReviewWorkload::from_config(&config).context("failed to build HTTP client")?;
    let executor = LoadExecutor::from_config(workload, &config);
    reporter.print_header(&config, executor.schedule());

    let summary = executor.run_until(shutdown_signal()).await;
    reporter.print_summary(&summary);

    if let Some(path) = &args.summary_export {
        reporter
            .export_json(&summary, path)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}

/// Ctrl-C / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
