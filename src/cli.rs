use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chainpost::chain::Workspace;
use chainpost::extraction::MissPolicy;
use chainpost::history::{list_history, record_run};
use chainpost::http::Client;
use chainpost::runner::{ChainRunner, TestReporter};
use chainpost::variable::{ChainpostConfig, ConfigLoader, Environment};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about = "Run chained API tests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 运行工作区中的一条测试链
    Run(RunArgs),

    /// 列出工作区中的测试链
    List {
        /// 工作区 JSON 文件
        workspace: PathBuf,
    },

    /// 查看最近的运行记录
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// 工作区 JSON 文件
    pub workspace: PathBuf,

    /// 测试链 id 或名称
    #[arg(short, long)]
    pub chain: String,

    /// 环境 id 或名称（工作区优先，其次 chainpost.toml）
    #[arg(short, long)]
    pub env: Option<String>,

    /// 覆盖变量，格式 key=value，可重复
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// 显示完整响应和提取结果
    #[arg(short, long)]
    pub verbose: bool,

    /// 不写入运行历史
    #[arg(long)]
    pub no_history: bool,

    /// 提取未命中时让步骤失败
    #[arg(long)]
    pub fail_on_miss: bool,
}

/// 运行测试链，返回链是否完全通过
pub async fn run(args: RunArgs) -> Result<bool> {
    let config = ConfigLoader::find_and_load()?.unwrap_or_default();
    let workspace = Workspace::load(&args.workspace)
        .with_context(|| format!("Failed to load workspace {}", args.workspace.display()))?;

    let mut chain = workspace.find_chain(&args.chain)?.clone();
    for raw in &args.vars {
        let Some((key, value)) = ConfigLoader::parse_cli_var(raw) else {
            bail!("Invalid --var '{}', expected KEY=VALUE", raw);
        };
        chain.variables.insert(key, value);
    }

    let environment = match &args.env {
        Some(name) => Some(resolve_environment(&workspace, &config, name)?),
        None => None,
    };

    let miss_policy = if args.fail_on_miss {
        MissPolicy::Fail
    } else {
        config.run.extraction_miss
    };
    debug!("Extraction miss policy: {:?}", miss_policy);

    let client = Client::with_timeout(config.client.timeout())?;
    let runner = ChainRunner::new(Arc::new(client)).with_miss_policy(miss_policy);

    let reporter = TestReporter::new(args.verbose);
    reporter.print_header(
        &chain.name,
        environment.as_ref().map(|e| e.name.as_str()),
        chain.steps.len(),
    );

    let catalog = workspace.request_catalog();
    let result = runner.run(&chain, &catalog, environment.as_ref()).await?;

    reporter.print_run(&result);

    if config.run.history && !args.no_history {
        record_run(&result);
    }

    Ok(result.all_passed())
}

fn resolve_environment(workspace: &Workspace, config: &ChainpostConfig, name: &str) -> Result<Environment> {
    if let Some(env) = workspace.find_environment(name) {
        return Ok(env.clone());
    }
    config
        .environment(name)
        .with_context(|| format!("Environment '{}' not found in workspace or chainpost.toml", name))
}

/// 列出测试链及其步骤
pub fn list(workspace: PathBuf) -> Result<()> {
    let workspace = Workspace::load(&workspace)?;
    let catalog = workspace.request_catalog();

    if workspace.chains.is_empty() {
        println!("No chains defined.");
        return Ok(());
    }

    for chain in &workspace.chains {
        println!("{} {}", chain.id.bold(), chain.name.dimmed());
        for (index, step) in chain.steps.iter().enumerate() {
            let target = match catalog.get(&step.request_id) {
                Some(request) => format!("{} {}", request.method.to_string().cyan(), request.url),
                None => format!("{} {}", "missing request".red(), step.request_id),
            };
            println!(
                "  {}. {} [{}] {}",
                index + 1,
                step.name,
                step.condition.as_str(),
                target
            );
        }
        println!();
    }

    Ok(())
}

pub fn history(limit: usize) -> Result<()> {
    list_history(limit)?;
    Ok(())
}
