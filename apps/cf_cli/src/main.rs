// apps/cf_cli/src/main.rs

//! Conflux 命令行界面
//!
//! 双曲守恒律求解核心的命令行驱动器。
//!
//! # 架构层级
//!
//! 本模块属于应用层，遵循以下原则：
//! - 方程与维度在此处一次性单态化分派
//! - 配置全部来自 JSON 参数文件与命令行参数

mod commands;

use clap::{Parser, Subcommand};

/// Conflux 双曲守恒律求解器命令行工具
#[derive(Parser)]
#[command(name = "cf_cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Invariant-domain preserving hyperbolic solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 显示已编译的方程与状态方程
    Info(commands::info::InfoArgs),
    /// 校验配置文件
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
