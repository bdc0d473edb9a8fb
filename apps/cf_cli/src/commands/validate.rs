// apps/cf_cli/src/commands/validate.rs

//! validate 命令：校验配置文件并回显解析结果

use std::path::PathBuf;

use clap::Args;

use cf_config::SolverConfig;
use cf_physics::equations::registry::EquationRegistry;

/// validate 命令参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径 (JSON)
    pub config: PathBuf,
}

/// 执行 validate 命令
pub fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    let config = SolverConfig::from_json_file(&args.config)?;

    let (dimension, _) = config.equation.validate()?;
    let registry = EquationRegistry::create();
    registry.resolve(&config.equation.equation, dimension)?;

    println!("配置有效: {}", args.config.display());
    println!("  方程:     {} ({}D)", config.equation.equation, dimension);
    println!("  状态方程: {}", config.hyperbolic_system.equation_of_state);
    println!("  CFL:      {}", config.hyperbolic_module.cfl_number);
    println!("  终止时间: {}", config.final_time);

    Ok(())
}
