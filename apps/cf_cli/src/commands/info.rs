// apps/cf_cli/src/commands/info.rs

//! info 命令：列出已编译的方程与状态方程

use clap::Args;

use cf_config::EosKind;
use cf_physics::equations::registry::EquationRegistry;

/// info 命令参数
#[derive(Args)]
pub struct InfoArgs {}

/// 执行 info 命令
pub fn execute(_args: InfoArgs) -> anyhow::Result<()> {
    let registry = EquationRegistry::create();

    println!("已编译的方程:");
    for entry in registry.entries() {
        println!("  {:<16} 维度 {:?}", entry.equation, entry.dimensions);
    }

    println!();
    println!("状态方程: {}", EosKind::ACCEPTED);

    Ok(())
}
