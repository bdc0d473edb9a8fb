// crates/cf_physics/src/equations/registry.rs

//! 方程注册表
//!
//! 在程序启动处显式构造，枚举 (方程名, 支持维度) 组合；
//! 分派错误信息由此生成。不使用任何静态初始化回调。

use cf_config::{ConfigError, EquationKind};

/// 注册表条目
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    /// 方程名（与配置字符串一致）
    pub equation: &'static str,
    /// 方程种类
    pub kind: EquationKind,
    /// 支持的空间维度
    pub dimensions: &'static [usize],
}

/// 方程注册表
#[derive(Debug, Clone)]
pub struct EquationRegistry {
    entries: Vec<RegistryEntry>,
}

impl EquationRegistry {
    /// 显式构造全部已编译的方程
    pub fn create() -> Self {
        Self {
            entries: vec![
                RegistryEntry {
                    equation: "euler",
                    kind: EquationKind::Euler,
                    dimensions: &[1, 2, 3],
                },
                RegistryEntry {
                    equation: "euler aeos",
                    kind: EquationKind::EulerAeos,
                    dimensions: &[1, 2, 3],
                },
                RegistryEntry {
                    equation: "shallow water",
                    kind: EquationKind::ShallowWater,
                    dimensions: &[1, 2],
                },
                RegistryEntry {
                    equation: "navier stokes",
                    kind: EquationKind::NavierStokes,
                    dimensions: &[1, 2, 3],
                },
                RegistryEntry {
                    equation: "skeleton",
                    kind: EquationKind::Skeleton,
                    dimensions: &[1, 2, 3],
                },
            ],
        }
    }

    /// 全部条目
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// 解析 (方程名, 维度)
    pub fn resolve(&self, equation: &str, dimension: usize) -> Result<RegistryEntry, ConfigError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.equation == equation)
            .copied()
            .ok_or_else(|| ConfigError::UnknownEquation {
                name: equation.to_string(),
                accepted: EquationKind::ACCEPTED,
            })?;

        if !entry.dimensions.contains(&dimension) {
            return Err(ConfigError::DimensionOutOfRange { dimension });
        }
        Ok(entry)
    }
}
