// crates/cf_config/src/solver_config.rs

//! SolverConfig - 双曲求解核心配置（全 f64）
//!
//! 按参数文件小节组织：
//! - `[hyperbolic system]`: 状态方程选择与真空松弛参数
//! - `[eos]`: 各状态方程的物理常数
//! - `[hyperbolic module]`: 指示器 / 限制器 / 黎曼求解器 / CFL / 违例策略
//! - `[initial values]`: 初始状态描述（由上层驱动器消费）
//! - `[equation]`: 方程与维度分派
//!
//! 字符串字段（状态方程名、方程名、指示器名）在 `validate()` 中解析为
//! 枚举，未知名称为致命配置错误。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// ============================================================
// 状态方程
// ============================================================

/// 状态方程种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EosKind {
    /// 多方气体 p = (γ-1) ρ e
    PolytropicGas,
    /// 范德瓦尔斯气体（允许负压）
    VanDerWaals,
    /// Noble-Abel 刚性气体
    NobleAbelStiffenedGas,
    /// 表格插值
    Tabulated,
}

impl EosKind {
    /// 可接受的名称集合（用于错误信息）
    pub const ACCEPTED: &'static str =
        "polytropic gas, van der waals, noble abel stiffened gas, tabulated";

    /// 从参数文件名称解析
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "polytropic gas" => Ok(Self::PolytropicGas),
            "van der waals" => Ok(Self::VanDerWaals),
            "noble abel stiffened gas" => Ok(Self::NobleAbelStiffenedGas),
            "tabulated" => Ok(Self::Tabulated),
            _ => Err(ConfigError::UnknownEquationOfState {
                name: name.to_string(),
                accepted: Self::ACCEPTED,
            }),
        }
    }
}

/// 状态方程物理常数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EosConfig {
    /// 比热比 γ
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// 范德瓦尔斯分子间引力常数 a
    #[serde(default)]
    pub vdw_a: f64,

    /// 共容积常数 b（NASG / vdW）
    #[serde(default)]
    pub covolume_b: f64,

    /// 比气体常数 R [J/(kg·K)]
    #[serde(default = "default_gas_constant")]
    pub gas_constant_r: f64,

    /// NASG 参考压力 p∞
    #[serde(default)]
    pub pinf: f64,

    /// NASG 参考比内能 q
    #[serde(default)]
    pub q: f64,
}

fn default_gamma() -> f64 {
    7.0 / 5.0
}
fn default_gas_constant() -> f64 {
    0.4
}

impl Default for EosConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            vdw_a: 0.0,
            covolume_b: 0.0,
            gas_constant_r: default_gas_constant(),
            pinf: 0.0,
            q: 0.0,
        }
    }
}

impl EosConfig {
    /// 校验物理常数
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gamma <= 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "gamma",
                message: format!("比热比必须大于 1，实际 {}", self.gamma),
            });
        }
        if self.covolume_b < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "covolume_b",
                message: format!("共容积必须非负，实际 {}", self.covolume_b),
            });
        }
        Ok(())
    }
}

// ============================================================
// 双曲系统
// ============================================================

/// 双曲系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperbolicSystemConfig {
    /// 状态方程名称
    #[serde(default = "default_eos_name")]
    pub equation_of_state: String,

    /// 参考密度（真空过滤基准）
    #[serde(default = "default_reference_density")]
    pub reference_density: f64,

    /// 真空状态松弛参数（小）
    #[serde(default = "default_vacuum_small")]
    pub vacuum_state_relaxation_small: f64,

    /// 真空状态松弛参数（大）
    #[serde(default = "default_vacuum_large")]
    pub vacuum_state_relaxation_large: f64,

    /// 是否计算严格界（更昂贵的波速估计与熵下界）
    #[serde(default = "default_true")]
    pub compute_strict_bounds: bool,

    /// 状态方程常数
    #[serde(default)]
    pub eos: EosConfig,
}

fn default_eos_name() -> String {
    "polytropic gas".to_string()
}
fn default_reference_density() -> f64 {
    1.0
}
fn default_vacuum_small() -> f64 {
    1.0e2
}
fn default_vacuum_large() -> f64 {
    1.0e4
}
fn default_true() -> bool {
    true
}

impl Default for HyperbolicSystemConfig {
    fn default() -> Self {
        Self {
            equation_of_state: default_eos_name(),
            reference_density: default_reference_density(),
            vacuum_state_relaxation_small: default_vacuum_small(),
            vacuum_state_relaxation_large: default_vacuum_large(),
            compute_strict_bounds: true,
            eos: EosConfig::default(),
        }
    }
}

impl HyperbolicSystemConfig {
    /// 解析状态方程名并校验常数
    pub fn validate(&self) -> Result<EosKind, ConfigError> {
        let kind = EosKind::parse(&self.equation_of_state)?;
        self.eos.validate()?;
        if self.reference_density <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "reference_density",
                message: format!("参考密度必须为正，实际 {}", self.reference_density),
            });
        }
        Ok(kind)
    }
}

// ============================================================
// 指示器
// ============================================================

/// 指示器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    /// 熵粘性交换子（参考指示器）
    EntropyViscosityCommutator,
    /// 跳量光滑度指示器
    Smoothness,
    /// 恒零（全低阶，回归测试用）
    Zero,
    /// 恒一（全高阶，回归测试用）
    One,
}

impl IndicatorKind {
    pub const ACCEPTED: &'static str =
        "entropy viscosity commutator, smoothness, zero, one";

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "entropy viscosity commutator" => Ok(Self::EntropyViscosityCommutator),
            "smoothness" => Ok(Self::Smoothness),
            "zero" => Ok(Self::Zero),
            "one" => Ok(Self::One),
            _ => Err(ConfigError::UnknownIndicator {
                name: name.to_string(),
                accepted: Self::ACCEPTED,
            }),
        }
    }
}

/// 指示器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// 指示器名称
    #[serde(default = "default_indicator_name")]
    pub indicator: String,

    /// 熵粘性交换子归一化因子
    #[serde(default = "default_evc_factor")]
    pub evc_factor: f64,
}

fn default_indicator_name() -> String {
    "entropy viscosity commutator".to_string()
}
fn default_evc_factor() -> f64 {
    1.0
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            indicator: default_indicator_name(),
            evc_factor: default_evc_factor(),
        }
    }
}

// ============================================================
// 限制器
// ============================================================

/// 限制器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// 限制循环迭代次数 N_iter
    #[serde(default = "default_limiter_iterations")]
    pub iterations: usize,

    /// 界松弛因子（0 关闭松弛）
    #[serde(default = "default_relax_bounds")]
    pub relax_bounds: f64,

    /// 松弛阶数（控制松弛量随局部振荡的衰减）
    #[serde(default = "default_relaxation_order")]
    pub relaxation_order: usize,

    /// 线搜索收敛容差
    #[serde(default = "default_line_search_eps")]
    pub line_search_eps: f64,

    /// 线搜索最大迭代数
    #[serde(default = "default_line_search_max_iter")]
    pub line_search_max_iter: usize,
}

fn default_limiter_iterations() -> usize {
    2
}
fn default_relax_bounds() -> f64 {
    1.0
}
fn default_relaxation_order() -> usize {
    3
}
fn default_line_search_eps() -> f64 {
    1.0e-10
}
fn default_line_search_max_iter() -> usize {
    8
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            iterations: default_limiter_iterations(),
            relax_bounds: default_relax_bounds(),
            relaxation_order: default_relaxation_order(),
            line_search_eps: default_line_search_eps(),
            line_search_max_iter: default_line_search_max_iter(),
        }
    }
}

// ============================================================
// 黎曼求解器
// ============================================================

/// 近似黎曼求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiemannSolverConfig {
    /// 牛顿迭代最大步数（0 表示只用双稀疏波估计）
    #[serde(default)]
    pub newton_max_iter: usize,

    /// 牛顿迭代相对容差
    #[serde(default = "default_newton_eps")]
    pub newton_eps: f64,
}

fn default_newton_eps() -> f64 {
    1.0e-10
}

impl Default for RiemannSolverConfig {
    fn default() -> Self {
        Self {
            newton_max_iter: 0,
            newton_eps: default_newton_eps(),
        }
    }
}

// ============================================================
// 不变域违例策略
// ============================================================

/// 检测到不变域违例时的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdViolationStrategy {
    /// 记录警告并继续
    Warn,
    /// 抛出 Restart，由调用方缩小 CFL 重试
    #[default]
    RaiseException,
}

// ============================================================
// 双曲模块
// ============================================================

/// 双曲模块配置（步进控制器）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperbolicModuleConfig {
    /// CFL 数，(0,1) 内保证低阶格式不变域保持
    #[serde(default = "default_cfl")]
    pub cfl_number: f64,

    /// 不变域违例策略
    #[serde(default)]
    pub id_violation_strategy: IdViolationStrategy,

    /// 指示器选项
    #[serde(default)]
    pub indicator: IndicatorConfig,

    /// 限制器选项
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// 黎曼求解器选项
    #[serde(default)]
    pub riemann_solver: RiemannSolverConfig,
}

fn default_cfl() -> f64 {
    0.5
}

impl Default for HyperbolicModuleConfig {
    fn default() -> Self {
        Self {
            cfl_number: default_cfl(),
            id_violation_strategy: IdViolationStrategy::default(),
            indicator: IndicatorConfig::default(),
            limiter: LimiterConfig::default(),
            riemann_solver: RiemannSolverConfig::default(),
        }
    }
}

impl HyperbolicModuleConfig {
    /// 校验参数范围并解析指示器名称
    pub fn validate(&self) -> Result<IndicatorKind, ConfigError> {
        if self.cfl_number <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "cfl_number",
                message: format!("CFL 数必须为正，实际 {}", self.cfl_number),
            });
        }
        if self.limiter.line_search_eps <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "line_search_eps",
                message: "线搜索容差必须为正".to_string(),
            });
        }
        IndicatorKind::parse(&self.indicator.indicator)
    }
}

// ============================================================
// 初始状态
// ============================================================

/// 初始状态配置（由上层驱动器消费）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialValuesConfig {
    /// 初始状态名称（如 "uniform", "contrast", "ramp"）
    #[serde(default = "default_configuration")]
    pub configuration: String,

    /// 传播方向
    #[serde(default = "default_direction")]
    pub direction: Vec<f64>,

    /// 界面位置
    #[serde(default)]
    pub position: Vec<f64>,

    /// 扰动幅值
    #[serde(default)]
    pub perturbation: f64,
}

fn default_configuration() -> String {
    "uniform".to_string()
}
fn default_direction() -> Vec<f64> {
    vec![1.0, 0.0, 0.0]
}

impl Default for InitialValuesConfig {
    fn default() -> Self {
        Self {
            configuration: default_configuration(),
            direction: default_direction(),
            position: Vec::new(),
            perturbation: 0.0,
        }
    }
}

// ============================================================
// 方程分派
// ============================================================

/// 方程种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationKind {
    /// 多方气体欧拉方程
    Euler,
    /// 任意状态方程欧拉方程
    EulerAeos,
    /// 浅水方程
    ShallowWater,
    /// Navier-Stokes（双曲部分同欧拉，抛物子步为外部协作者）
    NavierStokes,
    /// 骨架方程（模板）
    Skeleton,
}

impl EquationKind {
    pub const ACCEPTED: &'static str =
        "euler, euler aeos, shallow water, navier stokes, skeleton";

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "euler" => Ok(Self::Euler),
            "euler aeos" => Ok(Self::EulerAeos),
            "shallow water" => Ok(Self::ShallowWater),
            "navier stokes" => Ok(Self::NavierStokes),
            "skeleton" => Ok(Self::Skeleton),
            _ => Err(ConfigError::UnknownEquation {
                name: name.to_string(),
                accepted: Self::ACCEPTED,
            }),
        }
    }
}

/// 方程与维度分派配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquationConfig {
    /// 空间维度
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// 方程名称
    #[serde(default = "default_equation_name")]
    pub equation: String,
}

fn default_dimension() -> usize {
    1
}
fn default_equation_name() -> String {
    "euler".to_string()
}

impl Default for EquationConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            equation: default_equation_name(),
        }
    }
}

impl EquationConfig {
    /// 解析方程名并校验维度
    pub fn validate(&self) -> Result<(usize, EquationKind), ConfigError> {
        if !(1..=3).contains(&self.dimension) {
            return Err(ConfigError::DimensionOutOfRange {
                dimension: self.dimension,
            });
        }
        Ok((self.dimension, EquationKind::parse(&self.equation)?))
    }
}

// ============================================================
// 顶层配置
// ============================================================

/// 顶层求解器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    /// 方程分派
    #[serde(default)]
    pub equation: EquationConfig,

    /// 双曲系统
    #[serde(default)]
    pub hyperbolic_system: HyperbolicSystemConfig,

    /// 双曲模块
    #[serde(default)]
    pub hyperbolic_module: HyperbolicModuleConfig,

    /// 初始状态
    #[serde(default)]
    pub initial_values: InitialValuesConfig,

    /// 终止时间 [s]
    #[serde(default = "default_final_time")]
    pub final_time: f64,
}

fn default_final_time() -> f64 {
    0.2
}

impl SolverConfig {
    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 启动时全量校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.equation.validate()?;
        self.hyperbolic_system.validate()?;
        self.hyperbolic_module.validate()?;
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.hyperbolic_module.cfl_number - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_eos_kind_parse() {
        assert_eq!(
            EosKind::parse("polytropic gas").unwrap(),
            EosKind::PolytropicGas
        );
        assert_eq!(
            EosKind::parse("noble abel stiffened gas").unwrap(),
            EosKind::NobleAbelStiffenedGas
        );
        assert!(EosKind::parse("ideal gas").is_err());
    }

    #[test]
    fn test_equation_kind_parse() {
        assert_eq!(EquationKind::parse("euler").unwrap(), EquationKind::Euler);
        assert_eq!(
            EquationKind::parse("euler aeos").unwrap(),
            EquationKind::EulerAeos
        );
        assert!(EquationKind::parse("burgers").is_err());
    }

    #[test]
    fn test_dimension_validation() {
        let mut config = EquationConfig::default();
        config.dimension = 4;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::DimensionOutOfRange { dimension: 4 }
        ));
    }

    #[test]
    fn test_invalid_gamma() {
        let mut config = HyperbolicSystemConfig::default();
        config.eos.gamma = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SolverConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: SolverConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed.hyperbolic_system.equation_of_state,
            "polytropic gas"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: SolverConfig =
            serde_json::from_str(r#"{"final_time": 1.5}"#).unwrap();
        assert!((parsed.final_time - 1.5).abs() < 1e-15);
        assert_eq!(parsed.equation.equation, "euler");
    }
}
