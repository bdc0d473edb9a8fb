// crates/cf_config/src/lib.rs

//! 求解器配置层
//!
//! 定义双曲求解核心的全部运行时参数，使用纯 f64 类型以便 JSON
//! 序列化。配置在启动时一次性校验：未知的状态方程名、方程名、
//! 维度越界等均为致命配置错误，错误信息中列出合法取值集合。
//!
//! # 模块
//!
//! - [`error`]: 配置错误类型
//! - [`solver_config`]: 各子配置结构与顶层 [`SolverConfig`]

pub mod error;
pub mod solver_config;

pub use error::ConfigError;
pub use solver_config::{
    EquationConfig, EquationKind, EosConfig, EosKind, HyperbolicModuleConfig,
    HyperbolicSystemConfig, IdViolationStrategy, IndicatorConfig, IndicatorKind,
    InitialValuesConfig, LimiterConfig, RiemannSolverConfig, SolverConfig,
};
