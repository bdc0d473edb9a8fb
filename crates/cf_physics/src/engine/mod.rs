// crates/cf_physics/src/engine/mod.rs

//! 引擎核心
//!
//! - [`hyperbolic`]: 显式双曲步进控制器（预计算 → d_ij/τ_max →
//!   低阶 → 高阶 → 凸限制 → 容许性验证/Restart）
//! - [`ensemble`]: 集合归约（τ_max 全局最小、幽灵同步）

pub mod ensemble;
pub mod hyperbolic;

pub use ensemble::{Ensemble, SingleProcess};
pub use hyperbolic::{HyperbolicModule, Restart, StepStats};
