// crates/cf_physics/src/lib.rs

//! 双曲守恒律求解核心
//!
//! 在非结构网格上以配点型连续有限元离散积分双曲守恒律
//! （可压缩欧拉方程与浅水方程），采用图粘性 + 凸限制的
//! 不变域保持格式。模块组织：
//!
//! - 核心抽象 (core): 标量/SIMD 通道抽象
//! - 状态管理 (state): SoA 多分量向量与复合状态向量
//! - 稀疏模式 (sparsity): SIMD 打包的稀疏连接图与边值矩阵
//! - 离线数据 (offline): 集中质量、几何系数 c_ij、边界映射
//! - 状态方程库 (eos)
//! - 方程族 (equations): 欧拉 / 欧拉-AEOS / 浅水 / 骨架
//! - 策略 (schemes): 近似黎曼求解器、指示器、限制器
//! - 遍历内核 (stencil): SIMD 分块 + 线程并行稀疏遍历
//! - 引擎 (engine): 步进控制器与集合归约
//!
//! # 并行模型
//!
//! 进程内 rayon 固定分块并行；所有共享输出按互不相交的行写入，
//! 无细粒度锁。归约只假定结合交换律，不同线程数下结果可能
//! 存在逐位差异。

pub mod core;
pub mod engine;
pub mod eos;
pub mod equations;
pub mod offline;
pub mod schemes;
pub mod sparsity;
pub mod state;
pub mod stencil;

pub use crate::core::lane::Lane;
pub use engine::ensemble::{Ensemble, SingleProcess};
pub use engine::hyperbolic::{HyperbolicModule, Restart, StepStats};
pub use equations::{Equation, SystemView, N_BOUNDS};
pub use offline::{BoundaryId, BoundaryNode, OfflineData};
pub use sparsity::{SparseMatrixSimd, SparsityPatternSimd, SIMD_WIDTH};
pub use state::{MultiComponentVector, StateVector};
