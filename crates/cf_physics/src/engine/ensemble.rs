// crates/cf_physics/src/engine/ensemble.rs

//! 集合归约
//!
//! 两类集体操作：
//! 1. `min_reduce_time_step` —— 时间步长必须在全体 rank 上一致，
//!    因此在全局通信域上做最小归约
//! 2. `update_ghost_values` —— 区域分解子通信域内的幽灵同步
//!
//! 进程内实现 [`SingleProcess`] 按幽灵交换表 (源, 目标) 拷贝；
//! 单进程无幽灵时为恒等。实现必须可重入，不持有内部锁。

use crate::state::MultiComponentVector;

/// 集合归约接口
pub trait Ensemble: Send + Sync {
    /// 全局最小归约（τ_max 同步）
    fn min_reduce_time_step(&self, local: f64) -> f64;

    /// 按交换表同步幽灵区
    fn update_ghost_values<const K: usize>(
        &self,
        exchange: &[(u32, u32)],
        v: &mut MultiComponentVector<K>,
    );
}

/// 单进程实现
///
/// 归约为恒等；幽灵同步按交换表逐项拷贝（进程内多子域布局
/// 也由此覆盖）。
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl SingleProcess {
    /// 创建
    pub fn new() -> Self {
        Self
    }
}

impl Ensemble for SingleProcess {
    #[inline]
    fn min_reduce_time_step(&self, local: f64) -> f64 {
        local
    }

    fn update_ghost_values<const K: usize>(
        &self,
        exchange: &[(u32, u32)],
        v: &mut MultiComponentVector<K>,
    ) {
        for &(src, dst) in exchange {
            let value = v.get_node(src as usize);
            v.set_node(dst as usize, &value);
        }
    }
}
