// crates/cf_physics/src/schemes/mod.rs

//! 方程无关的策略接口与气体动力学策略实现
//!
//! 三类策略按行遍历的生命周期设计：
//! - 黎曼求解器是无状态的逐边求值
//! - 指示器与限制器是逐行累加器：`reset` 于对角元、`accumulate`
//!   于邻居列、收尾取 `alpha` / `bounds`
//!
//! 实例按线程分块克隆，块内无共享状态。

pub mod indicator;
pub mod limiter;
pub mod riemann;

use crate::core::lane::Lane;

/// 限制器界分量数（所有方程共用布局）
///
/// 气体动力学: [ρ_min, ρ_max, ε_min, s_min]；
/// 浅水: [h_min, h_max, q²_max, 未用]。
pub const N_BOUNDS: usize = 4;

/// 近似黎曼求解器：方向 n_ij 上一维黎曼问题最大波速的上界
///
/// 上界性质是不变域保持的前提，任何实现不得低估。
pub trait RiemannSolver<const D: usize, const P: usize, const K: usize, L: Lane>:
    Clone + Send + Sync
{
    /// 计算 λ_max(U_i, U_j, n_ij)
    fn compute(
        &self,
        u_i: &[L; P],
        u_j: &[L; P],
        prec_i: &[L; K],
        prec_j: &[L; K],
        n_ij: &[L; D],
    ) -> L;
}

/// 逐节点光滑度指示器
///
/// 产出 α_i ∈ [0,1]：1 表示完整高阶修正，0 表示纯低阶。
pub trait Indicator<const D: usize, const P: usize, const K: usize, L: Lane>:
    Clone + Send + Sync
{
    /// 行首（对角元）重置累加器
    fn reset(&mut self, u_i: &[L; P], prec_i: &[L; K]);

    /// 累加一环列贡献（遍历整行，首列即对角元；内部行 c_ii = 0）
    fn accumulate(&mut self, u_j: &[L; P], prec_j: &[L; K], c_ij: &[L; D]);

    /// 收尾：返回 α_i
    fn alpha(&self) -> L;
}

/// 逐边凸限制器
///
/// 两阶段：先在一环上累加局部界，再对每条边求最大可行 l_ij。
pub trait Limiter<const D: usize, const P: usize, const K: usize, L: Lane>:
    Clone + Send + Sync
{
    /// 行首重置界累加器（u_i 为低阶候选）
    fn reset(&mut self, u_i: &[L; P], prec_i: &[L; K]);

    /// 累加一环（含自身；低阶候选与上步预计算值）
    fn accumulate(&mut self, u_j: &[L; P], prec_j: &[L; K]);

    /// 收尾：松弛后的界
    fn bounds(&self) -> [L; N_BOUNDS];

    /// 求最大 l ∈ [0,1] 使 U + l P 满足全部界
    ///
    /// `prec_i` 为旧状态的预计算值（熵界需要 γ_min）。
    /// 返回值是安全下界：线搜索始终返回可行括号端点。
    fn limit(&self, bounds: &[L; N_BOUNDS], u: &[L; P], p_ij: &[L; P], prec_i: &[L; K]) -> L;
}
