// crates/cf_physics/src/engine/hyperbolic.rs

//! 显式双曲步进控制器
//!
//! 单个时间步的编排（凸限制前向欧拉）：
//!
//! 1. `prepare_state_vector`: 边界算子 + 幽灵同步 + 预计算循环
//! 2. 指示器/图粘性遍历：α_i、d_ij（d_ji 由波速估计的交换
//!    对称性逐位一致）、τ_max 原子最小化 + 集合最小归约
//! 3. 低阶前向欧拉装配 → 首个候选 U^L
//! 4. 高阶增量装配（熵指示混合通量，可叠加 RK 阶段贡献）
//! 5. 限制循环 N_iter 次：一环界 → 逐边 l_ij → 施加 min(l_ij, l_ji)
//! 6. 容许性验证 → 接受，或按违例策略计警告 / 抛 Restart
//!
//! 边矩阵与逐节点向量在 `prepare()` 按离线数据分配，跨步复用，
//! 每步整体覆写。

use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use cf_config::{HyperbolicModuleConfig, IdViolationStrategy};
use wide::f64x4;

use crate::core::lane::Lane;
use crate::engine::ensemble::Ensemble;
use crate::equations::{Equation, SystemView};
use crate::offline::OfflineData;
use crate::schemes::{Indicator, Limiter, RiemannSolver, N_BOUNDS};
use crate::sparsity::{MatrixShared, SparseMatrixSimd, SparsityPatternSimd, SIMD_WIDTH};
use crate::state::{McShared, MultiComponentVector, StateVector};
use crate::stencil::{thread_parallel_sweep, DispatchFlag};

// ============================================================
// Restart 信号
// ============================================================

/// 重启信号
///
/// 非错误值的类型化哨兵：不变域（或 CFL）违例时从 `step`
/// 抛出，调用方以缩小的 τ 或 CFL 重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restart;

impl std::fmt::Display for Restart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "不变域违例，需要以缩小的时间步重试")
    }
}

/// 单步统计
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    /// 实际使用的时间步长
    pub tau: f64,
    /// CFL 容许的最大时间步长（全局归约后）
    pub tau_max: f64,
}

// ============================================================
// 步进控制器
// ============================================================

/// 显式双曲模块
pub struct HyperbolicModule<E, En, const D: usize, const P: usize, const K: usize>
where
    E: Equation<D, P, K>,
    En: Ensemble,
{
    equation: Arc<E>,
    offline: Arc<OfflineData<D>>,
    ensemble: En,
    config: HyperbolicModuleConfig,
    cfl: f64,

    n_restarts: u32,
    n_warnings: AtomicU32,

    // prepare() 分配，跨步复用
    alpha: MultiComponentVector<1>,
    bounds: MultiComponentVector<N_BOUNDS>,
    low_order: MultiComponentVector<P>,
    limited: MultiComponentVector<P>,
    dij: SparseMatrixSimd<1>,
    lij: SparseMatrixSimd<1>,
    pij: SparseMatrixSimd<P>,
    flag: DispatchFlag,
    prepared: bool,

    last_tau_max: f64,
}

impl<E, En, const D: usize, const P: usize, const K: usize> HyperbolicModule<E, En, D, P, K>
where
    E: Equation<D, P, K>,
    En: Ensemble,
{
    /// 创建模块（尚未分配工作存储）
    pub fn new(
        equation: Arc<E>,
        offline: Arc<OfflineData<D>>,
        ensemble: En,
        config: HyperbolicModuleConfig,
    ) -> Self {
        let cfl = config.cfl_number;
        Self {
            equation,
            offline,
            ensemble,
            config,
            cfl,
            n_restarts: 0,
            n_warnings: AtomicU32::new(0),
            alpha: MultiComponentVector::new(0),
            bounds: MultiComponentVector::new(0),
            low_order: MultiComponentVector::new(0),
            limited: MultiComponentVector::new(0),
            dij: SparseMatrixSimd::new(0),
            lij: SparseMatrixSimd::new(0),
            pij: SparseMatrixSimd::new(0),
            flag: DispatchFlag::new(),
            prepared: false,
            last_tau_max: f64::INFINITY,
        }
    }

    /// 分配工作存储（按离线数据尺寸）
    pub fn prepare(&mut self) {
        let n_nodes = self.offline.n_nodes;
        let n_entries = self.offline.sparsity.n_entries();

        self.alpha = MultiComponentVector::new(n_nodes);
        self.bounds = MultiComponentVector::new(n_nodes);
        self.low_order = MultiComponentVector::new(n_nodes);
        self.limited = MultiComponentVector::new(n_nodes);
        self.dij = SparseMatrixSimd::new(n_entries);
        self.lij = SparseMatrixSimd::new(n_entries);
        self.pij = SparseMatrixSimd::new(n_entries);
        self.prepared = true;
    }

    /// 设置 CFL 数
    pub fn set_cfl(&mut self, cfl: f64) {
        assert!(cfl > 0.0, "CFL 数必须为正");
        self.cfl = cfl;
    }

    /// 当前 CFL 数
    #[inline]
    pub fn cfl(&self) -> f64 {
        self.cfl
    }

    /// 累计 Restart 次数
    #[inline]
    pub fn n_restarts(&self) -> u32 {
        self.n_restarts
    }

    /// 累计违例警告次数
    #[inline]
    pub fn n_warnings(&self) -> u32 {
        self.n_warnings.load(Ordering::Relaxed)
    }

    /// 上一步的指示器向量 α
    #[inline]
    pub fn alpha(&self) -> &MultiComponentVector<1> {
        &self.alpha
    }

    /// 上一步的图粘性矩阵 d_ij（诊断用）
    #[inline]
    pub fn graph_viscosity(&self) -> &SparseMatrixSimd<1> {
        &self.dij
    }

    /// 上一步的限制系数矩阵 l_ij（诊断用；有效值为 min(l_ij, l_ji)）
    #[inline]
    pub fn limiter_coefficients(&self) -> &SparseMatrixSimd<1> {
        &self.lij
    }

    /// 上一步的 CFL 容许步长
    #[inline]
    pub fn last_tau_max(&self) -> f64 {
        self.last_tau_max
    }

    /// 离线数据
    #[inline]
    pub fn offline_data(&self) -> &OfflineData<D> {
        &self.offline
    }

    /// 方程捆绑
    #[inline]
    pub fn equation(&self) -> &E {
        &self.equation
    }

    /// 预处理状态向量
    ///
    /// 施加边界条件（时刻 t 的 Dirichlet 数据由 `dirichlet` 提供）、
    /// 同步幽灵区、运行全部预计算循环（循环之间同步幽灵）。
    pub fn prepare_state_vector(
        &self,
        state: &mut StateVector<P, K>,
        t: f64,
        dirichlet: &dyn Fn(&[f64; D], f64) -> [f64; P],
    ) -> Result<(), Restart> {
        self.flag.reset();
        let view_scalar: E::View<f64> = self.equation.view();

        // 边界算子（边界节点逐个标量处理）
        for boundary in &self.offline.boundary_map {
            let i = boundary.node as usize;
            let u = state.u.get_node(i);
            let position = boundary.position;
            let result = view_scalar
                .apply_boundary_conditions(boundary.id, u, &boundary.normal, &|| {
                    dirichlet(&position, t)
                })
                .map_err(|_| Restart)?;
            state.u.set_node(i, &result);
        }

        self.ensemble
            .update_ghost_values(&self.offline.ghost_exchange, &mut state.u);

        // 预计算循环（cycle 之间有屏障 + 幽灵同步）
        let n_internal = self.offline.sparsity.n_internal();
        let n_owned = self.offline.n_owned;

        for cycle in 0..E::N_PRECOMPUTATION_CYCLES {
            {
                let view_vector: E::View<f64x4> = self.equation.view();
                let sparsity = &self.offline.sparsity;
                let u = &state.u;
                let precomputed_shared = state.precomputed.shared();

                thread_parallel_sweep(
                    n_internal,
                    n_owned,
                    &self.flag,
                    |rows| {
                        view_vector.precomputation_chunk(
                            cycle,
                            u,
                            &precomputed_shared,
                            sparsity,
                            rows,
                        );
                    },
                    |rows| {
                        view_scalar.precomputation_chunk(
                            cycle,
                            u,
                            &precomputed_shared,
                            sparsity,
                            rows,
                        );
                    },
                );
            }
            self.ensemble
                .update_ghost_values(&self.offline.ghost_exchange, &mut state.precomputed);
        }

        Ok(())
    }

    /// 执行一个显式欧拉步
    ///
    /// `tau = 0` 时采用 CFL 容许步长 τ_max；非零时按给定值步进
    /// （超出 τ_max 且策略为 raise_exception 时抛 Restart）。
    /// `stages` 为可选 RK 阶段贡献 (状态, 权重)，高阶通量按
    /// (1-Σω)F^n + Σω_s F^{s,n} 混合；阶段向量只读。
    ///
    /// 返回实际使用的 τ。调用前必须对 `old_state` 调用过
    /// [`HyperbolicModule::prepare_state_vector`]。
    pub fn step(
        &mut self,
        old_state: &StateVector<P, K>,
        stages: &[(&StateVector<P, K>, f64)],
        new_state: &mut StateVector<P, K>,
        tau: f64,
    ) -> Result<StepStats, Restart> {
        assert!(self.prepared, "step 之前必须调用 prepare()");
        self.flag.reset();

        let sparsity = &self.offline.sparsity;
        let n_internal = sparsity.n_internal();
        let n_owned = self.offline.n_owned;

        let ctx = SweepContext::<D, P, K> {
            sparsity,
            mass: &self.offline.lumped_mass,
            mass_inverse: &self.offline.lumped_mass_inverse,
            u_old: &old_state.u,
            prec_old: &old_state.precomputed,
        };

        // ---------- 遍历 1: 指示器 α + 图粘性 d_ij + τ 提案 ----------
        let tau_bits = AtomicU64::new(f64::INFINITY.to_bits());
        {
            let riemann_v: E::Riemann<f64x4> =
                self.equation.riemann_solver(&self.config.riemann_solver);
            let riemann_s: E::Riemann<f64> =
                self.equation.riemann_solver(&self.config.riemann_solver);
            let indicator_v: E::Indicator<f64x4> =
                self.equation.indicator(&self.config.indicator);
            let indicator_s: E::Indicator<f64> = self.equation.indicator(&self.config.indicator);

            let alpha_sh = self.alpha.shared();
            let dij_sh = self.dij.shared();

            thread_parallel_sweep(
                n_internal,
                n_owned,
                &self.flag,
                |rows| {
                    chunk_alpha_dij::<D, P, K, f64x4, _, _>(
                        &ctx, &riemann_v, &indicator_v, &alpha_sh, &dij_sh, &tau_bits, rows,
                    );
                },
                |rows| {
                    chunk_alpha_dij::<D, P, K, f64, _, _>(
                        &ctx, &riemann_s, &indicator_s, &alpha_sh, &dij_sh, &tau_bits, rows,
                    );
                },
            );
        }
        self.ensemble
            .update_ghost_values(&self.offline.ghost_exchange, &mut self.alpha);

        // ---------- CFL 步长（全局最小归约；τ_max 与 CFL 精确成比例） ----------
        let tau_local = f64::from_bits(tau_bits.load(Ordering::Relaxed));
        let tau_max = self.cfl * self.ensemble.min_reduce_time_step(tau_local);
        self.last_tau_max = tau_max;

        let tau_step = if tau > 0.0 {
            if tau > tau_max {
                match self.config.id_violation_strategy {
                    IdViolationStrategy::RaiseException => {
                        self.n_restarts += 1;
                        log::debug!(
                            "CFL 违例: 给定 τ = {:.3e} 超出 τ_max = {:.3e}，抛出 Restart",
                            tau,
                            tau_max
                        );
                        return Err(Restart);
                    }
                    IdViolationStrategy::Warn => {
                        self.n_warnings.fetch_add(1, Ordering::Relaxed);
                        log::warn!(
                            "CFL 违例: 给定 τ = {:.3e} 超出 τ_max = {:.3e}，继续步进",
                            tau,
                            tau_max
                        );
                    }
                }
            }
            tau
        } else {
            tau_max
        };

        // ---------- 遍历 2: 低阶更新 + 高阶增量装配 ----------
        let stage_weight_rest = 1.0 - stages.iter().map(|(_, w)| *w).sum::<f64>();
        {
            let view_v: E::View<f64x4> = self.equation.view();
            let view_s: E::View<f64> = self.equation.view();
            let low_sh = self.low_order.shared();
            let pij_sh = self.pij.shared();
            let alpha = &self.alpha;
            let dij = &self.dij;
            let strategy = self.config.id_violation_strategy;

            thread_parallel_sweep(
                n_internal,
                n_owned,
                &self.flag,
                |rows| {
                    chunk_low_order::<D, P, K, f64x4, _>(
                        &ctx, &view_v, stages, stage_weight_rest, alpha, dij, &low_sh, &pij_sh,
                        tau_step, strategy, &self.flag, &self.n_warnings, rows,
                    );
                },
                |rows| {
                    chunk_low_order::<D, P, K, f64, _>(
                        &ctx, &view_s, stages, stage_weight_rest, alpha, dij, &low_sh, &pij_sh,
                        tau_step, strategy, &self.flag, &self.n_warnings, rows,
                    );
                },
            );
        }
        if self.flag.is_raised() {
            self.n_restarts += 1;
            return Err(Restart);
        }
        self.ensemble
            .update_ghost_values(&self.offline.ghost_exchange, &mut self.low_order);

        // ---------- 限制循环 ----------
        let iterations = self.config.limiter.iterations.max(1);
        for iteration in 0..iterations {
            let keep_remainder = iteration + 1 < iterations;

            // (a) 一环界
            {
                let limiter_v: E::Limiter<f64x4> = self.equation.limiter(&self.config.limiter);
                let limiter_s: E::Limiter<f64> = self.equation.limiter(&self.config.limiter);
                let bounds_sh = self.bounds.shared();
                let low = &self.low_order;

                thread_parallel_sweep(
                    n_internal,
                    n_owned,
                    &self.flag,
                    |rows| {
                        chunk_bounds::<D, P, K, f64x4, _>(&ctx, &limiter_v, low, &bounds_sh, rows);
                    },
                    |rows| {
                        chunk_bounds::<D, P, K, f64, _>(&ctx, &limiter_s, low, &bounds_sh, rows);
                    },
                );
            }

            // (b) 逐边 l_ij
            {
                let limiter_v: E::Limiter<f64x4> = self.equation.limiter(&self.config.limiter);
                let limiter_s: E::Limiter<f64> = self.equation.limiter(&self.config.limiter);
                let lij_sh = self.lij.shared();
                let low = &self.low_order;
                let bounds = &self.bounds;
                let pij = &self.pij;

                thread_parallel_sweep(
                    n_internal,
                    n_owned,
                    &self.flag,
                    |rows| {
                        chunk_limit::<D, P, K, f64x4, _>(
                            &ctx, &limiter_v, low, bounds, pij, &lij_sh, rows,
                        );
                    },
                    |rows| {
                        chunk_limit::<D, P, K, f64, _>(
                            &ctx, &limiter_s, low, bounds, pij, &lij_sh, rows,
                        );
                    },
                );
            }

            // (c) 施加 min(l_ij, l_ji) 并收紧剩余增量
            {
                let view_v: E::View<f64x4> = self.equation.view();
                let view_s: E::View<f64> = self.equation.view();
                let limited_sh = self.limited.shared();
                let pij_sh = self.pij.shared();
                let low = &self.low_order;
                let lij = &self.lij;
                let strategy = self.config.id_violation_strategy;

                thread_parallel_sweep(
                    n_internal,
                    n_owned,
                    &self.flag,
                    |rows| {
                        chunk_apply::<D, P, K, f64x4, _>(
                            &ctx, &view_v, low, lij, &pij_sh, &limited_sh, keep_remainder,
                            strategy, &self.flag, &self.n_warnings, rows,
                        );
                    },
                    |rows| {
                        chunk_apply::<D, P, K, f64, _>(
                            &ctx, &view_s, low, lij, &pij_sh, &limited_sh, keep_remainder,
                            strategy, &self.flag, &self.n_warnings, rows,
                        );
                    },
                );
            }
            if self.flag.is_raised() {
                self.n_restarts += 1;
                return Err(Restart);
            }

            std::mem::swap(&mut self.low_order, &mut self.limited);
            self.ensemble
                .update_ghost_values(&self.offline.ghost_exchange, &mut self.low_order);
        }

        new_state.u.copy_from(&self.low_order);

        log::debug!(
            "步进完成: τ = {:.6e}, τ_max = {:.6e}, 警告 {}",
            tau_step,
            tau_max,
            self.n_warnings()
        );

        Ok(StepStats {
            tau: tau_step,
            tau_max,
        })
    }
}

// ============================================================
// 遍历上下文与分块体
// ============================================================

/// 遍历共享的只读上下文
struct SweepContext<'a, const D: usize, const P: usize, const K: usize> {
    sparsity: &'a SparsityPatternSimd<D>,
    mass: &'a [f64],
    mass_inverse: &'a [f64],
    u_old: &'a MultiComponentVector<P>,
    prec_old: &'a MultiComponentVector<K>,
}

/// 正浮点原子最小化（正数的 IEEE 位序与整数序一致）
#[inline]
fn atomic_min_f64(bits: &AtomicU64, value: f64) {
    bits.fetch_min(value.to_bits(), Ordering::Relaxed);
}

/// 转置表项聚集（缺失转置时回退为自身表项）
#[inline]
fn gather_transposed<const D: usize, L: Lane>(
    sparsity: &SparsityPatternSimd<D>,
    values: &[f64],
    base: usize,
) -> L {
    let mut idx = [0u32; SIMD_WIDTH];
    for (k, slot) in idx.iter_mut().enumerate().take(L::WIDTH) {
        let e = base + k;
        *slot = sparsity.transposed_at(e).unwrap_or(e) as u32;
    }
    L::gather(values, &idx)
}

/// 违例处理：Warn 计数，RaiseException 置位取消标志
#[inline]
fn report_violation(strategy: IdViolationStrategy, flag: &DispatchFlag, warnings: &AtomicU32) {
    match strategy {
        IdViolationStrategy::Warn => {
            warnings.fetch_add(1, Ordering::Relaxed);
        }
        IdViolationStrategy::RaiseException => {
            flag.raise();
        }
    }
}

/// 遍历 1 分块体：α_i、d_ij（全行）、τ 提案
#[allow(clippy::too_many_arguments)]
fn chunk_alpha_dij<const D: usize, const P: usize, const K: usize, L, RS, IND>(
    ctx: &SweepContext<'_, D, P, K>,
    riemann: &RS,
    indicator_proto: &IND,
    alpha_sh: &McShared<'_, 1>,
    dij_sh: &MatrixShared<'_, 1>,
    tau_bits: &AtomicU64,
    rows: Range<usize>,
) where
    L: Lane,
    RS: RiemannSolver<D, P, K, L>,
    IND: Indicator<D, P, K, L>,
{
    let mut indicator = indicator_proto.clone();
    let norms = ctx.sparsity.cij_norm_slice();

    let mut i = rows.start;
    while i < rows.end {
        let row_length = ctx.sparsity.row_length_lane::<L>(i);
        if row_length == 1 {
            i += L::WIDTH;
            continue;
        }

        let u_i: [L; P] = ctx.u_old.get(i);
        let prec_i: [L; K] = ctx.prec_old.get(i);
        indicator.reset(&u_i, &prec_i);

        let mut d_sum = L::zero();
        for c in 0..row_length {
            let base = ctx.sparsity.entry_base::<L>(i, c);
            let js = ctx.sparsity.columns_at(base, L::WIDTH);
            let c_ij: [L; D] = ctx.sparsity.cij_at(base);
            let u_j: [L; P] = ctx.u_old.gather(js);
            let prec_j: [L; K] = ctx.prec_old.gather(js);

            indicator.accumulate(&u_j, &prec_j, &c_ij);

            if c > 0 {
                let n_ij: [L; D] = ctx.sparsity.nij_at(base);
                let lambda = riemann.compute(&u_i, &u_j, &prec_i, &prec_j, &n_ij);
                let norm: L = ctx.sparsity.cij_norm_at(base);
                let norm_transposed: L = gather_transposed::<D, L>(ctx.sparsity, norms, base);
                let d = lambda * norm.max(norm_transposed);
                d_sum += d;
                // Safety: 自身行表项，行分块互不相交
                unsafe {
                    dij_sh.write(base, &[d]);
                }
            }
        }

        // 对角 d_ii = -Σ_{j≠i} d_ij
        let diag = ctx.sparsity.entry_base::<L>(i, 0);
        // Safety: 自身行表项
        unsafe {
            dij_sh.write(diag, &[-d_sum]);
            alpha_sh.write(i, &[indicator.alpha()]);
        }

        // τ 提案: m_i / (2 Σ d_ij)
        let m_i = L::load(ctx.mass, i);
        let tau_local = m_i / (L::splat(2.0) * d_sum.max(L::splat(f64::MIN_POSITIVE)));
        atomic_min_f64(tau_bits, tau_local.horizontal_min());

        i += L::WIDTH;
    }
}

/// 遍历 2 分块体：低阶更新 + 高阶增量 p_ij
#[allow(clippy::too_many_arguments)]
fn chunk_low_order<const D: usize, const P: usize, const K: usize, L, V>(
    ctx: &SweepContext<'_, D, P, K>,
    view: &V,
    stages: &[(&StateVector<P, K>, f64)],
    stage_weight_rest: f64,
    alpha: &MultiComponentVector<1>,
    dij: &SparseMatrixSimd<1>,
    low_sh: &McShared<'_, P>,
    pij_sh: &MatrixShared<'_, P>,
    tau: f64,
    strategy: IdViolationStrategy,
    flag: &DispatchFlag,
    warnings: &AtomicU32,
    rows: Range<usize>,
) where
    L: Lane,
    V: SystemView<D, P, K, L>,
{
    let tau_lane = L::splat(tau);
    let rest = L::splat(stage_weight_rest);

    let mut i = rows.start;
    while i < rows.end {
        let row_length = ctx.sparsity.row_length_lane::<L>(i);
        if row_length == 1 {
            // 受约束自由度：原值透传（约束分发由外部协作者完成）
            let u_i: [L; P] = ctx.u_old.get(i);
            // Safety: 自身行区间
            unsafe {
                low_sh.write(i, &u_i);
            }
            i += L::WIDTH;
            continue;
        }

        let u_i: [L; P] = ctx.u_old.get(i);
        let prec_i: [L; K] = ctx.prec_old.get(i);
        let alpha_i = L::load(alpha.component(0), i);

        let mut sum = [L::zero(); P];

        for c in 0..row_length {
            let base = ctx.sparsity.entry_base::<L>(i, c);
            let js = ctx.sparsity.columns_at(base, L::WIDTH);
            let c_ij: [L; D] = ctx.sparsity.cij_at(base);
            let u_j: [L; P] = ctx.u_old.gather(js);
            let prec_j: [L; K] = ctx.prec_old.gather(js);

            let fd = view.flux_divergence(&u_i, &prec_i, &u_j, &prec_j, &c_ij);

            // 阶段混合通量 F̃ = (1-Σω)F^n + Σ ω_s F^s
            let mut fd_tilde: [L; P] = std::array::from_fn(|comp| rest * fd[comp]);
            for (stage, weight) in stages {
                let su_i: [L; P] = stage.u.get(i);
                let sp_i: [L; K] = stage.precomputed.get(i);
                let su_j: [L; P] = stage.u.gather(js);
                let sp_j: [L; K] = stage.precomputed.gather(js);
                let sfd = view.flux_divergence(&su_i, &sp_i, &su_j, &sp_j, &c_ij);
                let w = L::splat(*weight);
                for comp in 0..P {
                    fd_tilde[comp] += w * sfd[comp];
                }
            }

            if c == 0 {
                for comp in 0..P {
                    sum[comp] += fd[comp];
                }
                // 对角增量恒零
                // Safety: 自身行表项
                unsafe {
                    pij_sh.write(base, &[L::zero(); P]);
                }
            } else {
                let d = dij.get::<L>(base)[0];
                let alpha_j = L::gather(alpha.component(0), js);
                let alpha_ij = alpha_i.min(alpha_j);

                let mut p_entry = [L::zero(); P];
                for comp in 0..P {
                    let diff = u_j[comp] - u_i[comp];
                    sum[comp] += fd[comp] + d * diff;
                    // 高阶 - 低阶: (F̃ - F) - α_ij d (U_j - U_i)
                    p_entry[comp] = tau_lane * (fd_tilde[comp] - fd[comp] - alpha_ij * d * diff);
                }
                // Safety: 自身行表项
                unsafe {
                    pij_sh.write(base, &p_entry);
                }
            }
        }

        let mass_inverse = L::load(ctx.mass_inverse, i);
        let factor = tau_lane * mass_inverse;
        let u_low: [L; P] = std::array::from_fn(|comp| u_i[comp] + factor * sum[comp]);

        // Safety: 自身行区间
        unsafe {
            low_sh.write(i, &u_low);
        }

        // 低阶候选已越界即为不变域违例
        if !view.is_admissible(&u_low) {
            report_violation(strategy, flag, warnings);
        }

        i += L::WIDTH;
    }
}

/// 限制循环 (a) 分块体：一环界
fn chunk_bounds<const D: usize, const P: usize, const K: usize, L, LIM>(
    ctx: &SweepContext<'_, D, P, K>,
    limiter_proto: &LIM,
    low: &MultiComponentVector<P>,
    bounds_sh: &McShared<'_, N_BOUNDS>,
    rows: Range<usize>,
) where
    L: Lane,
    LIM: Limiter<D, P, K, L>,
{
    let mut limiter = limiter_proto.clone();

    let mut i = rows.start;
    while i < rows.end {
        let row_length = ctx.sparsity.row_length_lane::<L>(i);
        if row_length == 1 {
            i += L::WIDTH;
            continue;
        }

        let u_i: [L; P] = low.get(i);
        let prec_i: [L; K] = ctx.prec_old.get(i);
        limiter.reset(&u_i, &prec_i);

        for c in 0..row_length {
            let base = ctx.sparsity.entry_base::<L>(i, c);
            let js = ctx.sparsity.columns_at(base, L::WIDTH);
            let u_j: [L; P] = low.gather(js);
            let prec_j: [L; K] = ctx.prec_old.gather(js);
            limiter.accumulate(&u_j, &prec_j);
        }

        // Safety: 自身行区间
        unsafe {
            bounds_sh.write(i, &limiter.bounds());
        }
        i += L::WIDTH;
    }
}

/// 限制循环 (b) 分块体：逐边 l_ij
#[allow(clippy::too_many_arguments)]
fn chunk_limit<const D: usize, const P: usize, const K: usize, L, LIM>(
    ctx: &SweepContext<'_, D, P, K>,
    limiter_proto: &LIM,
    low: &MultiComponentVector<P>,
    bounds: &MultiComponentVector<N_BOUNDS>,
    pij: &SparseMatrixSimd<P>,
    lij_sh: &MatrixShared<'_, 1>,
    rows: Range<usize>,
) where
    L: Lane,
    LIM: Limiter<D, P, K, L>,
{
    let limiter = limiter_proto.clone();

    let mut i = rows.start;
    while i < rows.end {
        let row_length = ctx.sparsity.row_length_lane::<L>(i);
        if row_length == 1 {
            i += L::WIDTH;
            continue;
        }

        let u_i: [L; P] = low.get(i);
        let prec_i: [L; K] = ctx.prec_old.get(i);
        let bounds_i: [L; N_BOUNDS] = bounds.get(i);

        // 凸组合缩放 k_i / m_i
        let neighbor_count = L::splat((row_length - 1) as f64);
        let scale = neighbor_count * L::load(ctx.mass_inverse, i);

        for c in 1..row_length {
            let base = ctx.sparsity.entry_base::<L>(i, c);
            let a_ij: [L; P] = pij.get(base);
            let p_tilde: [L; P] = std::array::from_fn(|comp| scale * a_ij[comp]);
            let l = limiter.limit(&bounds_i, &u_i, &p_tilde, &prec_i);
            // Safety: 自身行表项
            unsafe {
                lij_sh.write(base, &[l]);
            }
        }

        i += L::WIDTH;
    }
}

/// 限制循环 (c) 分块体：施加 min(l_ij, l_ji)，收紧剩余增量
#[allow(clippy::too_many_arguments)]
fn chunk_apply<const D: usize, const P: usize, const K: usize, L, V>(
    ctx: &SweepContext<'_, D, P, K>,
    view: &V,
    low: &MultiComponentVector<P>,
    lij: &SparseMatrixSimd<1>,
    pij_sh: &MatrixShared<'_, P>,
    limited_sh: &McShared<'_, P>,
    keep_remainder: bool,
    strategy: IdViolationStrategy,
    flag: &DispatchFlag,
    warnings: &AtomicU32,
    rows: Range<usize>,
) where
    L: Lane,
    V: SystemView<D, P, K, L>,
{
    let one = L::splat(1.0);
    let l_values = lij.component(0);

    let mut i = rows.start;
    while i < rows.end {
        let row_length = ctx.sparsity.row_length_lane::<L>(i);
        if row_length == 1 {
            // 受约束自由度：低阶候选透传
            let u_i: [L; P] = low.get(i);
            // Safety: 自身行区间
            unsafe {
                limited_sh.write(i, &u_i);
            }
            i += L::WIDTH;
            continue;
        }

        let u_i: [L; P] = low.get(i);
        let mass_inverse = L::load(ctx.mass_inverse, i);

        let mut acc = [L::zero(); P];
        for c in 1..row_length {
            let base = ctx.sparsity.entry_base::<L>(i, c);
            let l_own = L::load(l_values, base);
            let l_transposed: L = gather_transposed::<D, L>(ctx.sparsity, l_values, base);
            let l_bar = l_own.min(l_transposed);

            // Safety: 自身行表项，无并发写者
            let a_ij: [L; P] = unsafe { pij_sh.get::<L>(base) };
            for comp in 0..P {
                acc[comp] += l_bar * a_ij[comp];
            }

            if keep_remainder {
                let remainder: [L; P] =
                    std::array::from_fn(|comp| (one - l_bar) * a_ij[comp]);
                // Safety: 自身行表项
                unsafe {
                    pij_sh.write(base, &remainder);
                }
            }
        }

        let u_new: [L; P] = std::array::from_fn(|comp| u_i[comp] + mass_inverse * acc[comp]);

        // Safety: 自身行区间
        unsafe {
            limited_sh.write(i, &u_new);
        }

        if !view.is_admissible(&u_new) {
            report_violation(strategy, flag, warnings);
        }

        i += L::WIDTH;
    }
}
