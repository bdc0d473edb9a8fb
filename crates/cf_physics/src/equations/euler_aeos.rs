// crates/cf_physics/src/equations/euler_aeos.rs

//! 任意状态方程可压缩欧拉方程 (AEOS)
//!
//! 真实 γ 不存在时，以 NASG 插值构造代理 γ / 代理压力 /
//! 代理熵，供黎曼求解器、指示器与限制器使用。
//!
//! 预计算分两个循环（循环间有屏障）：
//! - cycle 0: p_i ← EOS(ρ_i, e_i)，γ_i ← 代理 γ(U_i, p_i)
//! - cycle 1: γ_min,i ← min 一环 γ_j（由 p_j 重算，避免读取
//!   本循环正在覆写的分量），随后 s_i、η_i
//!
//! cycle 0 有两种执行模式：逐通道标量 EOS 调用；或按
//! `prefer_vector_interface` 聚集 ρ/e 到临时数组、单次批量调用
//! 后散射回去（服务于调用开销大的表格库）。

use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use cf_config::{HyperbolicSystemConfig, IndicatorConfig, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::{positive_part, safe_division, Lane};
use crate::eos::EquationOfState;
use crate::equations::gas_common;
use crate::equations::{CharacteristicFailure, Equation, GasDynamicsView, SystemView};
use crate::offline::BoundaryId;
use crate::schemes::indicator::GasIndicator;
use crate::schemes::limiter::GasLimiter;
use crate::schemes::riemann::GasRiemannSolver;
use crate::sparsity::SparsityPatternSimd;
use crate::state::{McShared, MultiComponentVector};

/// 预计算分量数: (p, γ_min, s, η)
pub const N_PRECOMPUTED: usize = 4;

// ============================================================
// 方程捆绑
// ============================================================

/// 任意状态方程欧拉方程
pub struct EulerAeosEquations<const D: usize, const P: usize> {
    eos: Arc<dyn EquationOfState>,
    reference_density: f64,
    vacuum_state_relaxation_large: f64,
    compute_strict_bounds: bool,
}

impl<const D: usize, const P: usize> EulerAeosEquations<D, P> {
    /// 从状态方程与系统配置创建
    pub fn new(eos: Arc<dyn EquationOfState>, cfg: &HyperbolicSystemConfig) -> Self {
        assert_eq!(P, D + 2, "状态分量数必须为 维度 + 2");
        Self {
            eos,
            reference_density: cfg.reference_density,
            vacuum_state_relaxation_large: cfg.vacuum_state_relaxation_large,
            compute_strict_bounds: cfg.compute_strict_bounds,
        }
    }

    /// 状态方程
    #[inline]
    pub fn eos(&self) -> &Arc<dyn EquationOfState> {
        &self.eos
    }

    /// 是否计算严格界
    #[inline]
    pub fn compute_strict_bounds(&self) -> bool {
        self.compute_strict_bounds
    }
}

impl<const D: usize, const P: usize> Equation<D, P, N_PRECOMPUTED>
    for EulerAeosEquations<D, P>
{
    const NAME: &'static str = "euler aeos";
    const N_PRECOMPUTATION_CYCLES: usize = 2;

    type View<L: Lane> = EulerAeosView<D, P, L>;
    type Riemann<L: Lane> = GasRiemannSolver<D, P, N_PRECOMPUTED, EulerAeosView<D, P, L>, L>;
    type Indicator<L: Lane> = GasIndicator<D, P, N_PRECOMPUTED, EulerAeosView<D, P, L>, L>;
    type Limiter<L: Lane> = GasLimiter<D, P, N_PRECOMPUTED, EulerAeosView<D, P, L>, L>;

    fn view<L: Lane>(&self) -> Self::View<L> {
        EulerAeosView {
            eos: self.eos.clone(),
            b: self.eos.interpolation_b(),
            pinf: self.eos.interpolation_pinfty(),
            q: self.eos.interpolation_q(),
            reference_density: self.reference_density,
            vacuum_state_relaxation_large: self.vacuum_state_relaxation_large,
            _marker: PhantomData,
        }
    }

    fn riemann_solver<L: Lane>(&self, cfg: &RiemannSolverConfig) -> Self::Riemann<L> {
        GasRiemannSolver::new(self.view(), cfg)
    }

    fn indicator<L: Lane>(&self, cfg: &IndicatorConfig) -> Self::Indicator<L> {
        GasIndicator::new(self.view(), cfg)
    }

    fn limiter<L: Lane>(&self, cfg: &LimiterConfig) -> Self::Limiter<L> {
        GasLimiter::new(self.view(), cfg)
    }
}

// ============================================================
// 视图
// ============================================================

/// AEOS 视图
pub struct EulerAeosView<const D: usize, const P: usize, L: Lane> {
    eos: Arc<dyn EquationOfState>,
    b: f64,
    pinf: f64,
    q: f64,
    reference_density: f64,
    vacuum_state_relaxation_large: f64,
    _marker: PhantomData<L>,
}

impl<const D: usize, const P: usize, L: Lane> Clone for EulerAeosView<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            eos: self.eos.clone(),
            b: self.b,
            pinf: self.pinf,
            q: self.q,
            reference_density: self.reference_density,
            vacuum_state_relaxation_large: self.vacuum_state_relaxation_large,
            _marker: PhantomData,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> EulerAeosView<D, P, L> {
    /// 逐通道 EOS 压力查询
    #[inline]
    fn eos_pressure(&self, rho: L, e: L) -> L {
        rho.zip_map(e, |r, e| self.eos.pressure(r, e))
    }

    /// 由守恒状态查询 EOS 压力
    #[inline]
    fn eos_pressure_of_state(&self, u: &[L; P]) -> L {
        let rho = u[0];
        let e = Self::internal_energy(u) / rho;
        self.eos_pressure(rho, e)
    }

    /// 共容积 1 - bρ
    #[inline]
    fn covolume(&self, rho: L) -> L {
        L::splat(1.0) - L::splat(self.b) * rho
    }

    /// 内能平移量 ρe - ρq - p∞(1 - bρ)
    #[inline]
    fn energy_shift(&self, u: &[L; P]) -> L {
        let rho = u[0];
        Self::internal_energy(u) - rho * L::splat(self.q)
            - L::splat(self.pinf) * self.covolume(rho)
    }
}

impl<const D: usize, const P: usize, L: Lane> SystemView<D, P, N_PRECOMPUTED, L>
    for EulerAeosView<D, P, L>
{
    fn flux_divergence(
        &self,
        u_i: &[L; P],
        prec_i: &[L; N_PRECOMPUTED],
        u_j: &[L; P],
        prec_j: &[L; N_PRECOMPUTED],
        c_ij: &[L; D],
    ) -> [L; P] {
        let f_i = self.flux(u_i, Self::precomputed_pressure(prec_i));
        let f_j = self.flux(u_j, Self::precomputed_pressure(prec_j));
        gas_common::flux_divergence::<D, P, L>(&f_i, &f_j, c_ij)
    }

    fn is_admissible(&self, u: &[L; P]) -> bool {
        let rho = u[0];
        let shift = self.energy_shift(u);
        L::all_gt(rho, L::zero()) && L::all_gt(shift, L::zero())
    }

    fn precomputation_chunk(
        &self,
        cycle: usize,
        u: &MultiComponentVector<P>,
        precomputed: &McShared<'_, N_PRECOMPUTED>,
        sparsity: &SparsityPatternSimd<D>,
        rows: Range<usize>,
    ) {
        debug_assert!(cycle < 2);

        if cycle == 0 {
            if self.eos.prefer_vector_interface() {
                self.precompute_cycle0_vector(u, precomputed, sparsity, rows);
            } else {
                self.precompute_cycle0_scalar(u, precomputed, sparsity, rows);
            }
            return;
        }

        // cycle 1: 模板最小代理 γ 与熵
        let mut i = rows.start;
        while i < rows.end {
            let row_length = sparsity.row_length_lane::<L>(i);
            if row_length == 1 {
                i += L::WIDTH;
                continue;
            }

            let u_i: [L; P] = u.get(i);
            // Safety: 分量 0 (压力) 在本循环全局只读
            let prec_i: [L; N_PRECOMPUTED] = unsafe { precomputed.get(i) };
            let p_i = prec_i[0];
            let mut gamma_min_i = self.surrogate_gamma(&u_i, p_i);

            for c in 1..row_length {
                let base = sparsity.entry_base::<L>(i, c);
                let js = sparsity.columns_at(base, L::WIDTH);
                let u_j: [L; P] = u.gather(js);
                // Safety: 同上，仅读分量 0
                let p_j: L = unsafe { precomputed.gather_component(0, js) };
                let gamma_j = self.surrogate_gamma(&u_j, p_j);
                gamma_min_i = gamma_min_i.min(gamma_j);
            }

            let s_i = self.surrogate_specific_entropy(&u_i, gamma_min_i);
            let eta_i = self.surrogate_harten_entropy(&u_i, gamma_min_i);

            // Safety: 只覆写自身行的分量 1..4，压力分量保持只读
            unsafe {
                precomputed.write_component(1, i, gamma_min_i);
                precomputed.write_component(2, i, s_i);
                precomputed.write_component(3, i, eta_i);
            }
            i += L::WIDTH;
        }
    }

    fn apply_boundary_conditions(
        &self,
        id: BoundaryId,
        u: [L; P],
        normal: &[L; D],
        get_dirichlet_data: &dyn Fn() -> [L; P],
    ) -> Result<[L; P], CharacteristicFailure> {
        gas_common::apply_boundary_conditions(
            self,
            |u| self.eos_pressure_of_state(u),
            id,
            u,
            normal,
            get_dirichlet_data,
        )
    }

    fn from_primitive_state(&self, primitive: &[L; P]) -> [L; P] {
        let rho = primitive[0];
        let mut state = *primitive;
        let mut v_square = L::zero();
        for d in 0..D {
            state[1 + d] = rho * primitive[1 + d];
            v_square += primitive[1 + d] * primitive[1 + d];
        }
        state[1 + D] = rho * primitive[1 + D] + L::splat(0.5) * rho * v_square;
        state
    }

    fn to_primitive_state(&self, state: &[L; P]) -> [L; P] {
        let rho = state[0];
        let rho_inverse = L::splat(1.0) / rho;
        let rho_e = Self::internal_energy(state);
        let mut primitive = *state;
        for d in 0..D {
            primitive[1 + d] = state[1 + d] * rho_inverse;
        }
        primitive[1 + D] = rho_e * rho_inverse;
        primitive
    }
}

impl<const D: usize, const P: usize, L: Lane> EulerAeosView<D, P, L> {
    /// cycle 0 标量模式：逐自由度调用 EOS
    fn precompute_cycle0_scalar(
        &self,
        u: &MultiComponentVector<P>,
        precomputed: &McShared<'_, N_PRECOMPUTED>,
        sparsity: &SparsityPatternSimd<D>,
        rows: Range<usize>,
    ) {
        let mut i = rows.start;
        while i < rows.end {
            if sparsity.row_length_lane::<L>(i) == 1 {
                i += L::WIDTH;
                continue;
            }

            let u_i: [L; P] = u.get(i);
            let rho_i = u_i[0];
            let e_i = Self::internal_energy(&u_i) / rho_i;
            let p_i = self.eos_pressure(rho_i, e_i);
            let gamma_i = self.surrogate_gamma(&u_i, p_i);

            // Safety: 行区间互不相交
            unsafe {
                precomputed.write(i, &[p_i, gamma_i, L::zero(), L::zero()]);
            }
            i += L::WIDTH;
        }
    }

    /// cycle 0 批量模式：聚集 ρ/e → 单次批量 EOS → 散射
    ///
    /// 受约束自由度也填充物理值，保证批量数组整段可容许。
    fn precompute_cycle0_vector(
        &self,
        u: &MultiComponentVector<P>,
        precomputed: &McShared<'_, N_PRECOMPUTED>,
        sparsity: &SparsityPatternSimd<D>,
        rows: Range<usize>,
    ) {
        let size = rows.end - rows.start;
        let mut rho = vec![0.0f64; size];
        let mut e = vec![0.0f64; size];
        let mut p = vec![0.0f64; size];

        let mut i = rows.start;
        while i < rows.end {
            let u_i: [L; P] = u.get(i);
            let rho_i = u_i[0];
            let e_i = Self::internal_energy(&u_i) / rho_i;
            rho_i.store(&mut rho, i - rows.start);
            e_i.store(&mut e, i - rows.start);
            i += L::WIDTH;
        }

        self.eos.pressure_batch(&mut p, &rho, &e);

        let mut i = rows.start;
        while i < rows.end {
            if sparsity.row_length_lane::<L>(i) == 1 {
                i += L::WIDTH;
                continue;
            }

            let u_i: [L; P] = u.get(i);
            let p_i = L::load(&p, i - rows.start);
            let gamma_i = self.surrogate_gamma(&u_i, p_i);

            // Safety: 行区间互不相交
            unsafe {
                precomputed.write(i, &[p_i, gamma_i, L::zero(), L::zero()]);
            }
            i += L::WIDTH;
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> GasDynamicsView<D, P, N_PRECOMPUTED, L>
    for EulerAeosView<D, P, L>
{
    #[inline]
    fn internal_energy(u: &[L; P]) -> L {
        let rho_inverse = L::splat(1.0) / u[0];
        let mut m_square = L::zero();
        for d in 0..D {
            m_square += u[1 + d] * u[1 + d];
        }
        u[1 + D] - L::splat(0.5) * m_square * rho_inverse
    }

    #[inline]
    fn internal_energy_derivative(u: &[L; P]) -> [L; P] {
        let rho_inverse = L::splat(1.0) / u[0];
        let mut result = [L::zero(); P];
        let mut v_square = L::zero();
        for d in 0..D {
            let v_d = u[1 + d] * rho_inverse;
            v_square += v_d * v_d;
            result[1 + d] = -v_d;
        }
        result[0] = L::splat(0.5) * v_square;
        result[1 + D] = L::splat(1.0);
        result
    }

    #[inline]
    fn precomputed_pressure(prec: &[L; N_PRECOMPUTED]) -> L {
        prec[0]
    }

    #[inline]
    fn precomputed_gamma_min(&self, prec: &[L; N_PRECOMPUTED]) -> L {
        prec[1]
    }

    #[inline]
    fn precomputed_specific_entropy(prec: &[L; N_PRECOMPUTED]) -> L {
        prec[2]
    }

    #[inline]
    fn precomputed_harten_entropy(prec: &[L; N_PRECOMPUTED]) -> L {
        prec[3]
    }

    #[inline]
    fn covolume_b(&self) -> f64 {
        self.b
    }

    #[inline]
    fn pinfty(&self) -> f64 {
        self.pinf
    }

    #[inline]
    fn q(&self) -> f64 {
        self.q
    }

    #[inline]
    fn filter_vacuum_density(&self, rho: L) -> L {
        let cutoff =
            L::splat(self.reference_density * self.vacuum_state_relaxation_large * f64::EPSILON);
        L::select_lt(rho.abs(), cutoff, L::zero(), rho)
    }

    #[inline]
    fn surrogate_specific_entropy(&self, u: &[L; P], gamma_min: L) -> L {
        // s = [ρ(e - q) - p∞(1 - bρ)] (1/ρ - b)^{γ_min} / (1 - bρ)
        let rho = u[0];
        let rho_inverse = L::splat(1.0) / rho;
        let covolume = self.covolume(rho);
        let shift = self.energy_shift(u);
        shift * (rho_inverse - L::splat(self.b)).pow(gamma_min) / covolume
    }

    #[inline]
    fn surrogate_harten_entropy(&self, u: &[L; P], gamma_min: L) -> L {
        // η = {[ρ²(e - q) - ρ p∞(1 - bρ)]⁺ (1 - bρ)^{γ_min - 1}}^{1/(γ_min + 1)}
        let rho = u[0];
        let e_total = u[1 + D];
        let mut m_square = L::zero();
        for d in 0..D {
            m_square += u[1 + d] * u[1 + d];
        }

        let rho_rho_e_q =
            rho * e_total - L::splat(0.5) * m_square - rho * rho * L::splat(self.q);
        let covolume = self.covolume(rho);
        let covolume_term = covolume.pow(gamma_min - L::splat(1.0));
        let rho_pinf_cov = rho * L::splat(self.pinf) * covolume;

        let exponent = L::splat(1.0) / (gamma_min + L::splat(1.0));
        (positive_part(rho_rho_e_q - rho_pinf_cov) * covolume_term).pow(exponent)
    }

    fn surrogate_harten_entropy_derivative(&self, u: &[L; P], eta: L, gamma_min: L) -> [L; P] {
        let one = L::splat(1.0);
        let rho = u[0];
        let e_total = u[1 + D];

        let mut m_square = L::zero();
        for d in 0..D {
            m_square += u[1 + d] * u[1 + d];
        }
        let m_norm = m_square.sqrt();

        let covolume = self.covolume(rho);
        let covolume_inverse = one / covolume;

        let shift = rho * e_total - L::splat(0.5) * m_square - rho * rho * L::splat(self.q)
            - rho * L::splat(self.pinf) * covolume;

        let regularization = m_norm * L::splat(f64::EPSILON);
        let mut factor = regularization
            .max(eta * covolume_inverse)
            .max(L::splat(f64::MIN_POSITIVE))
            .pow(-gamma_min);
        factor = factor * covolume_inverse * covolume_inverse / (gamma_min + one);

        let first_term = e_total - L::splat(2.0) * rho * L::splat(self.q)
            - L::splat(self.pinf) * (one - L::splat(2.0 * self.b) * rho);
        let second_term = -(gamma_min - one) * shift * L::splat(self.b);

        let mut result = [L::zero(); P];
        result[0] = factor * (covolume * first_term + second_term);
        for d in 0..D {
            result[1 + d] = -factor * covolume * u[1 + d];
        }
        result[1 + D] = factor * covolume * rho;
        result
    }

    #[inline]
    fn surrogate_gamma(&self, u: &[L; P], p: L) -> L {
        let rho = u[0];
        let covolume = self.covolume(rho);
        let numerator = (p + L::splat(self.pinf)) * covolume;
        let denominator = self.energy_shift(u);
        L::splat(1.0) + safe_division(numerator, denominator)
    }

    #[inline]
    fn surrogate_pressure(&self, u: &[L; P], gamma: L) -> L {
        let rho = u[0];
        let covolume = self.covolume(rho);
        let rho_e = Self::internal_energy(u);
        positive_part(gamma - L::splat(1.0))
            * safe_division(rho_e - rho * L::splat(self.q), covolume)
            - gamma * L::splat(self.pinf)
    }

    #[inline]
    fn surrogate_speed_of_sound(&self, u: &[L; P], gamma: L) -> L {
        // c² = γ(γ-1)[ρ(e-q) - p∞(1-bρ)] / (ρ(1-bρ)²)
        let rho = u[0];
        let covolume = self.covolume(rho);
        let shift = self.energy_shift(u);
        let radicand = gamma * (gamma - L::splat(1.0)) * shift / (covolume * covolume * rho);
        positive_part(radicand).sqrt()
    }

    fn flux(&self, u: &[L; P], p: L) -> [[L; D]; P] {
        let rho_inverse = L::splat(1.0) / u[0];
        let e_total = u[1 + D];

        let mut result = [[L::zero(); D]; P];
        for d in 0..D {
            let m_d = u[1 + d];
            result[0][d] = m_d;
            for d2 in 0..D {
                result[1 + d2][d] = u[1 + d2] * m_d * rho_inverse;
            }
            result[1 + d][d] += p;
            result[1 + D][d] = m_d * rho_inverse * (e_total + p);
        }
        result
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::{NobleAbelStiffenedGas, PolytropicGas};
    use cf_config::HyperbolicSystemConfig;

    type Aeos1 = EulerAeosEquations<1, 3>;

    fn nasg_view() -> EulerAeosView<1, 3, f64> {
        let eos = Arc::new(NobleAbelStiffenedGas::new(1.6, 0.05, 2.0, 0.1, 0.4));
        Aeos1::new(eos, &HyperbolicSystemConfig::default()).view()
    }

    #[test]
    fn test_surrogate_gamma_pressure_inverse() {
        let v = nasg_view();
        let u = [1.5, 0.3, 8.0];
        let p = 1.2;
        let gamma = v.surrogate_gamma(&u, p);
        let p_back = v.surrogate_pressure(&u, gamma);
        assert!((p_back - p).abs() < 1e-11, "p={} p_back={}", p, p_back);
    }

    #[test]
    fn test_polytropic_limit_matches_euler() {
        // b = p∞ = q = 0 时 AEOS 代理量与多方闭式一致
        let eos = Arc::new(PolytropicGas::new(1.4, 0.4));
        let v: EulerAeosView<1, 3, f64> =
            Aeos1::new(eos, &HyperbolicSystemConfig::default()).view();

        let u = [1.2, 0.5, 3.0];
        let rho_e = EulerAeosView::<1, 3, f64>::internal_energy(&u);
        let p = 0.4 * rho_e;
        let gamma = v.surrogate_gamma(&u, p);
        assert!((gamma - 1.4).abs() < 1e-12);

        let c = v.surrogate_speed_of_sound(&u, gamma);
        let c_expected = (1.4 * p / 1.2).sqrt();
        assert!((c - c_expected).abs() < 1e-12);
    }

    #[test]
    fn test_admissibility_with_shift() {
        let v = nasg_view();
        // 充足内能
        assert!(v.is_admissible(&[1.0, 0.0, 10.0]));
        // 内能低于 NASG 平移下界
        assert!(!v.is_admissible(&[1.0, 0.0, 0.5]));
    }

    #[test]
    fn test_vacuum_filter() {
        let v = nasg_view();
        assert_eq!(v.filter_vacuum_density(1.0e-30), 0.0);
        assert_eq!(v.filter_vacuum_density(0.5), 0.5);
    }

    #[test]
    fn test_specific_entropy_derivative_consistency() {
        // 方向导数 s'(U)·δ ≈ (s(U+hδ) - s(U-hδ)) / 2h
        let v = nasg_view();
        let gamma = 1.5;
        let u = [1.3, 0.4, 9.0];
        let ds = v.surrogate_specific_entropy_derivative(&u, gamma);

        let delta = [0.02, -0.01, 0.04];
        let h = 1.0e-6;
        let mut u_plus = u;
        let mut u_minus = u;
        for c in 0..3 {
            u_plus[c] += h * delta[c];
            u_minus[c] -= h * delta[c];
        }
        let numeric = (v.surrogate_specific_entropy(&u_plus, gamma)
            - v.surrogate_specific_entropy(&u_minus, gamma))
            / (2.0 * h);
        let analytic: f64 = (0..3).map(|c| ds[c] * delta[c]).sum();
        assert!(
            (numeric - analytic).abs() / analytic.abs().max(1.0) < 1e-5,
            "numeric={} analytic={}",
            numeric,
            analytic
        );
    }

    #[test]
    fn test_harten_entropy_derivative_consistency() {
        let v = nasg_view();
        let gamma = 1.5;
        let u = [1.3, 0.4, 9.0];
        let eta = v.surrogate_harten_entropy(&u, gamma);
        let d_eta = v.surrogate_harten_entropy_derivative(&u, eta, gamma);

        let delta = [0.01, -0.02, 0.05];
        let h = 1.0e-6;
        let mut u_plus = u;
        let mut u_minus = u;
        for c in 0..3 {
            u_plus[c] += h * delta[c];
            u_minus[c] -= h * delta[c];
        }
        let numeric = (v.surrogate_harten_entropy(&u_plus, gamma)
            - v.surrogate_harten_entropy(&u_minus, gamma))
            / (2.0 * h);
        let analytic: f64 = (0..3).map(|c| d_eta[c] * delta[c]).sum();
        assert!(
            (numeric - analytic).abs() / analytic.abs().max(1.0) < 1e-5,
            "numeric={} analytic={}",
            numeric,
            analytic
        );
    }
}
