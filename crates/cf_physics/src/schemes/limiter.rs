// crates/cf_physics/src/schemes/limiter.rs

//! 气体动力学凸限制器
//!
//! 对边 (i,j) 与高阶候选增量 P_ij，求最大 l_ij ∈ [0,1] 使
//! U_i^L + l_ij P_ij 满足三组局部界：
//!
//! 1. ρ_min ≤ ρ ≤ ρ_max —— ρ 沿 l 线性，闭式求解
//! 2. 平移内能 ρ(e-q) - p∞(1-bρ) ≥ ε_min —— 乘 ρ 后是 l 的
//!    凹二次式，用带括号的牛顿/割线线搜索
//! 3. 代理比熵 s(U) ≥ s_min —— 同一线搜索机制
//!
//! 界取自低阶候选的一环（含自身），并按局部振荡限制的因子
//! 松弛。线搜索返回可行括号下端，因此结果恒为安全下界；
//! 多约束取最小，活跃约束的并列自动偏向较小 l。

use cf_config::LimiterConfig;

use crate::core::lane::Lane;
use crate::equations::GasDynamicsView;
use crate::schemes::{Limiter, N_BOUNDS};

/// 气体动力学限制器
pub struct GasLimiter<const D: usize, const P: usize, const K: usize, V, L: Lane> {
    view: V,
    /// 松弛因子上限（0 关闭）
    relax_bounds: f64,
    /// 松弛衰减 2^{-order}
    relaxation_scale: f64,
    line_search_eps: f64,
    line_search_max_iter: usize,

    // 行累加状态
    rho_i: L,
    rho_min: L,
    rho_max: L,
    eps_min: L,
    s_min: L,
    osc_numerator: L,
    osc_denominator: L,
}

impl<const D: usize, const P: usize, const K: usize, V: Clone, L: Lane> Clone
    for GasLimiter<D, P, K, V, L>
{
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            relax_bounds: self.relax_bounds,
            relaxation_scale: self.relaxation_scale,
            line_search_eps: self.line_search_eps,
            line_search_max_iter: self.line_search_max_iter,
            rho_i: self.rho_i,
            rho_min: self.rho_min,
            rho_max: self.rho_max,
            eps_min: self.eps_min,
            s_min: self.s_min,
            osc_numerator: self.osc_numerator,
            osc_denominator: self.osc_denominator,
        }
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> GasLimiter<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    /// 创建限制器
    pub fn new(view: V, cfg: &LimiterConfig) -> Self {
        Self {
            view,
            relax_bounds: cfg.relax_bounds,
            relaxation_scale: 0.5f64.powi(cfg.relaxation_order as i32),
            line_search_eps: cfg.line_search_eps,
            line_search_max_iter: cfg.line_search_max_iter,
            rho_i: L::zero(),
            rho_min: L::zero(),
            rho_max: L::zero(),
            eps_min: L::zero(),
            s_min: L::zero(),
            osc_numerator: L::zero(),
            osc_denominator: L::zero(),
        }
    }

    /// 平移内能 ρ(e-q) - p∞(1-bρ)
    #[inline]
    fn energy_shift(&self, u: &[L; P]) -> L {
        let rho = u[0];
        let covolume = L::splat(1.0) - L::splat(self.view.covolume_b()) * rho;
        V::internal_energy(u) - rho * L::splat(self.view.q())
            - L::splat(self.view.pinfty()) * covolume
    }

    /// 带括号的牛顿/割线线搜索
    ///
    /// 前置条件 ψ(0) ≥ 0（界由一环含自身构造保证）。在 [0, l_hi]
    /// 内求 ψ ≥ 0 的最大 l：每轮先从不可行端做牛顿步
    /// l - ψ/ψ'，落在括号外或 ψ' 退化时回退为割线步；逐通道
    /// 维护括号并返回可行下端。
    fn line_search(
        &self,
        psi: impl Fn(L) -> L,
        psi_prime: impl Fn(L) -> L,
        l_initial: L,
    ) -> L {
        let zero = L::zero();

        // ψ(l_hi) ≥ 0 的通道无需搜索
        let psi_initial = psi(l_initial);
        if L::all_gt(psi_initial, L::splat(-f64::MIN_POSITIVE)) {
            return l_initial;
        }
        let mut l_lo = L::select_lt(psi_initial, zero, zero, l_initial);
        let mut l_hi = l_initial;

        for _ in 0..self.line_search_max_iter {
            if (l_hi - l_lo).horizontal_max() < self.line_search_eps {
                break;
            }

            let psi_lo = psi(l_lo);
            let psi_hi = psi(l_hi);

            // 牛顿步：根的右侧 ψ 递减，斜率钳制远离零
            let slope = psi_prime(l_hi).min(L::splat(-f64::MIN_POSITIVE));
            let newton = l_hi - psi_hi / slope;

            // 割线步兜底，分母钳制防除零
            let denominator = (psi_lo - psi_hi).max(L::splat(f64::MIN_POSITIVE));
            let secant = l_lo + psi_lo * (l_hi - l_lo) / denominator;

            // 牛顿步落在括号内则采用，否则退回割线步
            let in_lower = L::select_lt(l_lo, newton, newton, secant);
            let candidate = L::select_lt(newton, l_hi, in_lower, secant)
                .max(l_lo)
                .min(l_hi);

            let psi_c = psi(candidate);
            // ψ(c) ≥ 0 → 下端推进；否则上端收缩
            l_lo = L::select_lt(psi_c, zero, l_lo, candidate);
            l_hi = L::select_lt(psi_c, zero, candidate, l_hi);
        }

        l_lo
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> Limiter<D, P, K, L>
    for GasLimiter<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    fn reset(&mut self, u_i: &[L; P], prec_i: &[L; K]) {
        let rho = u_i[0];
        self.rho_i = rho;
        self.rho_min = rho;
        self.rho_max = rho;
        self.eps_min = self.energy_shift(u_i);
        self.s_min = V::precomputed_specific_entropy(prec_i);
        self.osc_numerator = L::zero();
        self.osc_denominator = L::zero();
    }

    fn accumulate(&mut self, u_j: &[L; P], prec_j: &[L; K]) {
        let rho_j = u_j[0];
        self.rho_min = self.rho_min.min(rho_j);
        self.rho_max = self.rho_max.max(rho_j);
        self.eps_min = self.eps_min.min(self.energy_shift(u_j));
        self.s_min = self.s_min.min(V::precomputed_specific_entropy(prec_j));
        self.osc_numerator += (rho_j - self.rho_i).abs();
        self.osc_denominator += rho_j.abs() + self.rho_i.abs();
    }

    fn bounds(&self) -> [L; N_BOUNDS] {
        // 松弛量 r = min(relax_bounds · 2^{-order}, 局部振荡)
        let oscillation =
            self.osc_numerator / self.osc_denominator.max(L::splat(f64::MIN_POSITIVE));
        let r = L::splat(self.relax_bounds * self.relaxation_scale).min(oscillation);

        // 符号安全松弛 b ∓ r·|b|
        [
            self.rho_min - r * self.rho_min.abs(),
            self.rho_max + r * self.rho_max.abs(),
            self.eps_min - r * self.eps_min.abs(),
            self.s_min - r * self.s_min.abs(),
        ]
    }

    fn limit(&self, bounds: &[L; N_BOUNDS], u: &[L; P], p_ij: &[L; P], prec_i: &[L; K]) -> L {
        let zero = L::zero();
        let one = L::splat(1.0);
        let tiny = L::splat(f64::MIN_POSITIVE);
        let [rho_min, rho_max, eps_min, s_min] = *bounds;

        let mut l = one;

        // -------- 1. 密度界（ρ 沿 l 线性，闭式） --------
        let rho_u = u[0];
        let rho_p = p_ij[0];
        // 上界: ρ_u + l ρ_p ≤ ρ_max （ρ_p > 0 时有效）
        let l_upper = L::select_lt(tiny, rho_p, (rho_max - rho_u) / rho_p.max(tiny), one);
        // 下界: ρ_u + l ρ_p ≥ ρ_min （ρ_p < 0 时有效）
        let l_lower = L::select_lt(rho_p, -tiny, (rho_min - rho_u) / rho_p.min(-tiny), one);
        l = l.min(l_upper.max(zero)).min(l_lower.max(zero));

        // -------- 2. 内能正性（乘 ρ 后的凹二次式） --------
        let eps_min_captured = eps_min;
        let psi_energy = |t: L| {
            let candidate: [L; P] = std::array::from_fn(|c| u[c] + t * p_ij[c]);
            candidate[0] * (self.energy_shift(&candidate) - eps_min_captured)
        };
        // dψ/dl = ρ'·(shift - ε) + ρ·[(ρe)'·P + (p∞b - q)ρ']
        let shift_correction =
            L::splat(self.view.pinfty() * self.view.covolume_b() - self.view.q());
        let psi_energy_prime = |t: L| {
            let candidate: [L; P] = std::array::from_fn(|c| u[c] + t * p_ij[c]);
            let de = V::internal_energy_derivative(&candidate);
            let mut d_rho_e = L::zero();
            for c in 0..P {
                d_rho_e += de[c] * p_ij[c];
            }
            let d_shift = d_rho_e + shift_correction * p_ij[0];
            p_ij[0] * (self.energy_shift(&candidate) - eps_min_captured)
                + candidate[0] * d_shift
        };
        l = self.line_search(psi_energy, psi_energy_prime, l);

        // -------- 3. 比熵下界 --------
        let gamma_min = self.view.precomputed_gamma_min(prec_i);
        let psi_entropy = |t: L| {
            let candidate: [L; P] = std::array::from_fn(|c| u[c] + t * p_ij[c]);
            self.view.surrogate_specific_entropy(&candidate, gamma_min) - s_min
        };
        let psi_entropy_prime = |t: L| {
            let candidate: [L; P] = std::array::from_fn(|c| u[c] + t * p_ij[c]);
            let ds = self
                .view
                .surrogate_specific_entropy_derivative(&candidate, gamma_min);
            let mut directional = L::zero();
            for c in 0..P {
                directional += ds[c] * p_ij[c];
            }
            directional
        };
        l = self.line_search(psi_entropy, psi_entropy_prime, l);

        l.max(zero).min(one)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::euler::EulerEquations;
    use crate::equations::{Equation, SystemView};
    use crate::schemes::Limiter as _;

    type Euler1 = EulerEquations<1, 3>;

    fn limiter() -> GasLimiter<1, 3, 3, crate::equations::euler::EulerView<1, 3, f64>, f64> {
        Euler1::new(1.4).limiter(&LimiterConfig::default())
    }

    fn precomputed(
        view: &crate::equations::euler::EulerView<1, 3, f64>,
        u: &[f64; 3],
    ) -> [f64; 3] {
        [
            view.surrogate_pressure(u, 1.4),
            view.surrogate_specific_entropy(u, 1.4),
            view.surrogate_harten_entropy(u, 1.4),
        ]
    }

    #[test]
    fn test_zero_increment_full_high_order() {
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();
        let u = view.from_primitive_state(&[1.0, 0.2, 2.0]);
        let prec = precomputed(&view, &u);

        lim.reset(&u, &prec);
        lim.accumulate(&u, &prec);
        let bounds = lim.bounds();

        let l = lim.limit(&bounds, &u, &[0.0, 0.0, 0.0], &prec);
        assert!((l - 1.0).abs() < 1e-14, "零增量必须完全接受: {}", l);
    }

    #[test]
    fn test_density_upper_bound_enforced() {
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();
        lim.relax_bounds = 0.0;

        let u = view.from_primitive_state(&[1.0, 0.0, 2.0]);
        let prec = precomputed(&view, &u);
        lim.reset(&u, &prec);
        lim.accumulate(&u, &prec);
        let bounds = lim.bounds();

        // 纯密度增量 +0.5：界是 [ρ_i, ρ_i] → l = 0
        let p = [0.5, 0.0, 0.0];
        let l = lim.limit(&bounds, &u, &p, &prec);
        assert!(l < 1e-12, "密度上界失效: l = {}", l);
    }

    #[test]
    fn test_density_bound_partial_acceptance() {
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();
        lim.relax_bounds = 0.0;

        let u_i = view.from_primitive_state(&[1.0, 0.0, 2.0]);
        let u_j = view.from_primitive_state(&[1.2, 0.0, 2.0]);
        let prec_i = precomputed(&view, &u_i);
        let prec_j = precomputed(&view, &u_j);

        lim.reset(&u_i, &prec_i);
        lim.accumulate(&u_i, &prec_i);
        lim.accumulate(&u_j, &prec_j);
        let mut bounds = lim.bounds();
        // 放开内能与熵界，只考密度上界
        bounds[2] = -1.0e10;
        bounds[3] = -1.0e10;

        // 密度增量 +0.5 超出 ρ_max = 1.2 → l = 0.4
        let p = [0.5, 0.0, 0.0];
        let l = lim.limit(&bounds, &u_i, &p, &prec_i);
        assert!((l - 0.4).abs() < 1e-10, "期望 l = 0.4, 实际 {}", l);
    }

    #[test]
    fn test_internal_energy_positivity() {
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();
        lim.relax_bounds = 0.0;
        lim.line_search_max_iter = 32;

        // 候选增量将把总能量压到动能以下
        let u = view.from_primitive_state(&[1.0, 1.0, 1.0]);
        let prec = precomputed(&view, &u);
        lim.reset(&u, &prec);
        lim.accumulate(&u, &prec);
        let mut bounds = lim.bounds();
        // 放开密度与熵界，只考内能
        bounds[0] = 0.0;
        bounds[1] = 10.0;
        bounds[2] = 0.0;
        bounds[3] = -1.0e10;

        let p = [0.0, 0.0, -2.0];
        let l = lim.limit(&bounds, &u, &p, &prec);

        // U + lP 的内能必须非负
        let candidate = [u[0], u[1], u[2] + l * p[2]];
        let rho_e = candidate[2] - 0.5 * candidate[1] * candidate[1] / candidate[0];
        assert!(rho_e >= -1e-12, "限制后内能为负: {}", rho_e);
        // 完整增量会违约，l 必须小于 1
        assert!(l < 1.0);
    }

    #[test]
    fn test_limiter_idempotent() {
        // 同一界下二次限制结果不变
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();

        let u_i = view.from_primitive_state(&[1.0, 0.1, 2.0]);
        let u_j = view.from_primitive_state(&[0.9, 0.0, 1.8]);
        let prec_i = precomputed(&view, &u_i);
        let prec_j = precomputed(&view, &u_j);

        lim.reset(&u_i, &prec_i);
        lim.accumulate(&u_i, &prec_i);
        lim.accumulate(&u_j, &prec_j);
        let bounds = lim.bounds();

        let p = [-0.05, 0.02, -0.1];
        let l_1 = lim.limit(&bounds, &u_i, &p, &prec_i);
        let l_2 = lim.limit(&bounds, &u_i, &p, &prec_i);
        assert_eq!(l_1, l_2);
    }

    #[test]
    fn test_symmetric_min_is_safe() {
        // l = min(l_ij, l_ji) 仍满足双方约束（l 越小越安全）
        let eq = Euler1::new(1.4);
        let view = eq.view::<f64>();
        let mut lim = limiter();
        lim.relax_bounds = 0.0;

        let u_i = view.from_primitive_state(&[1.0, 0.0, 2.0]);
        let u_j = view.from_primitive_state(&[1.1, 0.0, 2.0]);
        let prec_i = precomputed(&view, &u_i);
        let prec_j = precomputed(&view, &u_j);

        lim.reset(&u_i, &prec_i);
        lim.accumulate(&u_i, &prec_i);
        lim.accumulate(&u_j, &prec_j);
        let bounds_i = lim.bounds();

        let p = [0.2, 0.0, 0.1];
        let l_ij = lim.limit(&bounds_i, &u_i, &p, &prec_i);

        let candidate = [
            u_i[0] + 0.5 * l_ij * p[0],
            u_i[1],
            u_i[2] + 0.5 * l_ij * p[2],
        ];
        // 更小的 l 不会违反密度上界
        assert!(candidate[0] <= bounds_i[1] + 1e-12);
    }
}
