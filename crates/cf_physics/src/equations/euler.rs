// crates/cf_physics/src/equations/euler.rs

//! 多方气体可压缩欧拉方程
//!
//! 状态空间 (2 + d) 维: [ρ, m, E]。多方情形所有代理量退化为
//! 精确量：γ 为常数，熵与声速有闭式表达，预计算单循环填充
//! (p, s, η)。

use std::marker::PhantomData;
use std::ops::Range;

use cf_config::{IndicatorConfig, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::{safe_division, Lane};
use crate::equations::gas_common;
use crate::equations::{CharacteristicFailure, Equation, GasDynamicsView, SystemView};
use crate::offline::BoundaryId;
use crate::schemes::indicator::GasIndicator;
use crate::schemes::limiter::GasLimiter;
use crate::schemes::riemann::GasRiemannSolver;
use crate::sparsity::SparsityPatternSimd;
use crate::state::{McShared, MultiComponentVector};

/// 预计算分量数: (p, s, η)
pub const N_PRECOMPUTED: usize = 3;

// ============================================================
// 方程捆绑
// ============================================================

/// 多方欧拉方程
///
/// D 为空间维度，P = D + 2。
#[derive(Debug, Clone)]
pub struct EulerEquations<const D: usize, const P: usize> {
    gamma: f64,
}

impl<const D: usize, const P: usize> EulerEquations<D, P> {
    /// 创建方程，γ 为比热比
    pub fn new(gamma: f64) -> Self {
        assert_eq!(P, D + 2, "状态分量数必须为 维度 + 2");
        assert!(gamma > 1.0);
        Self { gamma }
    }

    /// 比热比
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl<const D: usize, const P: usize> Equation<D, P, N_PRECOMPUTED> for EulerEquations<D, P> {
    const NAME: &'static str = "euler";
    const N_PRECOMPUTATION_CYCLES: usize = 1;

    type View<L: Lane> = EulerView<D, P, L>;
    type Riemann<L: Lane> = GasRiemannSolver<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;
    type Indicator<L: Lane> = GasIndicator<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;
    type Limiter<L: Lane> = GasLimiter<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;

    fn view<L: Lane>(&self) -> Self::View<L> {
        EulerView {
            gamma: self.gamma,
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

/// 多方欧拉视图
#[derive(Debug)]
pub struct EulerView<const D: usize, const P: usize, L: Lane> {
    gamma: f64,
    _marker: PhantomData<L>,
}

impl<const D: usize, const P: usize, L: Lane> Clone for EulerView<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            gamma: self.gamma,
            _marker: PhantomData,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> EulerView<D, P, L> {
    /// EOS 压力 p = (γ-1) ρe
    #[inline]
    fn pressure(&self, u: &[L; P]) -> L {
        L::splat(self.gamma - 1.0) * Self::internal_energy(u)
    }
}

impl<const D: usize, const P: usize, L: Lane> SystemView<D, P, N_PRECOMPUTED, L>
    for EulerView<D, P, L>
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
        let rho = Self::density(u);
        let rho_e = Self::internal_energy(u);
        L::all_gt(rho, L::zero()) && L::all_gt(rho_e, L::zero())
    }

    fn precomputation_chunk(
        &self,
        cycle: usize,
        u: &MultiComponentVector<P>,
        precomputed: &McShared<'_, N_PRECOMPUTED>,
        sparsity: &SparsityPatternSimd<D>,
        rows: Range<usize>,
    ) {
        debug_assert_eq!(cycle, 0);
        let gamma = L::splat(self.gamma);

        let mut i = rows.start;
        while i < rows.end {
            if sparsity.row_length_lane::<L>(i) == 1 {
                i += L::WIDTH;
                continue;
            }

            let u_i: [L; P] = u.get(i);
            let p_i = self.pressure(&u_i);
            let s_i = self.surrogate_specific_entropy(&u_i, gamma);
            let eta_i = self.surrogate_harten_entropy(&u_i, gamma);

            // Safety: 行区间互不相交
            unsafe {
                precomputed.write(i, &[p_i, s_i, eta_i]);
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
            |u| self.pressure(u),
            id,
            u,
            normal,
            get_dirichlet_data,
        )
    }

    fn from_primitive_state(&self, primitive: &[L; P]) -> [L; P] {
        // [ρ, v, e] → [ρ, m, E]
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

impl<const D: usize, const P: usize, L: Lane> GasDynamicsView<D, P, N_PRECOMPUTED, L>
    for EulerView<D, P, L>
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
        // (ρe)' = [½|v|², -v, 1]
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
    fn precomputed_gamma_min(&self, _prec: &[L; N_PRECOMPUTED]) -> L {
        L::splat(self.gamma)
    }

    #[inline]
    fn precomputed_specific_entropy(prec: &[L; N_PRECOMPUTED]) -> L {
        prec[1]
    }

    #[inline]
    fn precomputed_harten_entropy(prec: &[L; N_PRECOMPUTED]) -> L {
        prec[2]
    }

    #[inline]
    fn covolume_b(&self) -> f64 {
        0.0
    }

    #[inline]
    fn pinfty(&self) -> f64 {
        0.0
    }

    #[inline]
    fn q(&self) -> f64 {
        0.0
    }

    #[inline]
    fn surrogate_specific_entropy(&self, u: &[L; P], gamma_min: L) -> L {
        // s = ρe · ρ^{-γ}
        let rho = Self::density(u);
        Self::internal_energy(u) * rho.pow(-gamma_min)
    }

    #[inline]
    fn surrogate_harten_entropy(&self, u: &[L; P], gamma_min: L) -> L {
        // η = (ρ · ρe)^{1/(γ+1)}
        let sigma = Self::density(u) * Self::internal_energy(u);
        let exponent = L::splat(1.0) / (gamma_min + L::splat(1.0));
        sigma.max(L::zero()).pow(exponent)
    }

    fn surrogate_harten_entropy_derivative(&self, u: &[L; P], eta: L, gamma_min: L) -> [L; P] {
        // σ = ρ E - ½|m|², η = σ^{1/(γ+1)}
        // η' = η^{-γ} / (γ+1) · [E, -m, ρ]
        let rho = Self::density(u);
        let e_total = Self::total_energy(u);

        let mut m_norm = L::zero();
        for d in 0..D {
            m_norm += u[1 + d] * u[1 + d];
        }
        m_norm = m_norm.sqrt();

        let eps = L::splat(f64::EPSILON);
        let regularized = eta.max(m_norm * eps).max(eps);
        let factor = regularized.pow(-gamma_min) / (gamma_min + L::splat(1.0));

        let mut result = [L::zero(); P];
        result[0] = factor * e_total;
        for d in 0..D {
            result[1 + d] = -factor * u[1 + d];
        }
        result[1 + D] = factor * rho;
        result
    }

    #[inline]
    fn surrogate_gamma(&self, u: &[L; P], p: L) -> L {
        L::splat(1.0) + safe_division(p, Self::internal_energy(u))
    }

    #[inline]
    fn surrogate_pressure(&self, u: &[L; P], gamma: L) -> L {
        (gamma - L::splat(1.0)) * Self::internal_energy(u)
    }

    #[inline]
    fn surrogate_speed_of_sound(&self, u: &[L; P], gamma: L) -> L {
        // c² = γ(γ-1) ρe / ρ
        let radicand =
            gamma * (gamma - L::splat(1.0)) * safe_division(Self::internal_energy(u), u[0]);
        radicand.sqrt()
    }

    fn flux(&self, u: &[L; P], p: L) -> [[L; D]; P] {
        let rho_inverse = L::splat(1.0) / u[0];
        let e_total = Self::total_energy(u);

        let mut result = [[L::zero(); D]; P];
        for d in 0..D {
            let m_d = u[1 + d];
            // 质量行
            result[0][d] = m_d;
            // 动量行 v ⊗ m + p I
            for d2 in 0..D {
                result[1 + d2][d] = u[1 + d2] * m_d * rho_inverse;
            }
            result[1 + d][d] += p;
            // 能量行 v (E + p)
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

    type Euler1 = EulerEquations<1, 3>;

    fn view() -> EulerView<1, 3, f64> {
        Euler1::new(1.4).view()
    }

    #[test]
    fn test_primitive_roundtrip_exact() {
        let v = view();
        let u = [1.2, 0.6, 3.0];
        let prim = v.to_primitive_state(&u);
        let back = v.from_primitive_state(&prim);
        for c in 0..3 {
            assert!((back[c] - u[c]).abs() < 1e-14, "分量 {} 回转失败", c);
        }
    }

    #[test]
    fn test_surrogate_pressure_gamma_inverse() {
        let v = view();
        let u = [1.2, 0.6, 3.0];
        let p = 0.7;
        let gamma = v.surrogate_gamma(&u, p);
        assert!((v.surrogate_pressure(&u, gamma) - p).abs() < 1e-13);
    }

    #[test]
    fn test_admissibility() {
        let v = view();
        assert!(v.is_admissible(&[1.0, 0.0, 1.0]));
        // ρe = 1 - 0.5·4 < 0
        assert!(!v.is_admissible(&[1.0, 2.0, 1.0]));
        assert!(!v.is_admissible(&[-1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_flux_mass_row() {
        let v = view();
        let u = [2.0, 1.0, 4.0];
        let p = v.pressure(&u);
        let f = v.flux(&u, p);
        assert_eq!(f[0][0], 1.0);
        // 动量行: m v + p
        assert!((f[1][0] - (1.0 * 0.5 + p)).abs() < 1e-14);
    }

    #[test]
    fn test_flux_divergence_antisymmetric_interior() {
        // c_ji = -c_ij 时 fd_ji = -fd_ij
        let v = view();
        let u_i = [1.0, 0.3, 2.0];
        let u_j = [0.8, -0.1, 1.5];
        let prec_i = [v.pressure(&u_i), 0.0, 0.0];
        let prec_j = [v.pressure(&u_j), 0.0, 0.0];
        let fd_ij = v.flux_divergence(&u_i, &prec_i, &u_j, &prec_j, &[0.5]);
        let fd_ji = v.flux_divergence(&u_j, &prec_j, &u_i, &prec_i, &[-0.5]);
        for c in 0..3 {
            assert!((fd_ij[c] + fd_ji[c]).abs() < 1e-14);
        }
    }

    #[test]
    fn test_harten_entropy_derivative_consistency() {
        // 方向导数 η'(U)·δ ≈ (η(U+hδ) - η(U-hδ)) / 2h
        let v = view();
        let gamma = 1.4;
        let u = [1.3, 0.4, 2.8];
        let eta = v.surrogate_harten_entropy(&u, gamma);
        let d_eta = v.surrogate_harten_entropy_derivative(&u, eta, gamma);

        let delta = [0.01, -0.02, 0.03];
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
            (numeric - analytic).abs() < 1e-6,
            "numeric={} analytic={}",
            numeric,
            analytic
        );
    }
}
