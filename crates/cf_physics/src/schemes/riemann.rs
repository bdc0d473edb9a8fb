// crates/cf_physics/src/schemes/riemann.rs

//! 气体动力学近似黎曼求解器（Guermond-Popov 上界估计）
//!
//! 对方向 n_ij 上由 U_i、U_j 的法向分量构成的一维黎曼问题，
//! 返回最大波速 λ_max 的上界：
//!
//! 1. 构造一维黎曼数据 (ρ, v_n, p, a)，γ 取两侧代理 γ_min 的较小者
//! 2. 由双稀疏波不变量得到廉价的 p* 上界估计
//! 3. 可选地对双激波/双稀疏波函数 φ(p) 做带单调括号的牛顿
//!    迭代，相对步长 < eps 提前退出
//! 4. 在括号上端评估 λ±，返回其极大
//!
//! 所有压力以 NASG 参考压力平移 (p̂ = p + p∞)；范德瓦尔斯等
//! 允许负压的方程经 p̂ 钳制到最小正数后进入幂运算。

use std::marker::PhantomData;

use cf_config::RiemannSolverConfig;

use crate::core::lane::{negative_part, positive_part, Lane};
use crate::equations::GasDynamicsView;
use crate::schemes::RiemannSolver;

/// 一维黎曼数据
struct RiemannData<L> {
    rho: L,
    vn: L,
    p_hat: L,
    a: L,
    covolume: L,
}

/// 气体动力学波速上界求解器
pub struct GasRiemannSolver<const D: usize, const P: usize, const K: usize, V, L: Lane> {
    view: V,
    newton_max_iter: usize,
    newton_eps: f64,
    _marker: PhantomData<L>,
}

impl<const D: usize, const P: usize, const K: usize, V: Clone, L: Lane> Clone
    for GasRiemannSolver<D, P, K, V, L>
{
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            newton_max_iter: self.newton_max_iter,
            newton_eps: self.newton_eps,
            _marker: PhantomData,
        }
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> GasRiemannSolver<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    /// 创建求解器
    pub fn new(view: V, cfg: &RiemannSolverConfig) -> Self {
        Self {
            view,
            newton_max_iter: cfg.newton_max_iter,
            newton_eps: cfg.newton_eps,
            _marker: PhantomData,
        }
    }

    /// 构造一侧的一维黎曼数据
    fn riemann_data(&self, u: &[L; P], prec: &[L; K], n_ij: &[L; D], gamma: L) -> RiemannData<L> {
        let rho = self.view.filter_vacuum_density(u[0]);
        let m = V::momentum(u);
        let mut vn = L::zero();
        for d in 0..D {
            vn += m[d] * n_ij[d];
        }
        vn = vn / rho;

        let p = V::precomputed_pressure(prec);
        let p_hat = (p + L::splat(self.view.pinfty())).max(L::splat(f64::MIN_POSITIVE));
        let a = self.view.surrogate_speed_of_sound(u, gamma);
        let covolume = L::splat(1.0) - L::splat(self.view.covolume_b()) * rho;

        RiemannData {
            rho,
            vn,
            p_hat,
            a,
            covolume,
        }
    }

    /// 双稀疏波 p̂* 估计（平移压力意义下）
    fn p_star_two_rarefaction(&self, left: &RiemannData<L>, right: &RiemannData<L>, gamma: L) -> L {
        let one = L::splat(1.0);
        let alpha = (gamma - one) / (L::splat(2.0) * gamma);

        let acov_l = left.a * left.covolume;
        let acov_r = right.a * right.covolume;

        let numerator = positive_part(
            acov_l + acov_r - L::splat(0.5) * (gamma - one) * (right.vn - left.vn),
        );
        let denominator =
            acov_l * left.p_hat.pow(-alpha) + acov_r * right.p_hat.pow(-alpha);

        (numerator / denominator).pow(one / alpha)
    }

    /// 波速因子 sqrt(1 + (γ+1)/(2γ) · ((p̂ - p̂_Z)/p̂_Z)⁺)
    #[inline]
    fn wave_factor(side: &RiemannData<L>, p_hat: L, gamma: L) -> L {
        let factor = (gamma + L::splat(1.0)) / (L::splat(2.0) * gamma);
        (L::splat(1.0) + factor * positive_part((p_hat - side.p_hat) / side.p_hat)).sqrt()
    }

    /// λ_max 在候选 p̂ 处的评估
    #[inline]
    fn lambda_max_at(left: &RiemannData<L>, right: &RiemannData<L>, p_hat: L, gamma: L) -> L {
        let lambda1_minus = left.vn - left.a * Self::wave_factor(left, p_hat, gamma);
        let lambda3_plus = right.vn + right.a * Self::wave_factor(right, p_hat, gamma);
        positive_part(lambda3_plus).max(negative_part(lambda1_minus))
    }

    /// 单侧波函数 f_Z(p̂)：激波/稀疏波分支
    fn phi_side(side: &RiemannData<L>, p_hat: L, gamma: L) -> L {
        let one = L::splat(1.0);
        let alpha = (gamma - one) / (L::splat(2.0) * gamma);

        // 激波分支: (p̂ - p̂_Z) sqrt(A/(p̂ + B))
        let a_coeff =
            L::splat(2.0) * side.covolume / ((gamma + one) * side.rho);
        let b_coeff = (gamma - one) / (gamma + one) * side.p_hat;
        let shock = (p_hat - side.p_hat) * (a_coeff / (p_hat + b_coeff)).sqrt();

        // 稀疏波分支: 2 a cov/(γ-1) ((p̂/p̂_Z)^α - 1)
        let rarefaction = L::splat(2.0) * side.a * side.covolume / (gamma - one)
            * ((p_hat / side.p_hat).pow(alpha) - one);

        L::select_lt(p_hat, side.p_hat, rarefaction, shock)
    }

    /// 单侧波函数导数
    fn phi_side_derivative(side: &RiemannData<L>, p_hat: L, gamma: L) -> L {
        let one = L::splat(1.0);

        let a_coeff = L::splat(2.0) * side.covolume / ((gamma + one) * side.rho);
        let b_coeff = (gamma - one) / (gamma + one) * side.p_hat;
        let sqrt_term = (a_coeff / (p_hat + b_coeff)).sqrt();
        let shock = sqrt_term
            * (one - L::splat(0.5) * (p_hat - side.p_hat) / (p_hat + b_coeff));

        let exponent = -(gamma + one) / (L::splat(2.0) * gamma);
        let rarefaction = side.a * side.covolume / (gamma * side.p_hat)
            * (p_hat / side.p_hat).pow(exponent);

        L::select_lt(p_hat, side.p_hat, rarefaction, shock)
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> RiemannSolver<D, P, K, L>
    for GasRiemannSolver<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    fn compute(
        &self,
        u_i: &[L; P],
        u_j: &[L; P],
        prec_i: &[L; K],
        prec_j: &[L; K],
        n_ij: &[L; D],
    ) -> L {
        let gamma = self
            .view
            .precomputed_gamma_min(prec_i)
            .min(self.view.precomputed_gamma_min(prec_j));

        let left = self.riemann_data(u_i, prec_i, n_ij, gamma);
        let right = self.riemann_data(u_j, prec_j, n_ij, gamma);

        let p_star_tilde = self.p_star_two_rarefaction(&left, &right, gamma);

        if self.newton_max_iter == 0 {
            return Self::lambda_max_at(&left, &right, p_star_tilde, gamma);
        }

        // 单调括号牛顿：φ 单调增，保持 φ(p_1) <= 0 <= φ(p_2)
        let delta_v = right.vn - left.vn;
        let phi = |p: L| Self::phi_side(&left, p, gamma) + Self::phi_side(&right, p, gamma) + delta_v;
        let phi_prime =
            |p: L| Self::phi_side_derivative(&left, p, gamma) + Self::phi_side_derivative(&right, p, gamma);

        let mut p_1 = left.p_hat.min(right.p_hat).min(p_star_tilde);
        let mut p_2 = p_star_tilde.max(left.p_hat.max(right.p_hat));

        // 上端扩张：确保 φ(p_2) >= 0
        for _ in 0..2 {
            let phi_2 = phi(p_2);
            p_2 = L::select_lt(phi_2, L::zero(), L::splat(2.0) * p_2, p_2);
        }

        for _ in 0..self.newton_max_iter {
            // 早退：全部通道括号已收紧
            let gap = (p_2 - p_1) / p_2.max(L::splat(f64::MIN_POSITIVE));
            if gap.horizontal_max() < self.newton_eps {
                break;
            }

            let candidate = p_2 - phi(p_2) / phi_prime(p_2).max(L::splat(f64::MIN_POSITIVE));
            let candidate = candidate.max(p_1).min(p_2);
            let phi_c = phi(candidate);

            // φ(c) < 0 → 下端推进，否则上端收缩
            p_1 = L::select_lt(phi_c, L::zero(), candidate, p_1);
            p_2 = L::select_lt(phi_c, L::zero(), p_2, candidate);
        }

        // 在括号上端评估保证不低估
        Self::lambda_max_at(&left, &right, p_2, gamma)
    }
}

// ============================================================
// 测试
// ============================================================
