// crates/cf_physics/src/equations/shallow_water.rs

//! 浅水方程
//!
//! 状态空间 (1 + d) 维: [h, q]，q = h v 为单宽流量。
//! 预计算单分量：总能量 η = ½|q|²/h + ½ g h²，供指示器使用。
//!
//! 浅水专用策略与方程同模块：波速上界（双稀疏波 h* 估计 +
//! 激波界）、能量交换子指示器、水深/动能凸限制器。

use std::marker::PhantomData;
use std::ops::Range;

use cf_config::{IndicatorConfig, IndicatorKind, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::{negative_part, positive_part, Lane};
use crate::equations::{CharacteristicFailure, Equation, SystemView};
use crate::offline::BoundaryId;
use crate::schemes::{Indicator, Limiter, RiemannSolver, N_BOUNDS};
use crate::sparsity::SparsityPatternSimd;
use crate::state::{McShared, MultiComponentVector};

/// 预计算分量数: (η)
pub const N_PRECOMPUTED: usize = 1;

// ============================================================
// 方程捆绑
// ============================================================

/// 浅水方程
///
/// D 为空间维度，P = D + 1。
#[derive(Debug, Clone)]
pub struct ShallowWaterEquations<const D: usize, const P: usize> {
    gravity: f64,
}

impl<const D: usize, const P: usize> ShallowWaterEquations<D, P> {
    /// 创建方程
    pub fn new(gravity: f64) -> Self {
        assert_eq!(P, D + 1, "状态分量数必须为 维度 + 1");
        assert!(gravity > 0.0);
        Self { gravity }
    }

    /// 重力加速度
    #[inline]
    pub fn gravity(&self) -> f64 {
        self.gravity
    }
}

impl<const D: usize, const P: usize> Equation<D, P, N_PRECOMPUTED>
    for ShallowWaterEquations<D, P>
{
    const NAME: &'static str = "shallow water";
    const N_PRECOMPUTATION_CYCLES: usize = 1;

    type View<L: Lane> = ShallowWaterView<D, P, L>;
    type Riemann<L: Lane> = ShallowWaterRiemannSolver<D, P, L>;
    type Indicator<L: Lane> = ShallowWaterIndicator<D, P, L>;
    type Limiter<L: Lane> = ShallowWaterLimiter<D, P, L>;

    fn view<L: Lane>(&self) -> Self::View<L> {
        ShallowWaterView {
            gravity: self.gravity,
            _marker: PhantomData,
        }
    }

    fn riemann_solver<L: Lane>(&self, _cfg: &RiemannSolverConfig) -> Self::Riemann<L> {
        // 浅水双稀疏波估计本身即上界，无需牛顿细化
        ShallowWaterRiemannSolver {
            gravity: self.gravity,
            _marker: PhantomData,
        }
    }

    fn indicator<L: Lane>(&self, cfg: &IndicatorConfig) -> Self::Indicator<L> {
        ShallowWaterIndicator {
            view: self.view(),
            kind: IndicatorKind::parse(&cfg.indicator).expect("指示器名称应已通过配置校验"),
            evc_factor: cfg.evc_factor,
            h_i: L::zero(),
            d_eta_i: [L::zero(); P],
            left: L::zero(),
            right: [L::zero(); P],
            jump_numerator: L::zero(),
            jump_denominator: L::zero(),
        }
    }

    fn limiter<L: Lane>(&self, cfg: &LimiterConfig) -> Self::Limiter<L> {
        ShallowWaterLimiter {
            view: self.view(),
            relax_bounds: cfg.relax_bounds,
            relaxation_scale: 0.5f64.powi(cfg.relaxation_order as i32),
            line_search_eps: cfg.line_search_eps,
            line_search_max_iter: cfg.line_search_max_iter,
            h_i: L::zero(),
            h_min: L::zero(),
            h_max: L::zero(),
            kin_max: L::zero(),
            osc_numerator: L::zero(),
            osc_denominator: L::zero(),
        }
    }
}

// ============================================================
// 视图
// ============================================================

/// 浅水视图
#[derive(Debug)]
pub struct ShallowWaterView<const D: usize, const P: usize, L: Lane> {
    gravity: f64,
    _marker: PhantomData<L>,
}

impl<const D: usize, const P: usize, L: Lane> Clone for ShallowWaterView<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            gravity: self.gravity,
            _marker: PhantomData,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> ShallowWaterView<D, P, L> {
    /// 水深
    #[inline]
    pub fn water_depth(u: &[L; P]) -> L {
        u[0]
    }

    /// 流量
    #[inline]
    pub fn discharge(u: &[L; P]) -> [L; D] {
        std::array::from_fn(|d| u[1 + d])
    }

    /// 总能量 η = ½|q|²/h + ½ g h²
    #[inline]
    pub fn total_energy(&self, u: &[L; P]) -> L {
        let h = u[0];
        let mut q_square = L::zero();
        for d in 0..D {
            q_square += u[1 + d] * u[1 + d];
        }
        L::splat(0.5) * q_square / h.max(L::splat(f64::MIN_POSITIVE))
            + L::splat(0.5 * self.gravity) * h * h
    }

    /// 通量张量 f(U) = [q; q⊗q/h + ½gh² I]
    fn flux(&self, u: &[L; P]) -> [[L; D]; P] {
        let h = u[0];
        let h_inverse = L::splat(1.0) / h.max(L::splat(f64::MIN_POSITIVE));
        let pressure = L::splat(0.5 * self.gravity) * h * h;

        let mut result = [[L::zero(); D]; P];
        for d in 0..D {
            let q_d = u[1 + d];
            result[0][d] = q_d;
            for d2 in 0..D {
                result[1 + d2][d] = u[1 + d2] * q_d * h_inverse;
            }
            result[1 + d][d] += pressure;
        }
        result
    }
}

impl<const D: usize, const P: usize, L: Lane> SystemView<D, P, N_PRECOMPUTED, L>
    for ShallowWaterView<D, P, L>
{
    fn flux_divergence(
        &self,
        u_i: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
        u_j: &[L; P],
        _prec_j: &[L; N_PRECOMPUTED],
        c_ij: &[L; D],
    ) -> [L; P] {
        let f_i = self.flux(u_i);
        let f_j = self.flux(u_j);
        std::array::from_fn(|comp| {
            let mut acc = L::zero();
            for d in 0..D {
                acc += (f_i[comp][d] + f_j[comp][d]) * c_ij[d];
            }
            -acc
        })
    }

    fn is_admissible(&self, u: &[L; P]) -> bool {
        L::all_gt(u[0], L::zero())
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
        let mut i = rows.start;
        while i < rows.end {
            if sparsity.row_length_lane::<L>(i) == 1 {
                i += L::WIDTH;
                continue;
            }
            let u_i: [L; P] = u.get(i);
            let eta_i = self.total_energy(&u_i);
            // Safety: 行区间互不相交
            unsafe {
                precomputed.write(i, &[eta_i]);
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
        let mut result = u;

        match id {
            BoundaryId::Dirichlet => {
                result = get_dirichlet_data();
            }
            BoundaryId::DirichletMomentum => {
                let dirichlet = get_dirichlet_data();
                for d in 0..D {
                    result[1 + d] = dirichlet[1 + d];
                }
            }
            BoundaryId::Slip => {
                let mut q_dot_n = L::zero();
                for d in 0..D {
                    q_dot_n += u[1 + d] * normal[d];
                }
                for d in 0..D {
                    result[1 + d] = u[1 + d] - q_dot_n * normal[d];
                }
            }
            BoundaryId::NoSlip => {
                for d in 0..D {
                    result[1 + d] = L::zero();
                }
            }
            BoundaryId::Dynamic => {
                // 浅水特征: R_± = v·n ± 2√(gh)
                let g = L::splat(self.gravity);
                let h = u[0].max(L::splat(f64::MIN_POSITIVE));
                let mut vn = L::zero();
                for d in 0..D {
                    vn += u[1 + d] * normal[d];
                }
                vn = vn / h;
                let c = (g * h).sqrt();

                let vn0 = vn.lane(0);
                let c0 = c.lane(0);

                if vn0 < -c0 {
                    // 超临界入流
                    result = get_dirichlet_data();
                } else if vn0 <= c0 {
                    // 亚临界：入流取外侧 R_-，出流取内侧 R_+
                    let dirichlet = get_dirichlet_data();
                    let h_bar = dirichlet[0].max(L::splat(f64::MIN_POSITIVE));
                    let mut vn_bar = L::zero();
                    for d in 0..D {
                        vn_bar += dirichlet[1 + d] * normal[d];
                    }
                    vn_bar = vn_bar / h_bar;
                    let c_bar = (g * h_bar).sqrt();

                    let two = L::splat(2.0);
                    let r_plus = vn + two * c;
                    let r_minus = vn_bar - two * c_bar;

                    if !L::all_gt(r_plus - r_minus, L::splat(-f64::EPSILON)) {
                        debug_assert!(false, "浅水动力学边界特征重构失败: R_+ < R_-");
                        return Err(CharacteristicFailure);
                    }

                    let vn_new = L::splat(0.5) * (r_plus + r_minus);
                    let c_new = L::splat(0.25) * (r_plus - r_minus);
                    let h_new = c_new * c_new / g;

                    // 切向流量按内侧保持
                    let mut q_tangent = [L::zero(); D];
                    for d in 0..D {
                        q_tangent[d] = u[1 + d] - (vn * h) * normal[d];
                    }

                    result[0] = h_new;
                    for d in 0..D {
                        result[1 + d] = h_new * vn_new * normal[d]
                            + q_tangent[d] * h_new / h;
                    }
                }
                // 超临界出流：保持不变
            }
        }

        Ok(result)
    }

    fn from_primitive_state(&self, primitive: &[L; P]) -> [L; P] {
        // [h, v] → [h, q]
        let h = primitive[0];
        let mut state = *primitive;
        for d in 0..D {
            state[1 + d] = h * primitive[1 + d];
        }
        state
    }

    fn to_primitive_state(&self, state: &[L; P]) -> [L; P] {
        let h_inverse = L::splat(1.0) / state[0].max(L::splat(f64::MIN_POSITIVE));
        let mut primitive = *state;
        for d in 0..D {
            primitive[1 + d] = state[1 + d] * h_inverse;
        }
        primitive
    }
}

// ============================================================
// 波速上界
// ============================================================

/// 浅水近似黎曼求解器
///
/// 双稀疏波不变量给出 h* 估计，激波分支用
/// sqrt((1 + Δ/(2h))(1 + Δ/h)) 界；估计自身即上界。
pub struct ShallowWaterRiemannSolver<const D: usize, const P: usize, L: Lane> {
    gravity: f64,
    _marker: PhantomData<L>,
}

impl<const D: usize, const P: usize, L: Lane> Clone for ShallowWaterRiemannSolver<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            gravity: self.gravity,
            _marker: PhantomData,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> RiemannSolver<D, P, N_PRECOMPUTED, L>
    for ShallowWaterRiemannSolver<D, P, L>
{
    fn compute(
        &self,
        u_i: &[L; P],
        u_j: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
        _prec_j: &[L; N_PRECOMPUTED],
        n_ij: &[L; D],
    ) -> L {
        let g = L::splat(self.gravity);
        let tiny = L::splat(f64::MIN_POSITIVE);

        let h_l = u_i[0].max(tiny);
        let h_r = u_j[0].max(tiny);

        let mut vn_l = L::zero();
        let mut vn_r = L::zero();
        for d in 0..D {
            vn_l += u_i[1 + d] * n_ij[d];
            vn_r += u_j[1 + d] * n_ij[d];
        }
        vn_l = vn_l / h_l;
        vn_r = vn_r / h_r;

        let c_l = (g * h_l).sqrt();
        let c_r = (g * h_r).sqrt();

        // 双稀疏波中间态: c* = (c_l + c_r)/2 + (v_l - v_r)/4
        let c_star = positive_part(
            L::splat(0.5) * (c_l + c_r) + L::splat(0.25) * (vn_l - vn_r),
        );
        let h_star = c_star * c_star / g;

        let one = L::splat(1.0);
        let factor_l = ((one + positive_part(h_star - h_l) / (L::splat(2.0) * h_l))
            * (one + positive_part(h_star - h_l) / h_l))
            .sqrt();
        let factor_r = ((one + positive_part(h_star - h_r) / (L::splat(2.0) * h_r))
            * (one + positive_part(h_star - h_r) / h_r))
            .sqrt();

        let lambda1_minus = vn_l - c_l * factor_l;
        let lambda3_plus = vn_r + c_r * factor_r;

        positive_part(lambda3_plus).max(negative_part(lambda1_minus))
    }
}

// ============================================================
// 指示器
// ============================================================

/// 浅水能量交换子指示器
pub struct ShallowWaterIndicator<const D: usize, const P: usize, L: Lane> {
    view: ShallowWaterView<D, P, L>,
    kind: IndicatorKind,
    evc_factor: f64,

    h_i: L,
    d_eta_i: [L; P],
    left: L,
    right: [L; P],
    jump_numerator: L,
    jump_denominator: L,
}

impl<const D: usize, const P: usize, L: Lane> Clone for ShallowWaterIndicator<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            kind: self.kind,
            evc_factor: self.evc_factor,
            h_i: self.h_i,
            d_eta_i: self.d_eta_i,
            left: self.left,
            right: self.right,
            jump_numerator: self.jump_numerator,
            jump_denominator: self.jump_denominator,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> Indicator<D, P, N_PRECOMPUTED, L>
    for ShallowWaterIndicator<D, P, L>
{
    fn reset(&mut self, u_i: &[L; P], _prec_i: &[L; N_PRECOMPUTED]) {
        let h = u_i[0].max(L::splat(f64::MIN_POSITIVE));
        self.h_i = u_i[0];

        // η' = [g h - ½|v|², v]
        let g = L::splat(self.view.gravity);
        let mut v_square = L::zero();
        for d in 0..D {
            let v_d = u_i[1 + d] / h;
            v_square += v_d * v_d;
            self.d_eta_i[1 + d] = v_d;
        }
        self.d_eta_i[0] = g * h - L::splat(0.5) * v_square;

        self.left = L::zero();
        self.right = [L::zero(); P];
        self.jump_numerator = L::zero();
        self.jump_denominator = L::zero();
    }

    fn accumulate(&mut self, u_j: &[L; P], prec_j: &[L; N_PRECOMPUTED], c_ij: &[L; D]) {
        match self.kind {
            IndicatorKind::EntropyViscosityCommutator => {
                let h_j = u_j[0].max(L::splat(f64::MIN_POSITIVE));
                let eta_j = prec_j[0];
                let pressure_j =
                    L::splat(0.5 * self.view.gravity) * u_j[0] * u_j[0];

                // 能量通量 q = v (η + ½gh²)
                let mut q_dot_c = L::zero();
                for d in 0..D {
                    q_dot_c += u_j[1 + d] / h_j * c_ij[d];
                }
                self.left += (eta_j + pressure_j) * q_dot_c;

                let f_j = self.view.flux(u_j);
                for comp in 0..P {
                    let mut acc = L::zero();
                    for d in 0..D {
                        acc += f_j[comp][d] * c_ij[d];
                    }
                    self.right[comp] += acc;
                }
            }
            IndicatorKind::Smoothness => {
                self.jump_numerator += (u_j[0] - self.h_i).abs();
                self.jump_denominator += u_j[0].abs() + self.h_i.abs();
            }
            IndicatorKind::Zero | IndicatorKind::One => {}
        }
    }

    fn alpha(&self) -> L {
        let one = L::splat(1.0);
        match self.kind {
            IndicatorKind::EntropyViscosityCommutator => {
                let mut commutator = self.left;
                let mut denominator = self.left.abs();
                for comp in 0..P {
                    let term = self.d_eta_i[comp] * self.right[comp];
                    commutator -= term;
                    denominator += term.abs();
                }
                let ratio =
                    commutator.abs() / denominator.max(L::splat(f64::MIN_POSITIVE));
                one - (ratio * L::splat(self.evc_factor)).min(one)
            }
            IndicatorKind::Smoothness => {
                let ratio = self.jump_numerator
                    / self.jump_denominator.max(L::splat(f64::MIN_POSITIVE));
                one - (ratio * L::splat(self.evc_factor)).min(one)
            }
            IndicatorKind::Zero => L::zero(),
            IndicatorKind::One => one,
        }
    }
}

// ============================================================
// 限制器
// ============================================================

/// 浅水凸限制器：水深界 + 动能上界
pub struct ShallowWaterLimiter<const D: usize, const P: usize, L: Lane> {
    view: ShallowWaterView<D, P, L>,
    relax_bounds: f64,
    relaxation_scale: f64,
    line_search_eps: f64,
    line_search_max_iter: usize,

    h_i: L,
    h_min: L,
    h_max: L,
    kin_max: L,
    osc_numerator: L,
    osc_denominator: L,
}

impl<const D: usize, const P: usize, L: Lane> Clone for ShallowWaterLimiter<D, P, L> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            relax_bounds: self.relax_bounds,
            relaxation_scale: self.relaxation_scale,
            line_search_eps: self.line_search_eps,
            line_search_max_iter: self.line_search_max_iter,
            h_i: self.h_i,
            h_min: self.h_min,
            h_max: self.h_max,
            kin_max: self.kin_max,
            osc_numerator: self.osc_numerator,
            osc_denominator: self.osc_denominator,
        }
    }
}

impl<const D: usize, const P: usize, L: Lane> ShallowWaterLimiter<D, P, L> {
    /// 比动能 ½|q|²/h
    #[inline]
    fn kinetic_energy(u: &[L; P]) -> L {
        let mut q_square = L::zero();
        for d in 0..D {
            q_square += u[1 + d] * u[1 + d];
        }
        L::splat(0.5) * q_square / u[0].max(L::splat(f64::MIN_POSITIVE))
    }
}

impl<const D: usize, const P: usize, L: Lane> Limiter<D, P, N_PRECOMPUTED, L>
    for ShallowWaterLimiter<D, P, L>
{
    fn reset(&mut self, u_i: &[L; P], _prec_i: &[L; N_PRECOMPUTED]) {
        let h = u_i[0];
        self.h_i = h;
        self.h_min = h;
        self.h_max = h;
        self.kin_max = Self::kinetic_energy(u_i);
        self.osc_numerator = L::zero();
        self.osc_denominator = L::zero();
    }

    fn accumulate(&mut self, u_j: &[L; P], _prec_j: &[L; N_PRECOMPUTED]) {
        let h_j = u_j[0];
        self.h_min = self.h_min.min(h_j);
        self.h_max = self.h_max.max(h_j);
        self.kin_max = self.kin_max.max(Self::kinetic_energy(u_j));
        self.osc_numerator += (h_j - self.h_i).abs();
        self.osc_denominator += h_j.abs() + self.h_i.abs();
    }

    fn bounds(&self) -> [L; N_BOUNDS] {
        let oscillation =
            self.osc_numerator / self.osc_denominator.max(L::splat(f64::MIN_POSITIVE));
        let r = L::splat(self.relax_bounds * self.relaxation_scale).min(oscillation);

        [
            self.h_min - r * self.h_min.abs(),
            self.h_max + r * self.h_max.abs(),
            self.kin_max + r * self.kin_max.abs(),
            L::zero(),
        ]
    }

    fn limit(
        &self,
        bounds: &[L; N_BOUNDS],
        u: &[L; P],
        p_ij: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
    ) -> L {
        let zero = L::zero();
        let one = L::splat(1.0);
        let tiny = L::splat(f64::MIN_POSITIVE);
        let [h_min, h_max, kin_max, _] = *bounds;

        let mut l = one;

        // 水深界（线性闭式）
        let h_u = u[0];
        let h_p = p_ij[0];
        let l_upper = L::select_lt(tiny, h_p, (h_max - h_u) / h_p.max(tiny), one);
        let l_lower = L::select_lt(h_p, -tiny, (h_min - h_u) / h_p.min(-tiny), one);
        l = l.min(l_upper.max(zero)).min(l_lower.max(zero));

        // 动能上界：ψ(t) = h(t)(kin_max) - ½|q(t)|² （凹二次式）
        let psi_kinetic = |t: L| {
            let candidate: [L; P] = std::array::from_fn(|c| u[c] + t * p_ij[c]);
            let mut q_square = L::zero();
            for d in 0..D {
                q_square += candidate[1 + d] * candidate[1 + d];
            }
            candidate[0].max(tiny) * kin_max - L::splat(0.5) * q_square
        };

        let psi_hi = psi_kinetic(l);
        if !L::all_gt(psi_hi, L::splat(-f64::MIN_POSITIVE)) {
            let mut l_lo = L::select_lt(psi_hi, zero, zero, l);
            let mut l_hi = l;
            for _ in 0..self.line_search_max_iter {
                if (l_hi - l_lo).horizontal_max() < self.line_search_eps {
                    break;
                }
                let psi_lo = psi_kinetic(l_lo);
                let psi_h = psi_kinetic(l_hi);
                let denominator = (psi_lo - psi_h).max(tiny);
                let candidate = (l_lo + psi_lo * (l_hi - l_lo) / denominator)
                    .max(l_lo)
                    .min(l_hi);
                let psi_c = psi_kinetic(candidate);
                l_lo = L::select_lt(psi_c, zero, l_lo, candidate);
                l_hi = L::select_lt(psi_c, zero, candidate, l_hi);
            }
            l = l_lo;
        }

        l.max(zero).min(one)
    }
}

// ============================================================
// 测试
// ============================================================
