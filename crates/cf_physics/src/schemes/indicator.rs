// crates/cf_physics/src/schemes/indicator.rs

//! 气体动力学光滑度指示器
//!
//! 参考实现是熵粘性交换子：离散熵方程残差
//! |∇·(η v) - η'(U)·(∇·f)| 以各项幅值之和归一化，比值大处
//! （激波附近）压向低阶。备选实现：密度跳量光滑度指示器，
//! 以及回归测试用的恒零/恒一指示器。
//!
//! 约定 α = 1 为完整高阶修正，α = 0 为纯低阶。

use cf_config::{IndicatorConfig, IndicatorKind};

use crate::core::lane::Lane;
use crate::equations::GasDynamicsView;
use crate::schemes::Indicator;

/// 气体动力学指示器（运行时选择具体准则）
pub struct GasIndicator<const D: usize, const P: usize, const K: usize, V, L: Lane> {
    view: V,
    kind: IndicatorKind,
    evc_factor: f64,

    // 行累加状态
    rho_i: L,
    eta_i: L,
    d_eta_i: [L; P],
    /// 熵通量散度 Σ_j (η_j/ρ_j) m_j · c_ij
    left: L,
    /// 通量散度 Σ_j f(U_j) · c_ij
    right: [L; P],
    /// 跳量累加（光滑度指示器）
    jump_numerator: L,
    jump_denominator: L,
}

impl<const D: usize, const P: usize, const K: usize, V: Clone, L: Lane> Clone
    for GasIndicator<D, P, K, V, L>
{
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            kind: self.kind,
            evc_factor: self.evc_factor,
            rho_i: self.rho_i,
            eta_i: self.eta_i,
            d_eta_i: self.d_eta_i,
            left: self.left,
            right: self.right,
            jump_numerator: self.jump_numerator,
            jump_denominator: self.jump_denominator,
        }
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> GasIndicator<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    /// 创建指示器
    ///
    /// 指示器名称已在配置校验阶段解析，未知名称不可能到达这里。
    pub fn new(view: V, cfg: &IndicatorConfig) -> Self {
        let kind = IndicatorKind::parse(&cfg.indicator)
            .expect("指示器名称应已通过配置校验");
        Self {
            view,
            kind,
            evc_factor: cfg.evc_factor,
            rho_i: L::zero(),
            eta_i: L::zero(),
            d_eta_i: [L::zero(); P],
            left: L::zero(),
            right: [L::zero(); P],
            jump_numerator: L::zero(),
            jump_denominator: L::zero(),
        }
    }
}

impl<const D: usize, const P: usize, const K: usize, V, L: Lane> Indicator<D, P, K, L>
    for GasIndicator<D, P, K, V, L>
where
    V: GasDynamicsView<D, P, K, L>,
{
    fn reset(&mut self, u_i: &[L; P], prec_i: &[L; K]) {
        self.rho_i = u_i[0];
        self.eta_i = V::precomputed_harten_entropy(prec_i);
        let gamma_min = self.view.precomputed_gamma_min(prec_i);
        self.d_eta_i = self
            .view
            .surrogate_harten_entropy_derivative(u_i, self.eta_i, gamma_min);
        self.left = L::zero();
        self.right = [L::zero(); P];
        self.jump_numerator = L::zero();
        self.jump_denominator = L::zero();
    }

    fn accumulate(&mut self, u_j: &[L; P], prec_j: &[L; K], c_ij: &[L; D]) {
        match self.kind {
            IndicatorKind::EntropyViscosityCommutator => {
                let rho_j_inverse = L::splat(1.0) / u_j[0];
                let eta_j = V::precomputed_harten_entropy(prec_j);
                let m_j = V::momentum(u_j);

                // 熵通量 q = η v: ∇·q ≈ Σ_j (η_j/ρ_j) m_j·c_ij
                let mut m_dot_c = L::zero();
                for d in 0..D {
                    m_dot_c += m_j[d] * c_ij[d];
                }
                self.left += eta_j * rho_j_inverse * m_dot_c;

                let p_j = V::precomputed_pressure(prec_j);
                let f_j = self.view.flux(u_j, p_j);
                for comp in 0..P {
                    let mut acc = L::zero();
                    for d in 0..D {
                        acc += f_j[comp][d] * c_ij[d];
                    }
                    self.right[comp] += acc;
                }
            }
            IndicatorKind::Smoothness => {
                let rho_j = u_j[0];
                self.jump_numerator += (rho_j - self.rho_i).abs();
                self.jump_denominator += rho_j.abs() + self.rho_i.abs();
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

                // 归一化残差 ∈ [0,1]；η 幅值正则化避免零对零
                let regularization =
                    L::splat(f64::EPSILON) * self.eta_i.abs().max(L::splat(f64::MIN_POSITIVE));
                let ratio = commutator.abs() / (denominator + regularization);
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
// 测试
// ============================================================
