// crates/cf_physics/src/equations/navier_stokes.rs

//! Navier-Stokes 方程
//!
//! 双曲部分与多方欧拉一致；隐式抛物（粘性）子步是外部协作者，
//! 此处以占位求解器挂接，保证方程分派完整。

use cf_config::{IndicatorConfig, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::Lane;
use crate::equations::euler::{EulerEquations, EulerView, N_PRECOMPUTED};
use crate::equations::Equation;
use crate::schemes::indicator::GasIndicator;
use crate::schemes::limiter::GasLimiter;
use crate::schemes::riemann::GasRiemannSolver;

/// 抛物子步占位求解器
///
/// 真正的粘性求解在外部协作者中完成；本类型只维持分派结构。
#[derive(Debug, Clone, Copy, Default)]
pub struct StubParabolicSolver;

impl StubParabolicSolver {
    /// 占位子步：恒等
    pub fn step(&self, _t: f64, _tau: f64) {}
}

/// Navier-Stokes 方程（双曲部分 + 抛物占位）
#[derive(Debug, Clone)]
pub struct NavierStokesEquations<const D: usize, const P: usize> {
    hyperbolic: EulerEquations<D, P>,
    parabolic: StubParabolicSolver,
}

impl<const D: usize, const P: usize> NavierStokesEquations<D, P> {
    /// 创建方程
    pub fn new(gamma: f64) -> Self {
        Self {
            hyperbolic: EulerEquations::new(gamma),
            parabolic: StubParabolicSolver,
        }
    }

    /// 抛物协作者
    #[inline]
    pub fn parabolic_solver(&self) -> &StubParabolicSolver {
        &self.parabolic
    }
}

impl<const D: usize, const P: usize> Equation<D, P, N_PRECOMPUTED>
    for NavierStokesEquations<D, P>
{
    const NAME: &'static str = "navier stokes";
    const N_PRECOMPUTATION_CYCLES: usize = 1;

    type View<L: Lane> = EulerView<D, P, L>;
    type Riemann<L: Lane> = GasRiemannSolver<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;
    type Indicator<L: Lane> = GasIndicator<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;
    type Limiter<L: Lane> = GasLimiter<D, P, N_PRECOMPUTED, EulerView<D, P, L>, L>;

    fn view<L: Lane>(&self) -> Self::View<L> {
        self.hyperbolic.view()
    }

    fn riemann_solver<L: Lane>(&self, cfg: &RiemannSolverConfig) -> Self::Riemann<L> {
        self.hyperbolic.riemann_solver(cfg)
    }

    fn indicator<L: Lane>(&self, cfg: &IndicatorConfig) -> Self::Indicator<L> {
        self.hyperbolic.indicator(cfg)
    }

    fn limiter<L: Lane>(&self, cfg: &LimiterConfig) -> Self::Limiter<L> {
        self.hyperbolic.limiter(cfg)
    }
}
