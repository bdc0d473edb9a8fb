// crates/cf_physics/src/equations/skeleton.rs

//! 骨架方程
//!
//! 最小化的方程模板：单分量守恒量、零通量、零波速、恒一限制。
//! 新方程从这里复制起步；同时作为引擎回归测试的空转对象。

use std::marker::PhantomData;
use std::ops::Range;

use cf_config::{IndicatorConfig, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::Lane;
use crate::equations::{CharacteristicFailure, Equation, SystemView};
use crate::offline::BoundaryId;
use crate::schemes::{Indicator, Limiter, RiemannSolver, N_BOUNDS};
use crate::sparsity::SparsityPatternSimd;
use crate::state::{McShared, MultiComponentVector};

/// 预计算分量数
pub const N_PRECOMPUTED: usize = 0;

/// 骨架方程（单分量）
#[derive(Debug, Clone, Default)]
pub struct SkeletonEquations<const D: usize, const P: usize>;

impl<const D: usize, const P: usize> Equation<D, P, N_PRECOMPUTED> for SkeletonEquations<D, P> {
    const NAME: &'static str = "skeleton";
    const N_PRECOMPUTATION_CYCLES: usize = 0;

    type View<L: Lane> = SkeletonView<D, P, L>;
    type Riemann<L: Lane> = SkeletonRiemann<D, P, L>;
    type Indicator<L: Lane> = SkeletonIndicator<D, P, L>;
    type Limiter<L: Lane> = SkeletonLimiter<D, P, L>;

    fn view<L: Lane>(&self) -> Self::View<L> {
        SkeletonView(PhantomData)
    }

    fn riemann_solver<L: Lane>(&self, _cfg: &RiemannSolverConfig) -> Self::Riemann<L> {
        SkeletonRiemann(PhantomData)
    }

    fn indicator<L: Lane>(&self, _cfg: &IndicatorConfig) -> Self::Indicator<L> {
        SkeletonIndicator(PhantomData)
    }

    fn limiter<L: Lane>(&self, _cfg: &LimiterConfig) -> Self::Limiter<L> {
        SkeletonLimiter(PhantomData)
    }
}

/// 骨架视图：零通量恒容许
#[derive(Debug)]
pub struct SkeletonView<const D: usize, const P: usize, L: Lane>(PhantomData<L>);

impl<const D: usize, const P: usize, L: Lane> Clone for SkeletonView<D, P, L> {
    fn clone(&self) -> Self {
        SkeletonView(PhantomData)
    }
}

impl<const D: usize, const P: usize, L: Lane> SystemView<D, P, N_PRECOMPUTED, L>
    for SkeletonView<D, P, L>
{
    fn flux_divergence(
        &self,
        _u_i: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
        _u_j: &[L; P],
        _prec_j: &[L; N_PRECOMPUTED],
        _c_ij: &[L; D],
    ) -> [L; P] {
        [L::zero(); P]
    }

    fn is_admissible(&self, _u: &[L; P]) -> bool {
        true
    }

    fn precomputation_chunk(
        &self,
        _cycle: usize,
        _u: &MultiComponentVector<P>,
        _precomputed: &McShared<'_, N_PRECOMPUTED>,
        _sparsity: &SparsityPatternSimd<D>,
        _rows: Range<usize>,
    ) {
    }

    fn apply_boundary_conditions(
        &self,
        _id: BoundaryId,
        u: [L; P],
        _normal: &[L; D],
        _get_dirichlet_data: &dyn Fn() -> [L; P],
    ) -> Result<[L; P], CharacteristicFailure> {
        Ok(u)
    }

    fn from_primitive_state(&self, primitive: &[L; P]) -> [L; P] {
        *primitive
    }

    fn to_primitive_state(&self, state: &[L; P]) -> [L; P] {
        *state
    }
}

/// 骨架波速：恒零
#[derive(Debug)]
pub struct SkeletonRiemann<const D: usize, const P: usize, L: Lane>(PhantomData<L>);

impl<const D: usize, const P: usize, L: Lane> Clone for SkeletonRiemann<D, P, L> {
    fn clone(&self) -> Self {
        SkeletonRiemann(PhantomData)
    }
}

impl<const D: usize, const P: usize, L: Lane> RiemannSolver<D, P, N_PRECOMPUTED, L>
    for SkeletonRiemann<D, P, L>
{
    fn compute(
        &self,
        _u_i: &[L; P],
        _u_j: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
        _prec_j: &[L; N_PRECOMPUTED],
        _n_ij: &[L; D],
    ) -> L {
        L::zero()
    }
}

/// 骨架指示器：恒一（全高阶）
#[derive(Debug)]
pub struct SkeletonIndicator<const D: usize, const P: usize, L: Lane>(PhantomData<L>);

impl<const D: usize, const P: usize, L: Lane> Clone for SkeletonIndicator<D, P, L> {
    fn clone(&self) -> Self {
        SkeletonIndicator(PhantomData)
    }
}

impl<const D: usize, const P: usize, L: Lane> Indicator<D, P, N_PRECOMPUTED, L>
    for SkeletonIndicator<D, P, L>
{
    fn reset(&mut self, _u_i: &[L; P], _prec_i: &[L; N_PRECOMPUTED]) {}

    fn accumulate(&mut self, _u_j: &[L; P], _prec_j: &[L; N_PRECOMPUTED], _c_ij: &[L; D]) {}

    fn alpha(&self) -> L {
        L::splat(1.0)
    }
}

/// 骨架限制器：恒一（全接受）
#[derive(Debug)]
pub struct SkeletonLimiter<const D: usize, const P: usize, L: Lane>(PhantomData<L>);

impl<const D: usize, const P: usize, L: Lane> Clone for SkeletonLimiter<D, P, L> {
    fn clone(&self) -> Self {
        SkeletonLimiter(PhantomData)
    }
}

impl<const D: usize, const P: usize, L: Lane> Limiter<D, P, N_PRECOMPUTED, L>
    for SkeletonLimiter<D, P, L>
{
    fn reset(&mut self, _u_i: &[L; P], _prec_i: &[L; N_PRECOMPUTED]) {}

    fn accumulate(&mut self, _u_j: &[L; P], _prec_j: &[L; N_PRECOMPUTED]) {}

    fn bounds(&self) -> [L; N_BOUNDS] {
        [L::zero(); N_BOUNDS]
    }

    fn limit(
        &self,
        _bounds: &[L; N_BOUNDS],
        _u: &[L; P],
        _p_ij: &[L; P],
        _prec_i: &[L; N_PRECOMPUTED],
    ) -> L {
        L::splat(1.0)
    }
}
