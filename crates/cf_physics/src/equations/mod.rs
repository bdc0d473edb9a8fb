// crates/cf_physics/src/equations/mod.rs

//! 方程族
//!
//! 每个方程以一个零状态的捆绑类型实现 [`Equation`]，在编译期
//! 绑定四个策略提供者：双曲系统视图、近似黎曼求解器、指示器、
//! 限制器。步进控制器对 (方程 × 通道) 单态化，边循环内无任何
//! 动态分派。
//!
//! 提供的方程：多方欧拉 (euler)、任意状态方程欧拉 (euler_aeos)、
//! 浅水 (shallow_water)、骨架模板 (skeleton)、以及复用欧拉双曲
//! 部分并挂接抛物协作者占位的 navier_stokes。

pub mod euler;
pub mod euler_aeos;
pub(crate) mod gas_common;
pub mod navier_stokes;
pub mod registry;
pub mod shallow_water;
pub mod skeleton;

use std::ops::Range;

use cf_config::{IndicatorConfig, LimiterConfig, RiemannSolverConfig};

use crate::core::lane::Lane;
use crate::offline::BoundaryId;
use crate::schemes::{Indicator, Limiter, RiemannSolver};
use crate::sparsity::SparsityPatternSimd;
use crate::state::{McShared, MultiComponentVector};

pub use crate::schemes::N_BOUNDS;

/// 黎曼特征重构失败（动力学边界 R_2 < R_1）
///
/// 调试构建断言终止；发布构建升级为 Restart 由调用方重试。
#[derive(Debug, Clone, Copy)]
pub struct CharacteristicFailure;

/// 双曲系统视图
///
/// 视图只读借用方程的物理常数，并按通道类型 L 单态化。
/// 遍历内核以 `L = f64x4` 驱动 SIMD 前缀、以 `L = f64` 驱动
/// 标量余段，两者执行同一份实现。
pub trait SystemView<const D: usize, const P: usize, const K: usize, L: Lane>:
    Clone + Send + Sync
{
    /// 低阶图通量 -(f(U_i) + f(U_j)) · c_ij
    fn flux_divergence(
        &self,
        u_i: &[L; P],
        prec_i: &[L; K],
        u_j: &[L; P],
        prec_j: &[L; K],
        c_ij: &[L; D],
    ) -> [L; P];

    /// 状态可容许性（向量化状态须全部通道可容许）
    fn is_admissible(&self, u: &[L; P]) -> bool;

    /// 预计算块循环
    ///
    /// 由步进控制器按 cycle 依次驱动，cycle 之间存在全局屏障。
    /// `rows` 为连续行区间（SIMD 驱动时按通道宽度对齐），行长为 1
    /// 的受约束行必须跳过。写入经由共享视图，行区间互不相交。
    fn precomputation_chunk(
        &self,
        cycle: usize,
        u: &MultiComponentVector<P>,
        precomputed: &McShared<'_, K>,
        sparsity: &SparsityPatternSimd<D>,
        rows: Range<usize>,
    );

    /// 按边界类别施加边界算子
    ///
    /// dynamic 类别在亚音速分支做黎曼特征重构，数值上可能出现
    /// R_2 < R_1，以 [`CharacteristicFailure`] 上抛。
    fn apply_boundary_conditions(
        &self,
        id: BoundaryId,
        u: [L; P],
        normal: &[L; D],
        get_dirichlet_data: &dyn Fn() -> [L; P],
    ) -> Result<[L; P], CharacteristicFailure>;

    /// 原始变量 → 守恒变量
    fn from_primitive_state(&self, primitive: &[L; P]) -> [L; P];

    /// 守恒变量 → 原始变量
    fn to_primitive_state(&self, state: &[L; P]) -> [L; P];
}

/// 气体动力学视图扩展
///
/// 欧拉与欧拉-AEOS 视图的公共面，黎曼求解器 / 指示器 / 限制器
/// 的气体实现对此泛型，多方情形的代理量退化为精确量
/// (b = p∞ = q = 0, γ_min ≡ γ)。
pub trait GasDynamicsView<const D: usize, const P: usize, const K: usize, L: Lane>:
    SystemView<D, P, K, L>
{
    /// 密度 U[0]
    #[inline]
    fn density(u: &[L; P]) -> L {
        u[0]
    }

    /// 动量 [U[1], ..., U[D]]
    #[inline]
    fn momentum(u: &[L; P]) -> [L; D] {
        std::array::from_fn(|d| u[1 + d])
    }

    /// 总能量 U[1+D]
    #[inline]
    fn total_energy(u: &[L; P]) -> L {
        u[1 + D]
    }

    /// 内能 ρe = E - |m|²/(2ρ)
    fn internal_energy(u: &[L; P]) -> L;

    /// 内能对守恒状态的导数
    fn internal_energy_derivative(u: &[L; P]) -> [L; P];

    /// 预计算元组: 压力
    fn precomputed_pressure(prec: &[L; K]) -> L;

    /// 预计算元组: 模板上的最小代理 γ（多方: 常数 γ）
    fn precomputed_gamma_min(&self, prec: &[L; K]) -> L;

    /// 预计算元组: 比熵代理
    fn precomputed_specific_entropy(prec: &[L; K]) -> L;

    /// 预计算元组: Harten 熵代理
    fn precomputed_harten_entropy(prec: &[L; K]) -> L;

    /// NASG 共容积 b
    fn covolume_b(&self) -> f64;

    /// NASG 参考压力 p∞
    fn pinfty(&self) -> f64;

    /// NASG 参考比内能 q
    fn q(&self) -> f64;

    /// 真空密度过滤：幅值低于松弛截断时归零（AEOS 覆写，默认恒等）
    #[inline]
    fn filter_vacuum_density(&self, rho: L) -> L {
        rho
    }

    /// 代理比熵 s(U, γ_min)
    fn surrogate_specific_entropy(&self, u: &[L; P], gamma_min: L) -> L;

    /// 代理比熵导数 s'(U)
    ///
    /// s = shift · X，shift = ρe - ρq - p∞(1-bρ)，X = (1/ρ - b)^γ/(1-bρ)。
    /// X 只依赖 ρ：dX/dρ = X (bρ - γ)/(ρ(1-bρ))；其余分量沿
    /// 内能导数传播。限制器熵界的牛顿步使用。
    fn surrogate_specific_entropy_derivative(&self, u: &[L; P], gamma_min: L) -> [L; P] {
        let one = L::splat(1.0);
        let b = L::splat(self.covolume_b());
        let pinf = L::splat(self.pinfty());
        let q = L::splat(self.q());

        let rho = Self::density(u);
        let rho_inverse = one / rho;
        let covolume = one - b * rho;

        let x = (rho_inverse - b).pow(gamma_min) / covolume;
        let dx_drho = x * (b * rho - gamma_min) / (rho * covolume);
        let shift = Self::internal_energy(u) - rho * q - pinf * covolume;
        let de = Self::internal_energy_derivative(u);

        let mut result = [L::zero(); P];
        result[0] = (de[0] - q + pinf * b) * x + shift * dx_drho;
        for c in 1..P {
            result[c] = de[c] * x;
        }
        result
    }

    /// 代理 Harten 熵 η(U, γ_min)
    fn surrogate_harten_entropy(&self, u: &[L; P], gamma_min: L) -> L;

    /// 代理 Harten 熵导数 η'(U)
    fn surrogate_harten_entropy_derivative(&self, u: &[L; P], eta: L, gamma_min: L) -> [L; P];

    /// 代理 γ(U, p)
    fn surrogate_gamma(&self, u: &[L; P], p: L) -> L;

    /// 代理压力 p(U, γ)，与 surrogate_gamma 严格互逆
    fn surrogate_pressure(&self, u: &[L; P], gamma: L) -> L;

    /// 代理声速 c(U, γ)
    fn surrogate_speed_of_sound(&self, u: &[L; P], gamma: L) -> L;

    /// 通量张量 f(U, p)
    fn flux(&self, u: &[L; P], p: L) -> [[L; D]; P];
}

/// 方程捆绑
///
/// 编译期绑定 {视图, 黎曼求解器, 指示器, 限制器} 与常量
/// (维度 D, 状态分量数 P, 预计算分量数 K, 预计算循环数)。
pub trait Equation<const D: usize, const P: usize, const K: usize>:
    Send + Sync + 'static
{
    /// 方程名（与配置分派一致）
    const NAME: &'static str;

    /// 预计算循环数
    const N_PRECOMPUTATION_CYCLES: usize;

    /// 双曲系统视图
    type View<L: Lane>: SystemView<D, P, K, L>;

    /// 近似黎曼求解器
    type Riemann<L: Lane>: RiemannSolver<D, P, K, L>;

    /// 指示器
    type Indicator<L: Lane>: Indicator<D, P, K, L>;

    /// 限制器
    type Limiter<L: Lane>: Limiter<D, P, K, L>;

    /// 取视图
    fn view<L: Lane>(&self) -> Self::View<L>;

    /// 构建黎曼求解器
    fn riemann_solver<L: Lane>(&self, cfg: &RiemannSolverConfig) -> Self::Riemann<L>;

    /// 构建指示器
    fn indicator<L: Lane>(&self, cfg: &IndicatorConfig) -> Self::Indicator<L>;

    /// 构建限制器
    fn limiter<L: Lane>(&self, cfg: &LimiterConfig) -> Self::Limiter<L>;
}
