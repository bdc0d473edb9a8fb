// crates/cf_foundation/src/float.rs

//! 数值安全工具
//!
//! 提供最底层的数值钳制函数，对 f32/f64 泛型。所有上层代数
//! （状态方程、代理熵、波速估计、限制器）在可能出现舍入引起的
//! 负值或零分母处统一调用这里的函数，保证返回值非负且除法
//! 永不产生 Inf/NaN。

use num_traits::Float;

/// 正部 max(x, 0)
#[inline(always)]
pub fn positive_part<S: Float>(x: S) -> S {
    x.max(S::zero())
}

/// 负部 max(-x, 0)
#[inline(always)]
pub fn negative_part<S: Float>(x: S) -> S {
    (-x).max(S::zero())
}

/// 安全除法
///
/// 分子分母在数学上均应非负，且分子趋零时商趋零。
/// 该函数 (a) 避免除零，(b) 保证结果非负：
/// 分子钳制到 `>= 0`，分母钳制到最小正规数。
#[inline(always)]
pub fn safe_division<S: Float>(numerator: S, denominator: S) -> S {
    positive_part(numerator) / denominator.max(S::min_positive_value())
}

/// 相对误差 |a - b| / max(|a|, |b|, floor)
///
/// 用于收敛判据与测试断言。
#[inline]
pub fn relative_difference<S: Float>(a: S, b: S, floor: S) -> S {
    (a - b).abs() / a.abs().max(b.abs()).max(floor)
}
