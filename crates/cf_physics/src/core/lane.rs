// crates/cf_physics/src/core/lane.rs

//! Lane - 标量/SIMD 通道抽象
//!
//! 遍历内核将内部节点区间划分为 [SIMD 打包区 | 标量区]，
//! 同一份物理代码分别以 `L = f64x4` 与 `L = f64` 单态化执行。
//! 本 trait 是这两种实例的最小公共界面：算术、比较选择、
//! 聚集/分散访问与横向归约。
//!
//! # 密封性
//!
//! 仅 `f64` 与 `wide::f64x4` 实现本 trait。物理层禁止依赖
//! 具体通道宽度，宽度相关的分块逻辑集中在 stencil 模块。

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use wide::{f64x4, CmpGe, CmpLt};

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for wide::f64x4 {}
}

/// 标量/SIMD 通道
pub trait Lane:
    private::Sealed
    + Copy
    + Clone
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// 通道宽度
    const WIDTH: usize;

    /// 全通道广播
    fn splat(x: f64) -> Self;

    /// 零
    #[inline]
    fn zero() -> Self {
        Self::splat(0.0)
    }

    /// 从切片连续加载 `[i, i+WIDTH)`
    fn load(src: &[f64], i: usize) -> Self;

    /// 向切片连续写入 `[i, i+WIDTH)`
    fn store(self, dst: &mut [f64], i: usize);

    /// 通过列索引聚集加载（idx 至少 WIDTH 个）
    fn gather(src: &[f64], idx: &[u32]) -> Self;

    /// 第 k 个通道的值
    fn lane(self, k: usize) -> f64;

    /// 通道极小值
    fn min(self, other: Self) -> Self;

    /// 通道极大值
    fn max(self, other: Self) -> Self;

    /// 绝对值
    fn abs(self) -> Self;

    /// 平方根
    fn sqrt(self) -> Self;

    /// 逐通道选择：a < b ? x : y
    fn select_lt(a: Self, b: Self, x: Self, y: Self) -> Self;

    /// 所有通道满足 a > b
    fn all_gt(a: Self, b: Self) -> bool;

    /// 所有通道有限
    fn all_finite(self) -> bool;

    /// 逐通道一元标量函数（pow/exp 等无 SIMD 版本的出口）
    fn map(self, f: impl Fn(f64) -> f64) -> Self;

    /// 逐通道二元标量函数
    fn zip_map(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self;

    /// 逐通道幂 x^e
    #[inline]
    fn pow(self, e: Self) -> Self {
        self.zip_map(e, f64::powf)
    }

    /// 横向最小值
    fn horizontal_min(self) -> f64;

    /// 横向最大值
    fn horizontal_max(self) -> f64;
}

// ============================================================================
// f64 标量实例
// ============================================================================

impl Lane for f64 {
    const WIDTH: usize = 1;

    #[inline(always)]
    fn splat(x: f64) -> Self {
        x
    }

    #[inline(always)]
    fn load(src: &[f64], i: usize) -> Self {
        src[i]
    }

    #[inline(always)]
    fn store(self, dst: &mut [f64], i: usize) {
        dst[i] = self;
    }

    #[inline(always)]
    fn gather(src: &[f64], idx: &[u32]) -> Self {
        src[idx[0] as usize]
    }

    #[inline(always)]
    fn lane(self, _k: usize) -> f64 {
        self
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        f64::min(self, other)
    }

    #[inline(always)]
    fn max(self, other: Self) -> Self {
        f64::max(self, other)
    }

    #[inline(always)]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline(always)]
    fn select_lt(a: Self, b: Self, x: Self, y: Self) -> Self {
        if a < b {
            x
        } else {
            y
        }
    }

    #[inline(always)]
    fn all_gt(a: Self, b: Self) -> bool {
        a > b
    }

    #[inline(always)]
    fn all_finite(self) -> bool {
        self.is_finite()
    }

    #[inline(always)]
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        f(self)
    }

    #[inline(always)]
    fn zip_map(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        f(self, other)
    }

    #[inline(always)]
    fn horizontal_min(self) -> f64 {
        self
    }

    #[inline(always)]
    fn horizontal_max(self) -> f64 {
        self
    }
}

// ============================================================================
// f64x4 SIMD 实例
// ============================================================================

impl Lane for f64x4 {
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(x: f64) -> Self {
        f64x4::splat(x)
    }

    #[inline(always)]
    fn load(src: &[f64], i: usize) -> Self {
        let chunk: [f64; 4] = src[i..i + 4].try_into().expect("SIMD 加载越界");
        f64x4::from(chunk)
    }

    #[inline(always)]
    fn store(self, dst: &mut [f64], i: usize) {
        dst[i..i + 4].copy_from_slice(&self.to_array());
    }

    #[inline(always)]
    fn gather(src: &[f64], idx: &[u32]) -> Self {
        f64x4::from([
            src[idx[0] as usize],
            src[idx[1] as usize],
            src[idx[2] as usize],
            src[idx[3] as usize],
        ])
    }

    #[inline(always)]
    fn lane(self, k: usize) -> f64 {
        self.to_array()[k]
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        f64x4::min(self, other)
    }

    #[inline(always)]
    fn max(self, other: Self) -> Self {
        f64x4::max(self, other)
    }

    #[inline(always)]
    fn abs(self) -> Self {
        f64x4::abs(self)
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        f64x4::sqrt(self)
    }

    #[inline(always)]
    fn select_lt(a: Self, b: Self, x: Self, y: Self) -> Self {
        a.cmp_lt(b).blend(x, y)
    }

    #[inline(always)]
    fn all_gt(a: Self, b: Self) -> bool {
        // a > b 对所有通道成立 <=> 不存在 a <= b 的通道
        !b.cmp_ge(a).any()
    }

    #[inline(always)]
    fn all_finite(self) -> bool {
        self.to_array().iter().all(|x| x.is_finite())
    }

    #[inline(always)]
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        let a = self.to_array();
        f64x4::from([f(a[0]), f(a[1]), f(a[2]), f(a[3])])
    }

    #[inline(always)]
    fn zip_map(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let a = self.to_array();
        let b = other.to_array();
        f64x4::from([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }

    #[inline(always)]
    fn horizontal_min(self) -> f64 {
        let a = self.to_array();
        a[0].min(a[1]).min(a[2]).min(a[3])
    }

    #[inline(always)]
    fn horizontal_max(self) -> f64 {
        let a = self.to_array();
        a[0].max(a[1]).max(a[2]).max(a[3])
    }
}

// ============================================================================
// 通道上的数值钳制（与 cf_foundation::float 标量版语义一致）
// ============================================================================

/// 正部 max(x, 0)
#[inline(always)]
pub fn positive_part<L: Lane>(x: L) -> L {
    x.max(L::zero())
}

/// 负部 max(-x, 0)
#[inline(always)]
pub fn negative_part<L: Lane>(x: L) -> L {
    (-x).max(L::zero())
}

/// 安全除法：分子钳制非负，分母钳制到最小正数
#[inline(always)]
pub fn safe_division<L: Lane>(numerator: L, denominator: L) -> L {
    positive_part(numerator) / denominator.max(L::splat(f64::MIN_POSITIVE))
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_lane_basics() {
        let src = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(f64::load(&src, 2), 3.0);
        assert_eq!(f64::gather(&src, &[1]), 2.0);
        assert_eq!(f64::select_lt(1.0, 2.0, 10.0, 20.0), 10.0);
        assert_eq!(f64::select_lt(3.0, 2.0, 10.0, 20.0), 20.0);
    }

    #[test]
    fn test_simd_lane_load_store() {
        let src = [1.0, 2.0, 3.0, 4.0, 5.0];
        let v = f64x4::load(&src, 1);
        assert_eq!(v.to_array(), [2.0, 3.0, 4.0, 5.0]);

        let mut dst = [0.0; 4];
        v.store(&mut dst, 0);
        assert_eq!(dst, [2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_simd_gather() {
        let src = [10.0, 11.0, 12.0, 13.0, 14.0];
        let v = f64x4::gather(&src, &[4, 2, 0, 1]);
        assert_eq!(v.to_array(), [14.0, 12.0, 10.0, 11.0]);
    }

    #[test]
    fn test_simd_select_lt() {
        let a = f64x4::from([1.0, 3.0, 2.0, 5.0]);
        let b = f64x4::from([2.0, 2.0, 2.0, 2.0]);
        let x = f64x4::splat(-1.0);
        let y = f64x4::splat(1.0);
        let r = f64x4::select_lt(a, b, x, y);
        assert_eq!(r.to_array(), [-1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_simd_all_gt() {
        let a = f64x4::from([1.0, 2.0, 3.0, 4.0]);
        assert!(f64x4::all_gt(a, f64x4::splat(0.5)));
        assert!(!f64x4::all_gt(a, f64x4::splat(1.5)));
    }

    #[test]
    fn test_simd_horizontal() {
        let a = f64x4::from([3.0, 1.0, 4.0, 2.0]);
        assert_eq!(a.horizontal_min(), 1.0);
        assert_eq!(a.horizontal_max(), 4.0);
    }

    #[test]
    fn test_lane_pow() {
        let x = f64x4::splat(2.0);
        let e = f64x4::splat(3.0);
        let r = x.pow(e);
        assert!((r.lane(0) - 8.0).abs() < 1e-14);
    }

    #[test]
    fn test_safe_division_lane() {
        let q = safe_division(f64x4::splat(-1.0), f64x4::splat(2.0));
        assert_eq!(q.to_array(), [0.0; 4]);
        let q = safe_division(1.0f64, 0.0f64);
        assert!(q.is_finite());
    }
}
