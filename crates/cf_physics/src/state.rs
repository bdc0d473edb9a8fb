// crates/cf_physics/src/state.rs

//! 状态管理
//!
//! 多分量向量采用 SoA (Structure of Arrays) 布局：每个守恒分量
//! 一条 64 字节对齐的连续数组，长度覆盖 [本进程节点 | 幽灵区]。
//!
//! ```text
//! rho: [rho_0, rho_1, ...]
//! m_1: [m1_0,  m1_1,  ...]
//! E:   [E_0,   E_1,   ...]
//! ```
//!
//! SIMD 打包区的对角列访问因此是连续 load，邻居访问通过稀疏
//! 模式的列索引 gather。

use cf_foundation::memory::{AlignedVec, SharedRows};

use crate::core::lane::Lane;

// ============================================================
// 多分量向量
// ============================================================

/// K 分量 SoA 分布式数组
pub struct MultiComponentVector<const K: usize> {
    components: [AlignedVec<f64>; K],
    len: usize,
}

impl<const K: usize> MultiComponentVector<K> {
    /// 创建长度 len 的零初始化向量
    pub fn new(len: usize) -> Self {
        Self {
            components: std::array::from_fn(|_| AlignedVec::zeros(len)),
            len,
        }
    }

    /// 节点数（含幽灵区）
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 分量只读切片
    #[inline]
    pub fn component(&self, c: usize) -> &[f64] {
        &self.components[c]
    }

    /// 分量可变切片
    #[inline]
    pub fn component_mut(&mut self, c: usize) -> &mut [f64] {
        &mut self.components[c]
    }

    /// 连续加载节点 `[i, i+WIDTH)` 的状态
    #[inline]
    pub fn get<L: Lane>(&self, i: usize) -> [L; K] {
        std::array::from_fn(|c| L::load(&self.components[c], i))
    }

    /// 通过列索引聚集加载邻居状态
    #[inline]
    pub fn gather<L: Lane>(&self, idx: &[u32]) -> [L; K] {
        std::array::from_fn(|c| L::gather(&self.components[c], idx))
    }

    /// 单节点读取
    #[inline]
    pub fn get_node(&self, i: usize) -> [f64; K] {
        std::array::from_fn(|c| self.components[c][i])
    }

    /// 单节点写入
    #[inline]
    pub fn set_node(&mut self, i: usize, value: &[f64; K]) {
        for c in 0..K {
            self.components[c][i] = value[c];
        }
    }

    /// 连续写入节点 `[i, i+WIDTH)` 的状态
    #[inline]
    pub fn write<L: Lane>(&mut self, i: usize, value: &[L; K]) {
        for c in 0..K {
            value[c].store(&mut self.components[c], i);
        }
    }

    /// 全部置零
    pub fn fill_zero(&mut self) {
        for c in 0..K {
            self.components[c].fill(0.0);
        }
    }

    /// 从另一向量整体拷贝
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len);
        for c in 0..K {
            self.components[c]
                .as_mut_slice()
                .copy_from_slice(other.components[c].as_slice());
        }
    }

    /// 共享写入视图（互不相交的行分块并行写入）
    pub fn shared(&mut self) -> McShared<'_, K> {
        McShared {
            comps: self
                .components
                .each_mut()
                .map(|v| SharedRows::new(v.as_mut_slice())),
        }
    }
}

impl<const K: usize> Clone for MultiComponentVector<K> {
    fn clone(&self) -> Self {
        Self {
            components: std::array::from_fn(|c| self.components[c].clone()),
            len: self.len,
        }
    }
}

impl<const K: usize> std::fmt::Debug for MultiComponentVector<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiComponentVector")
            .field("n_components", &K)
            .field("len", &self.len)
            .finish()
    }
}

/// [`MultiComponentVector`] 的共享写入视图
///
/// # 安全约定
///
/// 与 [`SharedRows`] 相同：并发写入的行区间必须互不相交。
pub struct McShared<'a, const K: usize> {
    comps: [SharedRows<'a, f64>; K],
}

impl<'a, const K: usize> McShared<'a, K> {
    /// 连续写入节点 `[i, i+WIDTH)`
    ///
    /// # Safety
    ///
    /// 同一节点区间不得并发写入。
    #[inline]
    pub unsafe fn write<L: Lane>(&self, i: usize, value: &[L; K]) {
        for c in 0..K {
            let slice = self.comps[c].slice_mut(i, L::WIDTH);
            value[c].store(slice, 0);
        }
    }

    /// 单节点标量写入
    ///
    /// # Safety
    ///
    /// 同一节点不得并发写入。
    #[inline]
    pub unsafe fn write_node(&self, i: usize, value: &[f64; K]) {
        for c in 0..K {
            self.comps[c].write(i, value[c]);
        }
    }

    /// 写入单个分量通道
    ///
    /// # Safety
    ///
    /// 同一 (分量, 节点区间) 不得并发写入。预计算 cycle 1 借此
    /// 只覆写熵分量而保持压力分量只读。
    #[inline]
    pub unsafe fn write_component<L: Lane>(&self, c: usize, i: usize, value: L) {
        let slice = self.comps[c].slice_mut(i, L::WIDTH);
        value.store(slice, 0);
    }

    /// 连续读取节点 `[i, i+WIDTH)`
    ///
    /// # Safety
    ///
    /// 读取区间不得与并发写入重叠。
    #[inline]
    pub unsafe fn get<L: Lane>(&self, i: usize) -> [L; K] {
        std::array::from_fn(|c| L::load(self.comps[c].as_slice(), i))
    }

    /// 聚集读取单个分量
    ///
    /// # Safety
    ///
    /// 读取的元素不得与并发写入重叠。
    #[inline]
    pub unsafe fn gather_component<L: Lane>(&self, c: usize, idx: &[u32]) -> L {
        L::gather(self.comps[c].as_slice(), idx)
    }
}

// ============================================================
// 复合状态向量
// ============================================================

/// 复合状态向量：双曲守恒分量 + 每步重建的预计算分量
///
/// 两块的幽灵区布局一致，由调用方（引擎）负责在写入后同步。
#[derive(Debug, Clone)]
pub struct StateVector<const P: usize, const K: usize> {
    /// 守恒状态 U
    pub u: MultiComponentVector<P>,
    /// 预计算值（压力、代理 γ、熵等，随方程而异）
    pub precomputed: MultiComponentVector<K>,
}

impl<const P: usize, const K: usize> StateVector<P, K> {
    /// 创建长度 len 的零初始化状态向量
    pub fn new(len: usize) -> Self {
        Self {
            u: MultiComponentVector::new(len),
            precomputed: MultiComponentVector::new(len),
        }
    }

    /// 节点数
    #[inline]
    pub fn len(&self) -> usize {
        self.u.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

// ============================================================
// 状态小代数（定长数组上的逐分量运算）
// ============================================================

/// a + b
#[inline(always)]
pub fn state_add<L: Lane, const K: usize>(a: &[L; K], b: &[L; K]) -> [L; K] {
    std::array::from_fn(|c| a[c] + b[c])
}

/// a - b
#[inline(always)]
pub fn state_sub<L: Lane, const K: usize>(a: &[L; K], b: &[L; K]) -> [L; K] {
    std::array::from_fn(|c| a[c] - b[c])
}

/// s * a
#[inline(always)]
pub fn state_scale<L: Lane, const K: usize>(s: L, a: &[L; K]) -> [L; K] {
    std::array::from_fn(|c| s * a[c])
}

/// a + s * b
#[inline(always)]
pub fn state_axpy<L: Lane, const K: usize>(a: &[L; K], s: L, b: &[L; K]) -> [L; K] {
    std::array::from_fn(|c| a[c] + s * b[c])
}

// ============================================================
// 测试
// ============================================================
