// crates/cf_physics/src/stencil.rs

//! 稀疏模板遍历内核
//!
//! 把内部节点区间 [SIMD 区 | 标量区] 划分为固定行分块，
//! rayon 并行调度；每个分块以无共享状态执行调用方闭包，
//! 同一份物理代码分别以 f64x4 / f64 单态化。
//!
//! 分块边界处检查取消标志（dispatch_check）：任一线程检测到
//! 不变域违例后置位，其余线程在下一分块边界让出，步进控制器
//! 随即抛出 Restart。检查路径无分配。

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::sparsity::SIMD_WIDTH;

/// 每个并行分块的行数（SIMD 区取其整块倍数）
const CHUNK_ROWS: usize = 256;

// ============================================================
// 取消标志
// ============================================================

/// 协作取消标志
///
/// 遍历内核在分块边界轮询；置位后剩余分块全部跳过。
#[derive(Debug, Default)]
pub struct DispatchFlag {
    raised: AtomicBool,
}

impl DispatchFlag {
    /// 创建未置位的标志
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位（线程安全，幂等）
    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// 是否已置位
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// 复位（仅在步进之间调用）
    #[inline]
    pub fn reset(&self) {
        self.raised.store(false, Ordering::Release);
    }
}

// ============================================================
// 分块
// ============================================================

/// 行分块：SIMD 区与标量区统一表示
#[derive(Debug, Clone)]
enum Chunk {
    /// SIMD 行块区间（WIDTH 对齐）
    Vector(Range<usize>),
    /// 标量行区间
    Scalar(Range<usize>),
}

/// 构造固定分块表
fn build_chunks(n_internal: usize, n_owned: usize) -> Vec<Chunk> {
    debug_assert_eq!(n_internal % SIMD_WIDTH, 0);
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < n_internal {
        let end = (start + CHUNK_ROWS).min(n_internal);
        chunks.push(Chunk::Vector(start..end));
        start = end;
    }

    let mut start = n_internal;
    while start < n_owned {
        let end = (start + CHUNK_ROWS).min(n_owned);
        chunks.push(Chunk::Scalar(start..end));
        start = end;
    }

    chunks
}

// ============================================================
// 遍历驱动
// ============================================================

/// 线程并行稀疏遍历
///
/// `vector_chunk` 处理 SIMD 对齐的行块区间，`scalar_chunk`
/// 处理标量行区间。两个闭包必须只写入各自行区间的输出
/// （含上三角转置表项，全局互不重叠）。
pub fn thread_parallel_sweep<FV, FS>(
    n_internal: usize,
    n_owned: usize,
    flag: &DispatchFlag,
    vector_chunk: FV,
    scalar_chunk: FS,
) where
    FV: Fn(Range<usize>) + Sync,
    FS: Fn(Range<usize>) + Sync,
{
    let chunks = build_chunks(n_internal, n_owned);

    chunks.par_iter().for_each(|chunk| {
        // dispatch_check: 分块边界让出
        if flag.is_raised() {
            return;
        }
        match chunk {
            Chunk::Vector(range) => vector_chunk(range.clone()),
            Chunk::Scalar(range) => scalar_chunk(range.clone()),
        }
    });
}

/// 对节点区间做串行标量遍历（边界节点处理等小规模路径）
pub fn serial_sweep<F: FnMut(usize)>(rows: Range<usize>, mut body: F) {
    for i in rows {
        body(i);
    }
}

// ============================================================
// 测试
// ============================================================
