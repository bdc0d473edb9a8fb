// crates/cf_physics/src/sparsity.rs

//! SIMD 打包的稀疏连接图与边值矩阵
//!
//! 节点分区为 [内部 SIMD 区 | 内部标量区 | 幽灵区]。SIMD 区按
//! 4 行一块转置存储：块 b 中列 c 的 4 个表项连续排列，
//! 使得边值矩阵与几何系数的通道加载是连续 load，而邻居状态
//! 通过列索引 gather。标量区为普通 CSR。
//!
//! 约定：
//! - 每行第一列恒为对角元（自身节点）
//! - 行长为 1 的行是受约束自由度，所有遍历跳过
//! - 同一 SIMD 块内 4 行行长相同（由离线数据重排保证）
//!
//! 表项编号统一覆盖两个分区，转置表 `transposed` 把表项 (i,j)
//! 映射到 (j,i)，供对称化写入（d_ji = d_ij, p_ji = -p_ij）使用。

use cf_foundation::memory::{AlignedVec, SharedRows};

use crate::core::lane::Lane;

/// SIMD 通道宽度（与 [`crate::core::lane`] 的 f64x4 一致）
pub const SIMD_WIDTH: usize = 4;

/// 转置表中的无效标记（对端行不在本进程存储）
pub const INVALID_ENTRY: u32 = u32::MAX;

// ============================================================
// 稀疏模式
// ============================================================

/// SIMD 打包稀疏模式
///
/// 由离线数据构建，求解核心只读借用。
pub struct SparsityPatternSimd<const D: usize> {
    /// 总行数（本进程拥有的节点数）
    n_rows: usize,
    /// SIMD 前缀行数（4 的倍数）
    n_internal: usize,
    /// SIMD 块表项偏移（len = n_internal/4 + 1）
    block_offset: Vec<usize>,
    /// SIMD 块公共行长
    block_row_length: Vec<u32>,
    /// 标量区行偏移（绝对表项编号, len = n_rows - n_internal + 1）
    row_offset: Vec<usize>,
    /// 列索引（按表项编号）
    columns: Vec<u32>,
    /// 转置表项编号
    transposed: Vec<u32>,
    /// 几何系数 c_ij 分量
    cij: [AlignedVec<f64>; D],
    /// |c_ij|
    cij_norm: AlignedVec<f64>,
    /// 单位向量 n_ij = c_ij / |c_ij|（对角元置零）
    nij: [AlignedVec<f64>; D],
}

impl<const D: usize> SparsityPatternSimd<D> {
    /// 从逐行 (列, c_ij) 表构建
    ///
    /// 要求每行第一项为对角元。`n_internal` 必须是 [`SIMD_WIDTH`]
    /// 的倍数，且前 `n_internal` 行中每 4 行行长一致。
    pub fn from_rows(rows: &[Vec<(u32, [f64; D])>], n_internal: usize) -> Self {
        let n_rows = rows.len();
        assert!(n_internal <= n_rows);
        assert_eq!(n_internal % SIMD_WIDTH, 0, "SIMD 区行数必须是通道宽度的倍数");
        for (i, row) in rows.iter().enumerate() {
            assert!(!row.is_empty(), "行 {} 为空", i);
            assert_eq!(row[0].0 as usize, i, "行 {} 的首列必须是对角元", i);
        }

        let n_blocks = n_internal / SIMD_WIDTH;

        // SIMD 块偏移
        let mut block_offset = Vec::with_capacity(n_blocks + 1);
        let mut block_row_length = Vec::with_capacity(n_blocks);
        let mut offset = 0usize;
        for b in 0..n_blocks {
            let len = rows[b * SIMD_WIDTH].len();
            for k in 1..SIMD_WIDTH {
                assert_eq!(
                    rows[b * SIMD_WIDTH + k].len(),
                    len,
                    "SIMD 块 {} 内行长不一致",
                    b
                );
            }
            block_offset.push(offset);
            block_row_length.push(len as u32);
            offset += len * SIMD_WIDTH;
        }
        block_offset.push(offset);

        // 标量区偏移
        let mut row_offset = Vec::with_capacity(n_rows - n_internal + 1);
        row_offset.push(offset);
        for row in rows.iter().take(n_rows).skip(n_internal) {
            offset += row.len();
            row_offset.push(offset);
        }
        let n_entries = offset;

        // 填充列与几何系数
        let mut columns = vec![0u32; n_entries];
        let mut cij: [AlignedVec<f64>; D] = std::array::from_fn(|_| AlignedVec::zeros(n_entries));
        let mut cij_norm = AlignedVec::zeros(n_entries);
        let mut nij: [AlignedVec<f64>; D] = std::array::from_fn(|_| AlignedVec::zeros(n_entries));

        let entry_of = |i: usize, c: usize| -> usize {
            if i < n_internal {
                block_offset[i / SIMD_WIDTH] + c * SIMD_WIDTH + i % SIMD_WIDTH
            } else {
                row_offset[i - n_internal] + c
            }
        };

        for (i, row) in rows.iter().enumerate() {
            for (c, (col, coeff)) in row.iter().enumerate() {
                let e = entry_of(i, c);
                columns[e] = *col;
                let mut norm_sq = 0.0;
                for d in 0..D {
                    cij[d][e] = coeff[d];
                    norm_sq += coeff[d] * coeff[d];
                }
                let norm = norm_sq.sqrt();
                cij_norm[e] = norm;
                if norm > 0.0 {
                    for d in 0..D {
                        nij[d][e] = coeff[d] / norm;
                    }
                }
            }
        }

        // 构建转置表
        let mut lookup = std::collections::HashMap::with_capacity(n_entries);
        for (i, row) in rows.iter().enumerate() {
            for (c, (col, _)) in row.iter().enumerate() {
                lookup.insert((i as u32, *col), entry_of(i, c) as u32);
            }
        }
        let mut transposed = vec![INVALID_ENTRY; n_entries];
        for (i, row) in rows.iter().enumerate() {
            for (c, (col, _)) in row.iter().enumerate() {
                let e = entry_of(i, c);
                transposed[e] = lookup
                    .get(&(*col, i as u32))
                    .copied()
                    .unwrap_or(INVALID_ENTRY);
            }
        }

        Self {
            n_rows,
            n_internal,
            block_offset,
            block_row_length,
            row_offset,
            columns,
            transposed,
            cij,
            cij_norm,
            nij,
        }
    }

    /// 总行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// SIMD 前缀行数
    #[inline]
    pub fn n_internal(&self) -> usize {
        self.n_internal
    }

    /// 表项总数
    #[inline]
    pub fn n_entries(&self) -> usize {
        self.columns.len()
    }

    /// 行 i 的行长（标量视角）
    #[inline]
    pub fn row_length(&self, i: usize) -> usize {
        if i < self.n_internal {
            self.block_row_length[i / SIMD_WIDTH] as usize
        } else {
            self.row_offset[i - self.n_internal + 1] - self.row_offset[i - self.n_internal]
        }
    }

    /// 行 i 是否为受约束自由度
    #[inline]
    pub fn is_constrained(&self, i: usize) -> bool {
        self.row_length(i) == 1
    }

    /// 按通道宽度取行长：SIMD 时 `row` 为块首行
    #[inline]
    pub fn row_length_lane<L: Lane>(&self, row: usize) -> usize {
        if L::WIDTH == 1 {
            self.row_length(row)
        } else {
            debug_assert_eq!(row % SIMD_WIDTH, 0);
            self.block_row_length[row / SIMD_WIDTH] as usize
        }
    }

    /// 列 c 的表项基址（SIMD 时覆盖 4 个通道）
    #[inline]
    pub fn entry_base<L: Lane>(&self, row: usize, c: usize) -> usize {
        if L::WIDTH == 1 {
            self.row_offset[row - self.n_internal] + c
        } else {
            self.block_offset[row / SIMD_WIDTH] + c * SIMD_WIDTH
        }
    }

    /// 基址处 WIDTH 个列索引
    #[inline]
    pub fn columns_at(&self, base: usize, width: usize) -> &[u32] {
        &self.columns[base..base + width]
    }

    /// 基址处 c_ij 通道
    #[inline]
    pub fn cij_at<L: Lane>(&self, base: usize) -> [L; D] {
        std::array::from_fn(|d| L::load(&self.cij[d], base))
    }

    /// 基址处 |c_ij| 通道
    #[inline]
    pub fn cij_norm_at<L: Lane>(&self, base: usize) -> L {
        L::load(&self.cij_norm, base)
    }

    /// 基址处 n_ij 通道
    #[inline]
    pub fn nij_at<L: Lane>(&self, base: usize) -> [L; D] {
        std::array::from_fn(|d| L::load(&self.nij[d], base))
    }

    /// |c_ij| 全量切片（转置聚集用）
    #[inline]
    pub fn cij_norm_slice(&self) -> &[f64] {
        &self.cij_norm
    }

    /// 表项 e 的转置表项
    #[inline]
    pub fn transposed_at(&self, e: usize) -> Option<usize> {
        let t = self.transposed[e];
        if t == INVALID_ENTRY {
            None
        } else {
            Some(t as usize)
        }
    }

    /// 遍历行 i 的 (列, 表项) 序列（测试与标量回退用）
    pub fn row_entries(&self, i: usize) -> impl Iterator<Item = (u32, usize)> + '_ {
        let len = self.row_length(i);
        let n_internal = self.n_internal;
        (0..len).map(move |c| {
            let e = if i < n_internal {
                self.block_offset[i / SIMD_WIDTH] + c * SIMD_WIDTH + i % SIMD_WIDTH
            } else {
                self.row_offset[i - n_internal] + c
            };
            (self.columns[e], e)
        })
    }
}

impl<const D: usize> std::fmt::Debug for SparsityPatternSimd<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparsityPatternSimd")
            .field("n_rows", &self.n_rows)
            .field("n_internal", &self.n_internal)
            .field("n_entries", &self.columns.len())
            .finish()
    }
}

// ============================================================
// 边值矩阵
// ============================================================

/// 与稀疏模式同构的边值矩阵（KK 个分量/表项）
///
/// d_ij (KK=1)、l_ij (KK=1)、p_ij (KK=问题维度) 共用此存储。
pub struct SparseMatrixSimd<const KK: usize> {
    data: [AlignedVec<f64>; KK],
    n_entries: usize,
}

impl<const KK: usize> SparseMatrixSimd<KK> {
    /// 按模式表项数创建
    pub fn new(n_entries: usize) -> Self {
        Self {
            data: std::array::from_fn(|_| AlignedVec::zeros(n_entries)),
            n_entries,
        }
    }

    /// 表项总数
    #[inline]
    pub fn n_entries(&self) -> usize {
        self.n_entries
    }

    /// 基址处通道读取
    #[inline]
    pub fn get<L: Lane>(&self, base: usize) -> [L; KK] {
        std::array::from_fn(|c| L::load(&self.data[c], base))
    }

    /// 单表项读取
    #[inline]
    pub fn get_entry(&self, e: usize) -> [f64; KK] {
        std::array::from_fn(|c| self.data[c][e])
    }

    /// 单表项写入
    #[inline]
    pub fn set_entry(&mut self, e: usize, value: &[f64; KK]) {
        for c in 0..KK {
            self.data[c][e] = value[c];
        }
    }

    /// 分量全量切片（转置聚集用）
    #[inline]
    pub fn component(&self, c: usize) -> &[f64] {
        &self.data[c]
    }

    /// 全部置零
    pub fn fill_zero(&mut self) {
        for c in 0..KK {
            self.data[c].fill(0.0);
        }
    }

    /// 共享写入视图
    pub fn shared(&mut self) -> MatrixShared<'_, KK> {
        MatrixShared {
            comps: self.data.each_mut().map(|v| SharedRows::new(v.as_mut_slice())),
        }
    }
}

impl<const KK: usize> std::fmt::Debug for SparseMatrixSimd<KK> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseMatrixSimd")
            .field("n_components", &KK)
            .field("n_entries", &self.n_entries)
            .finish()
    }
}

/// [`SparseMatrixSimd`] 的共享写入视图
///
/// # 安全约定
///
/// 并发写入的表项集合必须互不相交。遍历内核保证：行 i 只写
/// 自己行的表项与上三角表项的转置位置，二者全局无重叠。
pub struct MatrixShared<'a, const KK: usize> {
    comps: [SharedRows<'a, f64>; KK],
}

impl<'a, const KK: usize> MatrixShared<'a, KK> {
    /// 基址处通道写入
    ///
    /// # Safety
    ///
    /// 表项区间不得并发写入。
    #[inline]
    pub unsafe fn write<L: Lane>(&self, base: usize, value: &[L; KK]) {
        for c in 0..KK {
            let slice = self.comps[c].slice_mut(base, L::WIDTH);
            value[c].store(slice, 0);
        }
    }

    /// 单表项写入
    ///
    /// # Safety
    ///
    /// 同一表项不得并发写入。
    #[inline]
    pub unsafe fn write_entry(&self, e: usize, value: &[f64; KK]) {
        for c in 0..KK {
            self.comps[c].write(e, value[c]);
        }
    }

    /// 基址处通道读取
    ///
    /// # Safety
    ///
    /// 读取的表项不得与并发写入重叠（限制循环只读写自身行表项）。
    #[inline]
    pub unsafe fn get<L: Lane>(&self, base: usize) -> [L; KK] {
        std::array::from_fn(|c| L::load(self.comps[c].as_slice(), base))
    }
}

// ============================================================
// 测试
// ============================================================
