// crates/cf_physics/src/offline.rs

//! 离线数据
//!
//! 求解核心消费的网格离线量：集中质量向量 m_i、SIMD 稀疏模式与
//! 预计算几何系数 c_ij / n_ij、边界映射（节点 → 法向 / 质量 /
//! 边界类别 / 坐标）。离线装配本身是外部协作者的职责；
//! 本模块另外提供一维区间与二维矩形上 Q1 配点离散的参考构造，
//! 供驱动器与测试端到端使用。
//!
//! # 节点重排
//!
//! 构造时将行长一致的内部节点排在前面，使 SIMD 前缀最大化；
//! 坐标数组 `positions` 记录重排后的节点坐标，初值设置据此进行。

use cf_foundation::memory::AlignedVec;

use crate::sparsity::{SparsityPatternSimd, SIMD_WIDTH};

// ============================================================
// 边界类别
// ============================================================

/// 边界条件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryId {
    /// 滑移：去除动量法向分量
    Slip,
    /// 无滑移：动量置零
    NoSlip,
    /// Dirichlet：整体替换状态
    Dirichlet,
    /// 仅替换动量的 Dirichlet
    DirichletMomentum,
    /// 动力学边界：按黎曼特征分解处理亚/超音速出入流
    Dynamic,
}

/// 边界节点记录
#[derive(Debug, Clone)]
pub struct BoundaryNode<const D: usize> {
    /// 节点编号（重排后）
    pub node: u32,
    /// 边界类别
    pub id: BoundaryId,
    /// 外法向（单位向量）
    pub normal: [f64; D],
    /// 法向质量 ∮ φ_i ds 权重
    pub normal_mass: f64,
    /// 边界质量
    pub boundary_mass: f64,
    /// 节点坐标
    pub position: [f64; D],
}

// ============================================================
// 离线数据
// ============================================================

/// 求解核心的离线输入
pub struct OfflineData<const D: usize> {
    /// 本进程节点总数（含幽灵）
    pub n_nodes: usize,
    /// 本进程拥有的节点数
    pub n_owned: usize,
    /// 集中质量 m_i
    pub lumped_mass: AlignedVec<f64>,
    /// 1 / m_i
    pub lumped_mass_inverse: AlignedVec<f64>,
    /// SIMD 稀疏模式与几何系数
    pub sparsity: SparsityPatternSimd<D>,
    /// 边界映射
    pub boundary_map: Vec<BoundaryNode<D>>,
    /// 节点坐标（重排后）
    pub positions: Vec<[f64; D]>,
    /// 幽灵交换表 (源节点, 幽灵目标节点)；单进程为空
    pub ghost_exchange: Vec<(u32, u32)>,
}

impl<const D: usize> OfflineData<D> {
    /// 由外部装配结果组装
    ///
    /// 集中质量必须为正：非正质量是装配阶段的程序错误。
    pub fn from_parts(
        rows: &[Vec<(u32, [f64; D])>],
        n_internal: usize,
        lumped_mass: Vec<f64>,
        boundary_map: Vec<BoundaryNode<D>>,
        positions: Vec<[f64; D]>,
    ) -> Self {
        let n_nodes = rows.len();
        assert_eq!(lumped_mass.len(), n_nodes);
        assert_eq!(positions.len(), n_nodes);
        debug_assert!(
            lumped_mass.iter().all(|&m| m > 0.0),
            "集中质量必须为正"
        );

        let inverse: Vec<f64> = lumped_mass
            .iter()
            .map(|&m| 1.0 / m.max(f64::MIN_POSITIVE))
            .collect();

        Self {
            n_nodes,
            n_owned: n_nodes,
            lumped_mass: AlignedVec::from_slice(&lumped_mass),
            lumped_mass_inverse: AlignedVec::from_slice(&inverse),
            sparsity: SparsityPatternSimd::from_rows(rows, n_internal),
            boundary_map,
            positions,
            ghost_exchange: Vec::new(),
        }
    }

    /// 总质量（测度）
    pub fn measure(&self) -> f64 {
        self.lumped_mass.iter().sum()
    }
}

// ============================================================
// 一维区间参考构造
// ============================================================

impl OfflineData<1> {
    /// 区间 [x_left, x_right] 上 n 节点的 P1 配点离散
    ///
    /// c_ij = ∫ φ_i φ_j' dx：内部行 (±1/2)，端点行含对角元 (∓1/2)。
    /// 端点节点按 `boundary_id` 进入边界映射。
    pub fn uniform_interval(n: usize, x_left: f64, x_right: f64, boundary_id: BoundaryId) -> Self {
        assert!(n >= 4, "节点数过少");
        let h = (x_right - x_left) / (n - 1) as f64;

        // 重排：内部节点 (旧 1..n-1) 在前，端点其后
        let new_index = |old: usize| -> u32 {
            if old == 0 {
                (n - 2) as u32
            } else if old == n - 1 {
                (n - 1) as u32
            } else {
                (old - 1) as u32
            }
        };

        let mut rows: Vec<Vec<(u32, [f64; 1])>> = vec![Vec::new(); n];
        let mut lumped_mass = vec![0.0; n];
        let mut positions = vec![[0.0]; n];

        for old in 0..n {
            let i = new_index(old) as usize;
            positions[i] = [x_left + old as f64 * h];

            let mut row = vec![(i as u32, [0.0])];
            if old == 0 {
                row[0].1 = [-0.5];
                row.push((new_index(1), [0.5]));
                lumped_mass[i] = 0.5 * h;
            } else if old == n - 1 {
                row[0].1 = [0.5];
                row.push((new_index(n - 2), [-0.5]));
                lumped_mass[i] = 0.5 * h;
            } else {
                row.push((new_index(old - 1), [-0.5]));
                row.push((new_index(old + 1), [0.5]));
                lumped_mass[i] = h;
            }
            rows[i] = row;
        }

        let n_interior = n - 2;
        let n_internal = (n_interior / SIMD_WIDTH) * SIMD_WIDTH;

        let boundary_map = vec![
            BoundaryNode {
                node: (n - 2) as u32,
                id: boundary_id,
                normal: [-1.0],
                normal_mass: 1.0,
                boundary_mass: 1.0,
                position: [x_left],
            },
            BoundaryNode {
                node: (n - 1) as u32,
                id: boundary_id,
                normal: [1.0],
                normal_mass: 1.0,
                boundary_mass: 1.0,
                position: [x_right],
            },
        ];

        Self::from_parts(&rows, n_internal, lumped_mass, boundary_map, positions)
    }
}

// ============================================================
// 二维矩形参考构造
// ============================================================

impl OfflineData<2> {
    /// 矩形 [0,lx]×[0,ly] 上 (nx × ny) 节点的 Q1 配点离散
    ///
    /// 张量积系数：c^x = D_x ⊗ M_y, c^y = M_x ⊗ D_y，其中一维
    /// 导数权重 D 与一维质量权重 M 在边界行取单侧值。
    /// 全部边界节点按 `boundary_id` 进入边界映射，角点法向取对角方向。
    pub fn uniform_rectangle(
        nx: usize,
        ny: usize,
        lx: f64,
        ly: f64,
        boundary_id: BoundaryId,
    ) -> Self {
        assert!(nx >= 3 && ny >= 3, "每个方向至少 3 个节点");
        let hx = lx / (nx - 1) as f64;
        let hy = ly / (ny - 1) as f64;
        let n = nx * ny;

        let is_interior = |ix: usize, iy: usize| ix > 0 && ix < nx - 1 && iy > 0 && iy < ny - 1;

        // 重排：内部节点在前
        let mut new_index = vec![0u32; n];
        let mut positions_new: Vec<[f64; 2]> = vec![[0.0; 2]; n];
        let mut next = 0u32;
        for iy in 0..ny {
            for ix in 0..nx {
                if is_interior(ix, iy) {
                    new_index[iy * nx + ix] = next;
                    next += 1;
                }
            }
        }
        let n_interior = next as usize;
        for iy in 0..ny {
            for ix in 0..nx {
                if !is_interior(ix, iy) {
                    new_index[iy * nx + ix] = next;
                    next += 1;
                }
            }
        }

        // 一维权重：返回 (偏移, 导数权重, 质量权重) 列表
        let weights_1d = |idx: usize, count: usize, h: f64| -> Vec<(isize, f64, f64)> {
            if idx == 0 {
                vec![(0, -0.5, h / 3.0), (1, 0.5, h / 6.0)]
            } else if idx == count - 1 {
                vec![(0, 0.5, h / 3.0), (-1, -0.5, h / 6.0)]
            } else {
                vec![
                    (0, 0.0, 2.0 * h / 3.0),
                    (-1, -0.5, h / 6.0),
                    (1, 0.5, h / 6.0),
                ]
            }
        };

        let mut rows: Vec<Vec<(u32, [f64; 2])>> = vec![Vec::new(); n];
        let mut lumped_mass = vec![0.0; n];

        for iy in 0..ny {
            for ix in 0..nx {
                let i = new_index[iy * nx + ix] as usize;
                positions_new[i] = [ix as f64 * hx, iy as f64 * hy];

                let wx = weights_1d(ix, nx, hx);
                let wy = weights_1d(iy, ny, hy);

                // 集中质量 = 一维质量权重行和的张量积
                let mx: f64 = wx.iter().map(|w| w.2).sum();
                let my: f64 = wy.iter().map(|w| w.2).sum();
                lumped_mass[i] = mx * my;

                // 对角元放首位
                let mut row = vec![(i as u32, [0.0, 0.0])];
                for &(dx, dwx, mwx) in &wx {
                    for &(dy, dwy, mwy) in &wy {
                        let jx = (ix as isize + dx) as usize;
                        let jy = (iy as isize + dy) as usize;
                        let j = new_index[jy * nx + jx];
                        let coeff = [dwx * mwy, mwx * dwy];
                        if dx == 0 && dy == 0 {
                            row[0].1 = coeff;
                        } else {
                            row.push((j, coeff));
                        }
                    }
                }
                rows[i] = row;
            }
        }

        let n_internal = (n_interior / SIMD_WIDTH) * SIMD_WIDTH;

        // 边界映射
        let mut boundary_map = Vec::new();
        for iy in 0..ny {
            for ix in 0..nx {
                if is_interior(ix, iy) {
                    continue;
                }
                let mut normal = [0.0f64, 0.0];
                if ix == 0 {
                    normal[0] -= 1.0;
                }
                if ix == nx - 1 {
                    normal[0] += 1.0;
                }
                if iy == 0 {
                    normal[1] -= 1.0;
                }
                if iy == ny - 1 {
                    normal[1] += 1.0;
                }
                let norm = (normal[0] * normal[0] + normal[1] * normal[1]).sqrt();
                normal[0] /= norm;
                normal[1] /= norm;

                let i = new_index[iy * nx + ix];
                let edge = if ix == 0 || ix == nx - 1 { hy } else { hx };
                boundary_map.push(BoundaryNode {
                    node: i,
                    id: boundary_id,
                    normal,
                    normal_mass: edge,
                    boundary_mass: edge,
                    position: [ix as f64 * hx, iy as f64 * hy],
                });
            }
        }

        Self::from_parts(&rows, n_internal, lumped_mass, boundary_map, positions_new)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_row_sums_vanish() {
        // Σ_j c_ij = 0 是精确离散散度恒等式
        let data = OfflineData::<1>::uniform_interval(16, 0.0, 1.0, BoundaryId::Slip);
        for i in 0..data.n_nodes {
            let sum: f64 = data
                .sparsity
                .row_entries(i)
                .map(|(_, e)| data.sparsity.cij_at::<f64>(e)[0])
                .sum();
            assert!(sum.abs() < 1e-14, "行 {} 散度和非零: {}", i, sum);
        }
    }

    #[test]
    fn test_interval_masses() {
        let n = 16;
        let data = OfflineData::<1>::uniform_interval(n, 0.0, 1.0, BoundaryId::Slip);
        let h = 1.0 / (n - 1) as f64;

        // 总质量 = 区间长度
        assert!((data.measure() - 1.0).abs() < 1e-14);

        // 内部节点质量 h，端点 h/2
        for i in 0..n - 2 {
            assert!((data.lumped_mass[i] - h).abs() < 1e-14);
        }
        assert!((data.lumped_mass[n - 2] - 0.5 * h).abs() < 1e-14);
    }

    #[test]
    fn test_interval_simd_prefix() {
        let data = OfflineData::<1>::uniform_interval(19, 0.0, 1.0, BoundaryId::Slip);
        // 17 个内部节点 → SIMD 前缀 16
        assert_eq!(data.sparsity.n_internal(), 16);
        for i in 0..16 {
            assert_eq!(data.sparsity.row_length(i), 3);
        }
    }

    #[test]
    fn test_interval_boundary_normals() {
        let data = OfflineData::<1>::uniform_interval(10, -1.0, 2.0, BoundaryId::Dynamic);
        assert_eq!(data.boundary_map.len(), 2);
        let left = &data.boundary_map[0];
        assert_eq!(left.normal, [-1.0]);
        assert_eq!(left.position, [-1.0]);
        assert_eq!(left.id, BoundaryId::Dynamic);
    }

    #[test]
    fn test_rectangle_row_sums_vanish() {
        let data = OfflineData::<2>::uniform_rectangle(6, 5, 1.0, 1.0, BoundaryId::Slip);
        for i in 0..data.n_nodes {
            let mut sum = [0.0f64; 2];
            for (_, e) in data.sparsity.row_entries(i) {
                let c = data.sparsity.cij_at::<f64>(e);
                sum[0] += c[0];
                sum[1] += c[1];
            }
            assert!(sum[0].abs() < 1e-14 && sum[1].abs() < 1e-14);
        }
    }

    #[test]
    fn test_rectangle_total_mass() {
        let data = OfflineData::<2>::uniform_rectangle(7, 6, 2.0, 3.0, BoundaryId::Slip);
        assert!((data.measure() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rectangle_interior_stencil() {
        let data = OfflineData::<2>::uniform_rectangle(8, 8, 1.0, 1.0, BoundaryId::Slip);
        // 内部节点 9 点模板
        for i in 0..data.sparsity.n_internal() {
            assert_eq!(data.sparsity.row_length(i), 9);
        }
        // 36 个内部节点 → SIMD 前缀 36/4*4 = 36
        assert_eq!(data.sparsity.n_internal(), 36);
    }

    #[test]
    fn test_rectangle_corner_normal() {
        let data = OfflineData::<2>::uniform_rectangle(5, 5, 1.0, 1.0, BoundaryId::Slip);
        let corner = data
            .boundary_map
            .iter()
            .find(|b| b.position == [0.0, 0.0])
            .unwrap();
        let inv_sqrt2 = 1.0 / 2.0f64.sqrt();
        assert!((corner.normal[0] + inv_sqrt2).abs() < 1e-14);
        assert!((corner.normal[1] + inv_sqrt2).abs() < 1e-14);
    }
}
