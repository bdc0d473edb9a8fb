// crates/cf_physics/tests/step_control.rs

//! 步进控制器行为验证
//!
//! Restart 状态机、CFL 精确缩放、违例策略、RK 阶段混合、
//! 边矩阵对称性与恒零/恒一指示器回归。

use std::sync::Arc;

use cf_config::{IdViolationStrategy, SolverConfig};
use cf_physics::engine::{HyperbolicModule, SingleProcess};
use cf_physics::equations::euler::EulerEquations;
use cf_physics::equations::skeleton::SkeletonEquations;
use cf_physics::equations::{Equation, SystemView};
use cf_physics::offline::{BoundaryId, OfflineData};
use cf_physics::state::StateVector;

const GAMMA: f64 = 1.4;

type Euler1 = EulerEquations<1, 3>;

fn sod_profile(x: f64) -> [f64; 3] {
    let (rho, p) = if x < 0.5 { (1.0, 1.0) } else { (0.125, 0.1) };
    [rho, 0.0, p / ((GAMMA - 1.0) * rho)]
}

/// 构建 Sod 初值的模块与状态
fn make_sod(
    n_nodes: usize,
    config: &SolverConfig,
) -> (
    HyperbolicModule<Euler1, SingleProcess, 1, 3, 3>,
    StateVector<3, 3>,
) {
    let equation = Arc::new(Euler1::new(GAMMA));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        n_nodes,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));

    let n = offline.n_nodes;
    let mut state = StateVector::<3, 3>::new(n);
    for i in 0..n {
        let prim = sod_profile(offline.positions[i][0]);
        state.u.set_node(i, &view.from_primitive_state(&prim));
    }

    let mut module = HyperbolicModule::new(
        equation,
        offline,
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();
    (module, state)
}

fn dirichlet_sod(pos: &[f64; 1], _t: f64) -> [f64; 3] {
    let view = Euler1::new(GAMMA).view::<f64>();
    view.from_primitive_state(&sod_profile(pos[0]))
}

// ============================================================
// Restart 状态机
// ============================================================

#[test]
fn test_forced_restart_then_retry_succeeds() {
    let config = SolverConfig::default();
    assert_eq!(
        config.hyperbolic_module.id_violation_strategy,
        IdViolationStrategy::RaiseException
    );

    let (mut module, mut state) = make_sod(101, &config);
    let mut new_state = state.clone();

    module
        .prepare_state_vector(&mut state, 0.0, &dirichlet_sod)
        .unwrap();

    // 先取 τ_max
    let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
    let tau_max = stats.tau_max;
    assert!(tau_max > 0.0 && tau_max.is_finite());

    // 强制违例: τ = 10 τ_max → 恰好一次 Restart
    let before = module.n_restarts();
    let result = module.step(&state, &[], &mut new_state, 10.0 * tau_max);
    assert!(result.is_err(), "超限 τ 必须抛出 Restart");
    assert_eq!(module.n_restarts(), before + 1, "应恰好记一次 Restart");

    // 以 τ = τ_max 重试成功，结果可容许
    let retry = module.step(&state, &[], &mut new_state, tau_max);
    assert!(retry.is_ok(), "τ = τ_max 重试必须成功");
    assert_eq!(module.n_restarts(), before + 1);

    let view = Euler1::new(GAMMA).view::<f64>();
    for i in 0..new_state.len() {
        assert!(view.is_admissible(&new_state.u.get_node(i)));
    }
}

#[test]
fn test_warn_strategy_counts_and_continues() {
    let mut config = SolverConfig::default();
    config.hyperbolic_module.id_violation_strategy = IdViolationStrategy::Warn;

    // 均匀状态: 任何 τ 下更新恒零，只有 CFL 警告计数
    let equation = Arc::new(Euler1::new(GAMMA));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        64,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;
    let mut state = StateVector::<3, 3>::new(n);
    let uniform = view.from_primitive_state(&[1.0, 0.0, 2.0]);
    for i in 0..n {
        state.u.set_node(i, &uniform);
    }
    let mut new_state = state.clone();

    let mut module = HyperbolicModule::new(
        equation,
        offline,
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let dirichlet = move |_: &[f64; 1], _t: f64| uniform;
    module
        .prepare_state_vector(&mut state, 0.0, &dirichlet)
        .unwrap();

    let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
    let result = module.step(&state, &[], &mut new_state, 1.5 * stats.tau_max);
    assert!(result.is_ok(), "warn 策略不应抛 Restart");
    assert!(module.n_warnings() >= 1, "应至少记一次警告");
    assert_eq!(module.n_restarts(), 0);
}

// ============================================================
// CFL 精确缩放
// ============================================================

#[test]
fn test_tau_max_scales_exactly_with_cfl() {
    let config = SolverConfig::default();

    let (mut module_a, mut state_a) = make_sod(101, &config);
    module_a.set_cfl(0.25);
    let mut new_a = state_a.clone();
    module_a
        .prepare_state_vector(&mut state_a, 0.0, &dirichlet_sod)
        .unwrap();
    let stats_a = module_a.step(&state_a, &[], &mut new_a, 0.0).unwrap();

    let (mut module_b, mut state_b) = make_sod(101, &config);
    module_b.set_cfl(0.5);
    let mut new_b = state_b.clone();
    module_b
        .prepare_state_vector(&mut state_b, 0.0, &dirichlet_sod)
        .unwrap();
    let stats_b = module_b.step(&state_b, &[], &mut new_b, 0.0).unwrap();

    // 0.25/0.5 均为 2 的幂: τ_max 必须精确成比例
    assert_eq!(
        2.0 * stats_a.tau_max,
        stats_b.tau_max,
        "τ_max 与 CFL 不成精确比例"
    );
}

// ============================================================
// 边矩阵对称性
// ============================================================

#[test]
fn test_graph_viscosity_symmetry_and_limiter_range() {
    let config = SolverConfig::default();
    let (mut module, mut state) = make_sod(101, &config);
    let mut new_state = state.clone();

    module
        .prepare_state_vector(&mut state, 0.0, &dirichlet_sod)
        .unwrap();
    module.step(&state, &[], &mut new_state, 0.0).unwrap();

    let sparsity = &module.offline_data().sparsity;
    let dij = module.graph_viscosity();
    let lij = module.limiter_coefficients();

    for i in 0..sparsity.n_rows() {
        if sparsity.is_constrained(i) {
            continue;
        }
        let mut off_diagonal_sum = 0.0;
        let mut diagonal = 0.0;
        for (j, e) in sparsity.row_entries(i) {
            let d = dij.get_entry(e)[0];
            if j as usize == i {
                diagonal = d;
                continue;
            }
            off_diagonal_sum += d;

            // d_ij = d_ji (交换对称性下逐位一致)
            let t = sparsity.transposed_at(e).unwrap();
            assert_eq!(d, dij.get_entry(t)[0], "d_{{{},{}}} 不对称", i, j);
            assert!(d >= 0.0);

            // l ∈ [0,1]
            let l = lij.get_entry(e)[0];
            assert!((0.0..=1.0).contains(&l), "l 超出 [0,1]: {}", l);
        }
        assert!(
            (diagonal + off_diagonal_sum).abs() < 1.0e-12,
            "行 {} 对角不等于负行和",
            i
        );
    }
}

// ============================================================
// RK 阶段贡献
// ============================================================

#[test]
fn test_single_stage_with_unit_weight_matches_plain_step() {
    let config = SolverConfig::default();
    let (mut module, mut state) = make_sod(101, &config);
    let mut plain = state.clone();
    let mut staged = state.clone();

    module
        .prepare_state_vector(&mut state, 0.0, &dirichlet_sod)
        .unwrap();

    let stats = module.step(&state, &[], &mut plain, 0.0).unwrap();
    // 同一状态作为权重 1 的阶段: F̃ = F，结果必须逐位一致
    let stage_state = state.clone();
    module
        .step(&state, &[(&stage_state, 1.0)], &mut staged, stats.tau)
        .unwrap();

    for c in 0..3 {
        for i in 0..state.len() {
            assert_eq!(
                plain.u.component(c)[i],
                staged.u.component(c)[i],
                "阶段混合恒等性破坏: 分量 {} 节点 {}",
                c,
                i
            );
        }
    }
}

// ============================================================
// 指示器回归
// ============================================================

#[test]
fn test_zero_and_one_indicator_regression() {
    let mut config_zero = SolverConfig::default();
    config_zero.hyperbolic_module.indicator.indicator = "zero".to_string();
    let mut config_one = SolverConfig::default();
    config_one.hyperbolic_module.indicator.indicator = "one".to_string();

    let (mut module_zero, mut state_zero) = make_sod(101, &config_zero);
    let mut new_zero = state_zero.clone();
    module_zero
        .prepare_state_vector(&mut state_zero, 0.0, &dirichlet_sod)
        .unwrap();
    module_zero
        .step(&state_zero, &[], &mut new_zero, 0.0)
        .unwrap();

    let (mut module_one, mut state_one) = make_sod(101, &config_one);
    let mut new_one = state_one.clone();
    module_one
        .prepare_state_vector(&mut state_one, 0.0, &dirichlet_sod)
        .unwrap();
    module_one
        .step(&state_one, &[], &mut new_one, 0.0)
        .unwrap();

    // 两种极端指示器均须可容许，且结果不同（高阶修正确实生效）
    let view = Euler1::new(GAMMA).view::<f64>();
    let mut max_diff = 0.0f64;
    for i in 0..state_zero.len() {
        assert!(view.is_admissible(&new_zero.u.get_node(i)));
        assert!(view.is_admissible(&new_one.u.get_node(i)));
        for c in 0..3 {
            max_diff = max_diff
                .max((new_zero.u.component(c)[i] - new_one.u.component(c)[i]).abs());
        }
    }
    assert!(max_diff > 1.0e-12, "恒零/恒一指示器结果不应一致");
}

// ============================================================
// 熵不等式（光滑数据，纯低阶）
// ============================================================

#[test]
fn test_entropy_non_increasing_for_smooth_data() {
    use cf_physics::equations::GasDynamicsView;

    let mut config = SolverConfig::default();
    config.hyperbolic_module.indicator.indicator = "zero".to_string();
    config.hyperbolic_module.cfl_number = 0.4;

    let equation = Arc::new(Euler1::new(GAMMA));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        129,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    let profile = |x: f64| -> [f64; 3] {
        let rho = 1.0 + 0.2 * (2.0 * std::f64::consts::PI * x).sin();
        let p = 1.0;
        [rho, 0.1, p / ((GAMMA - 1.0) * rho)]
    };

    let mut state = StateVector::<3, 3>::new(n);
    for i in 0..n {
        state.u.set_node(
            i,
            &view.from_primitive_state(&profile(offline.positions[i][0])),
        );
    }
    let mut new_state = state.clone();

    let mut module = HyperbolicModule::new(
        equation,
        offline.clone(),
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let bc_view = view.clone();
    let dirichlet = move |pos: &[f64; 1], _t: f64| bc_view.from_primitive_state(&profile(pos[0]));

    // 凸熵 -Σ m_i η_i（Harten 熵凹，格式保证其积分非降）
    let convex_entropy = |s: &StateVector<3, 3>| -> f64 {
        -(0..n)
            .map(|i| {
                let u = s.u.get_node(i);
                offline.lumped_mass[i] * view.surrogate_harten_entropy(&u, GAMMA)
            })
            .sum::<f64>()
    };

    let mut t = 0.0;
    for _ in 0..10 {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .unwrap();
        // 以边界算子作用后的状态为步前基准
        let before = convex_entropy(&state);
        let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);

        let after = convex_entropy(&state);
        assert!(
            after <= before + 1.0e-10,
            "离散凸熵增加: {} → {}",
            before,
            after
        );
    }
}

// ============================================================
// 骨架方程空转
// ============================================================

#[test]
fn test_skeleton_equation_is_noop() {
    let config = SolverConfig::default();
    let equation = Arc::new(SkeletonEquations::<1, 1>);
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        64,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    let mut state = StateVector::<1, 0>::new(n);
    for i in 0..n {
        state.u.set_node(i, &[i as f64]);
    }
    let mut new_state = state.clone();

    let mut module = HyperbolicModule::new(
        equation,
        offline,
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let dirichlet = |_: &[f64; 1], _t: f64| [0.0];
    module
        .prepare_state_vector(&mut state, 0.0, &dirichlet)
        .unwrap();
    // 零波速 → τ_max 极大; 以固定小步长驱动
    module.step(&state, &[], &mut new_state, 1.0e-3).unwrap();

    for i in 0..n {
        assert_eq!(
            new_state.u.component(0)[i],
            state.u.component(0)[i],
            "骨架方程必须保持状态不变"
        );
    }
}
