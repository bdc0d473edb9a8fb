// crates/cf_physics/tests/constant_states.rs

//! 二维与任意状态方程路径的端到端检查
//!
//! 常状态保持（离散散度恒等式 Σ_j c_ij = 0 的直接后果）、
//! 二维接触问题的守恒性、NASG 与表格状态方程（批量接口）
//! 的稳定步进。

use std::sync::Arc;

use cf_config::{HyperbolicSystemConfig, SolverConfig};
use cf_physics::engine::{HyperbolicModule, SingleProcess};
use cf_physics::eos::{EquationOfState, NobleAbelStiffenedGas, PolytropicGas, TabulatedEos};
use cf_physics::equations::euler::EulerEquations;
use cf_physics::equations::euler_aeos::EulerAeosEquations;
use cf_physics::equations::shallow_water::ShallowWaterEquations;
use cf_physics::equations::{Equation, SystemView};
use cf_physics::offline::{BoundaryId, OfflineData};
use cf_physics::state::StateVector;

const GAMMA: f64 = 1.4;

// ============================================================
// 二维常状态保持
// ============================================================

#[test]
fn test_2d_constant_state_preserved() {
    let equation = Arc::new(EulerEquations::<2, 4>::new(GAMMA));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<2>::uniform_rectangle(
        17,
        13,
        1.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    // 静止常状态（滑移壁不改动零动量）
    let uniform = view.from_primitive_state(&[1.3, 0.0, 0.0, 2.0]);
    let mut state = StateVector::<4, 3>::new(n);
    for i in 0..n {
        state.u.set_node(i, &uniform);
    }
    let mut new_state = state.clone();

    let config = SolverConfig::default();
    let mut module = HyperbolicModule::new(
        equation,
        offline,
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let dirichlet = move |_: &[f64; 2], _t: f64| uniform;

    let mut t = 0.0;
    for _ in 0..5 {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .unwrap();
        let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);
    }

    for i in 0..n {
        let u = state.u.get_node(i);
        for c in 0..4 {
            assert!(
                (u[c] - uniform[c]).abs() < 1.0e-13,
                "常状态被破坏: 节点 {} 分量 {}: {} vs {}",
                i,
                c,
                u[c],
                uniform[c]
            );
        }
    }
}

#[test]
fn test_2d_contact_mass_conservation() {
    let equation = Arc::new(EulerEquations::<2, 4>::new(GAMMA));
    let view = equation.view::<f64>();
    // 方形域: 角点法向与边界积分方向一致，滑移壁通量严格为零
    let offline = Arc::new(OfflineData::<2>::uniform_rectangle(
        33,
        33,
        1.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    let profile = |p: &[f64; 2]| -> [f64; 4] {
        let (rho, pressure) = if p[0] < 0.5 { (1.0, 1.0) } else { (0.125, 0.1) };
        [rho, 0.0, 0.0, pressure / ((GAMMA - 1.0) * rho)]
    };

    let mut state = StateVector::<4, 3>::new(n);
    for i in 0..n {
        state
            .u
            .set_node(i, &view.from_primitive_state(&profile(&offline.positions[i])));
    }
    let mut new_state = state.clone();

    let initial_mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();

    let config = SolverConfig::default();
    let mut module = HyperbolicModule::new(
        equation,
        offline.clone(),
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let bc_view = view.clone();
    let dirichlet = move |pos: &[f64; 2], _t: f64| bc_view.from_primitive_state(&profile(pos));

    let mut t = 0.0;
    for _ in 0..10 {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .unwrap();
        let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);
    }

    let mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();
    assert!(
        (mass - initial_mass).abs() / initial_mass < 1.0e-9,
        "二维质量不守恒: {} vs {}",
        mass,
        initial_mass
    );

    for i in 0..n {
        assert!(view.is_admissible(&state.u.get_node(i)));
    }
}

// ============================================================
// AEOS: NASG 与表格状态方程
// ============================================================

fn run_aeos_sod(
    eos: Arc<dyn cf_physics::eos::EquationOfState>,
    steps: usize,
) -> (Arc<OfflineData<1>>, StateVector<3, 4>) {
    let system_config = HyperbolicSystemConfig::default();
    let equation = Arc::new(EulerAeosEquations::<1, 3>::new(eos.clone(), &system_config));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        101,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    let eos_profile = eos.clone();
    let profile = move |x: f64| -> [f64; 3] {
        let (rho, p) = if x < 0.5 { (1.0, 1.0) } else { (0.125, 0.1) };
        [rho, 0.0, eos_profile.specific_internal_energy(rho, p)]
    };

    let mut state = StateVector::<3, 4>::new(n);
    for i in 0..n {
        state.u.set_node(
            i,
            &view.from_primitive_state(&profile(offline.positions[i][0])),
        );
    }
    let mut new_state = state.clone();

    let config = SolverConfig::default();
    let mut module = HyperbolicModule::new(
        equation,
        offline.clone(),
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let bc_view = view.clone();
    let bc_profile = profile.clone();
    let dirichlet =
        move |pos: &[f64; 1], _t: f64| bc_view.from_primitive_state(&bc_profile(pos[0]));

    let mut t = 0.0;
    for _ in 0..steps {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .unwrap();
        let stats = module
            .step(&state, &[], &mut new_state, 0.0)
            .expect("AEOS Sod 不应触发 Restart");
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);

        for i in 0..n {
            assert!(view.is_admissible(&state.u.get_node(i)));
        }
    }

    (offline, state)
}

#[test]
fn test_aeos_nasg_sod_stable() {
    let eos = Arc::new(NobleAbelStiffenedGas::new(1.4, 0.02, 0.05, 0.0, 0.4));
    let (offline, state) = run_aeos_sod(eos, 20);

    for i in 0..offline.n_nodes {
        let rho = state.u.component(0)[i];
        assert!(rho.is_finite() && rho > 0.0);
    }
}

#[test]
fn test_aeos_tabulated_matches_polytropic() {
    // 表格由多方气体采样: 批量接口路径的结果应与解析路径接近
    let analytic = Arc::new(PolytropicGas::new(GAMMA, 0.4));
    let tabulated = Arc::new(TabulatedEos::sampled_from(
        analytic.as_ref(),
        (1.0e-4, 1.0e2),
        (1.0e-4, 1.0e4),
        512,
        512,
    ));
    assert!(tabulated.prefer_vector_interface());

    let (offline, state_analytic) = run_aeos_sod(analytic, 10);
    let (_, state_tabulated) = run_aeos_sod(tabulated, 10);

    let mut max_diff = 0.0f64;
    for i in 0..offline.n_nodes {
        for c in 0..3 {
            max_diff = max_diff.max(
                (state_analytic.u.component(c)[i] - state_tabulated.u.component(c)[i]).abs(),
            );
        }
    }
    assert!(
        max_diff < 2.0e-2,
        "表格路径与解析路径偏差过大: {}",
        max_diff
    );
}

// ============================================================
// 浅水二维
// ============================================================

#[test]
fn test_sw_2d_dam_break_short_run() {
    let equation = Arc::new(ShallowWaterEquations::<2, 3>::new(9.81));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<2>::uniform_rectangle(
        33,
        33,
        1.0,
        1.0,
        BoundaryId::Slip,
    ));
    let n = offline.n_nodes;

    let profile = |p: &[f64; 2]| -> [f64; 3] {
        if p[0] < 0.5 {
            [1.0, 0.0, 0.0]
        } else {
            [0.1, 0.0, 0.0]
        }
    };

    let mut state = StateVector::<3, 1>::new(n);
    for i in 0..n {
        state.u.set_node(i, &profile(&offline.positions[i]));
    }
    let mut new_state = state.clone();

    let initial_mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();

    let config = SolverConfig::default();
    let mut module = HyperbolicModule::new(
        equation,
        offline.clone(),
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let dirichlet = move |pos: &[f64; 2], _t: f64| profile(pos);

    let mut t = 0.0;
    for _ in 0..10 {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .unwrap();
        let stats = module.step(&state, &[], &mut new_state, 0.0).unwrap();
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);
    }

    for i in 0..n {
        assert!(state.u.component(0)[i] > 0.0, "水深非正: 节点 {}", i);
        assert!(view.is_admissible(&state.u.get_node(i)));
    }

    let mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();
    assert!((mass - initial_mass).abs() / initial_mass < 1.0e-9);
}
