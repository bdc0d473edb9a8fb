// crates/cf_physics/tests/sod_shock_tube.rs

//! Sod 激波管验证
//!
//! 一维多方欧拉 (γ = 1.4)，[0,1] 区间，t = 0.2。
//! 对照精确黎曼解验证 L¹ 密度误差，并检查质量/能量守恒与
//! 每步容许性。滑移壁边界下质量与能量通量为零。

use std::sync::Arc;

use cf_config::SolverConfig;
use cf_physics::engine::{HyperbolicModule, SingleProcess};
use cf_physics::equations::euler::EulerEquations;
use cf_physics::equations::{Equation, SystemView};
use cf_physics::offline::{BoundaryId, OfflineData};
use cf_physics::state::StateVector;

const GAMMA: f64 = 1.4;

/// 左右初始状态 (ρ, v, p)
const LEFT: (f64, f64, f64) = (1.0, 0.0, 1.0);
const RIGHT: (f64, f64, f64) = (0.125, 0.0, 0.1);

// ============================================================
// 精确黎曼解（采样式）
// ============================================================

/// 单侧波函数（Toro 书中 f_K）
fn side_function(p: f64, rho_k: f64, p_k: f64) -> f64 {
    let a_k = (GAMMA * p_k / rho_k).sqrt();
    if p > p_k {
        // 激波
        let a_coeff = 2.0 / ((GAMMA + 1.0) * rho_k);
        let b_coeff = (GAMMA - 1.0) / (GAMMA + 1.0) * p_k;
        (p - p_k) * (a_coeff / (p + b_coeff)).sqrt()
    } else {
        // 稀疏波
        2.0 * a_k / (GAMMA - 1.0) * ((p / p_k).powf((GAMMA - 1.0) / (2.0 * GAMMA)) - 1.0)
    }
}

/// 求中间压力 p*（二分，φ 单调）
fn star_pressure() -> f64 {
    let (rho_l, v_l, p_l) = LEFT;
    let (rho_r, v_r, p_r) = RIGHT;
    let phi = |p: f64| side_function(p, rho_l, p_l) + side_function(p, rho_r, p_r) + v_r - v_l;

    let (mut lo, mut hi) = (1.0e-8, 10.0);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if phi(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// 在自相似坐标 ξ = x/t 处采样精确解，返回 (ρ, v, p)
fn sample_exact(xi: f64, p_star: f64) -> (f64, f64, f64) {
    let (rho_l, v_l, p_l) = LEFT;
    let (rho_r, v_r, p_r) = RIGHT;
    let a_l = (GAMMA * p_l / rho_l).sqrt();
    let a_r = (GAMMA * p_r / rho_r).sqrt();
    let v_star =
        0.5 * (v_l + v_r) + 0.5 * (side_function(p_star, rho_r, p_r) - side_function(p_star, rho_l, p_l));

    if xi < v_star {
        // 左侧：Sod 为稀疏波
        let rho_star = rho_l * (p_star / p_l).powf(1.0 / GAMMA);
        let a_star = (GAMMA * p_star / rho_star).sqrt();
        let head = v_l - a_l;
        let tail = v_star - a_star;
        if xi < head {
            (rho_l, v_l, p_l)
        } else if xi < tail {
            // 扇内
            let v = 2.0 / (GAMMA + 1.0) * (a_l + (GAMMA - 1.0) / 2.0 * v_l + xi);
            let a = a_l - (GAMMA - 1.0) / 2.0 * (v - v_l);
            let rho = rho_l * (a / a_l).powf(2.0 / (GAMMA - 1.0));
            let p = p_l * (a / a_l).powf(2.0 * GAMMA / (GAMMA - 1.0));
            (rho, v, p)
        } else {
            (rho_star, v_star, p_star)
        }
    } else {
        // 右侧：Sod 为激波
        let ratio = p_star / p_r;
        let gm = (GAMMA - 1.0) / (GAMMA + 1.0);
        let rho_star = rho_r * (ratio + gm) / (gm * ratio + 1.0);
        let shock_speed = v_r + a_r * ((GAMMA + 1.0) / (2.0 * GAMMA) * ratio
            + (GAMMA - 1.0) / (2.0 * GAMMA))
            .sqrt();
        if xi < shock_speed {
            (rho_star, v_star, p_star)
        } else {
            (rho_r, v_r, p_r)
        }
    }
}

// ============================================================
// 数值求解
// ============================================================

struct SodRun {
    offline: Arc<OfflineData<1>>,
    state: StateVector<3, 3>,
    n_restarts: u32,
    time: f64,
    /// 离散初始总质量与总能量（集中质量加权）
    initial_mass: f64,
    initial_energy: f64,
}

fn run_sod(n_nodes: usize, final_time: f64) -> SodRun {
    let equation = Arc::new(EulerEquations::<1, 3>::new(GAMMA));
    let view = equation.view::<f64>();
    let offline = Arc::new(OfflineData::<1>::uniform_interval(
        n_nodes,
        0.0,
        1.0,
        BoundaryId::Slip,
    ));

    let profile = |x: f64| -> [f64; 3] {
        let (rho, v, p) = if x < 0.5 { LEFT } else { RIGHT };
        [rho, v, p / ((GAMMA - 1.0) * rho)]
    };

    let n = offline.n_nodes;
    let mut state = StateVector::<3, 3>::new(n);
    for i in 0..n {
        let prim = profile(offline.positions[i][0]);
        state.u.set_node(i, &view.from_primitive_state(&prim));
    }
    let mut new_state = state.clone();

    let initial_mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();
    let initial_energy: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(2)[i])
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
    let dirichlet =
        move |pos: &[f64; 1], _t: f64| bc_view.from_primitive_state(&profile(pos[0]));

    let mut t = 0.0;
    while t < final_time {
        module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .expect("边界处理失败");
        let stats = module
            .step(&state, &[], &mut new_state, 0.0)
            .expect("Sod 不应触发 Restart");
        t += stats.tau;
        std::mem::swap(&mut state, &mut new_state);

        // 每步容许性
        for i in 0..n {
            let u = state.u.get_node(i);
            assert!(view.is_admissible(&u), "t = {} 节点 {} 不可容许", t, i);
        }
    }

    SodRun {
        offline,
        state,
        n_restarts: module.n_restarts(),
        time: t,
        initial_mass,
        initial_energy,
    }
}

fn total_of_component(run: &SodRun, c: usize) -> f64 {
    (0..run.offline.n_nodes)
        .map(|i| run.offline.lumped_mass[i] * run.state.u.component(c)[i])
        .sum()
}

// ============================================================
// 测试
// ============================================================

#[test]
fn test_sod_conservation_and_positivity() {
    let run = run_sod(201, 0.05);
    assert_eq!(run.n_restarts, 0, "Sod 不应出现 Restart");

    // 滑移壁下质量与能量通量为零，总量只允许舍入级漂移
    let mass = total_of_component(&run, 0);
    let energy = total_of_component(&run, 2);

    assert!(
        (mass - run.initial_mass).abs() / run.initial_mass < 1.0e-9,
        "质量不守恒: {} vs {}",
        mass,
        run.initial_mass
    );
    assert!(
        (energy - run.initial_energy).abs() / run.initial_energy < 1.0e-9,
        "能量不守恒: {} vs {}",
        energy,
        run.initial_energy
    );
}

#[test]
fn test_sod_density_l1_error() {
    let run = run_sod(401, 0.2);
    let p_star = star_pressure();

    // 中间压力与文献值对照
    assert!((p_star - 0.30313).abs() < 1.0e-3, "p* = {}", p_star);

    let mut l1 = 0.0;
    for i in 0..run.offline.n_nodes {
        let x = run.offline.positions[i][0];
        let xi = (x - 0.5) / run.time;
        let (rho_exact, _, _) = sample_exact(xi, p_star);
        let rho = run.state.u.component(0)[i];
        l1 += run.offline.lumped_mass[i] * (rho - rho_exact).abs();
    }

    assert!(l1 < 5.0e-2, "L¹ 密度误差过大: {}", l1);
    // 粗筛：误差不应好到可疑（格式是受限一阶/二阶混合）
    assert!(l1 > 1.0e-5);
}

#[test]
fn test_sod_shock_position() {
    let run = run_sod(401, 0.2);
    let p_star = star_pressure();

    // 激波位置：密度最后一次跨越 (ρ*_r + ρ_r)/2 处
    let ratio = p_star / RIGHT.2;
    let gm = (GAMMA - 1.0) / (GAMMA + 1.0);
    let rho_star_r = RIGHT.0 * (ratio + gm) / (gm * ratio + 1.0);
    let threshold = 0.5 * (rho_star_r + RIGHT.0);

    let mut shock_numeric = 0.0;
    for i in 0..run.offline.n_nodes {
        let x = run.offline.positions[i][0];
        if run.state.u.component(0)[i] > threshold && x > shock_numeric {
            shock_numeric = x;
        }
    }

    let a_r = (GAMMA * RIGHT.2 / RIGHT.0).sqrt();
    let shock_speed = a_r
        * ((GAMMA + 1.0) / (2.0 * GAMMA) * ratio + (GAMMA - 1.0) / (2.0 * GAMMA)).sqrt();
    let shock_exact = 0.5 + shock_speed * run.time;

    let dx = 1.0 / 400.0;
    assert!(
        (shock_numeric - shock_exact).abs() < 10.0 * dx,
        "激波位置偏差过大: 数值 {} vs 精确 {}",
        shock_numeric,
        shock_exact
    );
}
