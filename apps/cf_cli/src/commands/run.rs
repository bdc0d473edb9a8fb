// apps/cf_cli/src/commands/run.rs

//! run 命令：构建网格、设定初值、驱动时间循环
//!
//! 方程与维度在此处一次性单态化。内置一维区间与二维矩形的
//! 参考网格；初值由配置的 `[initial values]` 小节描述
//! （uniform / contrast，接触面位置与方向可配）。
//!
//! Restart 处理遵循调用方职责：捕获后将 CFL 减半重试。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;

use cf_config::{EquationKind, SolverConfig};
use cf_physics::engine::{HyperbolicModule, SingleProcess};
use cf_physics::eos;
use cf_physics::equations::euler::EulerEquations;
use cf_physics::equations::euler_aeos::EulerAeosEquations;
use cf_physics::equations::navier_stokes::NavierStokesEquations;
use cf_physics::equations::registry::EquationRegistry;
use cf_physics::equations::shallow_water::ShallowWaterEquations;
use cf_physics::equations::skeleton::SkeletonEquations;
use cf_physics::equations::{Equation, SystemView};
use cf_physics::offline::{BoundaryId, OfflineData};
use cf_physics::state::StateVector;

/// run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（缺省使用内置默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 每个方向的节点数
    #[arg(short, long, default_value_t = 400)]
    pub nodes: usize,
}

/// 执行 run 命令
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SolverConfig::from_json_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => SolverConfig::default(),
    };
    config.validate()?;

    let (dimension, kind) = config.equation.validate()?;
    EquationRegistry::create().resolve(&config.equation.equation, dimension)?;

    let n = args.nodes.max(8);
    let gamma = config.hyperbolic_system.eos.gamma;

    match (kind, dimension) {
        (EquationKind::Euler, 1) => {
            let offline = Arc::new(OfflineData::<1>::uniform_interval(
                n,
                0.0,
                1.0,
                BoundaryId::Slip,
            ));
            let profile = gas_profile_1d(&config, gamma);
            time_loop(
                Arc::new(EulerEquations::<1, 3>::new(gamma)),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::NavierStokes, 1) => {
            // 双曲部分同欧拉; 抛物子步由外部协作者完成
            let offline = Arc::new(OfflineData::<1>::uniform_interval(
                n,
                0.0,
                1.0,
                BoundaryId::Slip,
            ));
            let profile = gas_profile_1d(&config, gamma);
            time_loop(
                Arc::new(NavierStokesEquations::<1, 3>::new(gamma)),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::Euler, 2) | (EquationKind::NavierStokes, 2) => {
            let offline = Arc::new(OfflineData::<2>::uniform_rectangle(
                n,
                n / 4 + 4,
                1.0,
                0.25,
                BoundaryId::Slip,
            ));
            let profile = gas_profile_2d(&config, gamma);
            time_loop(
                Arc::new(EulerEquations::<2, 4>::new(gamma)),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::EulerAeos, 1) => {
            let eos_kind = config.hyperbolic_system.validate()?;
            let eos = eos::create(eos_kind, &config.hyperbolic_system.eos);
            let eos_for_profile = eos.clone();
            let position = interface_position(&config);
            let profile = move |p: &[f64; 1]| -> [f64; 3] {
                let (rho, pressure) = if p[0] < position {
                    (1.0, 1.0)
                } else {
                    (0.125, 0.1)
                };
                let e = eos_for_profile.specific_internal_energy(rho, pressure);
                [rho, 0.0, e]
            };
            let offline = Arc::new(OfflineData::<1>::uniform_interval(
                n,
                0.0,
                1.0,
                BoundaryId::Slip,
            ));
            time_loop(
                Arc::new(EulerAeosEquations::<1, 3>::new(
                    eos,
                    &config.hyperbolic_system,
                )),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::ShallowWater, 1) => {
            let offline = Arc::new(OfflineData::<1>::uniform_interval(
                n,
                0.0,
                1.0,
                BoundaryId::Slip,
            ));
            let position = interface_position(&config);
            let profile = move |p: &[f64; 1]| -> [f64; 2] {
                if p[0] < position {
                    [1.0, 0.0]
                } else {
                    [0.1, 0.0]
                }
            };
            time_loop(
                Arc::new(ShallowWaterEquations::<1, 2>::new(9.81)),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::ShallowWater, 2) => {
            let offline = Arc::new(OfflineData::<2>::uniform_rectangle(
                n,
                n / 4 + 4,
                1.0,
                0.25,
                BoundaryId::Slip,
            ));
            let position = interface_position(&config);
            let profile = move |p: &[f64; 2]| -> [f64; 3] {
                if p[0] < position {
                    [1.0, 0.0, 0.0]
                } else {
                    [0.1, 0.0, 0.0]
                }
            };
            time_loop(
                Arc::new(ShallowWaterEquations::<2, 3>::new(9.81)),
                offline,
                &config,
                &profile,
            )
        }
        (EquationKind::Skeleton, 1) => {
            let offline = Arc::new(OfflineData::<1>::uniform_interval(
                n,
                0.0,
                1.0,
                BoundaryId::Slip,
            ));
            let profile = |_p: &[f64; 1]| -> [f64; 1] { [1.0] };
            time_loop(
                Arc::new(SkeletonEquations::<1, 1>),
                offline,
                &config,
                &profile,
            )
        }
        (kind, dimension) => {
            bail!("内置网格不支持组合: {:?} {}D", kind, dimension)
        }
    }
}

/// 接触面位置（缺省域中点）
fn interface_position(config: &SolverConfig) -> f64 {
    config
        .initial_values
        .position
        .first()
        .copied()
        .unwrap_or(0.5)
}

/// 一维气体初值（uniform / contrast + 可选密度扰动）
fn gas_profile_1d(config: &SolverConfig, gamma: f64) -> impl Fn(&[f64; 1]) -> [f64; 3] {
    let position = interface_position(config);
    let uniform = config.initial_values.configuration == "uniform";
    let perturbation = config.initial_values.perturbation;

    move |p: &[f64; 1]| {
        let (mut rho, pressure) = if uniform || p[0] < position {
            (1.0, 1.0)
        } else {
            (0.125, 0.1)
        };
        rho *= 1.0 + perturbation * (2.0 * std::f64::consts::PI * p[0]).sin();
        let e = pressure / ((gamma - 1.0) * rho);
        [rho, 0.0, e]
    }
}

/// 二维气体初值（接触面沿配置方向）
fn gas_profile_2d(config: &SolverConfig, gamma: f64) -> impl Fn(&[f64; 2]) -> [f64; 4] {
    let position = interface_position(config);
    let uniform = config.initial_values.configuration == "uniform";
    let direction = config.initial_values.direction.clone();
    let (dx, dy) = {
        let x = direction.first().copied().unwrap_or(1.0);
        let y = direction.get(1).copied().unwrap_or(0.0);
        let norm = (x * x + y * y).sqrt().max(f64::MIN_POSITIVE);
        (x / norm, y / norm)
    };

    move |p: &[f64; 2]| {
        let coordinate = p[0] * dx + p[1] * dy;
        let (rho, pressure) = if uniform || coordinate < position {
            (1.0, 1.0)
        } else {
            (0.125, 0.1)
        };
        let e = pressure / ((gamma - 1.0) * rho);
        [rho, 0.0, 0.0, e]
    }
}

/// 通用时间循环
///
/// Restart 时将 CFL 减半重试；每 100 步记录一次进度。
fn time_loop<E, const D: usize, const P: usize, const K: usize>(
    equation: Arc<E>,
    offline: Arc<OfflineData<D>>,
    config: &SolverConfig,
    initial_primitive: &dyn Fn(&[f64; D]) -> [f64; P],
) -> anyhow::Result<()>
where
    E: Equation<D, P, K>,
{
    let view: E::View<f64> = equation.view();
    let n = offline.n_nodes;

    let mut state = StateVector::<P, K>::new(n);
    for i in 0..n {
        let primitive = initial_primitive(&offline.positions[i]);
        state.u.set_node(i, &view.from_primitive_state(&primitive));
    }
    let mut new_state = state.clone();

    let mut module = HyperbolicModule::new(
        equation,
        offline.clone(),
        SingleProcess::new(),
        config.hyperbolic_module.clone(),
    );
    module.prepare();

    let dirichlet =
        |position: &[f64; D], _t: f64| view.from_primitive_state(&initial_primitive(position));

    let final_time = config.final_time;
    let mut t = 0.0;
    let mut cycle = 0usize;

    log::info!(
        "开始: {} 节点, 终止时间 {}, CFL {}",
        n,
        final_time,
        module.cfl()
    );

    let mut n_retries = 0usize;
    while t < final_time {
        // 预处理（动力学边界特征重构可能抛 Restart）与步进
        // 共用同一重试路径
        let advanced = module
            .prepare_state_vector(&mut state, t, &dirichlet)
            .and_then(|()| module.step(&state, &[], &mut new_state, 0.0));

        match advanced {
            Ok(stats) => {
                t += stats.tau;
                cycle += 1;
                std::mem::swap(&mut state, &mut new_state);

                if cycle % 100 == 0 {
                    log::info!(
                        "cycle {:>6}  t = {:.6}  τ = {:.3e}",
                        cycle,
                        t,
                        stats.tau
                    );
                }
            }
            Err(_restart) => {
                let reduced = 0.5 * module.cfl();
                if reduced < 1.0e-6 {
                    bail!("CFL 减半后仍无法步进");
                }
                n_retries += 1;
                log::warn!("Restart: CFL {:.4} → {:.4}", module.cfl(), reduced);
                module.set_cfl(reduced);
            }
        }

        if cycle > 2_000_000 || n_retries > 64 {
            bail!("循环数超限");
        }
    }

    let mass: f64 = (0..n)
        .map(|i| offline.lumped_mass[i] * state.u.component(0)[i])
        .sum();
    log::info!(
        "完成: {} 步, t = {:.6}, 首分量总量 {:.10e}, restarts {}, warnings {}",
        cycle,
        t,
        mass,
        module.n_restarts(),
        module.n_warnings()
    );

    Ok(())
}
