// crates/cf_physics/src/eos/mod.rs

//! 状态方程库
//!
//! 提供标量接口（逐点）与批量接口（整段数组一次调用）。
//! 批量接口服务于外部表格库等调用开销大的实现，由
//! `prefer_vector_interface()` 标记偏好；预计算循环据此选择
//! 执行模式。
//!
//! 每个状态方程另外暴露 NASG 插值参数 (b, p∞, q)，供代理 γ /
//! 代理压力 / 代理熵使用。

mod noble_abel;
mod polytropic;
mod tabulated;
mod van_der_waals;

pub use noble_abel::NobleAbelStiffenedGas;
pub use polytropic::PolytropicGas;
pub use tabulated::TabulatedEos;
pub use van_der_waals::VanDerWaals;

use std::sync::Arc;

use cf_config::{EosConfig, EosKind};

/// 状态方程接口
///
/// 所有量为比量：e 为比内能 [J/kg]，p 为压力。
pub trait EquationOfState: Send + Sync {
    /// 名称
    fn name(&self) -> &'static str;

    /// p(ρ, e)
    fn pressure(&self, rho: f64, e: f64) -> f64;

    /// e(ρ, p)
    fn specific_internal_energy(&self, rho: f64, p: f64) -> f64;

    /// T(ρ, e)
    fn temperature(&self, rho: f64, e: f64) -> f64;

    /// c(ρ, e)
    fn speed_of_sound(&self, rho: f64, e: f64) -> f64;

    /// NASG 插值共容积 b
    fn interpolation_b(&self) -> f64 {
        0.0
    }

    /// NASG 插值参考压力 p∞
    fn interpolation_pinfty(&self) -> f64 {
        0.0
    }

    /// NASG 插值参考比内能 q
    fn interpolation_q(&self) -> f64 {
        0.0
    }

    /// 是否偏好批量接口
    fn prefer_vector_interface(&self) -> bool {
        false
    }

    /// 批量压力（默认逐点回退）
    fn pressure_batch(&self, p: &mut [f64], rho: &[f64], e: &[f64]) {
        debug_assert_eq!(p.len(), rho.len());
        debug_assert_eq!(p.len(), e.len());
        for i in 0..p.len() {
            p[i] = self.pressure(rho[i], e[i]);
        }
    }
}

/// 按配置实例化状态方程
///
/// 表格方程默认由多方气体生成采样表（外部表格库为协作者，
/// 此处保证批量接口路径可被端到端执行）。
pub fn create(kind: EosKind, cfg: &EosConfig) -> Arc<dyn EquationOfState> {
    match kind {
        EosKind::PolytropicGas => Arc::new(PolytropicGas::new(cfg.gamma, cfg.gas_constant_r)),
        EosKind::VanDerWaals => Arc::new(VanDerWaals::new(
            cfg.gamma,
            cfg.vdw_a,
            cfg.covolume_b,
            cfg.gas_constant_r,
        )),
        EosKind::NobleAbelStiffenedGas => Arc::new(NobleAbelStiffenedGas::new(
            cfg.gamma,
            cfg.covolume_b,
            cfg.pinf,
            cfg.q,
            cfg.gas_constant_r,
        )),
        EosKind::Tabulated => Arc::new(TabulatedEos::sampled_from(
            &PolytropicGas::new(cfg.gamma, cfg.gas_constant_r),
            (1.0e-8, 1.0e4),
            (1.0e-8, 1.0e7),
            512,
            512,
        )),
    }
}
