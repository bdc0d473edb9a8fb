// crates/cf_physics/src/eos/van_der_waals.rs

//! 范德瓦尔斯状态方程
//!
//! p = (γ - 1)(ρ e + a ρ²)/(1 - b ρ) - a ρ²
//!
//! 注意：该方程允许负压。插值参考压力 p∞ 无自然取值，
//! 保持为 0；下游的熵界限制路径不得假定 p + p∞ > 0。

use cf_foundation::float::positive_part;

use super::EquationOfState;

/// 范德瓦尔斯气体
#[derive(Debug, Clone)]
pub struct VanDerWaals {
    gamma: f64,
    a: f64,
    b: f64,
    cv: f64,
}

impl VanDerWaals {
    /// 创建范德瓦尔斯方程，a 为分子间引力常数，b 为共容积
    pub fn new(gamma: f64, a: f64, b: f64, r: f64) -> Self {
        Self {
            gamma,
            a,
            b,
            cv: r / (gamma - 1.0),
        }
    }
}

impl EquationOfState for VanDerWaals {
    fn name(&self) -> &'static str {
        "van der waals"
    }

    #[inline]
    fn pressure(&self, rho: f64, e: f64) -> f64 {
        let intermolecular = self.a * rho * rho;
        let covolume = 1.0 - self.b * rho;
        (self.gamma - 1.0) * (rho * e + intermolecular) / covolume - intermolecular
    }

    #[inline]
    fn specific_internal_energy(&self, rho: f64, p: f64) -> f64 {
        let intermolecular = self.a * rho * rho;
        let covolume = 1.0 - self.b * rho;
        (p + intermolecular) * covolume / (rho * (self.gamma - 1.0)) - self.a * rho
    }

    #[inline]
    fn temperature(&self, rho: f64, e: f64) -> f64 {
        (e + self.a * rho) / self.cv
    }

    #[inline]
    fn speed_of_sound(&self, rho: f64, e: f64) -> f64 {
        // c² = γ(γ-1)(e + aρ)/(1 - bρ)² - 2aρ
        let covolume = 1.0 - self.b * rho;
        let radicand =
            self.gamma * (self.gamma - 1.0) * (e + self.a * rho) / (covolume * covolume)
                - 2.0 * self.a * rho;
        positive_part(radicand).sqrt()
    }

    #[inline]
    fn interpolation_b(&self) -> f64 {
        self.b
    }

    // interpolation_pinfty 保持默认 0：vdW 允许负压，无自然 p∞
}
