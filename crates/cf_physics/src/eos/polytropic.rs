// crates/cf_physics/src/eos/polytropic.rs

//! 多方气体状态方程
//!
//! p = (γ - 1) ρ e

use cf_foundation::float::positive_part;

use super::EquationOfState;

/// 多方（理想）气体
#[derive(Debug, Clone)]
pub struct PolytropicGas {
    gamma: f64,
    /// 比定容热容 cv = R / (γ - 1)
    cv: f64,
}

impl PolytropicGas {
    /// 创建多方气体，γ 为比热比，r 为比气体常数
    pub fn new(gamma: f64, r: f64) -> Self {
        Self {
            gamma,
            cv: r / (gamma - 1.0),
        }
    }

    /// 比热比
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl EquationOfState for PolytropicGas {
    fn name(&self) -> &'static str {
        "polytropic gas"
    }

    #[inline]
    fn pressure(&self, rho: f64, e: f64) -> f64 {
        (self.gamma - 1.0) * rho * e
    }

    #[inline]
    fn specific_internal_energy(&self, rho: f64, p: f64) -> f64 {
        p / ((self.gamma - 1.0) * rho)
    }

    #[inline]
    fn temperature(&self, _rho: f64, e: f64) -> f64 {
        e / self.cv
    }

    #[inline]
    fn speed_of_sound(&self, _rho: f64, e: f64) -> f64 {
        positive_part(self.gamma * (self.gamma - 1.0) * e).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_energy_roundtrip() {
        let eos = PolytropicGas::new(1.4, 0.4);
        let (rho, e) = (1.2, 2.5);
        let p = eos.pressure(rho, e);
        assert!((eos.specific_internal_energy(rho, p) - e).abs() < 1e-14);
    }

    #[test]
    fn test_sound_speed() {
        let eos = PolytropicGas::new(1.4, 0.4);
        // c² = γ p / ρ
        let (rho, e) = (1.0, 2.5);
        let p = eos.pressure(rho, e);
        let c_expected = (1.4 * p / rho).sqrt();
        assert!((eos.speed_of_sound(rho, e) - c_expected).abs() < 1e-12);
    }
}
