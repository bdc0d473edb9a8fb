// crates/cf_physics/src/eos/noble_abel.rs

//! Noble-Abel 刚性气体状态方程 (NASG)
//!
//! p = (γ - 1) ρ (e - q) / (1 - b ρ) - γ p∞
//!
//! 该族是代理 γ 插值的原型：插值参数 (b, p∞, q) 即本方程自身的
//! 物理常数。

use cf_foundation::float::positive_part;

use super::EquationOfState;

/// Noble-Abel 刚性气体
#[derive(Debug, Clone)]
pub struct NobleAbelStiffenedGas {
    gamma: f64,
    b: f64,
    pinf: f64,
    q: f64,
    cv: f64,
}

impl NobleAbelStiffenedGas {
    /// 创建 NASG 方程
    pub fn new(gamma: f64, b: f64, pinf: f64, q: f64, r: f64) -> Self {
        Self {
            gamma,
            b,
            pinf,
            q,
            cv: r / (gamma - 1.0),
        }
    }

    #[inline]
    fn covolume(&self, rho: f64) -> f64 {
        1.0 - self.b * rho
    }
}

impl EquationOfState for NobleAbelStiffenedGas {
    fn name(&self) -> &'static str {
        "noble abel stiffened gas"
    }

    #[inline]
    fn pressure(&self, rho: f64, e: f64) -> f64 {
        (self.gamma - 1.0) * rho * (e - self.q) / self.covolume(rho) - self.gamma * self.pinf
    }

    #[inline]
    fn specific_internal_energy(&self, rho: f64, p: f64) -> f64 {
        (p + self.gamma * self.pinf) * self.covolume(rho) / ((self.gamma - 1.0) * rho) + self.q
    }

    #[inline]
    fn temperature(&self, rho: f64, e: f64) -> f64 {
        (e - self.q - self.pinf * self.covolume(rho) / rho) / self.cv
    }

    #[inline]
    fn speed_of_sound(&self, rho: f64, e: f64) -> f64 {
        // c² = γ (p + p∞) / (ρ (1 - b ρ))
        let p = self.pressure(rho, e);
        let radicand = self.gamma * (p + self.pinf) / (rho * self.covolume(rho));
        positive_part(radicand).sqrt()
    }

    #[inline]
    fn interpolation_b(&self) -> f64 {
        self.b
    }

    #[inline]
    fn interpolation_pinfty(&self) -> f64 {
        self.pinf
    }

    #[inline]
    fn interpolation_q(&self) -> f64 {
        self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduces_to_polytropic() {
        // b = p∞ = q = 0 时退化为多方气体
        let nasg = NobleAbelStiffenedGas::new(1.4, 0.0, 0.0, 0.0, 0.4);
        let (rho, e) = (1.3, 2.1);
        assert!((nasg.pressure(rho, e) - 0.4 * rho * e).abs() < 1e-14);
    }

    #[test]
    fn test_pressure_energy_roundtrip() {
        let nasg = NobleAbelStiffenedGas::new(1.6, 0.05, 10.0, 0.2, 0.4);
        let (rho, e) = (2.0, 15.0);
        let p = nasg.pressure(rho, e);
        assert!((nasg.specific_internal_energy(rho, p) - e).abs() < 1e-11);
    }

    #[test]
    fn test_interpolation_parameters() {
        let nasg = NobleAbelStiffenedGas::new(1.6, 0.05, 10.0, 0.2, 0.4);
        assert_eq!(nasg.interpolation_b(), 0.05);
        assert_eq!(nasg.interpolation_pinfty(), 10.0);
        assert_eq!(nasg.interpolation_q(), 0.2);
    }
}
