// crates/cf_physics/src/eos/tabulated.rs

//! 表格状态方程
//!
//! 在 (ln ρ, ln e) 规则网格上双线性插值 p(ρ, e)。外部表格库
//! 调用开销大，因此本实现偏好批量接口：预计算循环聚集 ρ/e
//! 到临时数组，一次调用填充整段压力，再散射回通道。
//!
//! 逆函数 e(ρ, p) 通过沿 e 方向二分求解；声速由热力学恒等式
//! c² = (∂p/∂ρ)_e + (p/ρ²)(∂p/∂e)_ρ 以中心差分近似。

use cf_foundation::float::positive_part;

use super::EquationOfState;

/// 双线性插值表格状态方程
pub struct TabulatedEos {
    ln_rho_min: f64,
    ln_rho_max: f64,
    ln_e_min: f64,
    ln_e_max: f64,
    n_rho: usize,
    n_e: usize,
    /// p 值表，行主序 [i_rho * n_e + i_e]
    table: Vec<f64>,
    /// 温度采样（与 p 同网格）
    temperature_table: Vec<f64>,
}

impl TabulatedEos {
    /// 从解析状态方程采样生成表格
    pub fn sampled_from(
        source: &dyn EquationOfState,
        rho_range: (f64, f64),
        e_range: (f64, f64),
        n_rho: usize,
        n_e: usize,
    ) -> Self {
        assert!(n_rho >= 2 && n_e >= 2);
        assert!(rho_range.0 > 0.0 && e_range.0 > 0.0);

        let ln_rho_min = rho_range.0.ln();
        let ln_rho_max = rho_range.1.ln();
        let ln_e_min = e_range.0.ln();
        let ln_e_max = e_range.1.ln();

        let mut table = vec![0.0; n_rho * n_e];
        let mut temperature_table = vec![0.0; n_rho * n_e];
        for ir in 0..n_rho {
            let t_r = ir as f64 / (n_rho - 1) as f64;
            let rho = (ln_rho_min + t_r * (ln_rho_max - ln_rho_min)).exp();
            for ie in 0..n_e {
                let t_e = ie as f64 / (n_e - 1) as f64;
                let e = (ln_e_min + t_e * (ln_e_max - ln_e_min)).exp();
                table[ir * n_e + ie] = source.pressure(rho, e);
                temperature_table[ir * n_e + ie] = source.temperature(rho, e);
            }
        }

        Self {
            ln_rho_min,
            ln_rho_max,
            ln_e_min,
            ln_e_max,
            n_rho,
            n_e,
            table,
            temperature_table,
        }
    }

    /// 双线性插值查表
    fn interpolate(&self, table: &[f64], rho: f64, e: f64) -> f64 {
        let x = (rho.max(f64::MIN_POSITIVE).ln() - self.ln_rho_min)
            / (self.ln_rho_max - self.ln_rho_min)
            * (self.n_rho - 1) as f64;
        let y = (e.max(f64::MIN_POSITIVE).ln() - self.ln_e_min) / (self.ln_e_max - self.ln_e_min)
            * (self.n_e - 1) as f64;

        let x = x.clamp(0.0, (self.n_rho - 1) as f64);
        let y = y.clamp(0.0, (self.n_e - 1) as f64);

        let i = (x as usize).min(self.n_rho - 2);
        let j = (y as usize).min(self.n_e - 2);
        let fx = x - i as f64;
        let fy = y - j as f64;

        let v00 = table[i * self.n_e + j];
        let v01 = table[i * self.n_e + j + 1];
        let v10 = table[(i + 1) * self.n_e + j];
        let v11 = table[(i + 1) * self.n_e + j + 1];

        (1.0 - fx) * ((1.0 - fy) * v00 + fy * v01) + fx * ((1.0 - fy) * v10 + fy * v11)
    }

    #[inline]
    fn e_bounds(&self) -> (f64, f64) {
        (self.ln_e_min.exp(), self.ln_e_max.exp())
    }
}

impl EquationOfState for TabulatedEos {
    fn name(&self) -> &'static str {
        "tabulated"
    }

    fn pressure(&self, rho: f64, e: f64) -> f64 {
        self.interpolate(&self.table, rho, e)
    }

    fn specific_internal_energy(&self, rho: f64, p: f64) -> f64 {
        // p 沿 e 单调，二分求逆
        let (mut lo, mut hi) = self.e_bounds();
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            if self.pressure(rho, mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    fn temperature(&self, rho: f64, e: f64) -> f64 {
        self.interpolate(&self.temperature_table, rho, e)
    }

    fn speed_of_sound(&self, rho: f64, e: f64) -> f64 {
        let dr = rho * 1.0e-4;
        let de = e * 1.0e-4;
        let p = self.pressure(rho, e);
        let dp_drho = (self.pressure(rho + dr, e) - self.pressure(rho - dr, e)) / (2.0 * dr);
        let dp_de = (self.pressure(rho, e + de) - self.pressure(rho, e - de)) / (2.0 * de);
        let radicand = dp_drho + p / (rho * rho) * dp_de;
        positive_part(radicand).sqrt()
    }

    fn prefer_vector_interface(&self) -> bool {
        true
    }

    fn pressure_batch(&self, p: &mut [f64], rho: &[f64], e: &[f64]) {
        for i in 0..p.len() {
            p[i] = self.interpolate(&self.table, rho[i], e[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::PolytropicGas;

    fn table() -> TabulatedEos {
        let src = PolytropicGas::new(1.4, 0.4);
        TabulatedEos::sampled_from(&src, (1.0e-4, 1.0e2), (1.0e-4, 1.0e4), 256, 256)
    }

    #[test]
    fn test_matches_source_in_range() {
        let tab = table();
        let src = PolytropicGas::new(1.4, 0.4);
        for &(rho, e) in &[(1.0, 2.5), (0.1, 10.0), (5.0, 0.5)] {
            let rel = (tab.pressure(rho, e) - src.pressure(rho, e)).abs()
                / src.pressure(rho, e).abs();
            assert!(rel < 1e-3, "表格误差过大: rho={} e={} rel={}", rho, e, rel);
        }
    }

    #[test]
    fn test_energy_inverse() {
        let tab = table();
        let (rho, e) = (1.0, 2.5);
        let p = tab.pressure(rho, e);
        let e_back = tab.specific_internal_energy(rho, p);
        assert!((e_back - e).abs() / e < 1e-6);
    }

    #[test]
    fn test_sound_speed_close_to_analytic() {
        let tab = table();
        let src = PolytropicGas::new(1.4, 0.4);
        let (rho, e) = (1.0, 2.5);
        let rel = (tab.speed_of_sound(rho, e) - src.speed_of_sound(rho, e)).abs()
            / src.speed_of_sound(rho, e);
        assert!(rel < 1e-2);
    }
}
