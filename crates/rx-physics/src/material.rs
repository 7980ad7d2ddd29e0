//! Constant-property solid materials.

use rx_core::ensure_positive;
use rx_project::MaterialDef;

use crate::error::PhysicsResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Thermal conductivity (W/m/K)
    pub k: f64,
    /// Density (kg/m³)
    pub rho: f64,
    /// Specific heat capacity (J/kg/K)
    pub cp: f64,
}

impl Material {
    pub fn new(k: f64, rho: f64, cp: f64) -> PhysicsResult<Self> {
        Ok(Self {
            k: ensure_positive(k, "conductivity")?,
            rho: ensure_positive(rho, "density")?,
            cp: ensure_positive(cp, "heat capacity")?,
        })
    }

    pub fn from_def(def: &MaterialDef) -> PhysicsResult<Self> {
        Self::new(def.conductivity_w_mk, def.density_kg_m3, def.heat_capacity_j_kgk)
    }

    /// Volumetric heat capacity (J/m³/K).
    pub fn rho_cp(&self) -> f64 {
        self.rho * self.cp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_properties() {
        assert!(Material::new(3.0, 10_000.0, 300.0).is_ok());
        assert!(Material::new(0.0, 10_000.0, 300.0).is_err());
        assert!(Material::new(3.0, f64::NAN, 300.0).is_err());
    }
}
