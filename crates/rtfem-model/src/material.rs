//! Material properties for finite element analysis.

/// Linear elastic isotropic material.
///
/// One material is shared by all elements of a model and is immutable for
/// the duration of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Young's modulus (E) [Pa]
    pub young_modulus: f64,
    /// Poisson's ratio (ν) [-]
    pub poisson_ratio: f64,
    /// Density (ρ) [kg/m³]
    pub density: f64,
}

impl Material {
    /// Create a new material.
    pub fn new(young_modulus: f64, poisson_ratio: f64, density: f64) -> Self {
        Self {
            young_modulus,
            poisson_ratio,
            density,
        }
    }

    /// Get the shear modulus (G) from E and ν.
    pub fn shear_modulus(&self) -> f64 {
        self.young_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }

    /// Get the bulk modulus (K) from E and ν.
    pub fn bulk_modulus(&self) -> f64 {
        self.young_modulus / (3.0 * (1.0 - 2.0 * self.poisson_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_moduli() {
        let steel = Material::new(210e9, 0.3, 7850.0);

        // G = E / (2(1+ν)) ≈ 80.77 GPa
        assert!((steel.shear_modulus() - 80.769e9).abs() / 80.769e9 < 1e-4);

        // K = E / (3(1-2ν)) = 175 GPa
        assert!((steel.bulk_modulus() - 175e9).abs() / 175e9 < 1e-12);
    }
}
