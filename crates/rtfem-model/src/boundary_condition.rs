//! Displacement boundary conditions.

use nalgebra::Vector3;

/// A prescribed-displacement constraint on one vertex.
///
/// All three translational DOFs of the vertex are constrained to the given
/// values (0 for a fully fixed vertex).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCondition {
    /// Constrained vertex index.
    pub vertex: usize,
    /// Prescribed displacement for the vertex's x, y, z DOFs.
    pub value: Vector3<f64>,
}

impl BoundaryCondition {
    /// Create a new boundary condition.
    pub fn new(vertex: usize, value: Vector3<f64>) -> Self {
        Self { vertex, value }
    }

    /// Fully fix a vertex (zero prescribed displacement).
    pub fn fixed(vertex: usize) -> Self {
        Self::new(vertex, Vector3::zeros())
    }

    /// Global DOF indices constrained by this boundary condition.
    pub fn dof_indices(&self) -> [usize; 3] {
        let base = self.vertex * 3;
        [base, base + 1, base + 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dof_indices_follow_vertex_stride() {
        let bc = BoundaryCondition::fixed(4);
        assert_eq!(bc.dof_indices(), [12, 13, 14]);
        assert_eq!(bc.value, Vector3::zeros());
    }

    #[test]
    fn prescribed_displacement_values() {
        let bc = BoundaryCondition::new(2, Vector3::new(0.0, -0.01, 0.0));
        assert_eq!(bc.dof_indices(), [6, 7, 8]);
        assert_eq!(bc.value.y, -0.01);
    }
}
