//! The FEM model aggregate: geometry, material, boundary conditions and
//! body force for a single connected body.

use nalgebra::Vector3;

use crate::boundary_condition::BoundaryCondition;
use crate::geometry::FemGeometry;
use crate::material::Material;

/// Solve input for one connected deformable body.
///
/// Constructed once and logically immutable during a single solve pass;
/// boundary conditions and body force may be appended between solves.
#[derive(Debug, Clone)]
pub struct FemModel {
    geometry: FemGeometry,
    material: Material,
    boundary_conditions: Vec<BoundaryCondition>,
    body_force: Vector3<f64>,
}

impl FemModel {
    /// Create a model from a fully built geometry and material.
    pub fn new(geometry: FemGeometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            boundary_conditions: Vec::new(),
            body_force: Vector3::zeros(),
        }
    }

    /// The mesh topology.
    pub fn geometry(&self) -> &FemGeometry {
        &self.geometry
    }

    /// Mutable access to the mesh, e.g. for applying traction to faces.
    pub fn geometry_mut(&mut self) -> &mut FemGeometry {
        &mut self.geometry
    }

    /// The shared material.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// All prescribed-displacement constraints.
    pub fn boundary_conditions(&self) -> &[BoundaryCondition] {
        &self.boundary_conditions
    }

    /// The uniform body force per unit mass (e.g. gravity) applied to
    /// every element.
    pub fn body_force(&self) -> &Vector3<f64> {
        &self.body_force
    }

    /// Append a boundary condition to the model.
    pub fn add_boundary_condition(&mut self, boundary_condition: BoundaryCondition) {
        self.boundary_conditions.push(boundary_condition);
    }

    /// Add a body force (e.g. gravity) to the entire model.
    ///
    /// Body forces accumulate; each element receives the total.
    pub fn add_body_force(&mut self, body_force: Vector3<f64>) {
        self.body_force += body_force;
    }

    /// Number of global degrees of freedom (3 per vertex).
    pub fn dof_count(&self) -> usize {
        self.geometry.dof_count()
    }

    /// Get statistics.
    pub fn statistics(&self) -> ModelStatistics {
        ModelStatistics {
            num_vertices: self.geometry.vertices.len(),
            num_elements: self.geometry.elements.len(),
            num_dofs: self.dof_count(),
            num_boundary_conditions: self.boundary_conditions.len(),
        }
    }
}

/// Model statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatistics {
    /// Number of vertices
    pub num_vertices: usize,
    /// Number of tetrahedral elements
    pub num_elements: usize,
    /// Number of global degrees of freedom
    pub num_dofs: usize,
    /// Number of boundary condition entries
    pub num_boundary_conditions: usize,
}

impl ModelStatistics {
    /// Format as a human-readable string.
    pub fn format(&self) -> String {
        format!(
            "Model: {} vertices ({} DOFs), {} elements, {} boundary conditions",
            self.num_vertices, self.num_dofs, self.num_elements, self.num_boundary_conditions
        )
    }
}
