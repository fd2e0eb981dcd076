//! Finite element solvers: per-element matrix and vector derivation.

use nalgebra::{SMatrix, SVector, Vector3};
use rtfem_model::{Material, TetrahedronElement, Vertex};

use crate::error::Result;

pub mod tetrahedron;

pub use tetrahedron::TetrahedronSolver;

/// Strain components per the Voigt ordering used throughout:
/// `[εxx, εyy, εzz, γxy, γyz, γzx]`.
pub const STRAIN_COMPONENTS: usize = 6;

/// DOFs of a 4-node tetrahedral element (4 vertices × 3 translations).
pub const TETRAHEDRON_DOFS: usize = 12;

/// Per-element results derived analytically from the element geometry.
///
/// For linear tetrahedra the geometry matrix and volume are constant
/// properties of the rest geometry: they need not be recomputed between
/// iterations unless the rest geometry changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSolverData {
    /// Geometry (strain-displacement) matrix B, maps nodal displacements
    /// to strain.
    pub geometry_matrix: SMatrix<f64, STRAIN_COMPONENTS, TETRAHEDRON_DOFS>,
    /// Consistent nodal force vector from body and traction forces.
    pub force_vector: SVector<f64, TETRAHEDRON_DOFS>,
    /// Element volume (positive for correctly wound elements).
    pub volume: f64,
}

/// Element solver interface for per-element derivation.
///
/// Implementations are pure with respect to their inputs: for fixed inputs
/// the outputs are bit-reproducible, which makes per-element computation
/// safe to run concurrently across all elements.
pub trait ElementSolver: Send + Sync {
    /// Derive the geometry matrix, force vector and volume of one element.
    ///
    /// # Arguments
    /// * `element` - The element (vertex ordering is significant)
    /// * `vertices` - All mesh vertices, indexed by the element
    /// * `body_force` - Uniform body force per unit mass (e.g. gravity)
    /// * `material` - Material properties
    ///
    /// # Errors
    /// Returns a geometry error for degenerate or misoriented elements
    /// (non-positive volume) and a configuration error for dangling
    /// vertex references.
    fn solve(
        &self,
        element: &TetrahedronElement,
        vertices: &[Vertex],
        body_force: &Vector3<f64>,
        material: &Material,
    ) -> Result<ElementSolverData>;
}

/// Constitutive matrix (D-matrix) for 3D isotropic linear elasticity.
///
/// D relates stresses to strains: {σ} = [D]{ε}
///
/// ```text
///       [1-ν   ν     ν     0       0       0    ]
///       [ν     1-ν   ν     0       0       0    ]
///   E   [ν     ν     1-ν   0       0       0    ]
/// ───── [0     0     0   (1-2ν)/2  0       0    ]
/// (1+ν)(1-2ν)
///       [0     0     0     0     (1-2ν)/2  0    ]
///       [0     0     0     0       0     (1-2ν)/2]
/// ```
pub fn constitutive_matrix(material: &Material) -> SMatrix<f64, 6, 6> {
    let e = material.young_modulus;
    let nu = material.poisson_ratio;

    let factor = e / ((1.0 + nu) * (1.0 - 2.0 * nu));
    let diagonal = 1.0 - nu;
    let shear = (1.0 - 2.0 * nu) / 2.0;

    let mut d = SMatrix::<f64, 6, 6>::zeros();

    for i in 0..3 {
        for j in 0..3 {
            d[(i, j)] = if i == j { diagonal } else { nu } * factor;
        }
        d[(i + 3, i + 3)] = shear * factor;
    }

    d
}

/// Element stiffness matrix `k_e = Bᵀ·D·B·V`.
///
/// Exact for linear tetrahedra since B is constant over the element.
pub fn stiffness_matrix(
    data: &ElementSolverData,
    material: &Material,
) -> SMatrix<f64, TETRAHEDRON_DOFS, TETRAHEDRON_DOFS> {
    let d = constitutive_matrix(material);
    let b = &data.geometry_matrix;
    b.transpose() * d * b * data.volume
}

/// Consistent element mass matrix for a linear tetrahedron.
///
/// From the closed-form integral `∫ Nᵢ Nⱼ dV`: `ρV/10` for matching
/// vertices, `ρV/20` otherwise, per translation direction.
pub fn mass_matrix(
    volume: f64,
    material: &Material,
) -> SMatrix<f64, TETRAHEDRON_DOFS, TETRAHEDRON_DOFS> {
    let rho = material.density;
    let mut m = SMatrix::<f64, TETRAHEDRON_DOFS, TETRAHEDRON_DOFS>::zeros();

    for i in 0..4 {
        for j in 0..4 {
            let entry = if i == j {
                rho * volume / 10.0
            } else {
                rho * volume / 20.0
            };
            for k in 0..3 {
                m[(i * 3 + k, j * 3 + k)] = entry;
            }
        }
    }

    m
}

/// Global DOF indices of an element: 3 consecutive DOFs per vertex,
/// ordered by vertex index.
pub fn global_dof_indices(element: &TetrahedronElement) -> [usize; TETRAHEDRON_DOFS] {
    let mut indices = [0usize; TETRAHEDRON_DOFS];
    for (local, &vertex) in element.vertices.iter().enumerate() {
        for k in 0..3 {
            indices[local * 3 + k] = vertex * 3 + k;
        }
    }
    indices
}
