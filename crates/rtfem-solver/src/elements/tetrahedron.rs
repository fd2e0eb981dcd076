//! Solver for the linear tetrahedron (constant shape-function gradient).
//!
//! The geometry matrix B is constant with respect to position, which is
//! what allows fully analytical integration: no quadrature is needed
//! anywhere in this module and, for fixed inputs, the outputs are
//! bit-reproducible.
//!
//! ## Shape functions
//!
//! The linear shape function of vertex `i` is
//!
//! ```text
//! fᵢ(x) = (Aᵢ + Bᵢ·x₁ + Cᵢ·x₂ + Dᵢ·x₃) / 6V
//! ```
//!
//! with the coefficients obtained as cofactors of the 4×4 coordinate
//! matrix (rows `[1, xᵢ, yᵢ, zᵢ]`). The signed volume follows from the
//! same cofactors: `6V = ΣᵢAᵢ`. A non-positive volume means a degenerate
//! or incorrectly wound element; it is reported as a geometry error, not
//! silently corrected.

use nalgebra::{DMatrix, Matrix3, SMatrix, SVector, Vector3};
use rtfem_model::{Material, TetrahedronElement, Vertex};

use crate::elements::{ElementSolver, ElementSolverData, STRAIN_COMPONENTS, TETRAHEDRON_DOFS};
use crate::error::{FemError, Result};
use crate::matrix_math;

/// Shape-function coefficients of the four vertices.
#[derive(Debug, Clone, PartialEq)]
struct ShapeFunctionCoefficients {
    a: [f64; 4],
    b: [f64; 4],
    c: [f64; 4],
    d: [f64; 4],
}

/// Outward normal and area of one element face.
#[derive(Debug, Clone, PartialEq)]
struct FaceGeometry {
    normal: Vector3<f64>,
    area: f64,
}

/// Element solver for 4-node linear tetrahedra.
///
/// Does NOT reorder vertices: callers must satisfy the winding contract
/// documented on [`TetrahedronElement`].
#[derive(Debug, Default)]
pub struct TetrahedronSolver;

impl TetrahedronSolver {
    /// Create a new tetrahedron solver.
    pub fn new() -> Self {
        Self
    }

    /// The 3×3 Jacobian of the element's rest geometry.
    ///
    /// Columns are the edge vectors from vertex 1 to vertices 2, 3, 4;
    /// its determinant equals `6V`.
    pub fn jacobian(
        &self,
        element: &TetrahedronElement,
        vertices: &[Vertex],
    ) -> Result<Matrix3<f64>> {
        let p = Self::fetch_positions(element, vertices)?;
        Ok(Matrix3::from_columns(&[
            p[1] - p[0],
            p[2] - p[0],
            p[3] - p[0],
        ]))
    }

    /// The analytical inverse of the 3×3 Jacobian.
    ///
    /// Reuses the shape-function coefficient derivation: row `k` of the
    /// inverse is `(Bₖ₊₁, Cₖ₊₁, Dₖ₊₁) / 6V`. Used by callers that need
    /// gradients with respect to the rest geometry.
    ///
    /// # Errors
    /// Returns a geometry error for degenerate or misoriented elements.
    pub fn jacobian_inverse(
        &self,
        element: &TetrahedronElement,
        vertices: &[Vertex],
    ) -> Result<Matrix3<f64>> {
        let positions = Self::fetch_positions(element, vertices)?;
        let coefficients = Self::compute_shape_function_coefficients(&positions)?;
        let volume = Self::compute_volume(&coefficients, element)?;

        let six_v = 6.0 * volume;
        Ok(Matrix3::new(
            coefficients.b[1] / six_v,
            coefficients.c[1] / six_v,
            coefficients.d[1] / six_v,
            coefficients.b[2] / six_v,
            coefficients.c[2] / six_v,
            coefficients.d[2] / six_v,
            coefficients.b[3] / six_v,
            coefficients.c[3] / six_v,
            coefficients.d[3] / six_v,
        ))
    }

    /// Resolve the element's vertex references to positions.
    fn fetch_positions(
        element: &TetrahedronElement,
        vertices: &[Vertex],
    ) -> Result<[Vector3<f64>; 4]> {
        let mut positions = [Vector3::zeros(); 4];
        for (slot, &index) in positions.iter_mut().zip(element.vertices.iter()) {
            let vertex = vertices.get(index).ok_or_else(|| {
                FemError::Configuration(format!(
                    "element references vertex {index}, but only {} vertices exist",
                    vertices.len()
                ))
            })?;
            *slot = vertex.position;
        }
        Ok(positions)
    }

    /// Compute the shape-function coefficients Aᵢ, Bᵢ, Cᵢ, Dᵢ as cofactors
    /// of the 4×4 coordinate matrix.
    fn compute_shape_function_coefficients(
        positions: &[Vector3<f64>; 4],
    ) -> Result<ShapeFunctionCoefficients> {
        let mut coordinate_matrix = DMatrix::zeros(4, 4);
        for (i, p) in positions.iter().enumerate() {
            coordinate_matrix[(i, 0)] = 1.0;
            coordinate_matrix[(i, 1)] = p.x;
            coordinate_matrix[(i, 2)] = p.y;
            coordinate_matrix[(i, 3)] = p.z;
        }

        let mut coefficients = ShapeFunctionCoefficients {
            a: [0.0; 4],
            b: [0.0; 4],
            c: [0.0; 4],
            d: [0.0; 4],
        };

        for i in 0..4 {
            let cofactor = |column: usize| -> Result<f64> {
                let minor = matrix_math::contract(&coordinate_matrix, i, column)?;
                let sign = if (i + column) % 2 == 0 { 1.0 } else { -1.0 };
                Ok(sign * matrix_math::determinant(&minor)?)
            };

            coefficients.a[i] = cofactor(0)?;
            coefficients.b[i] = cofactor(1)?;
            coefficients.c[i] = cofactor(2)?;
            coefficients.d[i] = cofactor(3)?;
        }

        Ok(coefficients)
    }

    /// Signed volume from the coefficients: `V = ΣᵢAᵢ / 6`.
    ///
    /// # Errors
    /// A non-positive volume is a precondition violation (degenerate or
    /// incorrectly wound element), reported as a geometry error.
    fn compute_volume(
        coefficients: &ShapeFunctionCoefficients,
        element: &TetrahedronElement,
    ) -> Result<f64> {
        let volume = coefficients.a.iter().sum::<f64>() / 6.0;
        if volume <= 0.0 {
            return Err(FemError::Geometry(format!(
                "element {:?} has non-positive volume {volume:e}; \
                 vertices are degenerate or wound clockwise",
                element.vertices
            )));
        }
        Ok(volume)
    }

    /// Assemble the [6×12] geometry matrix B from the coefficients.
    ///
    /// Each vertex's (Bᵢ, Cᵢ, Dᵢ) triplet lands in the strain-pattern
    /// block of its three columns, scaled by 1/(6V).
    fn compute_geometry_matrix(
        coefficients: &ShapeFunctionCoefficients,
        volume: f64,
    ) -> SMatrix<f64, STRAIN_COMPONENTS, TETRAHEDRON_DOFS> {
        let six_v = 6.0 * volume;
        let mut geometry = SMatrix::<f64, STRAIN_COMPONENTS, TETRAHEDRON_DOFS>::zeros();

        for i in 0..4 {
            let b = coefficients.b[i] / six_v;
            let c = coefficients.c[i] / six_v;
            let d = coefficients.d[i] / six_v;
            let col = i * 3;

            // εxx, εyy, εzz
            geometry[(0, col)] = b;
            geometry[(1, col + 1)] = c;
            geometry[(2, col + 2)] = d;

            // γxy = du/dy + dv/dx
            geometry[(3, col)] = c;
            geometry[(3, col + 1)] = b;

            // γyz = dv/dz + dw/dy
            geometry[(4, col + 1)] = d;
            geometry[(4, col + 2)] = c;

            // γzx = dw/dx + du/dz
            geometry[(5, col)] = d;
            geometry[(5, col + 2)] = b;
        }

        geometry
    }

    /// Outward normal and area of each face, from edge cross products.
    ///
    /// The raw cross product of two face edges is flipped if it points
    /// toward the opposite vertex, so the stored normal is always outward
    /// regardless of face vertex order. Its half-magnitude is the area.
    fn compute_face_geometry(
        element: &TetrahedronElement,
        positions: &[Vector3<f64>; 4],
    ) -> Result<[FaceGeometry; 4]> {
        let mut faces = Vec::with_capacity(4);

        for (k, face) in element.faces.iter().enumerate() {
            let corner = |vertex: usize| -> Result<Vector3<f64>> {
                let local = element.local_index(vertex).ok_or_else(|| {
                    FemError::Configuration(format!(
                        "face vertex {vertex} is not part of element {:?}",
                        element.vertices
                    ))
                })?;
                Ok(positions[local])
            };

            let a = corner(face.vertices[0])?;
            let b = corner(face.vertices[1])?;
            let c = corner(face.vertices[2])?;

            let mut normal = (b - a).cross(&(c - a));
            let opposite = positions[k];
            let centroid = (a + b + c) / 3.0;
            if normal.dot(&(centroid - opposite)) < 0.0 {
                normal = -normal;
            }

            let area = normal.norm() / 2.0;
            faces.push(FaceGeometry {
                normal: normal.normalize(),
                area,
            });
        }

        match <[FaceGeometry; 4]>::try_from(faces) {
            Ok(array) => Ok(array),
            Err(_) => unreachable!("a tetrahedron has exactly four faces"),
        }
    }

    /// Body-force contribution, uniformly distributed across the four
    /// vertices weighted by volume and density.
    fn compute_body_force_vector(
        volume: f64,
        body_force: &Vector3<f64>,
        material: &Material,
    ) -> SVector<f64, TETRAHEDRON_DOFS> {
        let nodal_force = body_force * (material.density * volume / 4.0);

        let mut force = SVector::<f64, TETRAHEDRON_DOFS>::zeros();
        for i in 0..4 {
            force.fixed_rows_mut::<3>(i * 3).copy_from(&nodal_force);
        }
        force
    }

    /// Traction contribution: each face's traction acts along its outward
    /// normal, weighted by face area and split across its three vertices.
    fn compute_traction_force_vector(
        element: &TetrahedronElement,
        faces: &[FaceGeometry; 4],
    ) -> Result<SVector<f64, TETRAHEDRON_DOFS>> {
        let mut force = SVector::<f64, TETRAHEDRON_DOFS>::zeros();

        for (face, geometry) in element.faces.iter().zip(faces.iter()) {
            let Some(traction) = face.traction else {
                continue;
            };

            let face_force = geometry.normal * (traction * geometry.area / 3.0);
            for &vertex in &face.vertices {
                let local = element.local_index(vertex).ok_or_else(|| {
                    FemError::Configuration(format!(
                        "face vertex {vertex} is not part of element {:?}",
                        element.vertices
                    ))
                })?;
                let mut rows = force.fixed_rows_mut::<3>(local * 3);
                rows += face_force;
            }
        }

        Ok(force)
    }
}

impl ElementSolver for TetrahedronSolver {
    fn solve(
        &self,
        element: &TetrahedronElement,
        vertices: &[Vertex],
        body_force: &Vector3<f64>,
        material: &Material,
    ) -> Result<ElementSolverData> {
        let positions = Self::fetch_positions(element, vertices)?;
        let coefficients = Self::compute_shape_function_coefficients(&positions)?;
        let volume = Self::compute_volume(&coefficients, element)?;

        let geometry_matrix = Self::compute_geometry_matrix(&coefficients, volume);

        let faces = Self::compute_face_geometry(element, &positions)?;
        let force_vector = Self::compute_body_force_vector(volume, body_force, material)
            + Self::compute_traction_force_vector(element, &faces)?;

        Ok(ElementSolverData {
            geometry_matrix,
            force_vector,
            volume,
        })
    }
}
