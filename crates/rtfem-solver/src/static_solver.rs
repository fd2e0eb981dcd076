//! Static linear analysis: K·u = F.
//!
//! Assembles the global stiffness and force, applies the model's boundary
//! conditions by elimination and hands the reduced system to a backend's
//! linear-solve primitive. One call, one equilibrium solution.

use nalgebra::{DVector, Vector3};
use serde::Serialize;

use rtfem_model::FemModel;

use crate::assembly::GlobalSystem;
use crate::backend::{LinearSolver, NativeBackend};
use crate::elements::{ElementSolver, TetrahedronSolver};
use crate::error::Result;

/// Solution of a solve pass.
///
/// The displacement vector is laid out `[x0, y0, z0, x1, y1, z1, ...]`,
/// DOF index = vertex id × 3 + axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverOutput {
    /// Global displacement vector.
    pub displacement: DVector<f64>,
}

impl SolverOutput {
    /// Displacement of one vertex.
    pub fn vertex_displacement(&self, vertex: usize) -> Vector3<f64> {
        let base = vertex * 3;
        Vector3::new(
            self.displacement[base],
            self.displacement[base + 1],
            self.displacement[base + 2],
        )
    }
}

/// Static equilibrium solver.
pub struct StaticSolver<'a> {
    model: &'a FemModel,
    element_solver: Box<dyn ElementSolver>,
}

impl<'a> StaticSolver<'a> {
    /// Create a static solver over a model, using the linear tetrahedron
    /// element solver.
    pub fn new(model: &'a FemModel) -> Self {
        Self {
            model,
            element_solver: Box::new(TetrahedronSolver::new()),
        }
    }

    /// Replace the element solver implementation.
    pub fn with_element_solver(mut self, element_solver: Box<dyn ElementSolver>) -> Self {
        self.element_solver = element_solver;
        self
    }

    /// Solve with the default backend.
    pub fn solve(&self) -> Result<SolverOutput> {
        self.solve_with_backend(&NativeBackend)
    }

    /// Solve K·u = F with the given backend.
    ///
    /// # Errors
    /// Configuration errors for an empty model or out-of-range boundary
    /// conditions, geometry errors from degenerate elements, and a solve
    /// failure if the reduced system is singular (typically an
    /// under-constrained model with rigid-body freedom).
    pub fn solve_with_backend<B>(&self, backend: &B) -> Result<SolverOutput>
    where
        B: LinearSolver + ?Sized,
    {
        let system = GlobalSystem::assemble(self.model, self.element_solver.as_ref())?;
        system.validate()?;

        let data = system.to_linear_system_data();
        let (displacement, _info) = backend.solve_linear(&data)?;

        Ok(SolverOutput { displacement })
    }
}
