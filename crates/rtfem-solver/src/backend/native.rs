//! Native backend using nalgebra.
//!
//! This is the default backend. It reconstructs the system as a dense
//! matrix and solves it with LU decomposition, which is adequate for the
//! small-to-medium meshes this engine targets (up to a few thousand DOFs).

use nalgebra::{DMatrix, DVector};

use super::traits::*;

/// Native solver backend using nalgebra for all numerical operations.
pub struct NativeBackend;

impl LinearSolver for NativeBackend {
    fn solve_linear(
        &self,
        system: &LinearSystemData,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let n = system.num_dofs;
        if system.force.len() != n {
            return Err(BackendError(format!(
                "force vector has {} entries for {} DOFs",
                system.force.len(),
                n
            )));
        }

        // Reconstruct dense matrix from COO triplets
        let mut a = DMatrix::zeros(n, n);
        for i in 0..system.stiffness.nnz() {
            let r = system.stiffness.row_indices[i];
            let c = system.stiffness.col_indices[i];
            a[(r, c)] += system.stiffness.values[i];
        }

        // LU decomposition and solve
        let x = a
            .lu()
            .solve(&system.force)
            .ok_or(BackendError("Singular matrix in LU decomposition".into()))?;

        Ok((
            x,
            SolveInfo {
                iterations: 1,
                residual_norm: None,
                solver_name: "nalgebra-LU".to_string(),
            },
        ))
    }
}

impl MatVec for NativeBackend {
    fn multiply(
        &self,
        matrix: &nalgebra_sparse::CsrMatrix<f64>,
        x: &DVector<f64>,
    ) -> Result<DVector<f64>, BackendError> {
        if matrix.ncols() != x.len() {
            return Err(BackendError(format!(
                "cannot multiply a {}x{} matrix with a vector of length {}",
                matrix.nrows(),
                matrix.ncols(),
                x.len()
            )));
        }
        Ok(matrix * x)
    }
}

impl SolverBackend for NativeBackend {
    fn name(&self) -> &str {
        "native-nalgebra"
    }
}
