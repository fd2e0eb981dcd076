//! Backend trait definitions for the linear-solve primitive.
//!
//! These traits abstract over the concrete numerical implementation used
//! for global system operations. Element-level computations remain in
//! nalgebra (small, dense matrices); the solvers only reach a backend
//! through [`LinearSolver`], so an alternative implementation (GPU,
//! external library) can be swapped in without touching them.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::error::FemError;

/// Error type for backend operations.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

impl From<&str> for BackendError {
    fn from(s: &str) -> Self {
        BackendError(s.to_string())
    }
}

impl From<BackendError> for FemError {
    fn from(e: BackendError) -> Self {
        FemError::Solve(e.0)
    }
}

/// Sparse matrix in COO (coordinate/triplet) format.
///
/// This is the backend-agnostic interchange format between the assembly
/// layer and any solver backend. Duplicate entries are summed on
/// conversion.
#[derive(Debug, Clone)]
pub struct SparseTriplets {
    pub nrows: usize,
    pub ncols: usize,
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseTriplets {
    /// Create an empty triplet list for an `nrows` × `ncols` matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Collect the non-zero entries of a dense matrix.
    pub fn from_dense(matrix: &DMatrix<f64>) -> Self {
        let mut triplets = Self::new(matrix.nrows(), matrix.ncols());
        for i in 0..matrix.nrows() {
            for j in 0..matrix.ncols() {
                let v = matrix[(i, j)];
                if v.abs() > 1e-30 {
                    triplets.push(i, j, v);
                }
            }
        }
        triplets
    }

    /// Append one entry.
    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        self.row_indices.push(row);
        self.col_indices.push(col);
        self.values.push(value);
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR for repeated matrix-vector products.
    pub fn to_csr(&self) -> Result<CsrMatrix<f64>, BackendError> {
        let coo = CooMatrix::try_from_triplets(
            self.nrows,
            self.ncols,
            self.row_indices.clone(),
            self.col_indices.clone(),
            self.values.clone(),
        )
        .map_err(|e| BackendError(format!("invalid COO triplets: {e}")))?;
        Ok(CsrMatrix::from(&coo))
    }
}

/// A linear system ready for solving: A · x = b.
///
/// Produced by the assembly layer, consumed by any [`LinearSolver`]
/// backend. Boundary conditions are already applied to both sides before
/// this struct is constructed.
pub struct LinearSystemData {
    /// System matrix in COO triplet format (constraints already applied).
    pub stiffness: SparseTriplets,
    /// Right-hand side (dense, constraints already applied).
    pub force: DVector<f64>,
    /// Total number of degrees of freedom.
    pub num_dofs: usize,
    /// Indices of constrained DOFs (for diagnostics).
    pub constrained_dofs: Vec<usize>,
}

/// Solver convergence and diagnostic info.
pub struct SolveInfo {
    /// Number of iterations (1 for direct solvers).
    pub iterations: usize,
    /// Final residual norm (if available).
    pub residual_norm: Option<f64>,
    /// Human-readable solver name (e.g., "nalgebra-LU").
    pub solver_name: String,
}

/// Trait for a linear solver backend.
///
/// Implementations solve A · x = b given the assembled system data.
pub trait LinearSolver: Send + Sync {
    /// Solve A · x = b and return the solution vector.
    fn solve_linear(
        &self,
        system: &LinearSystemData,
    ) -> Result<(DVector<f64>, SolveInfo), BackendError>;
}

/// Trait for the matrix-vector product primitive.
///
/// The dynamic solver forms its right-hand side from repeated products
/// with the cached stiffness and mass matrices; backends may accelerate
/// this independently of the linear solve.
pub trait MatVec: Send + Sync {
    /// Compute y = A · x.
    fn multiply(
        &self,
        matrix: &CsrMatrix<f64>,
        x: &DVector<f64>,
    ) -> Result<DVector<f64>, BackendError>;
}

/// Combined backend surface.
pub trait SolverBackend: LinearSolver + MatVec {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;
}
