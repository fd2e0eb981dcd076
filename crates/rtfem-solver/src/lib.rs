//! Real-time finite element solver for linear tetrahedral meshes.
//!
//! The pipeline runs in stages: per-element solvers derive geometry
//! matrices and force vectors, the assembly layer scatter-adds them into
//! the global system, boundary conditions are eliminated, and a backend
//! performs the linear solve. [`StaticSolver`] runs the pipeline once for
//! an equilibrium solution; [`DynamicSolver`] steps the equation of
//! motion with an unconditionally stable implicit scheme, one fixed-size
//! step per frame.

pub mod assembly;
pub mod backend;
pub mod dynamic_solver;
pub mod elements;
pub mod error;
pub mod matrix_math;
pub mod static_solver;
pub mod timer;

pub use assembly::GlobalSystem;
pub use backend::{
    default_backend, BackendError, LinearSolver, LinearSystemData, MatVec, NativeBackend,
    SolveInfo, SolverBackend, SparseTriplets,
};
pub use dynamic_solver::{DynamicConfig, DynamicSolver};
pub use elements::{ElementSolver, ElementSolverData, TetrahedronSolver};
pub use error::{FemError, Result};
pub use static_solver::{SolverOutput, StaticSolver};
pub use timer::{IterationTiming, SolverTimer};
