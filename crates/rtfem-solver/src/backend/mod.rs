//! Numerical backend abstraction layer.
//!
//! Provides a trait-based interface for the linear-solve primitive,
//! keeping the static and dynamic solvers backend-agnostic. The actual
//! numerical work is dispatched to a concrete backend at runtime.
//!
//! # Architecture
//!
//! ```text
//! Element solvers (nalgebra SMatrix — small, dense)
//!         │
//!         ▼
//! Assembly (produces COO triplets + force vector)
//!         │
//!         ▼
//! Backend trait layer (LinearSolver)
//!         │
//!         ▼
//! Native backend (dense LU)
//! ```

pub mod native;
pub mod traits;

pub use native::NativeBackend;
pub use traits::*;

/// Returns the default solver backend.
pub fn default_backend() -> Box<dyn SolverBackend> {
    Box::new(NativeBackend)
}
