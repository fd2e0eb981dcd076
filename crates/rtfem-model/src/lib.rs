//! Data model for real-time tetrahedral finite element analysis.
//!
//! This crate holds everything a solver needs as input: mesh geometry
//! (vertices and tetrahedral elements with their triangle faces), material
//! constants, boundary conditions, and the [`FemModel`] aggregate that ties
//! them together for a single connected body.

pub mod boundary_condition;
pub mod geometry;
pub mod material;
pub mod model;

pub use boundary_condition::BoundaryCondition;
pub use geometry::{FemGeometry, TetrahedronElement, TriangleFace, Vertex};
pub use material::Material;
pub use model::{FemModel, ModelStatistics};
