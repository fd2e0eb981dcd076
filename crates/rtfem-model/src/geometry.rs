//! Mesh geometry for tetrahedral finite element models.
//!
//! This module provides the core data structures for one connected body:
//! vertices, triangle faces, and 4-node tetrahedral elements.
//!
//! ## Vertex ordering
//!
//! The ordering of vertices within an element is semantically significant.
//! The four triangle faces are derived from it by a fixed rule:
//!
//! ```text
//! Face1 = {v2, v3, v4}
//! Face2 = {v3, v4, v1}
//! Face3 = {v4, v1, v2}
//! Face4 = {v1, v2, v3}
//! ```
//!
//! so face `i` is the face opposite vertex `i`. Callers must number the
//! first three vertices counterclockwise as seen from the fourth; a wrong
//! winding produces a non-positive element volume downstream, which the
//! solver reports as a geometry error. The ordering of faces relative to
//! an element only affects lookup, never correctness.

use nalgebra::Vector3;

/// A vertex in the finite element mesh.
///
/// Positions are rest positions and immutable for the lifetime of a solve;
/// the current displacement is tracked by the solver, not by the vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Vertex index (0-based). `id * 3` is the base of its global DOFs.
    pub id: usize,
    /// Rest position.
    pub position: Vector3<f64>,
}

impl Vertex {
    /// Create a new vertex.
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            position: Vector3::new(x, y, z),
        }
    }

    /// Get coordinates as an array.
    pub fn coords(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }
}

/// A triangle face of a tetrahedral element.
///
/// Faces are derived from their owning element and are not independently
/// owned mesh entities. The optional traction magnitude is a surface force
/// per unit area applied along the face's outward normal.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleFace {
    /// The three vertex indices spanning this face.
    pub vertices: [usize; 3],
    /// Traction force magnitude applied normal to the face, if any.
    pub traction: Option<f64>,
}

impl TriangleFace {
    /// Create a face with no traction applied.
    pub fn new(vertices: [usize; 3]) -> Self {
        Self {
            vertices,
            traction: None,
        }
    }

    /// Check whether this face spans the given vertices, in any order.
    pub fn matches(&self, vertices: [usize; 3]) -> bool {
        vertices
            .iter()
            .all(|v| self.vertices.contains(v))
    }
}

/// A 4-node linear tetrahedral element.
#[derive(Debug, Clone, PartialEq)]
pub struct TetrahedronElement {
    /// Ordered vertex indices (see module docs for the winding contract).
    pub vertices: [usize; 4],
    /// The four triangle faces, face `i` opposite vertex `i`.
    pub faces: [TriangleFace; 4],
}

impl TetrahedronElement {
    /// Create an element and derive its faces from the vertex ordering.
    pub fn new(vertices: [usize; 4]) -> Self {
        let [v1, v2, v3, v4] = vertices;
        Self {
            vertices,
            faces: [
                TriangleFace::new([v2, v3, v4]),
                TriangleFace::new([v3, v4, v1]),
                TriangleFace::new([v4, v1, v2]),
                TriangleFace::new([v1, v2, v3]),
            ],
        }
    }

    /// Apply a traction magnitude to the face spanning the given vertices.
    ///
    /// Returns `false` if no face of this element matches.
    pub fn set_traction(&mut self, face_vertices: [usize; 3], traction: f64) -> bool {
        for face in &mut self.faces {
            if face.matches(face_vertices) {
                face.traction = Some(traction);
                return true;
            }
        }
        false
    }

    /// Local index (0..4) of a global vertex within this element, if present.
    pub fn local_index(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }
}

/// Complete mesh topology of one connected body.
///
/// One `FemGeometry` belongs to exactly one [`crate::FemModel`].
#[derive(Debug, Clone, Default)]
pub struct FemGeometry {
    /// All vertices, indexed by their id.
    pub vertices: Vec<Vertex>,
    /// All tetrahedral elements.
    pub elements: Vec<TetrahedronElement>,
}

impl FemGeometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex at the given position, returning its id.
    pub fn add_vertex(&mut self, x: f64, y: f64, z: f64) -> usize {
        let id = self.vertices.len();
        self.vertices.push(Vertex::new(id, x, y, z));
        id
    }

    /// Add a tetrahedral element over four existing vertices.
    pub fn add_element(&mut self, vertices: [usize; 4]) {
        self.elements.push(TetrahedronElement::new(vertices));
    }

    /// Number of global degrees of freedom (3 per vertex).
    pub fn dof_count(&self) -> usize {
        self.vertices.len() * 3
    }
}
