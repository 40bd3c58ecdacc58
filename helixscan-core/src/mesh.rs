//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// One triangle of a stitched surface, vertices stored by value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Lower layer of the ring pair this face connects
    pub layer: u32,
    pub vertices: [Point3d; 3],
}

/// Triangle soup produced by layer stitching.
///
/// Face order and per-face vertex order are exactly as emitted and must be
/// kept by exporters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StitchedMesh {
    pub faces: Vec<Face>,
}

/// A triangle mesh with shared vertex storage and index faces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<[usize; 3]>,
}

impl Face {
    pub fn new(layer: u32, a: Point3d, b: Point3d, c: Point3d) -> Self {
        Self {
            layer,
            vertices: [a, b, c],
        }
    }

    /// Unit normal from the vertex winding, zero for degenerate faces
    pub fn normal(&self) -> Vector3d {
        let [v0, v1, v2] = self.vertices;
        let n = (v1 - v0).cross(&(v2 - v0));
        n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3d::zeros)
    }

    /// Whether the three vertices are (numerically) collinear
    pub fn is_degenerate(&self) -> bool {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0)).norm() <= f64::EPSILON
    }
}

impl StitchedMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self { faces: Vec::new() }
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Append a face
    pub fn push(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Number of faces whose vertices are collinear
    pub fn degenerate_face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_degenerate()).count()
    }

    /// Flatten into an indexed mesh, three fresh vertices per face, keeping
    /// face order and winding.
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for face in &self.faces {
            let a = mesh.add_vertex(face.vertices[0]);
            let b = mesh.add_vertex(face.vertices[1]);
            let c = mesh.add_vertex(face.vertices[2]);
            mesh.add_face([a, b, c]);
        }
        mesh
    }
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3d>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3d) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }
}
