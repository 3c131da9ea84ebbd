//! The logical unit exchanged through the segment: one mesh snapshot.

use bytemuck::{Pod, Zeroable};

/// A vertex position record as it appears on the wire (12 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A triangle record as it appears on the wire (12 bytes): three vertex
/// indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl Triangle {
    pub const fn new(a: i32, b: i32, c: i32) -> Self {
        Self { a, b, c }
    }
}

/// One decoded mesh frame.
///
/// A frame with no vertices or no triangles is *empty*; consumers skip
/// mesh reconstruction for empty frames rather than updating with zero
/// geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshFrame {
    /// Monotonically increasing publish counter. Zero means "empty slot";
    /// the writer starts at 1.
    pub seq: u64,
    /// Producer-side Unix timestamp (fractional seconds) at capture.
    pub capture_time: f64,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl MeshFrame {
    /// True when the frame carries no renderable geometry (either array
    /// empty).
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    /// Vertex positions, in the shape the mesh-update collaborator expects.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Per-face vertex counts. Every face is a triangle, so this is a run
    /// of 3s with one entry per triangle.
    pub fn face_counts(&self) -> Vec<i32> {
        vec![3; self.triangles.len()]
    }

    /// Flattened triangle indices (`a0, b0, c0, a1, b1, c1, ...`).
    pub fn indices(&self) -> &[i32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Check that every triangle index lies in `[0, vertex_count)`.
    ///
    /// The transport itself never enforces this; it is offered to callers
    /// that want to reject meshes referencing out-of-range vertices before
    /// handing them to a renderer. Returns the first offending triangle
    /// index, if any.
    pub fn validate_indices(&self) -> Result<(), usize> {
        let n = self.vertices.len() as i32;
        for (i, tri) in self.triangles.iter().enumerate() {
            if tri.a < 0 || tri.a >= n || tri.b < 0 || tri.b >= n || tri.c < 0 || tri.c >= n {
                return Err(i);
            }
        }
        Ok(())
    }
}
