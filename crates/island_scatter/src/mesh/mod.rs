//! Triangle mesh state and the geometry kernel used by the island pipeline.
//!
//! [`TriMesh`] is the concrete mesh value threaded through
//! [`crate::island::IslandMeshBuilder`]. The operations applied to it are described by the
//! [`GeometryKernel`] trait; [`SoftwareKernel`] is a deterministic CPU implementation.
use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

pub mod cut;
pub mod deform;
pub mod kernel;
pub mod primitives;
pub mod software;
pub mod subdivide;
pub mod uv;
pub mod voxel;

pub use kernel::{
    GeometryKernel, PlaneCut, PrimitiveOptions, SmoothingOptions, SolidifyOptions,
    TessellationOptions, UvProjection,
};
pub use software::SoftwareKernel;

/// Indexed triangle mesh with per-vertex normals and UVs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all geometry, keeping allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.triangles.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Adds a vertex with zero normal and UV, returning its index.
    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        self.push_vertex_with(position, Vec3::ZERO, Vec2::ZERO)
    }

    pub fn push_vertex_with(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    pub fn push_triangle(&mut self, tri: [u32; 3]) {
        self.triangles.push(tri);
    }

    /// Adds a quad `a, b, c, d` (counter-clockwise seen from outside) as two triangles.
    pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangles.push([a, b, c]);
        self.triangles.push([a, c, d]);
    }

    /// Appends `other` as additional disconnected geometry.
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    /// Axis-aligned bounds of all vertices, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }

    pub fn triangle_positions(&self, tri: [u32; 3]) -> [Vec3; 3] {
        [
            self.positions[tri[0] as usize],
            self.positions[tri[1] as usize],
            self.positions[tri[2] as usize],
        ]
    }

    /// Number of incident triangles for every undirected edge.
    pub fn edge_face_counts(&self) -> BTreeMap<(u32, u32), usize> {
        let mut counts = BTreeMap::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// True when every edge has exactly two incident triangles.
    pub fn is_closed_manifold(&self) -> bool {
        !self.triangles.is_empty() && self.edge_face_counts().values().all(|&n| n == 2)
    }

    /// Directed half-edges whose opposite half-edge does not exist, sorted.
    pub fn boundary_half_edges(&self) -> Vec<(u32, u32)> {
        let mut directed = BTreeMap::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *directed.entry((a, b)).or_insert(0usize) += 1;
            }
        }
        directed
            .keys()
            .filter(|(a, b)| !directed.contains_key(&(*b, *a)))
            .copied()
            .collect()
    }

    /// Signed enclosed volume; positive for closed, outward-oriented shells.
    pub fn signed_volume(&self) -> f32 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.triangle_positions(*t);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }
}
