//! Closed primitive shells (cone frustum, box), outward-oriented.
use core::f32::consts::TAU;

use glam::Vec3;

use crate::mesh::TriMesh;

/// Box corner `i` uses the max coordinate on axis `a` when bit `a` of `i` is set.
pub(crate) const BOX_CORNER_BITS: [[u32; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Box faces as corner indices, counter-clockwise seen from outside, in the order
/// -Z, +Z, -Y, +Y, -X, +X.
pub(crate) const BOX_FACES: [[usize; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

/// Builds a closed cone frustum with its base ring centered on `base_center`.
pub fn cone(
    base_center: Vec3,
    base_radius: f32,
    top_radius: f32,
    height: f32,
    radial_steps: u32,
) -> TriMesh {
    let steps = radial_steps.max(3);
    let mut mesh = TriMesh::new();
    let top_center = base_center + Vec3::Z * height;

    let mut base_ring = Vec::with_capacity(steps as usize);
    let mut top_ring = Vec::with_capacity(steps as usize);
    for i in 0..steps {
        let theta = TAU * i as f32 / steps as f32;
        let dir = Vec3::new(theta.cos(), theta.sin(), 0.0);
        base_ring.push(mesh.push_vertex(base_center + dir * base_radius));
        top_ring.push(mesh.push_vertex(top_center + dir * top_radius));
    }
    let base_hub = mesh.push_vertex(base_center);
    let top_hub = mesh.push_vertex(top_center);

    for i in 0..steps as usize {
        let j = (i + 1) % steps as usize;
        mesh.push_quad(base_ring[i], base_ring[j], top_ring[j], top_ring[i]);
        mesh.push_triangle([base_hub, base_ring[j], base_ring[i]]);
        mesh.push_triangle([top_hub, top_ring[i], top_ring[j]]);
    }
    mesh
}

/// Builds a closed box whose bottom face is centered on `base_center`.
pub fn cuboid(base_center: Vec3, dimensions: Vec3) -> TriMesh {
    let half = Vec3::new(dimensions.x * 0.5, dimensions.y * 0.5, 0.0);
    let min = base_center - half;
    let mut mesh = TriMesh::new();
    let corners: Vec<u32> = BOX_CORNER_BITS
        .iter()
        .map(|bits| {
            let offset = Vec3::new(bits[0] as f32, bits[1] as f32, bits[2] as f32) * dimensions;
            mesh.push_vertex(min + offset)
        })
        .collect();
    for face in BOX_FACES {
        mesh.push_quad(
            corners[face[0]],
            corners[face[1]],
            corners[face[2]],
            corners[face[3]],
        );
    }
    mesh
}
