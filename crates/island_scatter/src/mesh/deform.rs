//! Per-vertex normals and iterative Laplacian smoothing.
use glam::Vec3;

use crate::mesh::{SmoothingOptions, TriMesh};

/// Recomputes area-weighted per-vertex normals. Isolated vertices get +Z.
pub fn recompute_normals(mesh: &mut TriMesh) {
    let mut acc = vec![Vec3::ZERO; mesh.vertex_count()];
    for t in &mesh.triangles {
        let [a, b, c] = mesh.triangle_positions(*t);
        // Cross product length is twice the area, which is the weight we want.
        let n = (b - a).cross(c - a);
        for &v in t {
            acc[v as usize] += n;
        }
    }
    mesh.normals = acc.into_iter().map(|n| n.normalize_or(Vec3::Z)).collect();
}

/// Sorted, de-duplicated vertex neighbors.
pub fn vertex_neighbors(mesh: &TriMesh) -> Vec<Vec<u32>> {
    let mut neighbors = vec![Vec::new(); mesh.vertex_count()];
    for t in &mesh.triangles {
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
        }
    }
    for n in &mut neighbors {
        n.sort_unstable();
        n.dedup();
    }
    neighbors
}

/// Moves every vertex toward the average of its neighbors by `alpha`, `iterations` times.
pub fn iterative_smooth(mesh: &mut TriMesh, options: &SmoothingOptions) {
    if options.iterations == 0 || mesh.is_empty() {
        return;
    }
    let alpha = options.alpha.clamp(0.0, 1.0);
    let neighbors = vertex_neighbors(mesh);
    let mut next = mesh.positions.clone();
    for _ in 0..options.iterations {
        for (v, ring) in neighbors.iter().enumerate() {
            if ring.is_empty() {
                next[v] = mesh.positions[v];
                continue;
            }
            let sum: Vec3 = ring.iter().map(|&n| mesh.positions[n as usize]).sum();
            let avg = sum / ring.len() as f32;
            next[v] = mesh.positions[v].lerp(avg, alpha);
        }
        std::mem::swap(&mut mesh.positions, &mut next);
    }
}
