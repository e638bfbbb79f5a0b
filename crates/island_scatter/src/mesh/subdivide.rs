//! PN-triangle tessellation.
//!
//! Each level splits every triangle into four. New edge vertices are placed on the cubic
//! PN edge curve defined by the endpoint normals instead of the straight midpoint, which
//! rounds the surface as density increases.
use std::collections::HashMap;

use glam::Vec3;

use crate::mesh::{TessellationOptions, TriMesh};

/// Position of the PN cubic edge curve at `t = 0.5`.
pub fn pn_edge_midpoint(p0: Vec3, n0: Vec3, p1: Vec3, n1: Vec3) -> Vec3 {
    let w01 = (p1 - p0).dot(n0);
    let w10 = (p0 - p1).dot(n1);
    let b1 = (2.0 * p0 + p1 - w01 * n0) / 3.0;
    let b2 = (2.0 * p1 + p0 - w10 * n1) / 3.0;
    (p0 + 3.0 * b1 + 3.0 * b2 + p1) / 8.0
}

fn split_once(mesh: &TriMesh) -> TriMesh {
    let mut out = mesh.clone();
    out.triangles.clear();
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut midpoint = |out: &mut TriMesh, a: u32, b: u32| -> u32 {
        let key = (a.min(b), a.max(b));
        *midpoints.entry(key).or_insert_with(|| {
            let (lo, hi) = (key.0 as usize, key.1 as usize);
            let p = pn_edge_midpoint(
                mesh.positions[lo],
                mesh.normals[lo],
                mesh.positions[hi],
                mesh.normals[hi],
            );
            let n = (mesh.normals[lo] + mesh.normals[hi]).normalize_or(mesh.normals[lo]);
            let uv = (mesh.uvs[lo] + mesh.uvs[hi]) * 0.5;
            out.push_vertex_with(p, n, uv)
        })
    };
    for t in &mesh.triangles {
        let [a, b, c] = *t;
        let ab = midpoint(&mut out, a, b);
        let bc = midpoint(&mut out, b, c);
        let ca = midpoint(&mut out, c, a);
        out.push_triangle([a, ab, ca]);
        out.push_triangle([ab, b, bc]);
        out.push_triangle([ca, bc, c]);
        out.push_triangle([ab, bc, ca]);
    }
    out
}

/// Applies `options.level` rounds of PN subdivision. Requires per-vertex normals.
pub fn tessellate(mesh: &TriMesh, options: &TessellationOptions) -> TriMesh {
    let mut current = mesh.clone();
    for _ in 0..options.level {
        current = split_once(&current);
    }
    current
}
