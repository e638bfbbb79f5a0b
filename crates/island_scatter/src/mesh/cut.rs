//! Plane cut with optional hole filling.
use std::collections::{BTreeMap, HashMap};

use glam::{Vec2, Vec3};

use crate::mesh::{PlaneCut, TriMesh};

/// Relative tolerance for treating a vertex as lying on the plane.
const PLANE_EPSILON: f32 = 1e-6;

struct Clipper<'a> {
    src: &'a TriMesh,
    cut: &'a PlaneCut,
    dist: Vec<f32>,
    out: TriMesh,
    kept: Vec<Option<u32>>,
    crossings: HashMap<(u32, u32), u32>,
}

impl Clipper<'_> {
    fn keep(&mut self, v: u32) -> u32 {
        if let Some(idx) = self.kept[v as usize] {
            return idx;
        }
        let i = v as usize;
        // Vertices within tolerance of the plane are flattened onto it.
        let position = if self.dist[i] == 0.0 {
            self.cut.project(self.src.positions[i])
        } else {
            self.src.positions[i]
        };
        let idx = self
            .out
            .push_vertex_with(position, self.src.normals[i], self.src.uvs[i]);
        self.kept[i] = Some(idx);
        idx
    }

    fn crossing(&mut self, a: u32, b: u32) -> u32 {
        let (lo, hi) = (a.min(b), a.max(b));
        if self.dist[lo as usize] == 0.0 {
            return self.keep(lo);
        }
        if self.dist[hi as usize] == 0.0 {
            return self.keep(hi);
        }
        if let Some(&idx) = self.crossings.get(&(lo, hi)) {
            return idx;
        }
        let (l, h) = (lo as usize, hi as usize);
        let t = self.dist[l] / (self.dist[l] - self.dist[h]);
        let p = self
            .cut
            .project(self.src.positions[l].lerp(self.src.positions[h], t));
        let n = self.src.normals[l]
            .lerp(self.src.normals[h], t)
            .normalize_or(self.src.normals[l]);
        let uv = self.src.uvs[l].lerp(self.src.uvs[h], t);
        let idx = self.out.push_vertex_with(p, n, uv);
        self.crossings.insert((lo, hi), idx);
        idx
    }

    fn inside(&self, v: u32) -> bool {
        self.dist[v as usize] <= 0.0
    }

    fn clip_triangle(&mut self, tri: [u32; 3]) {
        let inside_count = tri.iter().filter(|&&v| self.inside(v)).count();
        match inside_count {
            0 => {}
            3 => {
                let mapped = tri.map(|v| self.keep(v));
                self.out.push_triangle(mapped);
            }
            _ => {
                let mut poly: Vec<u32> = Vec::with_capacity(4);
                for e in 0..3 {
                    let (cur, next) = (tri[e], tri[(e + 1) % 3]);
                    if self.inside(cur) {
                        poly.push(self.keep(cur));
                    }
                    if self.inside(cur) != self.inside(next) {
                        poly.push(self.crossing(cur, next));
                    }
                }
                poly.dedup();
                if poly.len() > 1 && poly.first() == poly.last() {
                    poly.pop();
                }
                for k in 1..poly.len().saturating_sub(1) {
                    self.out.push_triangle([poly[0], poly[k], poly[k + 1]]);
                }
            }
        }
    }
}

/// Caps every closed boundary loop whose vertices all lie on the plane.
fn fill_holes(mesh: &mut TriMesh, cut: &PlaneCut, tolerance: f32) {
    let on_plane = |p: Vec3| cut.signed_distance(p).abs() <= tolerance;
    let mut next: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (a, b) in mesh.boundary_half_edges() {
        if on_plane(mesh.positions[a as usize]) && on_plane(mesh.positions[b as usize]) {
            next.entry(a).or_default().push(b);
        }
    }
    for targets in next.values_mut() {
        // Popped from the back, so the smallest target is walked first.
        targets.sort_unstable_by(|x, y| y.cmp(x));
    }

    let starts: Vec<u32> = next.keys().copied().collect();
    for start in starts {
        while next.get(&start).is_some_and(|t| !t.is_empty()) {
            let mut edges: Vec<(u32, u32)> = Vec::new();
            let mut cur = start;
            let closed = loop {
                let Some(to) = next.get_mut(&cur).and_then(|t| t.pop()) else {
                    break false;
                };
                edges.push((cur, to));
                if to == start {
                    break true;
                }
                cur = to;
            };
            if !closed || edges.len() < 3 {
                continue;
            }
            let sum: Vec3 = edges.iter().map(|(a, _)| mesh.positions[*a as usize]).sum();
            let centroid = sum / edges.len() as f32;
            let hub = cut.project(centroid);
            let hub_idx = mesh.push_vertex_with(hub, cut.normal, Vec2::ZERO);
            for (a, b) in edges {
                mesh.push_triangle([b, a, hub_idx]);
            }
        }
    }
}

/// Removes the part of `mesh` on the side `cut.normal` points to.
pub fn plane_cut(mesh: &TriMesh, cut: &PlaneCut) -> TriMesh {
    let scale = mesh
        .bounds()
        .map(|(lo, hi)| (hi - lo).max_element().max(1.0))
        .unwrap_or(1.0);
    let tolerance = PLANE_EPSILON * scale.max(cut.origin.abs().max_element());
    let dist: Vec<f32> = mesh
        .positions
        .iter()
        .map(|p| {
            let d = cut.signed_distance(*p);
            if d.abs() <= tolerance {
                0.0
            } else {
                d
            }
        })
        .collect();

    let mut clipper = Clipper {
        src: mesh,
        cut,
        dist,
        out: TriMesh::new(),
        kept: vec![None; mesh.vertex_count()],
        crossings: HashMap::new(),
    };
    for tri in &mesh.triangles {
        clipper.clip_triangle(*tri);
    }
    let mut out = clipper.out;
    if cut.fill_holes {
        fill_holes(&mut out, cut, tolerance * 4.0);
    }
    out
}
