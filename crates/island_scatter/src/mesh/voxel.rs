//! Voxel-based solidify: fuses overlapping closed shells into one watertight surface.
//!
//! Occupancy is decided per voxel center with the generalized winding number of each
//! connected shell, so overlapping primitives union cleanly. Before extraction, every
//! 2×2×2 block whose solid or empty voxels split into several face-connected pieces is
//! filled; such blocks are exactly the ones that would produce edges shared by four faces
//! or pinched vertices. The extracted boundary is therefore a closed 2-manifold.
use std::collections::HashMap;

use glam::{DVec3, Vec3};
use tracing::{debug, warn};

use crate::mesh::primitives::{BOX_CORNER_BITS, BOX_FACES};
use crate::mesh::{SolidifyOptions, TriMesh};

/// Empty voxel layers added around the mesh bounds.
const GRID_PADDING: u32 = 2;

/// Neighbor offsets in the same order as [`BOX_FACES`].
const FACE_NEIGHBORS: [[i64; 3]; 6] = [
    [0, 0, -1],
    [0, 0, 1],
    [0, -1, 0],
    [0, 1, 0],
    [-1, 0, 0],
    [1, 0, 0],
];

/// Dense occupancy grid with a world-space origin and uniform cell size.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    pub origin: Vec3,
    pub cell_size: f32,
    pub dims: [u32; 3],
    cells: Vec<bool>,
}

impl VoxelGrid {
    pub fn new(origin: Vec3, cell_size: f32, dims: [u32; 3]) -> Self {
        let len = dims[0] as usize * dims[1] as usize * dims[2] as usize;
        Self {
            origin,
            cell_size,
            dims,
            cells: vec![false; len],
        }
    }

    #[inline]
    fn index(&self, i: u32, j: u32, k: u32) -> usize {
        (k as usize * self.dims[1] as usize + j as usize) * self.dims[0] as usize + i as usize
    }

    #[inline]
    pub fn get(&self, i: u32, j: u32, k: u32) -> bool {
        self.cells[self.index(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: u32, j: u32, k: u32, value: bool) {
        let idx = self.index(i, j, k);
        self.cells[idx] = value;
    }

    /// Occupancy with signed coordinates; outside the grid reports `outside`.
    #[inline]
    fn get_or(&self, i: i64, j: i64, k: i64, outside: bool) -> bool {
        if i < 0
            || j < 0
            || k < 0
            || i >= self.dims[0] as i64
            || j >= self.dims[1] as i64
            || k >= self.dims[2] as i64
        {
            return outside;
        }
        self.get(i as u32, j as u32, k as u32)
    }

    pub fn center(&self, i: u32, j: u32, k: u32) -> Vec3 {
        self.origin + (Vec3::new(i as f32, j as f32, k as f32) + 0.5) * self.cell_size
    }

    pub fn corner(&self, i: u32, j: u32, k: u32) -> Vec3 {
        self.origin + Vec3::new(i as f32, j as f32, k as f32) * self.cell_size
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// One connected closed shell of the input, with its bounds.
struct Shell {
    triangles: Vec<[Vec3; 3]>,
    min: Vec3,
    max: Vec3,
}

impl Shell {
    fn contains(&self, p: Vec3) -> bool {
        if p.cmplt(self.min).any() || p.cmpgt(self.max).any() {
            return false;
        }
        winding_number(&self.triangles, p) > 0.5
    }
}

/// Generalized winding number of a triangle soup around `p`.
pub fn winding_number(triangles: &[[Vec3; 3]], p: Vec3) -> f64 {
    let p = p.as_dvec3();
    let total: f64 = triangles
        .iter()
        .map(|t| {
            solid_angle(
                t[0].as_dvec3() - p,
                t[1].as_dvec3() - p,
                t[2].as_dvec3() - p,
            )
        })
        .sum();
    total / (4.0 * std::f64::consts::PI)
}

fn solid_angle(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    let (la, lb, lc) = (a.length(), b.length(), c.length());
    let det = a.dot(b.cross(c));
    let denom = la * lb * lc + a.dot(b) * lc + a.dot(c) * lb + b.dot(c) * la;
    2.0 * det.atan2(denom)
}

/// Splits the mesh into vertex-connected shells.
fn shells(mesh: &TriMesh) -> Vec<Shell> {
    let mut parent: Vec<u32> = (0..mesh.vertex_count() as u32).collect();
    fn find(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            parent[x as usize] = parent[parent[x as usize] as usize];
            x = parent[x as usize];
        }
        x
    }
    for t in &mesh.triangles {
        for &v in &t[1..] {
            let (ra, rb) = (find(&mut parent, t[0]), find(&mut parent, v));
            if ra != rb {
                parent[ra.max(rb) as usize] = ra.min(rb);
            }
        }
    }

    let mut by_root: Vec<Option<usize>> = vec![None; mesh.vertex_count()];
    let mut out: Vec<Shell> = Vec::new();
    for t in &mesh.triangles {
        let root = find(&mut parent, t[0]) as usize;
        let slot = *by_root[root].get_or_insert_with(|| {
            out.push(Shell {
                triangles: Vec::new(),
                min: Vec3::splat(f32::INFINITY),
                max: Vec3::splat(f32::NEG_INFINITY),
            });
            out.len() - 1
        });
        let tri = mesh.triangle_positions(*t);
        let shell = &mut out[slot];
        for p in tri {
            shell.min = shell.min.min(p);
            shell.max = shell.max.max(p);
        }
        shell.triangles.push(tri);
    }
    out
}

/// Whether a 2×2×2 occupancy mask splits solid or empty space into several pieces.
fn is_critical(mask: u8) -> bool {
    component_count(mask) > 1 || component_count(!mask) > 1
}

/// Face-connected components among the set bits of a 2×2×2 block.
fn component_count(mask: u8) -> u32 {
    let mut seen = 0u8;
    let mut count = 0;
    for start in 0..8u8 {
        if mask & (1 << start) == 0 || seen & (1 << start) != 0 {
            continue;
        }
        count += 1;
        let mut stack = vec![start];
        seen |= 1 << start;
        while let Some(c) = stack.pop() {
            for axis in [1u8, 2, 4] {
                let n = c ^ axis;
                if mask & (1 << n) != 0 && seen & (1 << n) == 0 {
                    seen |= 1 << n;
                    stack.push(n);
                }
            }
        }
    }
    count
}

/// Rasterizes `mesh` into a padded grid sized by `options.grid_resolution`.
pub fn voxelize(mesh: &TriMesh, options: &SolidifyOptions) -> Option<VoxelGrid> {
    let (lo, hi) = mesh.bounds()?;
    let extent = hi - lo;
    let longest = extent.max_element();
    if !longest.is_finite() || longest <= 0.0 {
        return None;
    }
    let cell = longest / options.grid_resolution.max(1) as f32;
    let dims = [
        (extent.x / cell).ceil().max(1.0) as u32 + 2 * GRID_PADDING,
        (extent.y / cell).ceil().max(1.0) as u32 + 2 * GRID_PADDING,
        (extent.z / cell).ceil().max(1.0) as u32 + 2 * GRID_PADDING,
    ];
    let origin = lo - Vec3::splat(cell * GRID_PADDING as f32);
    let mut grid = VoxelGrid::new(origin, cell, dims);

    let shells = shells(mesh);
    for k in 0..dims[2] {
        for j in 0..dims[1] {
            for i in 0..dims[0] {
                let c = grid.center(i, j, k);
                if shells.iter().any(|s| s.contains(c)) {
                    grid.set(i, j, k, true);
                }
            }
        }
    }
    Some(grid)
}

/// Fills critical blocks until none remain or `max_passes` is spent.
/// Returns the number of passes that changed the grid.
pub fn repair(grid: &mut VoxelGrid, max_passes: u32) -> u32 {
    let critical: [bool; 256] = std::array::from_fn(|m| is_critical(m as u8));
    let [nx, ny, nz] = grid.dims;
    if nx < 2 || ny < 2 || nz < 2 {
        return 0;
    }
    let mut passes = 0;
    loop {
        let mut changed = false;
        for k in 0..nz - 1 {
            for j in 0..ny - 1 {
                for i in 0..nx - 1 {
                    let mut mask = 0u8;
                    for (bit, b) in BOX_CORNER_BITS.iter().enumerate() {
                        if grid.get(i + b[0], j + b[1], k + b[2]) {
                            mask |= 1 << bit;
                        }
                    }
                    if mask != 0 && critical[mask as usize] {
                        for b in BOX_CORNER_BITS {
                            grid.set(i + b[0], j + b[1], k + b[2], true);
                        }
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            return passes;
        }
        passes += 1;
        if passes >= max_passes {
            warn!(
                "Voxel surface repair stopped after {} passes; surface may be non-manifold.",
                passes
            );
            return passes;
        }
    }
}

/// Emits the welded boundary surface of the solid voxels.
pub fn extract_surface(grid: &VoxelGrid, solid_at_boundaries: bool) -> TriMesh {
    let mut mesh = TriMesh::new();
    let mut corner_index: HashMap<[u32; 3], u32> = HashMap::new();
    let [nx, ny, nz] = grid.dims;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                if !grid.get(i, j, k) {
                    continue;
                }
                for (face, offset) in BOX_FACES.into_iter().zip(FACE_NEIGHBORS) {
                    let neighbor = grid.get_or(
                        i as i64 + offset[0],
                        j as i64 + offset[1],
                        k as i64 + offset[2],
                        solid_at_boundaries,
                    );
                    if neighbor {
                        continue;
                    }
                    let quad = face.map(|corner| {
                        let b = BOX_CORNER_BITS[corner];
                        let key = [i + b[0], j + b[1], k + b[2]];
                        *corner_index.entry(key).or_insert_with(|| {
                            mesh.push_vertex(grid.corner(key[0], key[1], key[2]))
                        })
                    });
                    mesh.push_quad(quad[0], quad[1], quad[2], quad[3]);
                }
            }
        }
    }
    mesh
}

/// Full solidify: voxelize, repair, extract.
pub fn solidify(mesh: &TriMesh, options: &SolidifyOptions) -> TriMesh {
    let Some(mut grid) = voxelize(mesh, options) else {
        debug!("Solidify skipped: mesh has no extent.");
        return TriMesh::new();
    };
    let passes = repair(&mut grid, options.surface_search_steps);
    let out = extract_surface(&grid, options.solid_at_boundaries);
    debug!(
        "Solidify: grid {:?}, {} solid voxels, {} repair passes, {} triangles.",
        grid.dims,
        grid.filled_count(),
        passes,
        out.triangle_count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::{cone, cuboid};

    fn options(resolution: u32) -> SolidifyOptions {
        SolidifyOptions {
            grid_resolution: resolution,
            solid_at_boundaries: false,
            surface_search_steps: 64,
        }
    }

    #[test]
    fn winding_number_inside_and_outside_box() {
        let m = cuboid(Vec3::ZERO, Vec3::splat(2.0));
        let tris: Vec<[Vec3; 3]> = m.triangles.iter().map(|t| m.triangle_positions(*t)).collect();
        assert!((winding_number(&tris, Vec3::new(0.1, -0.2, 1.0)) - 1.0).abs() < 1e-6);
        assert!(winding_number(&tris, Vec3::new(3.0, 0.0, 1.0)).abs() < 1e-6);
    }

    #[test]
    fn critical_masks() {
        // Two voxels sharing only an edge.
        assert!(is_critical(0b0000_1001));
        // Two voxels sharing only a vertex.
        assert!(is_critical(0b1000_0001));
        // A face-connected pair is fine.
        assert!(!is_critical(0b0000_0011));
        assert!(!is_critical(0));
        assert!(!is_critical(0xFF));
        // Full block minus two opposite corners leaves pinched empty space.
        assert!(is_critical(!0b1000_0001));
    }

    #[test]
    fn repair_removes_diagonal_contacts() {
        let mut grid = VoxelGrid::new(Vec3::ZERO, 1.0, [4, 4, 4]);
        grid.set(1, 1, 1, true);
        grid.set(2, 2, 1, true);
        let passes = repair(&mut grid, 8);
        assert!(passes >= 1);
        assert!(grid.get(1, 2, 1) && grid.get(2, 1, 1));
        let surface = extract_surface(&grid, false);
        assert!(surface.is_closed_manifold());
    }

    #[test]
    fn overlapping_cones_fuse_into_one_closed_volume() {
        let mut m = cone(Vec3::new(-300.0, 0.0, -800.0), 800.0, 200.0, 1300.0, 16);
        m.append(&cone(Vec3::new(400.0, 100.0, -800.0), 700.0, 175.0, 1300.0, 16));
        m.append(&cuboid(Vec3::new(0.0, 0.0, -800.0), Vec3::new(3000.0, 3000.0, 400.0)));
        let out = solidify(&m, &options(16));
        assert!(!out.is_empty());
        assert!(out.is_closed_manifold());
        assert!(out.signed_volume() > 0.0);
    }

    #[test]
    fn single_voxel_extracts_cube() {
        let mut grid = VoxelGrid::new(Vec3::ZERO, 2.0, [3, 3, 3]);
        grid.set(1, 1, 1, true);
        let cube = extract_surface(&grid, false);
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.is_closed_manifold());
        assert!((cube.signed_volume() - 8.0).abs() < 1e-3);
    }

    #[test]
    fn empty_mesh_solidifies_to_empty() {
        assert!(solidify(&TriMesh::new(), &options(8)).is_empty());
    }

    #[test]
    fn solidify_is_deterministic() {
        let m = cone(Vec3::ZERO, 500.0, 125.0, 800.0, 12);
        let a = solidify(&m, &options(10));
        let b = solidify(&m, &options(10));
        assert_eq!(a, b);
    }
}
