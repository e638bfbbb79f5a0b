use glam::Vec2;

use crate::mesh::{TriMesh, UvProjection};

/// Projects positions onto the XY plane: `uv = (p - origin).xy / scale.xy`.
///
/// A zero scale component leaves that coordinate at zero instead of producing infinities.
pub fn planar_project(mesh: &mut TriMesh, projection: &UvProjection) {
    let inv = |s: f32| if s == 0.0 { 0.0 } else { 1.0 / s };
    let inv_scale = Vec2::new(inv(projection.scale.x), inv(projection.scale.y));
    mesh.uvs = mesh
        .positions
        .iter()
        .map(|p| (*p - projection.origin).truncate() * inv_scale)
        .collect();
}
