use glam::Vec3;
use tracing::trace;

use crate::mesh::{
    cut, deform, primitives, subdivide, uv, voxel, GeometryKernel, PlaneCut, PrimitiveOptions,
    SmoothingOptions, SolidifyOptions, TessellationOptions, TriMesh, UvProjection,
};

/// Deterministic CPU implementation of [`GeometryKernel`] over [`TriMesh`].
///
/// Primitives are built into a scratch mesh before being appended. The scratch mesh is
/// kept between calls until [`GeometryKernel::release_transient`] is invoked.
#[derive(Debug, Default)]
pub struct SoftwareKernel {
    scratch: TriMesh,
}

impl SoftwareKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the kernel holds scratch geometry.
    pub fn has_transient(&self) -> bool {
        self.scratch.vertex_count() > 0
    }
}

impl GeometryKernel for SoftwareKernel {
    type Mesh = TriMesh;

    fn reset(&mut self, mut mesh: TriMesh) -> TriMesh {
        mesh.clear();
        mesh
    }

    fn append_cone(
        &mut self,
        mut mesh: TriMesh,
        options: &PrimitiveOptions,
        base_center: Vec3,
        base_radius: f32,
        top_radius: f32,
        height: f32,
    ) -> TriMesh {
        self.scratch = primitives::cone(
            base_center,
            base_radius,
            top_radius,
            height,
            options.radial_steps,
        );
        mesh.append(&self.scratch);
        mesh
    }

    fn append_box(
        &mut self,
        mut mesh: TriMesh,
        _options: &PrimitiveOptions,
        base_center: Vec3,
        dimensions: Vec3,
    ) -> TriMesh {
        self.scratch = primitives::cuboid(base_center, dimensions);
        mesh.append(&self.scratch);
        mesh
    }

    fn voxel_solidify(&mut self, mesh: TriMesh, options: &SolidifyOptions) -> TriMesh {
        voxel::solidify(&mesh, options)
    }

    fn recompute_normals(&mut self, mut mesh: TriMesh) -> TriMesh {
        deform::recompute_normals(&mut mesh);
        mesh
    }

    fn iterative_smooth(&mut self, mut mesh: TriMesh, options: &SmoothingOptions) -> TriMesh {
        deform::iterative_smooth(&mut mesh, options);
        mesh
    }

    fn tessellate(&mut self, mesh: TriMesh, options: &TessellationOptions) -> TriMesh {
        if options.level == 0 {
            return mesh;
        }
        subdivide::tessellate(&mesh, options)
    }

    fn plane_cut(&mut self, mesh: TriMesh, cut: &PlaneCut) -> TriMesh {
        cut::plane_cut(&mesh, cut)
    }

    fn planar_uv_project(&mut self, mut mesh: TriMesh, projection: &UvProjection) -> TriMesh {
        uv::planar_project(&mut mesh, projection);
        mesh
    }

    fn release_transient(&mut self) {
        trace!(
            "Releasing {} scratch vertices.",
            self.scratch.vertex_count()
        );
        self.scratch = TriMesh::new();
    }

    fn stats(&self, mesh: &TriMesh) -> (usize, usize) {
        (mesh.vertex_count(), mesh.triangle_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_accumulate_and_reset_clears() {
        let mut k = SoftwareKernel::new();
        let opts = PrimitiveOptions { radial_steps: 8 };
        let mesh = k.append_cone(TriMesh::new(), &opts, Vec3::ZERO, 2.0, 0.5, 3.0);
        let mesh = k.append_box(mesh, &opts, Vec3::new(10.0, 0.0, 0.0), Vec3::ONE);
        assert_eq!(k.stats(&mesh), (8 * 2 + 2 + 8, 8 * 4 + 12));
        assert!(mesh.is_closed_manifold());
        let mesh = k.reset(mesh);
        assert_eq!(k.stats(&mesh), (0, 0));
    }

    #[test]
    fn release_transient_drops_scratch() {
        let mut k = SoftwareKernel::new();
        assert!(!k.has_transient());
        let _ = k.append_box(
            TriMesh::new(),
            &PrimitiveOptions::default(),
            Vec3::ZERO,
            Vec3::ONE,
        );
        assert!(k.has_transient());
        k.release_transient();
        assert!(!k.has_transient());
    }

    #[test]
    fn full_chain_produces_closed_capped_mesh() {
        let mut k = SoftwareKernel::new();
        let opts = PrimitiveOptions::default();
        let mut mesh = k.append_cone(
            TriMesh::new(),
            &opts,
            Vec3::new(0.0, 0.0, -800.0),
            800.0,
            200.0,
            1300.0,
        );
        mesh = k.append_box(
            mesh,
            &opts,
            Vec3::new(0.0, 0.0, -800.0),
            Vec3::new(3000.0, 3000.0, 400.0),
        );
        mesh = k.voxel_solidify(
            mesh,
            &SolidifyOptions {
                grid_resolution: 16,
                ..SolidifyOptions::default()
            },
        );
        mesh = k.recompute_normals(mesh);
        mesh = k.iterative_smooth(mesh, &SmoothingOptions::default());
        mesh = k.recompute_normals(mesh);
        mesh = k.plane_cut(mesh, &PlaneCut::new(Vec3::ZERO, Vec3::Z));
        mesh = k.planar_uv_project(
            mesh,
            &UvProjection {
                origin: Vec3::ZERO,
                scale: Vec3::splat(100.0),
            },
        );
        assert!(!mesh.is_empty());
        let (_, hi) = mesh.bounds().expect("non-empty");
        assert!(hi.z <= 0.05);
        assert_eq!(mesh.uvs.len(), mesh.vertex_count());
    }
}
