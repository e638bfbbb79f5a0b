//! Geometry kernel contract used by the island pipeline.
//!
//! Every operation consumes the mesh value and returns the replacement, so the order in
//! which stages mutate the mesh is visible at the call site.
use glam::Vec3;

/// Options shared by primitive append operations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveOptions {
    /// Segments around the circumference of round primitives.
    pub radial_steps: u32,
}

impl Default for PrimitiveOptions {
    fn default() -> Self {
        Self { radial_steps: 16 }
    }
}

/// Voxel solidify parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidifyOptions {
    /// Cells along the longest side of the mesh bounds.
    pub grid_resolution: u32,
    /// Treat voxels touching the grid boundary as solid.
    pub solid_at_boundaries: bool,
    /// Budget of surface repair passes.
    pub surface_search_steps: u32,
}

impl Default for SolidifyOptions {
    fn default() -> Self {
        Self {
            grid_resolution: 64,
            solid_at_boundaries: false,
            surface_search_steps: 64,
        }
    }
}

/// Iterative smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingOptions {
    pub iterations: u32,
    /// Blend factor toward the neighbor average per iteration.
    pub alpha: f32,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            alpha: 0.2,
        }
    }
}

/// PN tessellation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TessellationOptions {
    /// Number of 1-to-4 refinement rounds; 0 leaves the mesh unchanged.
    pub level: u32,
}

/// A cutting plane. Geometry on the side `normal` points to is discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneCut {
    pub origin: Vec3,
    pub normal: Vec3,
    /// Cap the boundary loops created on the plane.
    pub fill_holes: bool,
}

impl PlaneCut {
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.normalize_or(Vec3::Z),
            fill_holes: true,
        }
    }

    pub fn with_fill_holes(mut self, fill_holes: bool) -> Self {
        self.fill_holes = fill_holes;
        self
    }

    /// Signed distance of `p` along the plane normal.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.origin).dot(self.normal)
    }

    /// Orthogonal projection of `p` onto the plane.
    #[inline]
    pub fn project(&self, p: Vec3) -> Vec3 {
        p - self.normal * self.signed_distance(p)
    }
}

/// Planar UV projection along Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvProjection {
    pub origin: Vec3,
    /// World units per UV unit on each axis.
    pub scale: Vec3,
}

impl Default for UvProjection {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Mesh-processing operations the island pipeline relies on.
pub trait GeometryKernel {
    type Mesh;

    /// Clears all geometry from `mesh`.
    fn reset(&mut self, mesh: Self::Mesh) -> Self::Mesh;

    /// Appends a closed cone frustum whose base center is `base_center`.
    fn append_cone(
        &mut self,
        mesh: Self::Mesh,
        options: &PrimitiveOptions,
        base_center: Vec3,
        base_radius: f32,
        top_radius: f32,
        height: f32,
    ) -> Self::Mesh;

    /// Appends a closed box whose base center is `base_center`.
    fn append_box(
        &mut self,
        mesh: Self::Mesh,
        options: &PrimitiveOptions,
        base_center: Vec3,
        dimensions: Vec3,
    ) -> Self::Mesh;

    fn voxel_solidify(&mut self, mesh: Self::Mesh, options: &SolidifyOptions) -> Self::Mesh;

    fn recompute_normals(&mut self, mesh: Self::Mesh) -> Self::Mesh;

    fn iterative_smooth(&mut self, mesh: Self::Mesh, options: &SmoothingOptions) -> Self::Mesh;

    fn tessellate(&mut self, mesh: Self::Mesh, options: &TessellationOptions) -> Self::Mesh;

    fn plane_cut(&mut self, mesh: Self::Mesh, cut: &PlaneCut) -> Self::Mesh;

    fn planar_uv_project(&mut self, mesh: Self::Mesh, projection: &UvProjection) -> Self::Mesh;

    /// Drops any scratch meshes the kernel keeps between calls.
    fn release_transient(&mut self);

    /// Vertex and triangle counts, for logging.
    fn stats(&self, mesh: &Self::Mesh) -> (usize, usize);
}
