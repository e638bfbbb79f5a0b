use glam::Vec3;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::events::{EventSink, GenerationEvent, GenerationEventKind};
use crate::island::{BuildTask, IslandSpec, SpawnPoint, SpawnPointRegistry};
use crate::mesh::{
    GeometryKernel, PlaneCut, SmoothingOptions, SolidifyOptions, TessellationOptions, UvProjection,
};
use crate::seed::SeedStream;

/// Z of every cone base and of the base slab.
const BASE_Z: f32 = -800.0;
/// Extra width of the base slab beyond `max_spawn_distance`.
const BASE_MARGIN: f32 = 10_000.0;
const BASE_HEIGHT: f32 = 400.0;
const SOLIDIFY_SEARCH_STEPS: u32 = 64;
const SMOOTH_ITERATIONS: u32 = 6;
const SMOOTH_ALPHA: f32 = 0.2;
const BOTTOM_CUT_Z: f32 = -390.0;
const TOP_CUT_Z: f32 = 0.0;
const UV_SCALE: f32 = 100.0;
/// Vertical offset hosts apply to the finished island to avoid z-fighting.
const SURFACE_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 0.05);

/// Output of one island build.
#[derive(Debug, Clone)]
pub struct IslandBuild<M> {
    /// The finished mesh.
    pub mesh: M,
    /// Island centers in generation order.
    pub spawn_points: SpawnPointRegistry,
    /// Offset to apply to the placed island.
    pub surface_offset: Vec3,
}

/// Runs the island pipeline over a [`GeometryKernel`].
pub struct IslandMeshBuilder<K: GeometryKernel> {
    kernel: K,
    spec: IslandSpec,
    spawn_markers: bool,
}

impl<K: GeometryKernel> IslandMeshBuilder<K> {
    /// Creates a builder after validating `spec`.
    pub fn try_new(kernel: K, spec: IslandSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self::new(kernel, spec))
    }

    pub fn new(kernel: K, spec: IslandSpec) -> Self {
        debug_assert!(spec.max_radius >= spec.min_radius, "radius range inverted");
        debug_assert!(spec.grid_resolution > 0, "grid_resolution must be > 0");
        Self {
            kernel,
            spec,
            spawn_markers: false,
        }
    }

    /// Emit a [`GenerationEvent::SpawnMarkerPlaced`] for each recorded spawn point.
    pub fn with_spawn_markers(mut self, enabled: bool) -> Self {
        self.spawn_markers = enabled;
        self
    }

    pub fn spec(&self) -> &IslandSpec {
        &self.spec
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    fn stage(&self, name: &str, mesh: &K::Mesh) {
        let (vertices, triangles) = self.kernel.stats(mesh);
        debug!("Island stage '{name}': {vertices} vertices, {triangles} triangles.");
    }

    /// Builds the island into `container`.
    ///
    /// Returns [`Error::ContainerUnavailable`] without drawing from `seed` when no
    /// container is supplied. Otherwise the stages always run to completion in order.
    pub fn build(
        &mut self,
        container: Option<K::Mesh>,
        seed: &mut SeedStream,
        sink: &mut dyn EventSink,
    ) -> Result<IslandBuild<K::Mesh>> {
        let Some(container) = container else {
            error!("Island build aborted: mesh container unavailable.");
            return Err(Error::ContainerUnavailable);
        };
        let spec = self.spec.clone();
        if sink.wants(GenerationEventKind::IslandBuildStarted) {
            sink.send(GenerationEvent::IslandBuildStarted {
                island_count: spec.island_count,
            });
        }

        let mut mesh = self.kernel.reset(container);
        let mut spawn_points = SpawnPointRegistry::with_capacity(spec.island_count);
        let half_distance = spec.max_spawn_distance / 2.0;

        for _ in 0..spec.island_count {
            let radius = seed.uniform_f32(spec.min_radius, spec.max_radius);
            let dir = seed.unit_vector();
            let position = Vec3::new(dir.x * half_distance, dir.y * half_distance, 0.0);
            let index = spawn_points.push(SpawnPoint { position, radius });

            mesh = self.kernel.append_cone(
                mesh,
                &spec.primitive,
                Vec3::new(position.x, position.y, BASE_Z),
                radius,
                radius / 4.0,
                spec.height,
            );

            if self.spawn_markers && sink.wants(GenerationEventKind::SpawnMarkerPlaced) {
                sink.send(GenerationEvent::SpawnMarkerPlaced { index, position });
            }
        }
        self.stage("cones", &mesh);

        let slab_width = spec.max_spawn_distance + BASE_MARGIN;
        mesh = self.kernel.append_box(
            mesh,
            &spec.primitive,
            Vec3::new(0.0, 0.0, BASE_Z),
            Vec3::new(slab_width, slab_width, BASE_HEIGHT),
        );
        self.stage("base slab", &mesh);

        mesh = self.kernel.voxel_solidify(
            mesh,
            &SolidifyOptions {
                grid_resolution: spec.grid_resolution,
                solid_at_boundaries: false,
                surface_search_steps: SOLIDIFY_SEARCH_STEPS,
            },
        );
        self.stage("solidify", &mesh);

        mesh = self.kernel.recompute_normals(mesh);

        mesh = self.kernel.iterative_smooth(
            mesh,
            &SmoothingOptions {
                iterations: SMOOTH_ITERATIONS,
                alpha: SMOOTH_ALPHA,
            },
        );
        self.stage("smooth", &mesh);

        mesh = self.kernel.tessellate(
            mesh,
            &TessellationOptions {
                level: spec.tessellation_level,
            },
        );
        self.stage("tessellate", &mesh);

        mesh = self.kernel.plane_cut(
            mesh,
            &PlaneCut::new(Vec3::new(0.0, 0.0, BOTTOM_CUT_Z), Vec3::NEG_Z)
                .with_fill_holes(spec.bottom_cut_fill_holes),
        );
        self.stage("bottom cut", &mesh);

        mesh = self.kernel.plane_cut(
            mesh,
            &PlaneCut::new(Vec3::new(0.0, 0.0, TOP_CUT_Z), Vec3::Z)
                .with_fill_holes(spec.top_cut_fill_holes),
        );
        self.stage("top cut", &mesh);

        mesh = self.kernel.planar_uv_project(
            mesh,
            &UvProjection {
                origin: Vec3::ZERO,
                scale: Vec3::splat(UV_SCALE),
            },
        );

        self.kernel.release_transient();

        let (vertex_count, triangle_count) = self.kernel.stats(&mesh);
        info!(
            "Island build complete | islands: {} | vertices: {} | triangles: {}.",
            spawn_points.len(),
            vertex_count,
            triangle_count
        );
        if sink.wants(GenerationEventKind::IslandGenerationComplete) {
            sink.send(GenerationEvent::IslandGenerationComplete {
                island_count: spawn_points.len(),
                vertex_count,
                triangle_count,
            });
        }

        Ok(IslandBuild {
            mesh,
            spawn_points,
            surface_offset: SURFACE_OFFSET,
        })
    }
}

impl<K> IslandMeshBuilder<K>
where
    K: GeometryKernel + Send + 'static,
    K::Mesh: Send + 'static,
{
    /// Runs [`IslandMeshBuilder::build`] on a worker thread.
    ///
    /// The finished build is published once through the returned [`BuildTask`]; no
    /// intermediate mesh is observable from the caller.
    pub fn spawn<S>(
        self,
        container: K::Mesh,
        seed: SeedStream,
        sink: S,
    ) -> Result<BuildTask<K::Mesh>>
    where
        S: EventSink + Send + 'static,
    {
        BuildTask::spawn(self, container, seed, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecSink;
    use crate::mesh::{PrimitiveOptions, SoftwareKernel, TriMesh};

    /// Kernel that records the operations it is asked to perform.
    #[derive(Default)]
    struct RecordingKernel {
        released: bool,
    }

    impl GeometryKernel for RecordingKernel {
        type Mesh = Vec<String>;

        fn reset(&mut self, mut mesh: Vec<String>) -> Vec<String> {
            mesh.clear();
            mesh.push("reset".into());
            mesh
        }

        fn append_cone(
            &mut self,
            mut mesh: Vec<String>,
            _options: &PrimitiveOptions,
            base_center: Vec3,
            base_radius: f32,
            top_radius: f32,
            height: f32,
        ) -> Vec<String> {
            mesh.push(format!(
                "cone z={} r={} top={} h={}",
                base_center.z, base_radius, top_radius, height
            ));
            mesh
        }

        fn append_box(
            &mut self,
            mut mesh: Vec<String>,
            _options: &PrimitiveOptions,
            base_center: Vec3,
            dimensions: Vec3,
        ) -> Vec<String> {
            mesh.push(format!(
                "box z={} {}x{}x{}",
                base_center.z, dimensions.x, dimensions.y, dimensions.z
            ));
            mesh
        }

        fn voxel_solidify(&mut self, mut mesh: Vec<String>, o: &SolidifyOptions) -> Vec<String> {
            mesh.push(format!(
                "solidify res={} boundaries={} steps={}",
                o.grid_resolution, o.solid_at_boundaries, o.surface_search_steps
            ));
            mesh
        }

        fn recompute_normals(&mut self, mut mesh: Vec<String>) -> Vec<String> {
            mesh.push("normals".into());
            mesh
        }

        fn iterative_smooth(&mut self, mut mesh: Vec<String>, o: &SmoothingOptions) -> Vec<String> {
            mesh.push(format!("smooth {} {}", o.iterations, o.alpha));
            mesh
        }

        fn tessellate(&mut self, mut mesh: Vec<String>, o: &TessellationOptions) -> Vec<String> {
            mesh.push(format!("tessellate {}", o.level));
            mesh
        }

        fn plane_cut(&mut self, mut mesh: Vec<String>, cut: &PlaneCut) -> Vec<String> {
            mesh.push(format!(
                "cut z={} nz={} fill={}",
                cut.origin.z, cut.normal.z, cut.fill_holes
            ));
            mesh
        }

        fn planar_uv_project(&mut self, mut mesh: Vec<String>, p: &UvProjection) -> Vec<String> {
            mesh.push(format!("uv {}", p.scale.x));
            mesh
        }

        fn release_transient(&mut self) {
            self.released = true;
        }

        fn stats(&self, mesh: &Vec<String>) -> (usize, usize) {
            (mesh.len(), 0)
        }
    }

    fn single_island() -> IslandSpec {
        IslandSpec::new()
            .with_island_count(1)
            .with_radius_range(800.0, 800.0)
            .with_max_spawn_distance(0.0)
    }

    #[test]
    fn stages_run_in_fixed_order() {
        let mut builder = IslandMeshBuilder::new(RecordingKernel::default(), single_island());
        let mut seed = SeedStream::new(1);
        let out = builder
            .build(Some(Vec::new()), &mut seed, &mut ())
            .expect("build");
        let expected = vec![
            "reset",
            "cone z=-800 r=800 top=200 h=1300",
            "box z=-800 10000x10000x400",
            "solidify res=50 boundaries=false steps=64",
            "normals",
            "smooth 6 0.2",
            "tessellate 2",
            "cut z=-390 nz=-1 fill=false",
            "cut z=0 nz=1 fill=true",
            "uv 100",
        ];
        assert_eq!(out.mesh, expected);
        assert!(builder.kernel().released);
        assert_eq!(out.surface_offset, Vec3::new(0.0, 0.0, 0.05));
    }

    #[test]
    fn single_island_sits_at_origin() {
        let mut builder = IslandMeshBuilder::new(RecordingKernel::default(), single_island());
        let out = builder
            .build(Some(Vec::new()), &mut SeedStream::new(99), &mut ())
            .expect("build");
        assert_eq!(out.spawn_points.len(), 1);
        let p = out.spawn_points.as_slice()[0];
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.radius, 800.0);
    }

    #[test]
    fn registry_matches_island_count_and_radius_range() {
        let spec = IslandSpec::new()
            .with_island_count(12)
            .with_radius_range(800.0, 5000.0);
        let mut builder = IslandMeshBuilder::new(RecordingKernel::default(), spec.clone());
        let out = builder
            .build(Some(Vec::new()), &mut SeedStream::new(7), &mut ())
            .expect("build");
        assert_eq!(out.spawn_points.len(), 12);
        for p in &out.spawn_points {
            assert!(p.radius >= spec.min_radius && p.radius <= spec.max_radius);
            assert_eq!(p.position.z, 0.0);
            assert!(p.position.truncate().length() <= spec.max_spawn_distance / 2.0 + 1e-2);
        }
        let cones = out.mesh.iter().filter(|s| s.starts_with("cone")).count();
        assert_eq!(cones, 12);
    }

    #[test]
    fn missing_container_aborts_before_drawing() {
        let mut builder = IslandMeshBuilder::new(RecordingKernel::default(), single_island());
        let mut seed = SeedStream::new(5);
        let mut sink = VecSink::new();
        let err = builder.build(None, &mut seed, &mut sink).unwrap_err();
        assert!(matches!(err, Error::ContainerUnavailable));
        assert!(sink.is_empty());
        assert_eq!(seed.unit(), SeedStream::new(5).unit());
    }

    #[test]
    fn events_include_markers_and_completion() {
        let spec = single_island().with_island_count(3);
        let mut builder =
            IslandMeshBuilder::new(RecordingKernel::default(), spec).with_spawn_markers(true);
        let mut sink = VecSink::new();
        builder
            .build(Some(Vec::new()), &mut SeedStream::new(3), &mut sink)
            .expect("build");
        assert_eq!(sink.count(GenerationEventKind::IslandBuildStarted), 1);
        assert_eq!(sink.count(GenerationEventKind::SpawnMarkerPlaced), 3);
        assert_eq!(sink.count(GenerationEventKind::IslandGenerationComplete), 1);
        assert!(matches!(
            sink.as_slice().last(),
            Some(GenerationEvent::IslandGenerationComplete { island_count: 3, .. })
        ));
    }

    #[test]
    fn try_new_rejects_invalid_spec() {
        let spec = IslandSpec::new().with_grid_resolution(0);
        assert!(IslandMeshBuilder::try_new(RecordingKernel::default(), spec).is_err());
    }

    fn small_spec() -> IslandSpec {
        IslandSpec::new()
            .with_island_count(3)
            .with_radius_range(800.0, 1500.0)
            .with_max_spawn_distance(3000.0)
            .with_grid_resolution(12)
            .with_tessellation_level(0)
            .with_radial_steps(8)
    }

    #[test]
    fn software_build_is_deterministic_and_flattened() {
        let run = |seed: u64| {
            let mut builder = IslandMeshBuilder::new(SoftwareKernel::new(), small_spec());
            builder
                .build(Some(TriMesh::new()), &mut SeedStream::new(seed), &mut ())
                .expect("build")
        };
        let a = run(42);
        let b = run(42);
        assert_eq!(a.spawn_points, b.spawn_points);
        assert_eq!(a.mesh, b.mesh);
        if let Some((lo, hi)) = a.mesh.bounds() {
            assert!(hi.z <= 0.05);
            assert!(lo.z >= -390.5);
        }
    }
}
