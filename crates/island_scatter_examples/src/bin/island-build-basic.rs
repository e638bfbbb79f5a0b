use island_scatter::prelude::*;
use island_scatter_examples::{init_tracing, write_obj};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // A small archipelago at a coarse voxel grid so the demo finishes quickly.
    let spec = IslandSpec::new()
        .with_island_count(8)
        .with_grid_resolution(32)
        .with_tessellation_level(1);

    let mut builder =
        IslandMeshBuilder::try_new(SoftwareKernel::new(), spec)?.with_spawn_markers(true);
    let mut seed = FixedSeed(2025).island_seed();
    let mut events = VecSink::new();

    let build = builder.build(Some(TriMesh::new()), &mut seed, &mut events)?;

    for point in &build.spawn_points {
        tracing::info!(
            "Island at ({:.0}, {:.0}) with radius {:.0}.",
            point.position.x,
            point.position.y,
            point.radius
        );
    }
    tracing::info!(
        "Markers: {} | surface offset: {:.2}.",
        events.count(GenerationEventKind::SpawnMarkerPlaced),
        build.surface_offset.z
    );

    write_obj(&build.mesh, "island-build-basic.obj")?;
    Ok(())
}
