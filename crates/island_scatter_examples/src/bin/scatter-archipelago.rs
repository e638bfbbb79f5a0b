use island_scatter::prelude::*;
use island_scatter_examples::{init_tracing, log_summary};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Build first; the scatter surface is the union of the island footprints.
    let spec = IslandSpec::new()
        .with_island_count(10)
        .with_grid_resolution(24)
        .with_tessellation_level(0);
    let mut builder = IslandMeshBuilder::try_new(SoftwareKernel::new(), spec)?;
    let mut seed = SeedStream::new(99);
    let build = builder.build(Some(TriMesh::new()), &mut seed, &mut ())?;

    let config = ScatterConfig::new()
        .with_actor(
            ActorDescriptor::new("/Game/Props/Palm")
                .with_biomes(1200.0, 6, 5)
                .with_scale_range(0.4),
        )
        .with_actor(
            ActorDescriptor::new("/Game/Props/Boulder")
                .with_biomes(600.0, 4, 3)
                .with_rotation_range(90.0),
        )
        .with_instance(InstanceDescriptor::new("/Game/Foliage/Grass").with_biomes(1500.0, 10, 30))
        .with_instance(InstanceDescriptor::new("/Game/Foliage/Shell").with_biomes(400.0, 6, 8))
        .with_load_timeout(Some(10.0));

    let mut loader = InMemoryLoader::new()
        .with_resource("/Game/Props/Palm", 3)
        .with_resource("/Game/Props/Boulder", 1);
    let mut navigation = FlatNavigation::from_spawn_points(&build.spawn_points);
    let mut host = RecordingHost::new();
    let mut events = FnSink::new(|event| {
        if let GenerationEvent::DescriptorFinished {
            mode,
            index,
            placed,
        } = event
        {
            tracing::info!("{mode} descriptor {index}: {placed} placed.");
        }
    });

    let mut env = ScatterEnv {
        loader: &mut loader,
        navigation: Some(&mut navigation),
        host: &mut host,
        events: &mut events,
    };
    let mut scheduler = ScatterScheduler::try_new(config)?;
    scheduler.start(seed, &mut env);
    let summary = scheduler.run_until_done(&mut env, 1.0 / 30.0, 10_000)?;

    log_summary(&summary);
    tracing::info!("Containers: {:?}.", host.containers);
    Ok(())
}
