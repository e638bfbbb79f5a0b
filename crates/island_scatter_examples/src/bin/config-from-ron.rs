use std::path::PathBuf;

use island_scatter::prelude::*;
use island_scatter_examples::{init_tracing, log_summary, write_obj};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/archipelago.ron")
    });
    let config = GeneratorConfig::from_ron_path(&path)?;
    tracing::info!(
        "Config '{}': seed {}, {} islands, {} actor and {} instance descriptors.",
        path.display(),
        config.seed,
        config.island.island_count,
        config.scatter.actors.len(),
        config.scatter.instances.len()
    );

    let mut seed = config.island_seed();
    let mut builder = IslandMeshBuilder::try_new(SoftwareKernel::new(), config.island.clone())?;
    let build = builder.build(Some(TriMesh::new()), &mut seed, &mut ())?;
    write_obj(&build.mesh, "config-from-ron.obj")?;

    // Every referenced actor resource loads after two loader updates.
    let mut loader = InMemoryLoader::new();
    for actor in &config.scatter.actors {
        loader.insert(actor.resource.clone(), 2);
    }
    let mut navigation = FlatNavigation::from_spawn_points(&build.spawn_points);
    let mut host = RecordingHost::new();
    let mut env = ScatterEnv {
        loader: &mut loader,
        navigation: Some(&mut navigation),
        host: &mut host,
        events: &mut (),
    };
    let mut scheduler = ScatterScheduler::try_new(config.scatter)?;
    scheduler.start(seed, &mut env);
    let summary = scheduler.run_until_done(&mut env, 0.1, 10_000)?;
    log_summary(&summary);
    Ok(())
}
