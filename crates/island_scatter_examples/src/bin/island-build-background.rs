use std::thread;
use std::time::Duration;

use island_scatter::prelude::*;
use island_scatter_examples::{init_tracing, write_obj};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let spec = IslandSpec::new()
        .with_island_count(12)
        .with_grid_resolution(40)
        .with_tessellation_level(1);
    let builder = IslandMeshBuilder::try_new(SoftwareKernel::new(), spec)?;

    // Progress events arrive on the main thread while the worker builds.
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut task = builder.spawn(TriMesh::new(), SeedStream::new(7), ChannelSink::new(tx))?;

    let build = loop {
        for event in rx.try_iter() {
            if let GenerationEvent::IslandGenerationComplete {
                island_count,
                triangle_count,
                ..
            } = event
            {
                tracing::info!(
                    "Worker finished {island_count} islands, {triangle_count} triangles."
                );
            }
        }
        if let Some(result) = task.try_finish() {
            break result?;
        }
        thread::sleep(Duration::from_millis(10));
    };

    write_obj(&build.mesh, "island-build-background.obj")?;
    Ok(())
}
