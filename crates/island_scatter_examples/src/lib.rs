#![forbid(unsafe_code)]
//! Shared helpers for the island_scatter demos.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use island_scatter::prelude::{ScatterSummary, TriMesh};
use tracing_subscriber::EnvFilter;

/// Installs a compact fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Writes `mesh` as a Wavefront OBJ file with positions, UVs and normals.
pub fn write_obj(mesh: &TriMesh, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# island_scatter mesh")?;
    for p in &mesh.positions {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for uv in &mesh.uvs {
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }
    for n in &mesh.normals {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    // OBJ indices are 1-based.
    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| i + 1);
        writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    out.flush()?;
    tracing::info!(
        "Wrote {} ({} vertices, {} triangles).",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(())
}

/// Logs the counters of a finished scatter run.
pub fn log_summary(summary: &ScatterSummary) {
    tracing::info!(
        "Scatter summary | actors: {} | instances: {} | containers: {} | degraded centers: {} | fallbacks: {} | skipped: {}.",
        summary.actors_spawned,
        summary.instances_added,
        summary.containers_created,
        summary.degraded_biome_centers,
        summary.item_fallbacks,
        summary.skipped_descriptors
    );
}
