#![forbid(unsafe_code)]
//! island_scatter: Deterministic island mesh synthesis and navigation-constrained scattering.
//!
//! Modules:
//! - mesh: triangle mesh state, the geometry kernel contract, and a CPU reference kernel
//! - island: island spec, spawn point registry, mesh builder and background build task
//! - scatter: descriptors, async resource loading, navigation sampling, scatter scheduler
//! - events, config, seed: event sinks, RON-loadable configuration, and the run seed
//!
//! For examples, see README and the `island_scatter_examples` crate.
pub mod config;
pub mod error;
pub mod events;
pub mod island;
pub mod mesh;
pub mod scatter;
pub mod seed;

pub use error::{Error, Result};

/// Convenient re-exports for common types. Import with `use island_scatter::prelude::*;`.
pub mod prelude {
    pub use crate::config::GeneratorConfig;
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        ChannelSink, EventSink, FnSink, GenerationEvent, GenerationEventKind, MultiSink, VecSink,
    };
    pub use crate::island::{
        BuildTask, IslandBuild, IslandMeshBuilder, IslandSpec, SpawnPoint, SpawnPointRegistry,
    };
    pub use crate::mesh::{
        GeometryKernel, PlaneCut, PrimitiveOptions, SmoothingOptions, SoftwareKernel,
        SolidifyOptions, TessellationOptions, TriMesh, UvProjection,
    };
    pub use crate::scatter::{
        ActorDescriptor, AsyncResourceLoader, CancelHandle, FlatNavigation, InMemoryLoader,
        InstanceDescriptor, MeshRef, NavConstrainedSampler, NavigationQuery, PlacementHost,
        PlacementTransform, RecordingHost, ResourceHandle, ResourceLoader, ResourceRef,
        ScatterConfig, ScatterEnv, ScatterMode, ScatterPhase, ScatterScheduler, ScatterSummary,
    };
    pub use crate::seed::{FixedSeed, SeedProvider, SeedStream};
}
