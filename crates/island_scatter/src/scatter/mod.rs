//! Navigation-constrained scattering of actors and batched instances.
//!
//! A [`ScatterScheduler`] loads the actor resources through a [`ResourceLoader`], waits
//! until the [`NavigationQuery`] reports an idle navigation system, then scatters every
//! [`ActorDescriptor`] followed by every [`InstanceDescriptor`] through a
//! [`PlacementHost`]. Point sampling, grid snapping and jitter live in
//! [`NavConstrainedSampler`].
use std::fmt;

use glam::Vec3;

pub mod descriptor;
pub mod host;
pub mod loader;
pub mod navigation;
pub mod sampler;
pub mod scheduler;

pub use descriptor::{ActorDescriptor, InstanceDescriptor, MeshRef, ResourceRef, ScatterConfig};
pub use host::{ActorHandle, InstanceContainerId, PlacementHost, RecordingHost, SpawnSink};
pub use loader::{
    AsyncResourceLoader, InMemoryLoader, LoadCompletion, LoadProgress, ResourceHandle,
    ResourceLoader,
};
pub use navigation::{FlatNavigation, NavigationQuery};
pub use sampler::{BiomeShape, NavConstrainedSampler, SampleContext};
pub use scheduler::{CancelHandle, ScatterEnv, ScatterScheduler};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScatterPhase {
    #[default]
    Idle,
    LoadingResources,
    WaitingForNavReady,
    ScatteringActors,
    ScatteringInstances,
    Done,
}

impl ScatterPhase {
    /// True for the two phases that place content.
    pub fn is_scattering(self) -> bool {
        matches!(
            self,
            ScatterPhase::ScatteringActors | ScatterPhase::ScatteringInstances
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ScatterPhase::Done
    }
}

impl fmt::Display for ScatterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScatterPhase::Idle => "Idle",
            ScatterPhase::LoadingResources => "LoadingResources",
            ScatterPhase::WaitingForNavReady => "WaitingForNavReady",
            ScatterPhase::ScatteringActors => "ScatteringActors",
            ScatterPhase::ScatteringInstances => "ScatteringInstances",
            ScatterPhase::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Which descriptor list is being scattered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScatterMode {
    /// One spawned actor per point.
    Actor,
    /// One instance per point in a shared container.
    Instance,
}

impl ScatterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScatterMode::Actor => "actor",
            ScatterMode::Instance => "instance",
        }
    }
}

impl fmt::Display for ScatterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final transform of one placed item.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementTransform {
    /// Grid-snapped ground position (`z == 0`).
    pub position: Vec3,
    /// Rotation about the vertical axis in degrees.
    pub yaw_degrees: f32,
    /// Uniform scale.
    pub scale: f32,
}

/// Counters collected over one scatter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScatterSummary {
    pub actors_spawned: usize,
    pub instances_added: usize,
    pub containers_created: usize,
    /// Biomes whose center fell back to the origin.
    pub degraded_biome_centers: usize,
    /// Items whose navigation query failed.
    pub item_fallbacks: usize,
    /// Descriptors skipped because of a missing resource, container or cursor overrun.
    pub skipped_descriptors: usize,
}

impl ScatterSummary {
    /// Total items placed in either mode.
    pub fn placed(&self) -> usize {
        self.actors_spawned + self.instances_added
    }
}
