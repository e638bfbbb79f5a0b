//! Placement targets.
use crate::error::{Error, Result};
use crate::scatter::{MeshRef, PlacementTransform, ResourceHandle, ResourceRef, ScatterMode};

/// Identifier of a spawned actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorHandle(pub u64);

/// Identifier of a batched instance container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceContainerId(pub u64);

/// Host world that materializes placed content.
pub trait PlacementHost {
    /// Spawns one actor of `class`. Fails with [`Error::MissingContext`] when the
    /// world cannot take actors.
    fn spawn_actor(
        &mut self,
        class: &ResourceHandle,
        transform: &PlacementTransform,
    ) -> Result<ActorHandle>;

    /// Creates a container that batches instances of `mesh`.
    fn create_instance_container(&mut self, mesh: &MeshRef) -> Option<InstanceContainerId>;

    fn add_instance(&mut self, container: InstanceContainerId, transform: &PlacementTransform);
}

/// Where sampled points go, and how they are jittered.
#[derive(Debug, Clone, Copy)]
pub enum SpawnSink<'a> {
    /// One actor per point, yaw in `[0, rotation_range]`, scale in `[1, 1 + scale_range]`.
    Actor {
        class: &'a ResourceHandle,
        rotation_range: f32,
        scale_range: f32,
    },
    /// One instance per point, yaw in `[0, 360)`, scale growing with distance from the
    /// biome center.
    Instance { container: InstanceContainerId },
}

impl SpawnSink<'_> {
    pub fn mode(&self) -> ScatterMode {
        match self {
            SpawnSink::Actor { .. } => ScatterMode::Actor,
            SpawnSink::Instance { .. } => ScatterMode::Instance,
        }
    }
}

/// [`PlacementHost`] that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub actors: Vec<(ResourceRef, PlacementTransform)>,
    pub containers: Vec<MeshRef>,
    pub instances: Vec<(InstanceContainerId, PlacementTransform)>,
    /// When set, `spawn_actor` fails as if no world were available.
    pub world_missing: bool,
    /// When set, container creation fails.
    pub refuse_containers: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances added to `container`.
    pub fn instances_in(&self, container: InstanceContainerId) -> usize {
        self.instances.iter().filter(|(c, _)| *c == container).count()
    }

    /// Every recorded placement, actors first.
    pub fn all_transforms(&self) -> impl Iterator<Item = &PlacementTransform> {
        self.actors
            .iter()
            .map(|(_, t)| t)
            .chain(self.instances.iter().map(|(_, t)| t))
    }
}

impl PlacementHost for RecordingHost {
    fn spawn_actor(
        &mut self,
        class: &ResourceHandle,
        transform: &PlacementTransform,
    ) -> Result<ActorHandle> {
        if self.world_missing {
            return Err(Error::MissingContext("world".into()));
        }
        self.actors.push((class.reference.clone(), *transform));
        Ok(ActorHandle(self.actors.len() as u64 - 1))
    }

    fn create_instance_container(&mut self, mesh: &MeshRef) -> Option<InstanceContainerId> {
        if self.refuse_containers {
            return None;
        }
        self.containers.push(mesh.clone());
        Some(InstanceContainerId(self.containers.len() as u64 - 1))
    }

    fn add_instance(&mut self, container: InstanceContainerId, transform: &PlacementTransform) {
        self.instances.push((container, *transform));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn t() -> PlacementTransform {
        PlacementTransform {
            position: Vec3::ZERO,
            yaw_degrees: 0.0,
            scale: 1.0,
        }
    }

    #[test]
    fn recording_host_tracks_placements() {
        let mut host = RecordingHost::new();
        let class = ResourceHandle {
            reference: "tree".into(),
            id: 0,
        };
        assert_eq!(host.spawn_actor(&class, &t()).expect("spawn"), ActorHandle(0));
        let c = host
            .create_instance_container(&"grass".into())
            .expect("container");
        host.add_instance(c, &t());
        host.add_instance(c, &t());
        assert_eq!(host.instances_in(c), 2);
        assert_eq!(host.all_transforms().count(), 3);
    }

    #[test]
    fn missing_world_and_refused_containers_fail() {
        let mut host = RecordingHost {
            world_missing: true,
            refuse_containers: true,
            ..RecordingHost::default()
        };
        let class = ResourceHandle {
            reference: "tree".into(),
            id: 0,
        };
        assert!(host.spawn_actor(&class, &t()).is_err());
        assert!(host.create_instance_container(&"grass".into()).is_none());
    }

    #[test]
    fn sink_reports_mode() {
        let class = ResourceHandle {
            reference: "tree".into(),
            id: 0,
        };
        let a = SpawnSink::Actor {
            class: &class,
            rotation_range: 90.0,
            scale_range: 0.5,
        };
        assert_eq!(a.mode(), ScatterMode::Actor);
        let i = SpawnSink::Instance {
            container: InstanceContainerId(3),
        };
        assert_eq!(i.mode(), ScatterMode::Instance);
    }
}
