//! Event types and sinks for observing island builds and scatter runs.
//!
//! This module defines [`GenerationEvent`] and a set of sinks and adapters to emit,
//! collect, or forward events while executing an
//! [`crate::island::IslandMeshBuilder`] build or driving a
//! [`crate::scatter::ScatterScheduler`]. The two completion notifications a host listens
//! for are [`GenerationEvent::IslandGenerationComplete`] and
//! [`GenerationEvent::SpawningComplete`].
use crossbeam_channel::Sender;
use glam::Vec3;

use crate::scatter::{PlacementTransform, ScatterMode, ScatterPhase, ScatterSummary};

/// Describes events emitted by island builds and scatter runs.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// Emitted before the first pipeline stage of an island build.
    IslandBuildStarted {
        /// Number of islands that will be generated.
        island_count: usize,
    },

    /// Emitted per recorded spawn point when spawn markers are enabled.
    SpawnMarkerPlaced {
        /// Index of the spawn point in the registry.
        index: usize,
        /// Ground position of the marker.
        position: Vec3,
    },

    /// Emitted once the island mesh is finished.
    IslandGenerationComplete {
        /// Number of spawn points recorded.
        island_count: usize,
        /// Vertices in the finished mesh.
        vertex_count: usize,
        /// Triangles in the finished mesh.
        triangle_count: usize,
    },

    /// Emitted when a scatter run starts.
    ScatterStarted {
        actor_descriptors: usize,
        instance_descriptors: usize,
    },

    /// Emitted when one async resource load completes.
    ResourceLoaded {
        /// Position of the resource in the load list.
        index: usize,
        /// Reference that finished loading.
        reference: String,
    },

    /// Emitted when every resource of the run is resolved.
    ResourcesReady {
        /// Number of resources that were loaded.
        count: usize,
    },

    /// Emitted on every scheduler phase transition.
    PhaseChanged { from: ScatterPhase, to: ScatterPhase },

    /// Emitted before a descriptor is scattered.
    DescriptorStarted { mode: ScatterMode, index: usize },

    /// Emitted after a descriptor is scattered.
    DescriptorFinished {
        mode: ScatterMode,
        index: usize,
        /// Items placed for this descriptor.
        placed: usize,
    },

    /// Emitted for each placed actor or instance.
    PlacementMade {
        mode: ScatterMode,
        descriptor_index: usize,
        biome_index: usize,
        transform: PlacementTransform,
    },

    /// Non-fatal warning generated during a build or a scatter run.
    Warning {
        /// Context string (e.g. descriptor, biome).
        context: String,
        /// Human-readable message.
        message: String,
    },

    /// Emitted once the scatter run reaches its terminal phase.
    SpawningComplete {
        /// Counters for the finished run.
        summary: ScatterSummary,
    },
}

/// Discriminant of [`GenerationEvent`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationEventKind {
    IslandBuildStarted,
    SpawnMarkerPlaced,
    IslandGenerationComplete,
    ScatterStarted,
    ResourceLoaded,
    ResourcesReady,
    PhaseChanged,
    DescriptorStarted,
    DescriptorFinished,
    PlacementMade,
    Warning,
    SpawningComplete,
}

impl GenerationEvent {
    pub fn kind(&self) -> GenerationEventKind {
        match self {
            GenerationEvent::IslandBuildStarted { .. } => GenerationEventKind::IslandBuildStarted,
            GenerationEvent::SpawnMarkerPlaced { .. } => GenerationEventKind::SpawnMarkerPlaced,
            GenerationEvent::IslandGenerationComplete { .. } => {
                GenerationEventKind::IslandGenerationComplete
            }
            GenerationEvent::ScatterStarted { .. } => GenerationEventKind::ScatterStarted,
            GenerationEvent::ResourceLoaded { .. } => GenerationEventKind::ResourceLoaded,
            GenerationEvent::ResourcesReady { .. } => GenerationEventKind::ResourcesReady,
            GenerationEvent::PhaseChanged { .. } => GenerationEventKind::PhaseChanged,
            GenerationEvent::DescriptorStarted { .. } => GenerationEventKind::DescriptorStarted,
            GenerationEvent::DescriptorFinished { .. } => GenerationEventKind::DescriptorFinished,
            GenerationEvent::PlacementMade { .. } => GenerationEventKind::PlacementMade,
            GenerationEvent::Warning { .. } => GenerationEventKind::Warning,
            GenerationEvent::SpawningComplete { .. } => GenerationEventKind::SpawningComplete,
        }
    }

    pub(crate) fn warning(context: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationEvent::Warning {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// A generic event sink that accepts [`GenerationEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: GenerationEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: GenerationEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = GenerationEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: GenerationEvent) {}

    #[inline]
    fn wants(&self, _kind: GenerationEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(GenerationEvent),
{
    #[inline]
    fn send(&mut self, event: GenerationEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<GenerationEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
        }
    }

    pub fn into_inner(self) -> Vec<GenerationEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[GenerationEvent] {
        &self.events
    }

    /// Number of collected events of the given kind.
    pub fn count(&self, kind: GenerationEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: GenerationEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: GenerationEvent) {
        if self.sinks.is_empty() {
            return;
        }
        let last_idx = self.sinks.len() - 1;
        for i in 0..last_idx {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last_idx].send(event);
    }

    fn wants(&self, kind: GenerationEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

/// Event sink that forwards events over a channel, e.g. from a background build thread.
pub struct ChannelSink {
    pub tx: Sender<GenerationEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<GenerationEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    #[inline]
    fn send(&mut self, event: GenerationEvent) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(ctx: &str) -> GenerationEvent {
        GenerationEvent::warning(ctx, "msg")
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::with_capacity(2);
        assert!(sink.is_empty());
        sink.send(warning("a"));
        sink.send(GenerationEvent::ResourcesReady { count: 0 });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(GenerationEventKind::Warning), 1);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn unit_sink_wants_nothing() {
        let sink = ();
        assert!(!sink.wants(GenerationEventKind::SpawningComplete));
    }

    #[test]
    fn multi_sink_fans_out_events() {
        let mut multi = MultiSink::with_sinks(vec![VecSink::new(), VecSink::new()]);
        multi.send(warning("ctx"));
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.sinks[0].len(), 1);
        assert_eq!(multi.sinks[1].len(), 1);
        assert!(matches!(
            multi.sinks[0].as_slice()[0],
            GenerationEvent::Warning { .. }
        ));
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(warning("ctx"));
        sink.send_many([warning("a"), warning("b")]);
        assert_eq!(count, 3);
    }

    #[test]
    fn channel_sink_forwards_and_tolerates_closed_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = ChannelSink::new(tx);
        sink.send(warning("ctx"));
        assert!(matches!(rx.try_recv(), Ok(GenerationEvent::Warning { .. })));
        drop(rx);
        sink.send(warning("late"));
    }
}
