//! Polling scatter state machine.
//!
//! The scheduler is driven by [`ScatterScheduler::tick`] with the elapsed time since the
//! previous tick. Loading is polled every tick; once loading is done a repeating poll
//! timer fires every `poll_interval`. Each fire checks the readiness gate (resources
//! loaded and navigation idle) and, when it holds, scatters exactly one descriptor.
//!
//! ```text
//! Idle -> LoadingResources -> WaitingForNavReady -> ScatteringActors
//!      -> ScatteringInstances -> Done
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::{EventSink, GenerationEvent, GenerationEventKind};
use crate::scatter::{
    ActorDescriptor, AsyncResourceLoader, InstanceDescriptor, LoadProgress,
    NavConstrainedSampler, NavigationQuery, PlacementHost, ResourceLoader, SampleContext,
    ScatterConfig, ScatterMode, ScatterPhase, ScatterSummary, SpawnSink,
};
use crate::seed::SeedStream;

/// Host collaborators for one tick.
pub struct ScatterEnv<'a> {
    pub loader: &'a mut dyn ResourceLoader,
    /// `None` while the host has no navigation system; the scheduler holds.
    pub navigation: Option<&'a mut dyn NavigationQuery>,
    pub host: &'a mut dyn PlacementHost,
    pub events: &'a mut dyn EventSink,
}

/// Cloneable cancellation flag, honored on the next tick.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Progress of one scatter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterState {
    /// Resources loaded so far.
    pub load_cursor: usize,
    pub loaded: bool,
    pub mode: ScatterMode,
    /// Next descriptor of the current mode.
    pub descriptor_cursor: usize,
    /// Biomes finished for the last processed descriptor.
    pub biome_index: usize,
    /// Items placed in this run.
    pub spawned_count: usize,
}

impl Default for ScatterState {
    fn default() -> Self {
        Self {
            load_cursor: 0,
            loaded: false,
            mode: ScatterMode::Actor,
            descriptor_cursor: 0,
            biome_index: 0,
            spawned_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PollTimer {
    interval: f32,
    remaining: f32,
    active: bool,
}

impl PollTimer {
    fn arm(&mut self, first_delay: f32, interval: f32) {
        self.interval = interval;
        self.remaining = first_delay;
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
        self.remaining = 0.0;
    }

    /// Number of fires due after `dt` more time units, at most `max_fires`.
    ///
    /// Fires beyond the cap are dropped; the timer keeps its phase.
    fn advance(&mut self, dt: f32, max_fires: u32) -> u32 {
        if !self.active || self.interval <= 0.0 {
            return 0;
        }
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return 0;
        }
        let overdue = -self.remaining;
        let due = ((overdue / self.interval).floor() as u32).saturating_add(1);
        let into_period = overdue.rem_euclid(self.interval);
        self.remaining = (self.interval - into_period).clamp(f32::MIN_POSITIVE, self.interval);
        due.min(max_fires.max(1))
    }
}

fn set_phase(phase: &mut ScatterPhase, to: ScatterPhase, events: &mut dyn EventSink) {
    let from = *phase;
    if from == to {
        return;
    }
    *phase = to;
    info!("Scatter phase: {from} -> {to}.");
    if events.wants(GenerationEventKind::PhaseChanged) {
        events.send(GenerationEvent::PhaseChanged { from, to });
    }
}

fn warn_event(events: &mut dyn EventSink, context: String, message: String) {
    if events.wants(GenerationEventKind::Warning) {
        events.send(GenerationEvent::warning(context, message));
    }
}

/// Drives one scatter run at a time.
pub struct ScatterScheduler {
    config: ScatterConfig,
    sampler: NavConstrainedSampler,
    loader: AsyncResourceLoader,
    phase: ScatterPhase,
    state: Option<ScatterState>,
    seed: Option<SeedStream>,
    timer: PollTimer,
    summary: ScatterSummary,
    cancel: CancelHandle,
    paused: bool,
    elapsed: f32,
}

impl ScatterScheduler {
    /// Creates a scheduler after validating `config`.
    pub fn try_new(config: ScatterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn new(config: ScatterConfig) -> Self {
        debug_assert!(config.poll_interval > 0.0, "poll_interval must be > 0");
        debug_assert!(config.grid_step > 0.0, "grid_step must be > 0");
        Self {
            sampler: NavConstrainedSampler::from_config(&config),
            loader: AsyncResourceLoader::new(config.load_timeout),
            config,
            phase: ScatterPhase::Idle,
            state: None,
            seed: None,
            timer: PollTimer::default(),
            summary: ScatterSummary::default(),
            cancel: CancelHandle::default(),
            paused: false,
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &ScatterConfig {
        &self.config
    }

    pub fn phase(&self) -> ScatterPhase {
        self.phase
    }

    /// Progress of the active run; `None` when idle or finished.
    pub fn state(&self) -> Option<&ScatterState> {
        self.state.as_ref()
    }

    pub fn summary(&self) -> ScatterSummary {
        self.summary
    }

    /// Time advanced since the run started, excluding paused ticks.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspends the run; ticks do nothing until [`ScatterScheduler::resume`].
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Starts a fresh run, discarding any previous one.
    pub fn start(&mut self, seed: SeedStream, env: &mut ScatterEnv<'_>) {
        if !matches!(self.phase, ScatterPhase::Idle | ScatterPhase::Done) {
            info!("Restarting scatter run from {}; previous state discarded.", self.phase);
        }
        self.phase = ScatterPhase::Idle;
        self.state = Some(ScatterState::default());
        self.seed = Some(seed);
        self.summary = ScatterSummary::default();
        self.timer.stop();
        self.cancel.clear();
        self.paused = false;
        self.elapsed = 0.0;

        if env.events.wants(GenerationEventKind::ScatterStarted) {
            env.events.send(GenerationEvent::ScatterStarted {
                actor_descriptors: self.config.actors.len(),
                instance_descriptors: self.config.instances.len(),
            });
        }
        set_phase(&mut self.phase, ScatterPhase::LoadingResources, &mut *env.events);

        let references = self
            .config
            .actors
            .iter()
            .map(|a| a.resource.clone())
            .collect();
        self.loader.start(references, &mut *env.loader);
        if self.loader.is_empty() {
            warn_event(
                &mut *env.events,
                "loader".into(),
                "resource list is empty".into(),
            );
        }
    }

    /// Stops the run immediately. The timer is stopped and the run state discarded.
    pub fn cancel(&mut self) {
        if matches!(self.phase, ScatterPhase::Idle | ScatterPhase::Done) {
            return;
        }
        info!("Scatter run cancelled in {}.", self.phase);
        self.discard();
        self.phase = ScatterPhase::Idle;
    }

    fn discard(&mut self) {
        self.timer.stop();
        self.loader.reset();
        self.state = None;
        self.seed = None;
    }

    /// Advances the run by `dt` time units and returns the phase afterwards.
    ///
    /// A negative or non-finite `dt` is treated as zero and reported as a warning.
    pub fn tick(&mut self, dt: f32, env: &mut ScatterEnv<'_>) -> Result<ScatterPhase> {
        if matches!(self.phase, ScatterPhase::Idle | ScatterPhase::Done) {
            return Ok(self.phase);
        }
        if self.cancel.is_cancelled() {
            info!("Scatter run cancelled in {}.", self.phase);
            self.discard();
            set_phase(&mut self.phase, ScatterPhase::Idle, &mut *env.events);
            return Err(Error::Cancelled);
        }
        if self.paused {
            return Ok(self.phase);
        }
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!("Ignoring invalid tick delta {dt}.");
            warn_event(
                &mut *env.events,
                "scheduler".into(),
                format!("invalid tick delta {dt}"),
            );
            0.0
        };
        self.elapsed += dt;

        if self.phase == ScatterPhase::LoadingResources {
            self.poll_loader(dt, env)?;
            return Ok(self.phase);
        }

        let fires = self.timer.advance(dt, self.max_fires_per_tick());
        for _ in 0..fires {
            self.on_poll(env);
            if !self.timer.active {
                break;
            }
        }
        if self.phase == ScatterPhase::Done {
            self.state = None;
            self.seed = None;
        }
        Ok(self.phase)
    }

    /// Catch-up bound: enough fires to pass the gate and every descriptor.
    fn max_fires_per_tick(&self) -> u32 {
        let steps = self.config.actors.len() + self.config.instances.len() + 2;
        u32::try_from(steps).unwrap_or(u32::MAX)
    }

    /// Ticks until the run is done, giving up after `max_ticks`.
    pub fn run_until_done(
        &mut self,
        env: &mut ScatterEnv<'_>,
        dt: f32,
        max_ticks: usize,
    ) -> Result<ScatterSummary> {
        if self.phase == ScatterPhase::Idle {
            return Err(Error::MissingContext("scatter run not started".into()));
        }
        for _ in 0..max_ticks {
            if self.tick(dt, env)? == ScatterPhase::Done {
                return Ok(self.summary);
            }
        }
        if self.phase == ScatterPhase::Done {
            return Ok(self.summary);
        }
        Err(Error::DeadlineExceeded {
            phase: self.phase,
            elapsed: self.elapsed,
        })
    }

    fn poll_loader(&mut self, dt: f32, env: &mut ScatterEnv<'_>) -> Result<()> {
        let progress = match self.loader.poll(dt, &mut *env.loader) {
            Ok(progress) => progress,
            Err(e) => {
                error!("Resource loading failed: {e}");
                self.discard();
                set_phase(&mut self.phase, ScatterPhase::Idle, &mut *env.events);
                return Err(e);
            }
        };
        for p in progress {
            match p {
                LoadProgress::Loaded { index, reference } => {
                    if let Some(state) = self.state.as_mut() {
                        state.load_cursor = index + 1;
                    }
                    if env.events.wants(GenerationEventKind::ResourceLoaded) {
                        env.events.send(GenerationEvent::ResourceLoaded {
                            index,
                            reference: reference.to_string(),
                        });
                    }
                }
                LoadProgress::Complete => {
                    if let Some(state) = self.state.as_mut() {
                        state.loaded = true;
                    }
                    if env.events.wants(GenerationEventKind::ResourcesReady) {
                        env.events.send(GenerationEvent::ResourcesReady {
                            count: self.loader.len(),
                        });
                    }
                    set_phase(
                        &mut self.phase,
                        ScatterPhase::WaitingForNavReady,
                        &mut *env.events,
                    );
                    self.timer
                        .arm(self.config.first_poll_delay(), self.config.poll_interval);
                }
            }
        }
        Ok(())
    }

    /// One timer fire: check the gate, then scatter at most one descriptor.
    fn on_poll(&mut self, env: &mut ScatterEnv<'_>) {
        let ScatterEnv {
            loader,
            navigation,
            host,
            events,
        } = env;

        let Some(nav) = navigation.as_deref_mut() else {
            let err = Error::MissingContext("navigation system".into());
            error!("Cannot scatter: {err}.");
            warn_event(&mut **events, "navigation".into(), err.to_string());
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if !state.loaded || nav.is_navigation_building_or_locked() {
            debug!("Not ready to scatter (loaded: {}).", state.loaded);
            return;
        }
        let Some(seed) = self.seed.as_mut() else {
            error!("Cannot scatter: {}.", Error::MissingContext("seed".into()));
            return;
        };

        if self.phase == ScatterPhase::WaitingForNavReady {
            set_phase(&mut self.phase, ScatterPhase::ScatteringActors, &mut **events);
        }

        let mut ctx = SampleContext {
            navigation: nav,
            seed,
            host: &mut **host,
            events: &mut **events,
            summary: &mut self.summary,
        };

        loop {
            match state.mode {
                ScatterMode::Actor => {
                    let len = self.config.actors.len();
                    if len > 0 {
                        let index = state.descriptor_cursor;
                        match self.config.actors.get(index) {
                            Some(d) => scatter_actor(
                                &self.sampler,
                                d,
                                index,
                                &mut **loader,
                                &mut ctx,
                                state,
                            ),
                            None => report_out_of_range(ScatterMode::Actor, index, len, &mut ctx),
                        }
                        state.descriptor_cursor += 1;
                        if state.descriptor_cursor < len {
                            return;
                        }
                    }
                    state.descriptor_cursor = 0;
                    state.mode = ScatterMode::Instance;
                    set_phase(
                        &mut self.phase,
                        ScatterPhase::ScatteringInstances,
                        &mut *ctx.events,
                    );
                    if len > 0 {
                        return;
                    }
                }
                ScatterMode::Instance => {
                    let len = self.config.instances.len();
                    if len > 0 {
                        let index = state.descriptor_cursor;
                        match self.config.instances.get(index) {
                            Some(d) => scatter_instance(&self.sampler, d, index, &mut ctx, state),
                            None => {
                                report_out_of_range(ScatterMode::Instance, index, len, &mut ctx)
                            }
                        }
                        state.descriptor_cursor += 1;
                        if state.descriptor_cursor < len {
                            return;
                        }
                    }
                    self.timer.stop();
                    set_phase(&mut self.phase, ScatterPhase::Done, &mut *ctx.events);
                    let summary = *ctx.summary;
                    info!(
                        "Spawning complete | actors: {} | instances: {} | containers: {} | skipped: {}.",
                        summary.actors_spawned,
                        summary.instances_added,
                        summary.containers_created,
                        summary.skipped_descriptors
                    );
                    if ctx.events.wants(GenerationEventKind::SpawningComplete) {
                        ctx.events
                            .send(GenerationEvent::SpawningComplete { summary });
                    }
                    return;
                }
            }
        }
    }
}

fn report_out_of_range(mode: ScatterMode, index: usize, len: usize, ctx: &mut SampleContext<'_>) {
    let err = Error::IndexOutOfRange {
        mode: mode.as_str(),
        index,
        len,
    };
    error!("Scatter step aborted: {err}.");
    warn_event(&mut *ctx.events, format!("{mode}:{index}"), err.to_string());
    ctx.summary.skipped_descriptors += 1;
}

fn descriptor_started(ctx: &mut SampleContext<'_>, mode: ScatterMode, index: usize) {
    if ctx.events.wants(GenerationEventKind::DescriptorStarted) {
        ctx.events
            .send(GenerationEvent::DescriptorStarted { mode, index });
    }
}

fn descriptor_finished(
    ctx: &mut SampleContext<'_>,
    state: &mut ScatterState,
    mode: ScatterMode,
    index: usize,
    placed: usize,
    biomes: u32,
) {
    state.biome_index = biomes as usize;
    state.spawned_count = ctx.summary.placed();
    if ctx.events.wants(GenerationEventKind::DescriptorFinished) {
        ctx.events.send(GenerationEvent::DescriptorFinished {
            mode,
            index,
            placed,
        });
    }
}

fn skip_descriptor(ctx: &mut SampleContext<'_>, mode: ScatterMode, index: usize, err: &Error) {
    error!("Skipping {mode} descriptor {index}: {err}.");
    warn_event(&mut *ctx.events, format!("{mode}:{index}"), err.to_string());
    ctx.summary.skipped_descriptors += 1;
}

fn scatter_actor(
    sampler: &NavConstrainedSampler,
    d: &ActorDescriptor,
    index: usize,
    loader: &mut dyn ResourceLoader,
    ctx: &mut SampleContext<'_>,
    state: &mut ScatterState,
) {
    let mode = ScatterMode::Actor;
    descriptor_started(ctx, mode, index);
    let Some(class) = loader.load_synchronous(&d.resource) else {
        let err = Error::MissingResource {
            reference: d.resource.to_string(),
        };
        skip_descriptor(ctx, mode, index, &err);
        descriptor_finished(ctx, state, mode, index, 0, 0);
        return;
    };
    let sink = SpawnSink::Actor {
        class: &class,
        rotation_range: d.rotation_range,
        scale_range: d.scale_range,
    };
    let before = ctx.summary.actors_spawned;
    let result = sampler.scatter_biomes(ctx, sink, d.shape(), index);
    let placed = ctx.summary.actors_spawned - before;
    match result {
        Ok(_) => descriptor_finished(ctx, state, mode, index, placed, d.biome_count),
        Err(e) => {
            skip_descriptor(ctx, mode, index, &e);
            descriptor_finished(ctx, state, mode, index, placed, 0);
        }
    }
}

fn scatter_instance(
    sampler: &NavConstrainedSampler,
    d: &InstanceDescriptor,
    index: usize,
    ctx: &mut SampleContext<'_>,
    state: &mut ScatterState,
) {
    let mode = ScatterMode::Instance;
    descriptor_started(ctx, mode, index);
    let Some(container) = ctx.host.create_instance_container(&d.mesh) else {
        let err = Error::MissingContext(format!("instance container for '{}'", d.mesh));
        skip_descriptor(ctx, mode, index, &err);
        descriptor_finished(ctx, state, mode, index, 0, 0);
        return;
    };
    ctx.summary.containers_created += 1;
    let before = ctx.summary.instances_added;
    let result = sampler.scatter_biomes(ctx, SpawnSink::Instance { container }, d.shape(), index);
    let placed = ctx.summary.instances_added - before;
    match result {
        Ok(_) => descriptor_finished(ctx, state, mode, index, placed, d.biome_count),
        Err(e) => {
            skip_descriptor(ctx, mode, index, &e);
            descriptor_finished(ctx, state, mode, index, placed, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::events::VecSink;
    use crate::scatter::{
        FlatNavigation, InMemoryLoader, LoadCompletion, RecordingHost, ResourceHandle, ResourceRef,
    };

    struct World {
        loader: InMemoryLoader,
        nav: FlatNavigation,
        host: RecordingHost,
        events: VecSink,
        has_nav: bool,
    }

    impl World {
        fn new() -> Self {
            Self {
                loader: InMemoryLoader::new()
                    .with_resource("tree", 1)
                    .with_resource("rock", 2),
                nav: FlatNavigation::new().with_disc(Vec3::ZERO, 5000.0),
                host: RecordingHost::new(),
                events: VecSink::new(),
                has_nav: true,
            }
        }

        fn env(&mut self) -> ScatterEnv<'_> {
            ScatterEnv {
                loader: &mut self.loader,
                navigation: if self.has_nav {
                    Some(&mut self.nav)
                } else {
                    None
                },
                host: &mut self.host,
                events: &mut self.events,
            }
        }

        fn phases(&self) -> Vec<ScatterPhase> {
            self.events
                .as_slice()
                .iter()
                .filter_map(|e| match e {
                    GenerationEvent::PhaseChanged { to, .. } => Some(*to),
                    _ => None,
                })
                .collect()
        }
    }

    fn config() -> ScatterConfig {
        ScatterConfig::new()
            .with_actor(ActorDescriptor::new("tree").with_biomes(800.0, 2, 4))
            .with_actor(ActorDescriptor::new("rock").with_biomes(500.0, 1, 3))
            .with_instance(InstanceDescriptor::new("grass").with_biomes(600.0, 3, 5))
            .with_instance(InstanceDescriptor::new("flowers").with_biomes(300.0, 1, 2))
    }

    fn tick(s: &mut ScatterScheduler, w: &mut World, dt: f32) -> ScatterPhase {
        s.tick(dt, &mut w.env()).expect("tick")
    }

    #[test]
    fn full_run_visits_every_phase_in_order() {
        let mut w = World::new();
        let mut s = ScatterScheduler::try_new(config()).expect("config");
        s.start(SeedStream::new(1), &mut w.env());
        let summary = s.run_until_done(&mut w.env(), 0.25, 200).expect("done");

        assert_eq!(
            w.phases(),
            vec![
                ScatterPhase::LoadingResources,
                ScatterPhase::WaitingForNavReady,
                ScatterPhase::ScatteringActors,
                ScatterPhase::ScatteringInstances,
                ScatterPhase::Done,
            ]
        );
        assert_eq!(summary.containers_created, 2);
        assert_eq!(summary.actors_spawned, w.host.actors.len());
        assert_eq!(summary.instances_added, w.host.instances.len());
        assert_eq!(w.events.count(GenerationEventKind::ResourceLoaded), 2);
        assert_eq!(w.events.count(GenerationEventKind::SpawningComplete), 1);
        assert!(s.state().is_none());
    }

    #[test]
    fn mode_switch_happens_once_between_lists() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(2), &mut w.env());
        s.run_until_done(&mut w.env(), 0.5, 200).expect("done");

        let events = w.events.as_slice();
        let switch: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                matches!(
                    e,
                    GenerationEvent::PhaseChanged {
                        to: ScatterPhase::ScatteringInstances,
                        ..
                    }
                )
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(switch.len(), 1);
        let last_actor = events
            .iter()
            .rposition(|e| {
                matches!(
                    e,
                    GenerationEvent::DescriptorFinished {
                        mode: ScatterMode::Actor,
                        index: 1,
                        ..
                    }
                )
            })
            .expect("actor finished");
        let first_instance = events
            .iter()
            .position(|e| {
                matches!(
                    e,
                    GenerationEvent::DescriptorStarted {
                        mode: ScatterMode::Instance,
                        index: 0
                    }
                )
            })
            .expect("instance started");
        assert!(last_actor < switch[0] && switch[0] < first_instance);
    }

    #[test]
    fn never_scatters_while_navigation_is_busy() {
        let mut w = World::new();
        w.nav.set_building(true);
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(3), &mut w.env());
        for _ in 0..40 {
            let phase = tick(&mut s, &mut w, 0.5);
            assert!(!phase.is_scattering());
        }
        assert_eq!(s.phase(), ScatterPhase::WaitingForNavReady);
        assert!(w.host.actors.is_empty());

        w.nav.set_building(false);
        tick(&mut s, &mut w, 0.5);
        assert_eq!(s.phase(), ScatterPhase::ScatteringActors);
    }

    #[test]
    fn never_scatters_before_resources_load() {
        let mut w = World::new();
        w.loader = InMemoryLoader::new()
            .with_resource("tree", 30)
            .with_resource("rock", 1);
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(4), &mut w.env());
        for _ in 0..20 {
            assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::LoadingResources);
            assert!(!s.state().expect("state").loaded);
        }
        assert!(w.host.actors.is_empty());
    }

    #[test]
    fn one_descriptor_per_poll_after_first_interval() {
        let mut w = World::new();
        w.loader = InMemoryLoader::new()
            .with_resource("tree", 0)
            .with_resource("rock", 0);
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(5), &mut w.env());
        assert_eq!(tick(&mut s, &mut w, 0.1), ScatterPhase::WaitingForNavReady);
        // Negative first delay means the first fire comes one interval later.
        assert_eq!(tick(&mut s, &mut w, 0.25), ScatterPhase::WaitingForNavReady);
        assert_eq!(tick(&mut s, &mut w, 0.25), ScatterPhase::ScatteringActors);
        assert_eq!(s.state().expect("state").descriptor_cursor, 1);
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::ScatteringInstances);
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::ScatteringInstances);
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::Done);
    }

    #[test]
    fn zero_per_biome_max_still_advances() {
        let mut w = World::new();
        let cfg = ScatterConfig::new()
            .with_actor(ActorDescriptor::new("tree").with_biomes(800.0, 3, 0))
            .with_instance(InstanceDescriptor::new("grass").with_biomes(800.0, 3, 0));
        let mut s = ScatterScheduler::new(cfg);
        s.start(SeedStream::new(6), &mut w.env());
        let summary = s.run_until_done(&mut w.env(), 0.5, 50).expect("done");
        assert_eq!(summary.placed(), 0);
        assert_eq!(summary.containers_created, 1);
        assert_eq!(w.events.count(GenerationEventKind::DescriptorFinished), 2);
    }

    #[test]
    fn empty_lists_complete_on_first_poll() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(ScatterConfig::new());
        s.start(SeedStream::new(7), &mut w.env());
        assert_eq!(tick(&mut s, &mut w, 0.0), ScatterPhase::WaitingForNavReady);
        assert!(w.loader.requests.is_empty());
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::Done);
        assert_eq!(
            w.phases(),
            vec![
                ScatterPhase::LoadingResources,
                ScatterPhase::WaitingForNavReady,
                ScatterPhase::ScatteringActors,
                ScatterPhase::ScatteringInstances,
                ScatterPhase::Done,
            ]
        );
        assert!(w.events.count(GenerationEventKind::Warning) >= 1);
    }

    #[test]
    fn placements_snap_to_grid() {
        let mut w = World::new();
        let cfg = config().with_grid_step(150.0);
        let mut s = ScatterScheduler::new(cfg);
        s.start(SeedStream::new(8), &mut w.env());
        s.run_until_done(&mut w.env(), 0.5, 100).expect("done");
        assert!(w.host.all_transforms().count() > 0);
        for t in w.host.all_transforms() {
            assert_eq!((t.position.x / 150.0).fract(), 0.0);
            assert_eq!((t.position.y / 150.0).fract(), 0.0);
            assert_eq!(t.position.z, 0.0);
        }
    }

    #[test]
    fn same_seed_reproduces_run() {
        let run = |seed: u64| {
            let mut w = World::new();
            let mut s = ScatterScheduler::new(config());
            s.start(SeedStream::new(seed), &mut w.env());
            s.run_until_done(&mut w.env(), 0.5, 100).expect("done");
            (w.host.actors, w.host.instances)
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn cancel_handle_stops_run_on_next_tick() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(config());
        let handle = s.cancel_handle();
        s.start(SeedStream::new(10), &mut w.env());
        tick(&mut s, &mut w, 0.5);
        handle.cancel();
        let err = s.tick(0.5, &mut w.env()).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(s.phase(), ScatterPhase::Idle);
        assert!(s.state().is_none());
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::Idle);
    }

    #[test]
    fn direct_cancel_discards_state() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(11), &mut w.env());
        s.cancel();
        assert_eq!(s.phase(), ScatterPhase::Idle);
        assert!(s.state().is_none());
        assert!(matches!(
            s.run_until_done(&mut w.env(), 0.5, 10),
            Err(Error::MissingContext(_))
        ));
    }

    #[test]
    fn pause_freezes_progress() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(12), &mut w.env());
        s.pause();
        for _ in 0..10 {
            assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::LoadingResources);
        }
        assert_eq!(s.elapsed(), 0.0);
        s.resume();
        assert!(s.run_until_done(&mut w.env(), 0.5, 100).is_ok());
    }

    #[test]
    fn unknown_resource_times_out() {
        let mut w = World::new();
        let cfg = ScatterConfig::new()
            .with_actor(ActorDescriptor::new("ghost"))
            .with_load_timeout(Some(2.0));
        let mut s = ScatterScheduler::try_new(cfg).expect("config");
        s.start(SeedStream::new(13), &mut w.env());
        let err = s.run_until_done(&mut w.env(), 0.5, 100).unwrap_err();
        assert!(matches!(err, Error::LoadTimeout { .. }));
        assert_eq!(s.phase(), ScatterPhase::Idle);
    }

    #[test]
    fn unavailable_navigation_holds_until_deadline() {
        let mut w = World::new();
        w.has_nav = false;
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(14), &mut w.env());
        let err = s.run_until_done(&mut w.env(), 0.5, 20).unwrap_err();
        assert!(matches!(
            err,
            Error::DeadlineExceeded {
                phase: ScatterPhase::WaitingForNavReady,
                ..
            }
        ));
        assert!(w.events.count(GenerationEventKind::Warning) > 0);
    }

    struct SyncFailLoader;

    impl ResourceLoader for SyncFailLoader {
        fn request_async_load(&mut self, _: &ResourceRef, on_complete: LoadCompletion) {
            on_complete.complete();
        }

        fn load_synchronous(&mut self, _: &ResourceRef) -> Option<ResourceHandle> {
            None
        }
    }

    #[test]
    fn missing_resource_skips_descriptor() {
        let mut w = World::new();
        let mut loader = SyncFailLoader;
        let mut s = ScatterScheduler::new(config());
        let mut env = ScatterEnv {
            loader: &mut loader,
            navigation: Some(&mut w.nav),
            host: &mut w.host,
            events: &mut w.events,
        };
        s.start(SeedStream::new(15), &mut env);
        let summary = s.run_until_done(&mut env, 0.5, 100).expect("done");
        assert_eq!(summary.skipped_descriptors, 2);
        assert_eq!(summary.actors_spawned, 0);
        assert_eq!(summary.containers_created, 2);
    }

    #[test]
    fn refused_container_skips_instance_descriptor() {
        let mut w = World::new();
        w.host.refuse_containers = true;
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(16), &mut w.env());
        let summary = s.run_until_done(&mut w.env(), 0.5, 100).expect("done");
        assert_eq!(summary.instances_added, 0);
        assert_eq!(summary.skipped_descriptors, 2);
        assert_eq!(s.phase(), ScatterPhase::Done);
    }

    #[test]
    fn restart_resets_summary() {
        let mut w = World::new();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(17), &mut w.env());
        let first = s.run_until_done(&mut w.env(), 0.5, 100).expect("done");
        s.start(SeedStream::new(17), &mut w.env());
        assert_eq!(s.summary(), ScatterSummary::default());
        let second = s.run_until_done(&mut w.env(), 0.5, 100).expect("done");
        assert_eq!(first, second);
    }

    fn zero_latency_world() -> World {
        let mut w = World::new();
        w.loader = InMemoryLoader::new()
            .with_resource("tree", 0)
            .with_resource("rock", 0);
        w
    }

    fn warnings(w: &World) -> Vec<(String, String)> {
        w.events
            .as_slice()
            .iter()
            .filter_map(|e| match e {
                GenerationEvent::Warning { context, message } => {
                    Some((context.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn invalid_tick_delta_is_ignored_with_warning() {
        let mut w = zero_latency_world();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(18), &mut w.env());
        assert_eq!(tick(&mut s, &mut w, 0.0), ScatterPhase::WaitingForNavReady);

        for dt in [f32::NAN, f32::INFINITY, -3.0] {
            assert_eq!(tick(&mut s, &mut w, dt), ScatterPhase::WaitingForNavReady);
        }
        assert_eq!(s.elapsed(), 0.0);
        let warned = warnings(&w);
        assert_eq!(warned.len(), 3);
        assert!(warned.iter().all(|(context, _)| context == "scheduler"));
        assert!(warned[0].1.contains("invalid tick delta"));

        let summary = s.run_until_done(&mut w.env(), 0.5, 10).expect("done");
        assert_eq!(summary.containers_created, 2);
    }

    #[test]
    fn huge_tick_delta_finishes_in_one_tick() {
        let mut w = zero_latency_world();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(19), &mut w.env());
        assert_eq!(tick(&mut s, &mut w, 0.0), ScatterPhase::WaitingForNavReady);
        assert_eq!(tick(&mut s, &mut w, 1.0e9), ScatterPhase::Done);
        assert_eq!(w.events.count(GenerationEventKind::DescriptorFinished), 4);
        assert_eq!(w.events.count(GenerationEventKind::SpawningComplete), 1);
    }

    #[test]
    fn poll_timer_catch_up_is_bounded() {
        let mut timer = PollTimer::default();
        timer.arm(1.0e-6, 1.0e-6);
        assert_eq!(timer.advance(1.0e30, 8), 8);
        assert!(timer.remaining > 0.0 && timer.remaining <= timer.interval);

        timer.arm(0.5, 0.5);
        assert_eq!(timer.advance(0.25, 8), 0);
        assert_eq!(timer.advance(1.25, 8), 3);
        assert_eq!(timer.remaining, 0.5);

        timer.stop();
        assert_eq!(timer.advance(10.0, 8), 0);
    }

    #[test]
    fn out_of_range_cursor_skips_to_next_mode() {
        let mut w = zero_latency_world();
        let mut s = ScatterScheduler::new(config());
        s.start(SeedStream::new(20), &mut w.env());
        assert_eq!(tick(&mut s, &mut w, 0.0), ScatterPhase::WaitingForNavReady);
        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::ScatteringActors);
        s.state.as_mut().expect("state").descriptor_cursor = 5;

        assert_eq!(tick(&mut s, &mut w, 0.5), ScatterPhase::ScatteringInstances);
        assert_eq!(s.summary().skipped_descriptors, 1);
        let state = s.state().expect("state");
        assert_eq!(state.mode, ScatterMode::Instance);
        assert_eq!(state.descriptor_cursor, 0);
        let out_of_range: Vec<_> = warnings(&w)
            .into_iter()
            .filter(|(_, message)| message.contains("out of range"))
            .collect();
        assert_eq!(out_of_range.len(), 1);
        assert!(out_of_range[0].1.contains("index 5 out of range (len 2)"));

        let summary = s.run_until_done(&mut w.env(), 0.5, 10).expect("done");
        assert_eq!(summary.skipped_descriptors, 1);
    }
}
