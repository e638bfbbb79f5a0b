//! Two-level biome sampling on the navigable surface.
//!
//! Each biome first draws a center within `biome_search_radius` of the origin, then a
//! count in `[0, per_biome_max]`, then that many points within `biome_scale` of the
//! center. Points are snapped to the placement grid and jittered according to the
//! [`SpawnSink`] they go to.
use glam::Vec3;
use tracing::{error, warn};

use crate::error::Result;
use crate::events::{EventSink, GenerationEvent, GenerationEventKind};
use crate::scatter::{
    NavigationQuery, PlacementHost, PlacementTransform, ScatterConfig, ScatterSummary, SpawnSink,
};
use crate::seed::SeedStream;

/// Instance scale at the biome center.
const INSTANCE_SCALE_NEAR: f32 = 0.8;
/// Instance scale at `biome_scale` from the center.
const INSTANCE_SCALE_FAR: f32 = 1.5;

/// Biome geometry shared by both descriptor kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeShape {
    pub biome_scale: f32,
    pub biome_count: u32,
    pub per_biome_max: u32,
}

/// Collaborators and counters threaded through one descriptor's placement.
pub struct SampleContext<'a> {
    pub navigation: &'a mut dyn NavigationQuery,
    pub seed: &'a mut SeedStream,
    pub host: &'a mut dyn PlacementHost,
    pub events: &'a mut dyn EventSink,
    pub summary: &'a mut ScatterSummary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavConstrainedSampler {
    /// Radius around the origin biome centers are drawn from.
    pub biome_search_radius: f32,
    /// Placement grid step on X and Y.
    pub grid_step: f32,
}

impl Default for NavConstrainedSampler {
    fn default() -> Self {
        Self::from_config(&ScatterConfig::default())
    }
}

fn safe_divide(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

impl NavConstrainedSampler {
    pub fn new(biome_search_radius: f32, grid_step: f32) -> Self {
        Self {
            biome_search_radius,
            grid_step,
        }
    }

    pub fn from_config(config: &ScatterConfig) -> Self {
        Self::new(config.biome_search_radius, config.grid_step)
    }

    /// Rounds X and Y to the nearest grid multiple (halves round up) and zeroes Z.
    pub fn snap(&self, p: Vec3) -> Vec3 {
        if self.grid_step <= 0.0 {
            return Vec3::new(p.x, p.y, 0.0);
        }
        let round = |v: f32| (v / self.grid_step + 0.5).floor() * self.grid_step;
        Vec3::new(round(p.x), round(p.y), 0.0)
    }

    /// Navigable biome center, or the origin when the query fails.
    ///
    /// The flag is `true` when the fallback was used.
    pub fn biome_center(
        &self,
        navigation: &mut dyn NavigationQuery,
        seed: &mut SeedStream,
    ) -> (Vec3, bool) {
        match navigation.random_point_in_navigable_radius(
            Vec3::ZERO,
            self.biome_search_radius,
            seed,
        ) {
            Some(p) => (p, false),
            None => (Vec3::ZERO, true),
        }
    }

    /// Navigable point near `center`, or an unconstrained point in the same disc.
    ///
    /// The flag is `true` when the fallback was used.
    pub fn item_position(
        &self,
        navigation: &mut dyn NavigationQuery,
        center: Vec3,
        biome_scale: f32,
        seed: &mut SeedStream,
    ) -> (Vec3, bool) {
        match navigation.random_point_in_navigable_radius(center, biome_scale, seed) {
            Some(p) => (p, false),
            None => (seed.point_in_disc(center, biome_scale), true),
        }
    }

    /// Snapped transform with jitter drawn for `sink`.
    pub fn transform_for(
        &self,
        sink: &SpawnSink<'_>,
        center: Vec3,
        raw: Vec3,
        biome_scale: f32,
        seed: &mut SeedStream,
    ) -> PlacementTransform {
        let (yaw_degrees, scale) = match *sink {
            SpawnSink::Actor {
                rotation_range,
                scale_range,
                ..
            } => {
                let yaw = seed.uniform_f32(0.0, rotation_range);
                let scale = seed.uniform_f32(1.0, 1.0 + scale_range);
                (yaw, scale)
            }
            SpawnSink::Instance { .. } => {
                let yaw = seed.unit() * 360.0;
                let t = safe_divide(center.distance(raw), biome_scale);
                let scale = INSTANCE_SCALE_NEAR + (INSTANCE_SCALE_FAR - INSTANCE_SCALE_NEAR) * t;
                (yaw, scale)
            }
        };
        PlacementTransform {
            position: self.snap(raw),
            yaw_degrees,
            scale,
        }
    }

    /// Places every biome of one descriptor into `sink`. Returns the number of placed items.
    ///
    /// A failing host aborts the remaining biomes of this descriptor.
    pub fn scatter_biomes(
        &self,
        ctx: &mut SampleContext<'_>,
        sink: SpawnSink<'_>,
        shape: BiomeShape,
        descriptor_index: usize,
    ) -> Result<usize> {
        let SampleContext {
            navigation,
            seed,
            host,
            events,
            summary,
        } = ctx;
        let mode = sink.mode();
        let per_biome_max = i32::try_from(shape.per_biome_max).unwrap_or(i32::MAX);
        let mut placed = 0;

        for biome_index in 0..shape.biome_count as usize {
            let (center, degraded) = self.biome_center(&mut **navigation, seed);
            if degraded {
                summary.degraded_biome_centers += 1;
                warn!(
                    "No navigable biome center for {} descriptor {}; using the origin.",
                    mode, descriptor_index
                );
                if events.wants(GenerationEventKind::Warning) {
                    events.send(GenerationEvent::warning(
                        format!("{mode}:{descriptor_index}"),
                        "biome center fell back to the origin",
                    ));
                }
            }

            let count = seed.uniform_i32(0, per_biome_max);
            for _ in 0..count {
                let (raw, fell_back) =
                    self.item_position(&mut **navigation, center, shape.biome_scale, seed);
                if fell_back {
                    summary.item_fallbacks += 1;
                    warn!("Navigation query failed; placing at an unconstrained point.");
                    if events.wants(GenerationEventKind::Warning) {
                        events.send(GenerationEvent::warning(
                            format!("{mode}:{descriptor_index}"),
                            "navigation query failed",
                        ));
                    }
                }

                let transform = self.transform_for(&sink, center, raw, shape.biome_scale, seed);
                match sink {
                    SpawnSink::Actor { class, .. } => {
                        if let Err(e) = host.spawn_actor(class, &transform) {
                            error!("Actor spawn for '{}' failed: {}", class.reference, e);
                            return Err(e);
                        }
                        summary.actors_spawned += 1;
                    }
                    SpawnSink::Instance { container } => {
                        host.add_instance(container, &transform);
                        summary.instances_added += 1;
                    }
                }
                placed += 1;

                if events.wants(GenerationEventKind::PlacementMade) {
                    events.send(GenerationEvent::PlacementMade {
                        mode,
                        descriptor_index,
                        biome_index,
                        transform,
                    });
                }
            }
        }
        Ok(placed)
    }
}
