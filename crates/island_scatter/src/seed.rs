//! Deterministic random stream shared by island building and scattering.
//!
//! A [`SeedStream`] is created once per run from a [`SeedProvider`] and threaded by
//! mutable reference through every stage that draws randomness. It is never reseeded
//! mid-run, so two runs with the same seed and configuration draw identical sequences.
use std::fmt;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maximum rejection rounds for [`SeedStream::unit_vector`] before falling back to +X.
const UNIT_VECTOR_MAX_ROUNDS: usize = 64;

/// Seeded pseudo-random stream.
pub struct SeedStream {
    initial_seed: u64,
    rng: StdRng,
}

impl SeedStream {
    pub fn new(seed: u64) -> Self {
        Self {
            initial_seed: seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this stream was created with.
    pub fn initial_seed(&self) -> u64 {
        self.initial_seed
    }

    /// Rewinds the stream to its initial state. Only valid between runs.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.initial_seed);
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f32 {
        // 24 bits fit the f32 mantissa, so the result never rounds up to 1.0.
        (self.rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform float in `[min, max]`. Equal bounds return the bound exactly.
    pub fn uniform_f32(&mut self, min: f32, max: f32) -> f32 {
        let u = self.unit();
        if min == max {
            return min;
        }
        min + (max - min) * u
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    pub fn uniform_i32(&mut self, min: i32, max: i32) -> i32 {
        let r = self.rng.next_u32() as u64;
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64 + 1) as u64;
        let offset = (r * span) >> 32;
        (min as i64 + offset as i64) as i32
    }

    /// Random direction on the unit sphere.
    pub fn unit_vector(&mut self) -> Vec3 {
        for _ in 0..UNIT_VECTOR_MAX_ROUNDS {
            let v = Vec3::new(
                self.uniform_f32(-1.0, 1.0),
                self.uniform_f32(-1.0, 1.0),
                self.uniform_f32(-1.0, 1.0),
            );
            let len_sq = v.length_squared();
            if len_sq > 1e-8 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
        Vec3::X
    }

    /// Uniform point inside the disc of `radius` around `center`, on the XY plane.
    pub fn point_in_disc(&mut self, center: Vec3, radius: f32) -> Vec3 {
        let r = radius.max(0.0) * self.unit().sqrt();
        let theta = 2.0 * core::f32::consts::PI * self.unit();
        let offset = Vec2::from_angle(theta) * r;
        center + Vec3::new(offset.x, offset.y, 0.0)
    }
}

impl fmt::Debug for SeedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedStream")
            .field("initial_seed", &self.initial_seed)
            .finish_non_exhaustive()
    }
}

/// Host-side source of the run seed.
///
/// Both subsystems call [`SeedProvider::island_seed`] once at run start and own the
/// returned stream for the rest of the run.
pub trait SeedProvider {
    fn island_seed(&self) -> SeedStream;
}

/// A provider that always hands out the same seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSeed(pub u64);

impl SeedProvider for FixedSeed {
    fn island_seed(&self) -> SeedStream {
        SeedStream::new(self.0)
    }
}

impl SeedProvider for u64 {
    fn island_seed(&self) -> SeedStream {
        SeedStream::new(*self)
    }
}
