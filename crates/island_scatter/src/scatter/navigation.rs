use glam::{Vec2, Vec3};

use crate::island::SpawnPointRegistry;
use crate::seed::SeedStream;

/// Host navigation system.
pub trait NavigationQuery {
    /// A random walkable point within `radius` of `center`, or `None` when the query fails.
    fn random_point_in_navigable_radius(
        &mut self,
        center: Vec3,
        radius: f32,
        seed: &mut SeedStream,
    ) -> Option<Vec3>;

    /// True while the navigation data is being (re)built or is locked.
    fn is_navigation_building_or_locked(&self) -> bool;
}

const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// Flat walkable surface made of discs on the ground plane.
#[derive(Debug, Clone)]
pub struct FlatNavigation {
    discs: Vec<(Vec2, f32)>,
    building: bool,
    max_attempts: u32,
}

impl Default for FlatNavigation {
    fn default() -> Self {
        Self {
            discs: Vec::new(),
            building: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl FlatNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    /// One walkable disc per recorded island.
    pub fn from_spawn_points(points: &SpawnPointRegistry) -> Self {
        points
            .iter()
            .fold(Self::new(), |nav, p| nav.with_disc(p.position, p.radius))
    }

    pub fn with_disc(mut self, center: Vec3, radius: f32) -> Self {
        self.discs.push((center.truncate(), radius.max(0.0)));
        self
    }

    /// Rejection-sampling rounds per query.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn set_building(&mut self, building: bool) {
        self.building = building;
    }

    pub fn is_walkable(&self, p: Vec3) -> bool {
        let q = p.truncate();
        self.discs
            .iter()
            .any(|(c, r)| q.distance_squared(*c) <= r * r)
    }
}

impl NavigationQuery for FlatNavigation {
    fn random_point_in_navigable_radius(
        &mut self,
        center: Vec3,
        radius: f32,
        seed: &mut SeedStream,
    ) -> Option<Vec3> {
        if self.discs.is_empty() {
            return None;
        }
        for _ in 0..self.max_attempts {
            let p = seed.point_in_disc(center, radius);
            if self.is_walkable(p) {
                return Some(Vec3::new(p.x, p.y, 0.0));
            }
        }
        None
    }

    fn is_navigation_building_or_locked(&self) -> bool {
        self.building
    }
}
