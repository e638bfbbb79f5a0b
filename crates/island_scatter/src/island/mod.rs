//! Island mesh synthesis.
//!
//! [`IslandMeshBuilder`] turns an [`IslandSpec`] and a [`crate::seed::SeedStream`] into a
//! single fused landmass mesh by running a fixed sequence of [`crate::mesh::GeometryKernel`]
//! operations. The island placement points it draws are recorded in a
//! [`SpawnPointRegistry`] for downstream consumers.
use glam::Vec3;

use crate::error::{Error, Result};
use crate::mesh::PrimitiveOptions;

pub mod builder;
pub mod task;

pub use builder::{IslandBuild, IslandMeshBuilder};
pub use task::BuildTask;

/// Shape parameters for one island build.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IslandSpec {
    /// Number of cone islands to generate.
    pub island_count: usize,
    /// Smallest island base radius.
    pub min_radius: f32,
    /// Largest island base radius.
    pub max_radius: f32,
    /// Cone height in world units.
    pub height: f32,
    /// Diameter of the area island centers are drawn from.
    pub max_spawn_distance: f32,
    /// Voxel cells along the longest side during solidify.
    pub grid_resolution: u32,
    /// Rounds of PN subdivision.
    pub tessellation_level: u32,
    /// Cap the open boundary left by the lower cut.
    pub bottom_cut_fill_holes: bool,
    /// Cap the open boundary left by the plateau cut.
    pub top_cut_fill_holes: bool,
    pub primitive: PrimitiveOptions,
}

impl Default for IslandSpec {
    fn default() -> Self {
        Self {
            island_count: 20,
            min_radius: 800.0,
            max_radius: 5000.0,
            height: 1300.0,
            max_spawn_distance: 9976.0,
            grid_resolution: 50,
            tessellation_level: 2,
            bottom_cut_fill_holes: false,
            top_cut_fill_holes: true,
            primitive: PrimitiveOptions::default(),
        }
    }
}

impl IslandSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_island_count(mut self, island_count: usize) -> Self {
        self.island_count = island_count;
        self
    }

    /// Sets the island base radius range.
    pub fn with_radius_range(mut self, min_radius: f32, max_radius: f32) -> Self {
        self.min_radius = min_radius;
        self.max_radius = max_radius;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_max_spawn_distance(mut self, max_spawn_distance: f32) -> Self {
        self.max_spawn_distance = max_spawn_distance;
        self
    }

    pub fn with_grid_resolution(mut self, grid_resolution: u32) -> Self {
        self.grid_resolution = grid_resolution;
        self
    }

    pub fn with_tessellation_level(mut self, tessellation_level: u32) -> Self {
        self.tessellation_level = tessellation_level;
        self
    }

    /// Sets hole filling for the lower and the plateau cut.
    pub fn with_cut_fill_holes(mut self, bottom: bool, top: bool) -> Self {
        self.bottom_cut_fill_holes = bottom;
        self.top_cut_fill_holes = top;
        self
    }

    pub fn with_radial_steps(mut self, radial_steps: u32) -> Self {
        self.primitive.radial_steps = radial_steps;
        self
    }

    /// Validates the island parameters, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_radius.is_finite() && self.max_radius.is_finite()) {
            return Err(Error::InvalidConfig("island radii must be finite".into()));
        }
        if self.min_radius <= 0.0 {
            return Err(Error::InvalidConfig("min_radius must be > 0".into()));
        }
        if self.max_radius < self.min_radius {
            return Err(Error::InvalidConfig(
                "max_radius must be >= min_radius".into(),
            ));
        }
        if self.height.is_nan() || self.height <= 0.0 {
            return Err(Error::InvalidConfig("height must be > 0".into()));
        }
        if self.max_spawn_distance.is_nan() || self.max_spawn_distance < 0.0 {
            return Err(Error::InvalidConfig(
                "max_spawn_distance must be >= 0".into(),
            ));
        }
        if self.grid_resolution == 0 {
            return Err(Error::InvalidConfig("grid_resolution must be > 0".into()));
        }
        if self.primitive.radial_steps < 3 {
            return Err(Error::InvalidConfig("radial_steps must be >= 3".into()));
        }
        Ok(())
    }
}

/// A recorded island placement point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnPoint {
    /// Island center on the ground plane (`z == 0`).
    pub position: Vec3,
    /// Base radius drawn for this island.
    pub radius: f32,
}

/// Island placement points in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnPointRegistry {
    points: Vec<SpawnPoint>,
}

impl SpawnPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            points: Vec::with_capacity(cap),
        }
    }

    /// Appends a point and returns its index.
    pub fn push(&mut self, point: SpawnPoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn get(&self, index: usize) -> Option<&SpawnPoint> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpawnPoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[SpawnPoint] {
        &self.points
    }

    /// Positions only, in generation order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().map(|p| p.position)
    }
}

impl<'a> IntoIterator for &'a SpawnPointRegistry {
    type Item = &'a SpawnPoint;
    type IntoIter = std::slice::Iter<'a, SpawnPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
