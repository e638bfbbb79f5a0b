use std::fmt;

use crate::error::{Error, Result};
use crate::scatter::BiomeShape;

/// Reference to a loadable actor class or resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ResourceRef(pub String);

/// Reference to a mesh used for batched instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MeshRef(pub String);

macro_rules! string_ref {
    ($name:ident) => {
        impl $name {
            pub fn new(path: impl Into<String>) -> Self {
                Self(path.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_ref!(ResourceRef);
string_ref!(MeshRef);

/// Discrete actor scatter settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorDescriptor {
    pub resource: ResourceRef,
    /// Radius of one biome around its center.
    pub biome_scale: f32,
    /// Number of biomes to place.
    pub biome_count: u32,
    /// Upper bound (inclusive) of items per biome.
    pub per_biome_max: u32,
    /// Yaw is drawn from `[0, rotation_range]` degrees.
    pub rotation_range: f32,
    /// Scale is drawn from `[1, 1 + scale_range]`.
    pub scale_range: f32,
}

impl ActorDescriptor {
    pub fn new(resource: impl Into<ResourceRef>) -> Self {
        Self {
            resource: resource.into(),
            biome_scale: 1000.0,
            biome_count: 1,
            per_biome_max: 1,
            rotation_range: 360.0,
            scale_range: 0.0,
        }
    }

    /// Sets biome radius, biome count and items per biome.
    pub fn with_biomes(mut self, biome_scale: f32, biome_count: u32, per_biome_max: u32) -> Self {
        self.biome_scale = biome_scale;
        self.biome_count = biome_count;
        self.per_biome_max = per_biome_max;
        self
    }

    pub fn with_rotation_range(mut self, rotation_range: f32) -> Self {
        self.rotation_range = rotation_range;
        self
    }

    pub fn with_scale_range(mut self, scale_range: f32) -> Self {
        self.scale_range = scale_range;
        self
    }

    pub fn shape(&self) -> BiomeShape {
        BiomeShape {
            biome_scale: self.biome_scale,
            biome_count: self.biome_count,
            per_biome_max: self.per_biome_max,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.biome_scale.is_nan() || self.biome_scale < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "actor descriptor {index}: biome_scale must be >= 0"
            )));
        }
        if self.rotation_range.is_nan() || self.rotation_range < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "actor descriptor {index}: rotation_range must be >= 0"
            )));
        }
        if self.scale_range.is_nan() || self.scale_range < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "actor descriptor {index}: scale_range must be >= 0"
            )));
        }
        Ok(())
    }
}

/// Batched instance scatter settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceDescriptor {
    pub mesh: MeshRef,
    /// Radius of one biome; also the distance at which instance scale reaches its maximum.
    pub biome_scale: f32,
    pub biome_count: u32,
    /// Upper bound (inclusive) of items per biome.
    pub per_biome_max: u32,
}

impl InstanceDescriptor {
    pub fn new(mesh: impl Into<MeshRef>) -> Self {
        Self {
            mesh: mesh.into(),
            biome_scale: 1000.0,
            biome_count: 1,
            per_biome_max: 1,
        }
    }

    /// Sets biome radius, biome count and items per biome.
    pub fn with_biomes(mut self, biome_scale: f32, biome_count: u32, per_biome_max: u32) -> Self {
        self.biome_scale = biome_scale;
        self.biome_count = biome_count;
        self.per_biome_max = per_biome_max;
        self
    }

    pub fn shape(&self) -> BiomeShape {
        BiomeShape {
            biome_scale: self.biome_scale,
            biome_count: self.biome_count,
            per_biome_max: self.per_biome_max,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.biome_scale.is_nan() || self.biome_scale < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "instance descriptor {index}: biome_scale must be >= 0"
            )));
        }
        Ok(())
    }
}

/// Configuration of one scatter run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScatterConfig {
    pub actors: Vec<ActorDescriptor>,
    pub instances: Vec<InstanceDescriptor>,
    /// Time between readiness polls.
    pub poll_interval: f32,
    /// Delay before the first poll; a negative value means "use `poll_interval`".
    pub poll_first_delay: f32,
    /// Placement positions snap to multiples of this step on X and Y.
    pub grid_step: f32,
    /// Radius around the origin biome centers are drawn from.
    pub biome_search_radius: f32,
    /// Upper bound on the wait for one resource load; `None` waits forever.
    pub load_timeout: Option<f32>,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            actors: Vec::new(),
            instances: Vec::new(),
            poll_interval: 0.5,
            poll_first_delay: -0.5,
            grid_step: 200.0,
            biome_search_radius: 10_000.0,
            load_timeout: None,
        }
    }
}

impl ScatterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, descriptor: ActorDescriptor) -> Self {
        self.actors.push(descriptor);
        self
    }

    pub fn with_instance(mut self, descriptor: InstanceDescriptor) -> Self {
        self.instances.push(descriptor);
        self
    }

    /// Sets the poll interval and the first poll delay.
    pub fn with_poll(mut self, interval: f32, first_delay: f32) -> Self {
        self.poll_interval = interval;
        self.poll_first_delay = first_delay;
        self
    }

    pub fn with_grid_step(mut self, grid_step: f32) -> Self {
        self.grid_step = grid_step;
        self
    }

    pub fn with_biome_search_radius(mut self, radius: f32) -> Self {
        self.biome_search_radius = radius;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<f32>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Delay until the first poll after a run starts.
    pub fn first_poll_delay(&self) -> f32 {
        if self.poll_first_delay < 0.0 {
            self.poll_interval
        } else {
            self.poll_first_delay
        }
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_nan() || self.poll_interval <= 0.0 {
            return Err(Error::InvalidConfig("poll_interval must be > 0".into()));
        }
        if self.poll_first_delay.is_nan() {
            return Err(Error::InvalidConfig("poll_first_delay must be a number".into()));
        }
        if self.grid_step.is_nan() || self.grid_step <= 0.0 {
            return Err(Error::InvalidConfig("grid_step must be > 0".into()));
        }
        if self.biome_search_radius.is_nan() || self.biome_search_radius < 0.0 {
            return Err(Error::InvalidConfig(
                "biome_search_radius must be >= 0".into(),
            ));
        }
        if let Some(t) = self.load_timeout {
            if t.is_nan() || t <= 0.0 {
                return Err(Error::InvalidConfig("load_timeout must be > 0".into()));
            }
        }
        for (i, a) in self.actors.iter().enumerate() {
            a.validate(i)?;
        }
        for (i, d) in self.instances.iter().enumerate() {
            d.validate(i)?;
        }
        Ok(())
    }
}
