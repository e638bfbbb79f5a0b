//! Top-level generator configuration.
//!
//! [`GeneratorConfig`] bundles the run seed with the island and scatter settings so a
//! host can keep a whole generation pass in one file. With the `ron` feature it can be
//! decoded from RON text.
use crate::error::Result;
use crate::island::IslandSpec;
use crate::scatter::ScatterConfig;
use crate::seed::{SeedProvider, SeedStream};

/// Seed plus island and scatter settings for one generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    pub seed: u64,
    pub island: IslandSpec,
    pub scatter: ScatterConfig,
}

impl GeneratorConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_island(mut self, island: IslandSpec) -> Self {
        self.island = island;
        self
    }

    pub fn with_scatter(mut self, scatter: ScatterConfig) -> Self {
        self.scatter = scatter;
        self
    }

    /// Validates both halves of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.island.validate()?;
        self.scatter.validate()
    }

    /// Decodes and validates a configuration from RON text.
    #[cfg(feature = "ron")]
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|e| crate::error::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, decodes and validates a RON configuration file.
    #[cfg(feature = "ron")]
    pub fn from_ron_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded generator config from {}.", path.display());
        Self::from_ron_str(&text)
    }
}

impl SeedProvider for GeneratorConfig {
    fn island_seed(&self) -> SeedStream {
        SeedStream::new(self.seed)
    }
}
