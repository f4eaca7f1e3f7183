//! Simulation settings.
//!
//! Everything has a default, so an empty JSON object is a valid config. The
//! defaults model three pools of 5, 7 and 10 slots, with exclusive actors
//! arriving rarely and gregarious ones most often.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actor::Species;
use crate::admission::RetryPolicy;
use crate::dispatcher::Arrival;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolLayout {
    /// One pool per entry, with that many slots.
    Fixed(Vec<usize>),
    Random(RandomLayout),
}

impl Default for PoolLayout {
    fn default() -> Self {
        PoolLayout::Fixed(vec![5, 7, 10])
    }
}

impl PoolLayout {
    /// Slot count of each pool. Random layouts draw fresh counts per call.
    pub fn slot_counts(&self) -> Vec<usize> {
        match self {
            PoolLayout::Fixed(counts) => counts.clone(),
            PoolLayout::Random(layout) => layout.draw(),
        }
    }
}

/// Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomLayout {
    pub min_pools: usize,
    pub max_pools: usize,
    pub min_slots: usize,
    pub max_slots: usize,
}

impl Default for RandomLayout {
    fn default() -> Self {
        Self {
            min_pools: 3,
            max_pools: 6,
            min_slots: 5,
            max_slots: 10,
        }
    }
}

impl RandomLayout {
    fn draw(&self) -> Vec<usize> {
        let mut rng = rand::thread_rng();
        let pools = rng.gen_range(self.min_pools..=self.max_pools);
        (0..pools)
            .map(|_| rng.gen_range(self.min_slots..=self.max_slots))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    /// Mean gap between two arrivals of this species.
    pub arrival_mean_secs: f64,
    /// Mean service duration of one actor.
    pub service_mean_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeciesTable {
    pub exclusive: SpeciesConfig,
    pub paired: SpeciesConfig,
    pub gregarious: SpeciesConfig,
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self {
            exclusive: SpeciesConfig {
                arrival_mean_secs: 10.0,
                service_mean_secs: 5.0,
            },
            paired: SpeciesConfig {
                arrival_mean_secs: 3.0,
                service_mean_secs: 5.0,
            },
            gregarious: SpeciesConfig {
                arrival_mean_secs: 2.0,
                service_mean_secs: 3.5,
            },
        }
    }
}

impl SpeciesTable {
    pub fn get(&self, species: Species) -> SpeciesConfig {
        match species {
            Species::Exclusive => self.exclusive,
            Species::Paired => self.paired,
            Species::Gregarious => self.gregarious,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub pools: PoolLayout,
    pub species: SpeciesTable,
    pub retry_backoff_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pools: PoolLayout::default(),
            species: SpeciesTable::default(),
            retry_backoff_ms: 100,
        }
    }
}

impl SimConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.pools {
            PoolLayout::Fixed(counts) => {
                if counts.is_empty() {
                    return Err(ConfigError::NoPools);
                }
                if let Some(index) = counts.iter().position(|&n| n == 0) {
                    return Err(ConfigError::ZeroSlots { index });
                }
            }
            PoolLayout::Random(layout) => {
                if layout.min_pools == 0 {
                    return Err(ConfigError::NoPools);
                }
                if layout.min_slots == 0 {
                    return Err(ConfigError::ZeroSlots { index: 0 });
                }
                if layout.min_pools > layout.max_pools {
                    return Err(ConfigError::InvalidRange(format!(
                        "min_pools {} > max_pools {}",
                        layout.min_pools, layout.max_pools
                    )));
                }
                if layout.min_slots > layout.max_slots {
                    return Err(ConfigError::InvalidRange(format!(
                        "min_slots {} > max_slots {}",
                        layout.min_slots, layout.max_slots
                    )));
                }
            }
        }

        for species in Species::ALL {
            let entry = self.species.get(species);
            for (field, value) in [
                ("arrival_mean_secs", entry.arrival_mean_secs),
                ("service_mean_secs", entry.service_mean_secs),
            ] {
                if !(value > 0.0 && Duration::try_from_secs_f64(value).is_ok()) {
                    return Err(ConfigError::InvalidMean {
                        species,
                        field,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(self.retry_backoff_ms))
    }

    /// One arrival stream per species.
    pub fn arrivals(&self) -> Vec<Arrival> {
        Species::ALL
            .into_iter()
            .map(|species| {
                let entry = self.species.get(species);
                Arrival {
                    species,
                    arrival_mean: Duration::from_secs_f64(entry.arrival_mean_secs),
                    service_mean: Duration::from_secs_f64(entry.service_mean_secs),
                }
            })
            .collect()
    }
}
