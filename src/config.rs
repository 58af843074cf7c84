use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

use crate::{resolver::DEFAULT_EXPANSION_LIMIT, validator::GrammarProfile, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub repair: RepairConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Elapsed time credited to each tick by the simulated clock.
    #[serde(default = "default_tick_interval", with = "duration_ms")]
    pub tick_interval: Duration,

    /// Sleep between ticks so that wall-clock time follows `tick_interval`.
    #[serde(default)]
    pub realtime: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            tick_interval: default_tick_interval(),
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Node budget for the inlined main tree.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub grammar: GrammarProfile,

    /// Fallback whitelist when an episode does not supply one. Empty means the
    /// whole catalogue.
    #[serde(default)]
    pub allowed_primitives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_navigation_steps")]
    pub navigation_steps: u32,

    #[serde(default = "default_manipulation_steps")]
    pub manipulation_steps: u32,

    #[serde(default = "default_instant_steps")]
    pub instant_steps: u32,

    /// Extra steps an instant primitive waits for the scene to settle.
    #[serde(default = "default_settle_steps")]
    pub settle_steps: u32,

    #[serde(default = "default_grasp_success_rate")]
    pub grasp_success_rate: f64,

    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub unreachable_objects: Vec<String>,

    /// Objects present in the scene. Empty means any snake_case object exists.
    #[serde(default)]
    pub known_objects: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            navigation_steps: default_navigation_steps(),
            manipulation_steps: default_manipulation_steps(),
            instant_steps: default_instant_steps(),
            settle_steps: default_settle_steps(),
            grasp_success_rate: default_grasp_success_rate(),
            seed: 0,
            unreachable_objects: Vec::new(),
            known_objects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepairConfig {
    /// Total proposals requested from the plan producer, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let config: Self = from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(s: &str) -> InternalResult<Self> {
        let config: Self = from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.max_ticks == 0 {
            return Err(ConfigError::Invalid(
                "driver.max_ticks must be greater than 0".to_string(),
            ));
        }
        if self.driver.tick_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "driver.tick_interval must be greater than 0".to_string(),
            ));
        }
        if self.resolver.max_nodes == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_nodes must be greater than 0".to_string(),
            ));
        }
        let rate = self.simulation.grasp_success_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Invalid(format!(
                "simulation.grasp_success_rate must be within [0, 1], got {}",
                rate
            )));
        }
        if self.repair.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "repair.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader).map_err(ConfigError::from)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s).map_err(ConfigError::from)?;
    Ok(config)
}

fn default_max_ticks() -> u64 {
    1000
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_max_nodes() -> usize {
    DEFAULT_EXPANSION_LIMIT
}

fn default_navigation_steps() -> u32 {
    5
}

fn default_manipulation_steps() -> u32 {
    3
}

fn default_instant_steps() -> u32 {
    1
}

fn default_settle_steps() -> u32 {
    1
}

fn default_grasp_success_rate() -> f64 {
    1.0
}

fn default_max_attempts() -> usize {
    3
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
