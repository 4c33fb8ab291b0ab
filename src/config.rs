// ABOUTME: Simulation configuration - ring size, pool capacity, timings, strategy.
// ABOUTME: Supports chained construction and loading from REFECTORY_* variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_AGENTS: &str = "REFECTORY_AGENTS";
pub const ENV_CAPACITY: &str = "REFECTORY_CAPACITY";
pub const ENV_THINK_MS: &str = "REFECTORY_THINK_MS";
pub const ENV_JITTER_MS: &str = "REFECTORY_JITTER_MS";
pub const ENV_EAT_MS: &str = "REFECTORY_EAT_MS";
pub const ENV_TIMEOUT_MS: &str = "REFECTORY_TIMEOUT_MS";
pub const ENV_STRATEGY: &str = "REFECTORY_STRATEGY";

/// Order in which an agent picks up its two resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionStrategy {
    /// Left first, then right, each with a bounded wait. A timed-out second
    /// pick-up puts the first one back down, which breaks circular waits.
    #[default]
    Timeout,

    /// Lower-indexed resource first. No circular wait can form, at the
    /// cost of giving the agent that closes the ring a different order
    /// from its neighbours.
    Ordered,
}

impl fmt::Display for AcquisitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionStrategy::Timeout => write!(f, "timeout"),
            AcquisitionStrategy::Ordered => write!(f, "ordered"),
        }
    }
}

impl FromStr for AcquisitionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timeout" => Ok(AcquisitionStrategy::Timeout),
            "ordered" => Ok(AcquisitionStrategy::Ordered),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of agents seated around the ring.
    pub agents: usize,

    /// Initial number of units in the shared pool.
    pub capacity: u64,

    /// Fixed part of each thinking delay.
    pub think_time: Duration,

    /// Upper bound of the random delay added to each thinking delay.
    pub think_jitter: Duration,

    /// How long an agent keeps both resources after taking a unit.
    pub eat_time: Duration,

    /// Bounded wait for each resource pick-up.
    pub acquire_timeout: Duration,

    /// Pick-up order.
    pub strategy: AcquisitionStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            capacity: 25,
            think_time: Duration::from_millis(50),
            think_jitter: Duration::from_millis(25),
            eat_time: Duration::from_millis(50),
            acquire_timeout: Duration::from_millis(100),
            strategy: AcquisitionStrategy::Timeout,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration for `agents` agents and a pool of `capacity`
    /// units, with default timings.
    pub fn new(agents: usize, capacity: u64) -> Self {
        Self {
            agents,
            capacity,
            ..Self::default()
        }
    }

    /// Set the fixed thinking delay.
    pub fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Set the upper bound of the random thinking jitter.
    pub fn think_jitter(mut self, think_jitter: Duration) -> Self {
        self.think_jitter = think_jitter;
        self
    }

    /// Set how long an agent eats.
    pub fn eat_time(mut self, eat_time: Duration) -> Self {
        self.eat_time = eat_time;
        self
    }

    /// Set the bounded wait for each pick-up.
    pub fn acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Set the pick-up order.
    pub fn strategy(mut self, strategy: AcquisitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check the configuration describes a runnable ring.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        if self.acquire_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Load a configuration from `REFECTORY_*` environment variables.
    ///
    /// Unset variables keep their default value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(agents) = parse_var(&lookup, ENV_AGENTS)? {
            config.agents = agents;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_CAPACITY)? {
            config.capacity = capacity;
        }
        if let Some(ms) = parse_var(&lookup, ENV_THINK_MS)? {
            config.think_time = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_JITTER_MS)? {
            config.think_jitter = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_EAT_MS)? {
            config.eat_time = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_TIMEOUT_MS)? {
            config.acquire_timeout = Duration::from_millis(ms);
        }
        if let Some(strategy) = lookup(ENV_STRATEGY) {
            config.strategy = strategy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.agents, 5);
        assert_eq!(config.capacity, 25);
        assert_eq!(config.strategy, AcquisitionStrategy::Timeout);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chained_setters() {
        let config = SimulationConfig::new(3, 7)
            .think_time(Duration::from_millis(1))
            .think_jitter(Duration::ZERO)
            .eat_time(Duration::from_millis(2))
            .acquire_timeout(Duration::from_millis(3))
            .strategy(AcquisitionStrategy::Ordered);

        assert_eq!(config.agents, 3);
        assert_eq!(config.capacity, 7);
        assert_eq!(config.think_time, Duration::from_millis(1));
        assert_eq!(config.think_jitter, Duration::ZERO);
        assert_eq!(config.eat_time, Duration::from_millis(2));
        assert_eq!(config.acquire_timeout, Duration::from_millis(3));
        assert_eq!(config.strategy, AcquisitionStrategy::Ordered);
    }

    #[test]
    fn test_validate_rejects_empty_ring() {
        let config = SimulationConfig::new(0, 10);
        assert_eq!(config.validate(), Err(ConfigError::NoAgents));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = SimulationConfig::new(2, 10).acquire_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_zero_capacity_is_valid() {
        assert!(SimulationConfig::new(5, 0).validate().is_ok());
    }

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!(
            "timeout".parse::<AcquisitionStrategy>(),
            Ok(AcquisitionStrategy::Timeout)
        );
        assert_eq!(
            " Ordered ".parse::<AcquisitionStrategy>(),
            Ok(AcquisitionStrategy::Ordered)
        );
        assert_eq!(
            "random".parse::<AcquisitionStrategy>(),
            Err(ConfigError::UnknownStrategy("random".to_string()))
        );
        assert_eq!(AcquisitionStrategy::Ordered.to_string(), "ordered");
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = SimulationConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SimulationConfig::from_lookup(lookup_from(&[
            (ENV_AGENTS, "20"),
            (ENV_CAPACITY, "5"),
            (ENV_THINK_MS, "1"),
            (ENV_JITTER_MS, "0"),
            (ENV_EAT_MS, "2"),
            (ENV_TIMEOUT_MS, "30"),
            (ENV_STRATEGY, "ordered"),
        ]))
        .unwrap();

        assert_eq!(config.agents, 20);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.think_time, Duration::from_millis(1));
        assert_eq!(config.think_jitter, Duration::ZERO);
        assert_eq!(config.eat_time, Duration::from_millis(2));
        assert_eq!(config.acquire_timeout, Duration::from_millis(30));
        assert_eq!(config.strategy, AcquisitionStrategy::Ordered);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = SimulationConfig::from_lookup(lookup_from(&[(ENV_CAPACITY, "lots")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidEnv {
                var: ENV_CAPACITY.to_string(),
                value: "lots".to_string(),
            })
        );
    }

    #[test]
    fn test_from_lookup_validates() {
        let result = SimulationConfig::from_lookup(lookup_from(&[(ENV_AGENTS, "0")]));
        assert_eq!(result, Err(ConfigError::NoAgents));
    }

    #[test]
    fn test_config_json_roundtrip_keeps_strategy_lowercase() {
        let config = SimulationConfig::new(2, 4).strategy(AcquisitionStrategy::Ordered);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["strategy"], "ordered");

        let back: SimulationConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
